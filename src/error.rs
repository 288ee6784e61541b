/// This is the broad classification of every [`Error`] this crate
/// generates, used by callers to decide between "bad syntax" and
/// "too large" diagnostics.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The input violates the protocol grammar; more input cannot fix it.
    Malformed,

    /// A configured size limit was exceeded.
    ResourceLimit,

    /// A byte range was requested outside of a byte string.
    OutOfRange,
}

/// This is the enumeration of all the different kinds of errors which this
/// crate generates.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// Appending to a byte string would have grown it past
    /// [`ByteString::MAX_SIZE`](struct.ByteString.html#associatedconstant.MAX_SIZE).
    #[error("byte string would grow to {requested} bytes")]
    ByteStringTooLarge {
        /// The size the byte string would have had.
        requested: usize,
    },

    /// A substring was requested which does not lie within the byte string.
    #[error("substring {start}+{len} out of range for {available} bytes")]
    SubstringOutOfRange {
        /// Requested start offset.
        start: usize,

        /// Requested length.
        len: usize,

        /// Length of the byte string.
        available: usize,
    },

    /// The request method is missing or contains a byte outside `tchar`.
    #[error("invalid method in request line")]
    InvalidMethod,

    /// The request target is missing or contains a byte outside `VCHAR`.
    #[error("invalid request target in request line")]
    InvalidTarget,

    /// The protocol version is not `HTTP/` DIGIT `.` DIGIT.
    #[error("invalid protocol version")]
    InvalidVersion,

    /// The protocol version is well formed but not HTTP/1.x.
    #[error("unsupported protocol version HTTP/{major}.{minor}")]
    UnsupportedVersion {
        /// Major version digit.
        major: u8,

        /// Minor version digit.
        minor: u8,
    },

    /// The status code in the status line is not exactly three digits.
    #[error("invalid status code")]
    InvalidStatusCode,

    /// The reason phrase contains a byte which is not allowed there.
    #[error("invalid reason phrase")]
    InvalidReasonPhrase,

    /// A single SP was expected between start-line elements.
    #[error("missing or extra whitespace in start line")]
    InvalidStartLineDelimiter,

    /// A line ended with something other than CRLF.
    #[error("line not terminated by CRLF")]
    InvalidLineTerminator,

    /// The start line exceeds the configured limit.
    #[error("start line longer than {limit} bytes")]
    StartLineTooLong {
        /// The configured limit.
        limit: usize,
    },

    /// A field line has no field name before its colon.
    #[error("missing field name")]
    MissingFieldName,

    /// The field name contains a byte outside `tchar`.
    #[error("invalid character in field name")]
    InvalidFieldName,

    /// Whitespace appeared between a field name and its colon.
    #[error("whitespace between field name and colon")]
    WhitespaceBeforeColon,

    /// The field value contains a byte which is not allowed there.
    #[error("invalid character in field value")]
    InvalidFieldValue,

    /// A single field line exceeds the configured limit.
    #[error("field line longer than {limit} bytes")]
    FieldLineTooLong {
        /// The configured limit.
        limit: usize,
    },

    /// The start line and header fields together exceed the configured
    /// limit.
    #[error("header block larger than {limit} bytes")]
    HeaderBlockTooLarge {
        /// The configured limit.
        limit: usize,
    },

    /// A `Content-Length` value is not a non-negative decimal number.
    #[error("invalid Content-Length header value")]
    InvalidContentLength,

    /// The message carries framing headers that disagree with each other.
    #[error("conflicting message framing headers")]
    ConflictingFraming,

    /// The transfer codings cannot be framed by this parser.
    #[error("unsupported transfer coding")]
    UnsupportedTransferCoding,

    /// The message body exceeds the configured limit.
    #[error("message body larger than {limit} bytes")]
    BodyTooLarge {
        /// The configured limit.
        limit: u64,
    },

    /// Body framing was requested while the parser was not waiting for it.
    #[error("message parser is not ready for body framing")]
    UnexpectedBodyFraming,

    /// The input ended before the message did.
    #[error("connection closed before the message ended")]
    TruncatedMessage,

    /// The parser already reported an error for this message.
    #[error("message parser has already failed")]
    ParserFailed,

    /// The chunk-size line does not begin with a hexadecimal number.
    #[error("missing chunk size")]
    MissingChunkSize,

    /// The chunk size exceeds the configured maximum.
    #[error("chunk size exceeds {limit} bytes")]
    ChunkSizeTooLarge {
        /// The configured limit.
        limit: u64,
    },

    /// The chunk extensions are not valid.
    #[error("invalid chunk extension")]
    InvalidChunkExtension,

    /// The chunk-size line exceeds the configured limit.
    #[error("chunk-size line longer than {limit} bytes")]
    ChunkLineTooLong {
        /// The configured limit.
        limit: usize,
    },

    /// Something other than CRLF appeared after chunk data.
    #[error("unexpected extra junk at the end of a chunk")]
    InvalidChunkTerminator,

    /// The input starts with neither PROXY protocol signature.
    #[error("PROXY protocol error: invalid magic")]
    ProxyInvalidMagic,

    /// The PROXY protocol v1 line is malformed.
    #[error("PROXY/1.0 error: {0}")]
    ProxyV1Malformed(&'static str),

    /// The PROXY protocol v1 line is longer than the protocol allows.
    #[error("PROXY/1.0 error: line too long")]
    ProxyV1TooLong,

    /// The PROXY protocol v2 version nibble is not 2.
    #[error("PROXY/2.0 error: invalid version {0}")]
    ProxyV2InvalidVersion(u8),

    /// The PROXY protocol v2 command nibble is unknown.
    #[error("PROXY/2.0 error: invalid command {0}")]
    ProxyV2InvalidCommand(u8),

    /// The PROXY protocol v2 address family nibble is unknown.
    #[error("PROXY/2.0 error: invalid address family {0}")]
    ProxyV2InvalidFamily(u8),

    /// The PROXY protocol v2 transport protocol nibble is unknown.
    #[error("PROXY/2.0 error: invalid transport protocol {0}")]
    ProxyV2InvalidTransport(u8),

    /// The PROXY protocol v2 length is too short for its address family.
    #[error("PROXY/2.0 error: address block needs {needed} bytes, header has {available}")]
    ProxyV2AddressesTruncated {
        /// Bytes the address family requires.
        needed: usize,

        /// Bytes the header declares.
        available: usize,
    },

    /// A PROXY protocol v2 TLV record runs past the declared header length.
    #[error("PROXY/2.0 error: TLV record overruns header")]
    ProxyV2TlvOverrun,

    /// The PROXY protocol v2 declared length exceeds the configured limit.
    #[error("PROXY/2.0 error: header longer than {limit} bytes")]
    ProxyV2TooLong {
        /// The configured limit.
        limit: usize,
    },
}

impl Error {
    /// Classify this error per the parser error taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::SubstringOutOfRange {
                ..
            } => ErrorKind::OutOfRange,
            Error::ByteStringTooLarge {
                ..
            }
            | Error::StartLineTooLong {
                ..
            }
            | Error::FieldLineTooLong {
                ..
            }
            | Error::HeaderBlockTooLarge {
                ..
            }
            | Error::BodyTooLarge {
                ..
            }
            | Error::ChunkSizeTooLarge {
                ..
            }
            | Error::ChunkLineTooLong {
                ..
            }
            | Error::ProxyV1TooLong
            | Error::ProxyV2TooLong {
                ..
            } => ErrorKind::ResourceLimit,
            _ => ErrorKind::Malformed,
        }
    }
}
