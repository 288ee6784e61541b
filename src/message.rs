use super::{
    byte_string::ByteString,
    charset::CharacterSet,
    chunked_body::{
        encode_chunk,
        encode_last_chunk,
        ChunkedBody,
        DecodeStatus,
    },
    error::Error,
    field::{
        parse_field,
        Field,
        FieldId,
    },
    limits::Limits,
    start_line::{
        self,
        LineKind,
        StartLine,
    },
    tokenizer::Tokenizer,
    CRLF,
};
use std::{
    cmp::Ordering,
    convert::TryFrom,
};
use tracing::{
    debug,
    trace,
};

const COMMA: CharacterSet = CharacterSet::from_bytes("comma", b",");

const LIST_DELIMITERS: CharacterSet =
    CharacterSet::WSP.union(&COMMA).renamed("list delimiter");

/// Where a [`Message`] is in its life.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum State {
    Init,
    ParsingStartLine,
    ParsingHeaders,

    /// The header section is done; the parser waits for
    /// [`Message::expect_body`] before going on.
    HeadersComplete,
    ParsingBody,
    BodyNotExpected,
    MessageComplete,
    Failed,
}

/// What a successful [`Message::parse`] call got to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseStatus {
    /// All input was used up; call again once more has arrived.
    Incomplete,

    /// The header section ended.  Decide on body framing, then call again
    /// with the remaining input.
    HeadersComplete,

    /// The whole message, including any body, has been parsed.
    Complete,
}

/// How the body of a message is delimited (RFC 9112 section 6.3).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BodyFraming {
    /// The message has no body.
    None,

    /// The body is exactly this many bytes.
    Length(u64),

    /// The body uses the chunked transfer coding.
    Chunked,

    /// The body runs until the connection closes.
    UntilClose,
}

#[derive(Debug)]
enum BodyState {
    None,
    Length(u64),
    Chunked(ChunkedBody),
    UntilClose,
}

/// Incremental parser for one HTTP/1.x request or response.
///
/// The caller holds on to every byte it has received but not yet seen
/// consumed, and passes all of them to [`parse`](#method.parse) each time
/// more arrive.  The parser reports how many leading bytes it used; those
/// must not be passed again.  Only whole lines are ever consumed from the
/// start line and header section, so nothing is half-parsed across calls.
#[derive(Debug)]
pub struct Message {
    body: Vec<u8>,
    body_state: BodyState,
    fields: Vec<Field>,
    header_size: usize,
    kind: LineKind,
    limits: Limits,
    start_line: Option<StartLine>,
    state: State,
}

impl Message {
    #[must_use]
    pub fn new(kind: LineKind) -> Self {
        Self::with_limits(kind, Limits::default())
    }

    #[must_use]
    pub fn with_limits(
        kind: LineKind,
        limits: Limits,
    ) -> Self {
        Self {
            body: Vec::new(),
            body_state: BodyState::None,
            fields: Vec::new(),
            header_size: 0,
            kind,
            limits,
            start_line: None,
            state: State::Init,
        }
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    #[must_use]
    pub fn start_line(&self) -> Option<&StartLine> {
        self.start_line.as_ref()
    }

    /// Header fields in the order they were received.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Every field with the given identifier, in order.
    pub fn fields_named(
        &self,
        id: FieldId,
    ) -> impl Iterator<Item = &Field> + '_ {
        self.fields.iter().filter(move |field| field.id == id)
    }

    /// Values of every field whose name matches `name` ignoring case.
    pub fn field_values<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a ByteString> + 'a {
        self.fields
            .iter()
            .filter(move |field| {
                field.name.compare_ignore_case(name.as_bytes()) == Ordering::Equal
            })
            .map(|field| &field.value)
    }

    /// The decoded body received so far.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Trailer fields of a chunked body.
    #[must_use]
    pub fn trailer(&self) -> &[Field] {
        match &self.body_state {
            BodyState::Chunked(decoder) => decoder.trailer(),
            _ => &[],
        }
    }

    /// Whether a chunked body ended with an `ieof` extension.
    #[must_use]
    pub fn early_eof(&self) -> bool {
        match &self.body_state {
            BodyState::Chunked(decoder) => decoder.early_eof(),
            _ => false,
        }
    }

    fn set_state(
        &mut self,
        state: State,
    ) {
        trace!(from = ?self.state, to = ?state, "message");
        self.state = state;
    }

    fn fail(
        &mut self,
        error: Error,
    ) -> Error {
        debug!(state = ?self.state, %error, "rejecting message");
        self.set_state(State::Failed);
        error
    }

    pub fn parse(
        &mut self,
        input: &ByteString,
    ) -> Result<(ParseStatus, usize), Error> {
        if self.state == State::Failed {
            return Err(Error::ParserFailed);
        }
        let mut tok = Tokenizer::new(input.clone());
        match self.parse_tokens(&mut tok) {
            Ok(status) => Ok((status, tok.parsed_size())),
            Err(error) => Err(self.fail(error)),
        }
    }

    fn parse_tokens(
        &mut self,
        tok: &mut Tokenizer,
    ) -> Result<ParseStatus, Error> {
        loop {
            let progressed = match self.state {
                State::Init => {
                    self.set_state(State::ParsingStartLine);
                    true
                },
                State::ParsingStartLine => self.parse_start_line(tok)?,
                State::ParsingHeaders => self.parse_header_line(tok)?,
                State::HeadersComplete => return Ok(ParseStatus::HeadersComplete),
                State::ParsingBody => self.parse_body(tok)?,
                State::BodyNotExpected => {
                    self.set_state(State::MessageComplete);
                    true
                },
                State::MessageComplete => return Ok(ParseStatus::Complete),
                State::Failed => return Err(Error::ParserFailed),
            };
            if !progressed {
                return Ok(ParseStatus::Incomplete);
            }
        }
    }

    fn parse_start_line(
        &mut self,
        tok: &mut Tokenizer,
    ) -> Result<bool, Error> {
        if self.kind == LineKind::Request {
            while tok.skip_literal(CRLF.as_bytes()) {}
            if tok.remaining() == "\r" {
                return Ok(false);
            }
        }
        let before = tok.parsed_size();
        let line = match start_line::parse(self.kind, tok, self.limits.max_start_line)? {
            Some(line) => line,
            None => return Ok(false),
        };
        let version = line.version();
        if version.major != 1 {
            return Err(Error::UnsupportedVersion {
                major: version.major,
                minor: version.minor,
            });
        }
        self.header_size = tok.parsed_size() - before;
        self.start_line = Some(line);
        self.set_state(State::ParsingHeaders);
        Ok(true)
    }

    fn check_header_size(
        &self,
        size: usize,
    ) -> Result<(), Error> {
        if size > self.limits.max_header_block {
            Err(Error::HeaderBlockTooLarge {
                limit: self.limits.max_header_block,
            })
        } else {
            Ok(())
        }
    }

    fn parse_header_line(
        &mut self,
        tok: &mut Tokenizer,
    ) -> Result<bool, Error> {
        match tok.remaining().as_bytes() {
            [] | [b'\r'] => (),
            [b'\r', b'\n', ..] => {
                tok.skip_literal(CRLF.as_bytes());
                self.header_size += CRLF.len();
                self.check_header_size(self.header_size)?;
                self.set_state(State::HeadersComplete);
                return Ok(true);
            },
            [b'\n', ..] => return Err(Error::InvalidLineTerminator),
            _ => {
                let before = tok.parsed_size();
                if let Some(field) = parse_field(tok, self.limits.max_field_line)? {
                    self.header_size += tok.parsed_size() - before;
                    self.check_header_size(self.header_size)?;
                    self.fields.push(field);
                    return Ok(true);
                }
            },
        }
        self.check_header_size(self.header_size + tok.remaining().len())?;
        Ok(false)
    }

    fn parse_body(
        &mut self,
        tok: &mut Tokenizer,
    ) -> Result<bool, Error> {
        let max_body = self.limits.max_body;
        match &mut self.body_state {
            BodyState::None => (),
            BodyState::Length(remaining) => {
                let n = usize::try_from(*remaining)
                    .unwrap_or(usize::MAX)
                    .min(tok.remaining().len());
                if let Some(data) = tok.take(n) {
                    self.body.extend_from_slice(&data);
                    *remaining -= n as u64;
                }
                if *remaining > 0 {
                    return Ok(false);
                }
            },
            BodyState::Chunked(decoder) => {
                let start = self.body.len();
                let room = usize::try_from(max_body.saturating_sub(start as u64))
                    .unwrap_or(usize::MAX);
                self.body.resize(start + room.min(tok.remaining().len()), 0);
                let progress = decoder.decode(tok.remaining(), &mut self.body[start..]);
                let written = progress.as_ref().map_or(0, |progress| progress.written);
                self.body.truncate(start + written);
                let progress = progress?;
                tok.take(progress.consumed);
                match progress.status {
                    DecodeStatus::Complete => (),
                    DecodeStatus::Incomplete => return Ok(false),
                    DecodeStatus::NeedsSpace => {
                        return Err(Error::BodyTooLarge {
                            limit: max_body,
                        })
                    },
                }
            },
            BodyState::UntilClose => {
                let data = tok.remaining().clone();
                if (self.body.len() + data.len()) as u64 > max_body {
                    return Err(Error::BodyTooLarge {
                        limit: max_body,
                    });
                }
                self.body.extend_from_slice(&data);
                tok.take(data.len());
                return Ok(false);
            },
        }
        self.set_state(State::MessageComplete);
        Ok(true)
    }

    /// Decide how the body is delimited, following RFC 9112 section 6.3.
    ///
    /// Framing headers that could be read two different ways are
    /// rejected: Transfer-Encoding alongside Content-Length, differing
    /// Content-Length values, and transfer codings a request cannot be
    /// framed by.  Responses to HEAD requests and 2xx responses to
    /// CONNECT have no body either, but only the caller knows the request,
    /// so it must pass [`BodyFraming::None`] to
    /// [`expect_body`](#method.expect_body) itself in those cases.
    pub fn body_framing(&self) -> Result<BodyFraming, Error> {
        if self.state != State::HeadersComplete {
            return Err(Error::UnexpectedBodyFraming);
        }
        self.framing_policy().map_err(|error| {
            debug!(%error, "rejecting message framing");
            error
        })
    }

    fn framing_policy(&self) -> Result<BodyFraming, Error> {
        let is_request = match &self.start_line {
            Some(StartLine::Status {
                code,
                ..
            }) => {
                if (100..200).contains(code) || *code == 204 || *code == 304 {
                    return Ok(BodyFraming::None);
                }
                false
            },
            _ => true,
        };
        let codings = self
            .fields_named(FieldId::TransferEncoding)
            .flat_map(|field| {
                let mut tok = Tokenizer::new(field.value.clone());
                std::iter::from_fn(move || tok.token(&LIST_DELIMITERS))
            })
            .collect::<Vec<_>>();
        let length = self.content_length()?;
        if !codings.is_empty() {
            if length.is_some() {
                return Err(Error::ConflictingFraming);
            }
            let is_chunked = |coding: &ByteString| {
                coding.compare_ignore_case(b"chunked") == Ordering::Equal
            };
            if codings.iter().filter(|&coding| is_chunked(coding)).count() > 1 {
                return Err(Error::UnsupportedTransferCoding);
            }
            return match codings.last() {
                Some(coding) if is_chunked(coding) => Ok(BodyFraming::Chunked),
                _ if is_request => Err(Error::UnsupportedTransferCoding),
                _ => Ok(BodyFraming::UntilClose),
            };
        }
        Ok(match length {
            Some(length) => BodyFraming::Length(length),
            None if is_request => BodyFraming::None,
            None => BodyFraming::UntilClose,
        })
    }

    // All Content-Length values, including comma-separated repeats, must
    // agree.
    fn content_length(&self) -> Result<Option<u64>, Error> {
        let mut length = None;
        for field in self.fields_named(FieldId::ContentLength) {
            let mut elements = Tokenizer::new(field.value.clone());
            let mut seen = false;
            while let Some(element) = elements.token(&COMMA) {
                let mut digits = Tokenizer::new(element);
                digits.skip_all(&CharacterSet::WSP);
                let value = digits
                    .int64(Some(10), false)
                    .and_then(|value| u64::try_from(value).ok());
                digits.skip_all(&CharacterSet::WSP);
                let value = match value {
                    Some(value) if digits.at_end() => value,
                    _ => return Err(Error::InvalidContentLength),
                };
                match length {
                    Some(previous) if previous != value => {
                        return Err(Error::ConflictingFraming)
                    },
                    _ => length = Some(value),
                }
                seen = true;
            }
            if !seen {
                return Err(Error::InvalidContentLength);
            }
        }
        Ok(length)
    }

    /// Tell the parser how the body is delimited, once
    /// [`parse`](#method.parse) has reported
    /// [`ParseStatus::HeadersComplete`].
    pub fn expect_body(
        &mut self,
        framing: BodyFraming,
    ) -> Result<(), Error> {
        if self.state != State::HeadersComplete {
            return Err(Error::UnexpectedBodyFraming);
        }
        trace!(?framing, "body framing");
        self.body_state = match framing {
            BodyFraming::None => {
                self.set_state(State::BodyNotExpected);
                return Ok(());
            },
            BodyFraming::Length(length) if length > self.limits.max_body => {
                return Err(self.fail(Error::BodyTooLarge {
                    limit: self.limits.max_body,
                }));
            },
            BodyFraming::Length(length) => BodyState::Length(length),
            BodyFraming::Chunked => {
                BodyState::Chunked(ChunkedBody::with_limits(&self.limits))
            },
            BodyFraming::UntilClose => BodyState::UntilClose,
        };
        self.set_state(State::ParsingBody);
        Ok(())
    }

    /// Report that the input has ended, completing a body delimited by
    /// connection close.  Ending anywhere else in the message is an error.
    pub fn finish(&mut self) -> Result<(), Error> {
        match (self.state, &self.body_state) {
            (State::MessageComplete, _) => Ok(()),
            (State::Failed, _) => Err(Error::ParserFailed),
            (State::BodyNotExpected, _)
            | (State::ParsingBody, BodyState::UntilClose) => {
                self.set_state(State::MessageComplete);
                Ok(())
            },
            _ => Err(self.fail(Error::TruncatedMessage)),
        }
    }

    /// Serialize the message as parsed so far.  A chunked body is
    /// re-encoded as a single chunk followed by the trailer.
    pub fn generate(
        &self,
        output: &mut Vec<u8>,
    ) {
        if let Some(line) = &self.start_line {
            line.generate(output);
        }
        for field in &self.fields {
            field.generate(output);
        }
        output.extend_from_slice(CRLF.as_bytes());
        match &self.body_state {
            BodyState::Chunked(decoder) => {
                encode_chunk(&self.body, output);
                encode_last_chunk(decoder.trailer(), output);
            },
            _ => output.extend_from_slice(&self.body),
        }
    }
}
