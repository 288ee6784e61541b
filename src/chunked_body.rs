use super::{
    byte_string::ByteString,
    charset::CharacterSet,
    error::Error,
    field::{
        parse_field,
        Field,
    },
    limits::Limits,
    tokenizer::Tokenizer,
    CRLF,
};
use std::convert::TryFrom;
use tracing::{
    debug,
    trace,
};

// qdtext / quoted-pair bytes of RFC 9110 section 5.6.4, minus DQUOTE and
// backslash which end or escape them.
const QDTEXT: CharacterSet =
    CharacterSet::from_ranges("qdtext", &[(0x21, 0x21), (0x23, 0x5B), (0x5D, 0x7E)])
        .union(&CharacterSet::WSP)
        .union(&CharacterSet::OBS_TEXT);

const QUOTED_PAIR: CharacterSet = CharacterSet::VCHAR
    .union(&CharacterSet::WSP)
    .union(&CharacterSet::OBS_TEXT)
    .renamed("quoted-pair");

#[derive(Debug, Eq, PartialEq)]
pub enum DecodeStatus {
    /// The last chunk and the trailer section have been decoded.
    Complete,

    /// All input was used up before the body ended.
    Incomplete,

    /// The output buffer filled up while chunk data remained.
    NeedsSpace,
}

/// Outcome of one [`ChunkedBody::decode`] call.
#[derive(Debug, Eq, PartialEq)]
pub struct Progress {
    pub status: DecodeStatus,

    /// Input bytes used; the caller resumes with the bytes after these.
    pub consumed: usize,

    /// Decoded body bytes placed at the front of the output buffer.
    pub written: usize,
}

enum Step {
    Continue,
    Incomplete,
    NeedsSpace,
    Complete,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ChunkedBodyState {
    ChunkSize,
    ChunkExtension,
    ChunkData,
    ChunkTerminator,
    Trailer,
    Done,
}

fn skip_quoted_string(tok: &mut Tokenizer) -> Result<bool, Error> {
    tok.skip(b'"');
    loop {
        tok.skip_all(&QDTEXT);
        match tok.peek() {
            None => return Ok(false),
            Some(b'"') => {
                tok.skip(b'"');
                return Ok(true);
            },
            Some(b'\\') => {
                tok.skip(b'\\');
                match tok.peek() {
                    None => return Ok(false),
                    Some(_) if tok.skip_one(&QUOTED_PAIR) => (),
                    Some(_) => return Err(Error::InvalidChunkExtension),
                }
            },
            Some(_) => return Err(Error::InvalidChunkExtension),
        }
    }
}

// Parse `*( BWS ";" BWS name [ BWS "=" BWS value ] ) CRLF`, returning
// whether an `ieof` extension was present, or `Ok(None)` if the line has
// not fully arrived.
fn parse_extensions(tok: &mut Tokenizer) -> Result<Option<bool>, Error> {
    let mut ieof = false;
    loop {
        tok.skip_all(&CharacterSet::WSP);
        match tok.remaining().as_bytes() {
            [] | [b'\r'] => return Ok(None),
            [b'\r', b'\n', ..] => {
                tok.skip_literal(CRLF.as_bytes());
                return Ok(Some(ieof));
            },
            [b'\n', ..] | [b'\r', ..] => return Err(Error::InvalidLineTerminator),
            [b';', ..] => {
                tok.skip(b';');
            },
            _ => return Err(Error::InvalidChunkExtension),
        }
        tok.skip_all(&CharacterSet::WSP);
        let name = match tok.prefix(&CharacterSet::TCHAR) {
            Some(name) => name,
            None if tok.at_end() => return Ok(None),
            None => return Err(Error::InvalidChunkExtension),
        };
        let mut value = tok.clone();
        value.skip_all(&CharacterSet::WSP);
        if value.skip(b'=') {
            value.skip_all(&CharacterSet::WSP);
            let complete = match value.peek() {
                None => false,
                Some(b'"') => skip_quoted_string(&mut value)?,
                Some(_) if value.prefix(&CharacterSet::TCHAR).is_some() => true,
                Some(_) => return Err(Error::InvalidChunkExtension),
            };
            if !complete {
                return Ok(None);
            }
            *tok = value;
        } else if value.at_end() {
            return Ok(None);
        }
        if name == "ieof" {
            ieof = true;
        }
    }
}

/// Decoder for the chunked transfer coding of RFC 9112 section 7.1.
///
/// Input is handed over in whatever pieces it arrives in.  Each call
/// reports how much input it used, and the caller passes the unused tail
/// back in (followed by newly arrived bytes) on the next call.  Chunk data
/// is written into a caller-supplied buffer which is never overrun.
#[derive(Debug)]
pub struct ChunkedBody {
    chunk_bytes_needed: u64,
    decoded_size: u64,
    early_eof: bool,
    limits: Limits,
    line_length: usize,
    state: ChunkedBodyState,
    trailer: Vec<Field>,
    trailer_size: usize,
}

impl ChunkedBody {
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(&Limits::default())
    }

    /// Decode with `max_chunk_size` bounding each chunk, `max_field_line`
    /// bounding chunk-size lines and trailer fields, and
    /// `max_header_block` bounding the whole trailer section.
    #[must_use]
    pub fn with_limits(limits: &Limits) -> Self {
        Self {
            chunk_bytes_needed: 0,
            decoded_size: 0,
            early_eof: false,
            limits: limits.clone(),
            line_length: 0,
            state: ChunkedBodyState::ChunkSize,
            trailer: Vec::new(),
            trailer_size: 0,
        }
    }

    /// Whether the last chunk carried an `ieof` extension.
    #[must_use]
    pub fn early_eof(&self) -> bool {
        self.early_eof
    }

    /// Total chunk data decoded so far.
    #[must_use]
    pub fn decoded_size(&self) -> u64 {
        self.decoded_size
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == ChunkedBodyState::Done
    }

    #[must_use]
    pub fn trailer(&self) -> &[Field] {
        &self.trailer
    }

    pub fn decode(
        &mut self,
        input: &ByteString,
        output: &mut [u8],
    ) -> Result<Progress, Error> {
        let mut tok = Tokenizer::new(input.clone());
        let mut written = 0;
        loop {
            let step = match self.state {
                ChunkedBodyState::ChunkSize => self.decode_size(&mut tok),
                ChunkedBodyState::ChunkExtension => {
                    self.decode_extension(&mut tok)
                },
                ChunkedBodyState::ChunkData => {
                    Ok(self.decode_data(&mut tok, output, &mut written))
                },
                ChunkedBodyState::ChunkTerminator => {
                    self.decode_terminator(&mut tok)
                },
                ChunkedBodyState::Trailer => self.decode_trailer(&mut tok),
                ChunkedBodyState::Done => Ok(Step::Complete),
            }
            .map_err(|error| {
                debug!(state = ?self.state, %error, "rejecting chunked body");
                error
            })?;
            let status = match step {
                Step::Continue => continue,
                Step::Incomplete => DecodeStatus::Incomplete,
                Step::NeedsSpace => DecodeStatus::NeedsSpace,
                Step::Complete => DecodeStatus::Complete,
            };
            return Ok(Progress {
                status,
                consumed: tok.parsed_size(),
                written,
            });
        }
    }

    fn set_state(
        &mut self,
        state: ChunkedBodyState,
    ) {
        trace!(from = ?self.state, to = ?state, "chunked body");
        self.state = state;
    }

    fn decode_size(
        &mut self,
        tok: &mut Tokenizer,
    ) -> Result<Step, Error> {
        let limit = self.limits.max_chunk_size;
        let mut ahead = tok.clone();
        let digits = ahead.prefix(&CharacterSet::HEXDIG).unwrap_or_default();
        let mut size: u64 = 0;
        for &digit in digits.iter() {
            size = size
                .checked_mul(16)
                .and_then(|size| {
                    size.checked_add(u64::from(
                        char::from(digit).to_digit(16).unwrap_or(0),
                    ))
                })
                .filter(|&size| size <= limit)
                .ok_or(Error::ChunkSizeTooLarge {
                    limit,
                })?;
        }
        if digits.len() >= self.limits.max_field_line {
            return Err(Error::ChunkLineTooLong {
                limit: self.limits.max_field_line,
            });
        }
        if ahead.at_end() {
            return Ok(Step::Incomplete);
        }
        if digits.is_empty() {
            return Err(Error::MissingChunkSize);
        }
        *tok = ahead;
        self.chunk_bytes_needed = size;
        self.line_length = digits.len();
        self.set_state(ChunkedBodyState::ChunkExtension);
        Ok(Step::Continue)
    }

    fn decode_extension(
        &mut self,
        tok: &mut Tokenizer,
    ) -> Result<Step, Error> {
        let limit = self.limits.max_field_line;
        let mut ahead = tok.clone();
        match parse_extensions(&mut ahead)? {
            Some(_)
                if self.line_length + ahead.parsed_size() - tok.parsed_size()
                    > limit =>
            {
                Err(Error::ChunkLineTooLong {
                    limit,
                })
            },
            Some(ieof) => {
                *tok = ahead;
                if self.chunk_bytes_needed == 0 {
                    self.early_eof = ieof;
                    self.set_state(ChunkedBodyState::Trailer);
                } else {
                    self.set_state(ChunkedBodyState::ChunkData);
                }
                Ok(Step::Continue)
            },
            None if self.line_length + tok.remaining().len() >= limit => {
                Err(Error::ChunkLineTooLong {
                    limit,
                })
            },
            None => Ok(Step::Incomplete),
        }
    }

    fn decode_data(
        &mut self,
        tok: &mut Tokenizer,
        output: &mut [u8],
        written: &mut usize,
    ) -> Step {
        if tok.at_end() {
            return Step::Incomplete;
        }
        let space = output.len() - *written;
        if space == 0 {
            return Step::NeedsSpace;
        }
        let wanted = usize::try_from(self.chunk_bytes_needed).unwrap_or(usize::MAX);
        let n = wanted.min(tok.remaining().len()).min(space);
        if let Some(data) = tok.take(n) {
            output[*written..*written + n].copy_from_slice(&data);
            *written += n;
            self.chunk_bytes_needed -= n as u64;
            self.decoded_size += n as u64;
        }
        if self.chunk_bytes_needed == 0 {
            self.set_state(ChunkedBodyState::ChunkTerminator);
        }
        Step::Continue
    }

    fn decode_terminator(
        &mut self,
        tok: &mut Tokenizer,
    ) -> Result<Step, Error> {
        match tok.remaining().as_bytes() {
            [] | [b'\r'] => Ok(Step::Incomplete),
            [b'\r', b'\n', ..] => {
                tok.skip_literal(CRLF.as_bytes());
                self.set_state(ChunkedBodyState::ChunkSize);
                Ok(Step::Continue)
            },
            _ => Err(Error::InvalidChunkTerminator),
        }
    }

    fn decode_trailer(
        &mut self,
        tok: &mut Tokenizer,
    ) -> Result<Step, Error> {
        match tok.remaining().as_bytes() {
            [] | [b'\r'] => return Ok(Step::Incomplete),
            [b'\r', b'\n', ..] => {
                tok.skip_literal(CRLF.as_bytes());
                self.set_state(ChunkedBodyState::Done);
                return Ok(Step::Complete);
            },
            [b'\n', ..] => return Err(Error::InvalidLineTerminator),
            _ => (),
        }
        let before = tok.parsed_size();
        match parse_field(tok, self.limits.max_field_line)? {
            Some(field) => {
                self.trailer_size += tok.parsed_size() - before;
                if self.trailer_size > self.limits.max_header_block {
                    return Err(Error::HeaderBlockTooLarge {
                        limit: self.limits.max_header_block,
                    });
                }
                self.trailer.push(field);
                Ok(Step::Continue)
            },
            None => Ok(Step::Incomplete),
        }
    }
}

impl Default for ChunkedBody {
    fn default() -> Self {
        Self::new()
    }
}

/// Append `data` to `output` as one chunk.  Nothing is written for empty
/// `data`, since a zero-size chunk would end the body.
pub fn encode_chunk(
    data: &[u8],
    output: &mut Vec<u8>,
) {
    if data.is_empty() {
        return;
    }
    output.extend_from_slice(format!("{:X}\r\n", data.len()).as_bytes());
    output.extend_from_slice(data);
    output.extend_from_slice(CRLF.as_bytes());
}

/// Append the last chunk, the trailer fields, and the empty line ending
/// the body.
pub fn encode_last_chunk(
    trailer: &[Field],
    output: &mut Vec<u8>,
) {
    output.extend_from_slice(b"0\r\n");
    for field in trailer {
        field.generate(output);
    }
    output.extend_from_slice(CRLF.as_bytes());
}
