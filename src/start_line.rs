use super::{
    byte_string::ByteString,
    charset::CharacterSet,
    error::Error,
    tokenizer::Tokenizer,
    CRLF,
};
use std::fmt;

const HTTP_MAGIC: &[u8] = b"HTTP/";

const REASON_PHRASE: CharacterSet = CharacterSet::WSP
    .union(&CharacterSet::VCHAR)
    .union(&CharacterSet::OBS_TEXT)
    .renamed("reason-phrase");

/// Selects which first-line grammar a parser expects: clients send
/// request-lines, origins and peers answer with status-lines.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LineKind {
    Request,
    Status,
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    pub const HTTP_1_0: Version = Version {
        major: 1,
        minor: 0,
    };
    pub const HTTP_1_1: Version = Version {
        major: 1,
        minor: 1,
    };
}

impl fmt::Display for Version {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StartLine {
    Request {
        method: ByteString,
        target: ByteString,
        version: Version,
    },
    Status {
        version: Version,
        code: u16,
        reason: ByteString,
    },
}

impl StartLine {
    #[must_use]
    pub fn kind(&self) -> LineKind {
        match self {
            StartLine::Request {
                ..
            } => LineKind::Request,
            StartLine::Status {
                ..
            } => LineKind::Status,
        }
    }

    #[must_use]
    pub fn version(&self) -> Version {
        match self {
            StartLine::Request {
                version,
                ..
            }
            | StartLine::Status {
                version,
                ..
            } => *version,
        }
    }

    pub fn generate(
        &self,
        output: &mut Vec<u8>,
    ) {
        match self {
            StartLine::Request {
                method,
                target,
                version,
            } => {
                output.extend_from_slice(method);
                output.push(b' ');
                output.extend_from_slice(target);
                output.push(b' ');
                output.extend_from_slice(version.to_string().as_bytes());
            },
            StartLine::Status {
                version,
                code,
                reason,
            } => {
                output.extend_from_slice(
                    format!("{} {:03} ", version, code).as_bytes(),
                );
                output.extend_from_slice(reason);
            },
        }
        output.extend_from_slice(CRLF.as_bytes());
    }
}

// Consume the single SP separating two start-line elements.  `Ok(false)`
// means the input ended first.
fn delimiter(
    tok: &mut Tokenizer,
    error: Error,
) -> Result<bool, Error> {
    match tok.peek() {
        None => Ok(false),
        Some(b' ') => {
            tok.skip(b' ');
            Ok(true)
        },
        Some(_) => Err(error),
    }
}

// Consume the CRLF ending a line.  `Ok(false)` means the input ended first.
fn line_end(
    tok: &mut Tokenizer,
    error: Error,
) -> Result<bool, Error> {
    match tok.remaining().as_bytes() {
        [] | [b'\r'] => return Ok(false),
        [b'\r', b'\n', ..] => (),
        [b'\n', ..] | [b'\r', ..] => return Err(Error::InvalidLineTerminator),
        _ => return Err(error),
    }
    tok.skip_literal(CRLF.as_bytes());
    Ok(true)
}

fn digit(tok: &mut Tokenizer) -> Result<Option<u8>, Error> {
    match tok.peek() {
        None => Ok(None),
        Some(byte) if byte.is_ascii_digit() => {
            tok.skip(byte);
            Ok(Some(byte - b'0'))
        },
        Some(_) => Err(Error::InvalidVersion),
    }
}

fn parse_version(tok: &mut Tokenizer) -> Result<Option<Version>, Error> {
    if !tok.skip_literal(HTTP_MAGIC) {
        let remaining = tok.remaining();
        return if remaining.len() < HTTP_MAGIC.len()
            && HTTP_MAGIC.starts_with(remaining.as_bytes())
        {
            Ok(None)
        } else {
            Err(Error::InvalidVersion)
        };
    }
    let major = match digit(tok)? {
        Some(major) => major,
        None => return Ok(None),
    };
    match tok.peek() {
        None => return Ok(None),
        Some(b'.') => {
            tok.skip(b'.');
        },
        Some(_) => return Err(Error::InvalidVersion),
    }
    Ok(digit(tok)?.map(|minor| Version {
        major,
        minor,
    }))
}

fn parse_request_line(tok: &mut Tokenizer) -> Result<Option<StartLine>, Error> {
    let method = match tok.prefix(&CharacterSet::TCHAR) {
        Some(method) => method,
        None if tok.at_end() => return Ok(None),
        None => return Err(Error::InvalidMethod),
    };
    if !delimiter(tok, Error::InvalidMethod)? {
        return Ok(None);
    }
    let target = match tok.prefix(&CharacterSet::VCHAR) {
        Some(target) => target,
        None if tok.at_end() => return Ok(None),
        None if tok.peek() == Some(b' ') => {
            return Err(Error::InvalidStartLineDelimiter)
        },
        None => return Err(Error::InvalidTarget),
    };
    match tok.peek() {
        None => return Ok(None),
        Some(b' ') => {
            tok.skip(b' ');
        },
        Some(b'\r') | Some(b'\n') => return Err(Error::InvalidVersion),
        Some(_) => return Err(Error::InvalidTarget),
    }
    let version = match parse_version(tok)? {
        Some(version) => version,
        None => return Ok(None),
    };
    if !line_end(tok, Error::InvalidVersion)? {
        return Ok(None);
    }
    Ok(Some(StartLine::Request {
        method,
        target,
        version,
    }))
}

fn parse_status_line(tok: &mut Tokenizer) -> Result<Option<StartLine>, Error> {
    let version = match parse_version(tok)? {
        Some(version) => version,
        None => return Ok(None),
    };
    if !delimiter(tok, Error::InvalidVersion)? {
        return Ok(None);
    }
    let code = match tok.prefix_limited(&CharacterSet::DIGIT, 4) {
        Some(code) if code.len() < 3 && tok.at_end() => return Ok(None),
        Some(code) if code.len() == 3 => code,
        None if tok.at_end() => return Ok(None),
        _ => return Err(Error::InvalidStatusCode),
    };
    if !delimiter(tok, Error::InvalidStartLineDelimiter)? {
        return Ok(None);
    }
    let reason = tok.prefix(&REASON_PHRASE).unwrap_or_default();
    if !line_end(tok, Error::InvalidReasonPhrase)? {
        return Ok(None);
    }
    Ok(Some(StartLine::Status {
        version,
        code: code
            .iter()
            .fold(0, |value, &digit| value * 10 + u16::from(digit - b'0')),
        reason,
    }))
}

/// Parse a request-line or status-line, CRLF included, no longer than
/// `limit` bytes.
///
/// `Ok(None)` means the line has not fully arrived yet; the tokenizer is
/// left untouched in that case.  Grammar violations are reported as soon
/// as the offending byte is seen, without waiting for the line end.
pub fn parse(
    kind: LineKind,
    tok: &mut Tokenizer,
    limit: usize,
) -> Result<Option<StartLine>, Error> {
    let mut ahead = tok.clone();
    let line = match kind {
        LineKind::Request => parse_request_line(&mut ahead)?,
        LineKind::Status => parse_status_line(&mut ahead)?,
    };
    match line {
        Some(_) if ahead.parsed_size() - tok.parsed_size() > limit => {
            Err(Error::StartLineTooLong {
                limit,
            })
        },
        Some(line) => {
            *tok = ahead;
            Ok(Some(line))
        },
        None if tok.remaining().len() >= limit => Err(Error::StartLineTooLong {
            limit,
        }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn parse_request(input: &str) -> Result<Option<StartLine>, Error> {
        parse(LineKind::Request, &mut Tokenizer::new(ByteString::from(input)), 1000)
    }

    fn parse_status(input: &str) -> Result<Option<StartLine>, Error> {
        parse(LineKind::Status, &mut Tokenizer::new(ByteString::from(input)), 1000)
    }

    #[test]
    fn request_line() {
        let mut tok = Tokenizer::new(ByteString::from("GET /x HTTP/1.1\r\nHost"));
        let line = parse(LineKind::Request, &mut tok, 1000).unwrap().unwrap();
        assert_eq!(
            StartLine::Request {
                method: "GET".into(),
                target: "/x".into(),
                version: Version::HTTP_1_1,
            },
            line
        );
        assert_eq!(17, tok.parsed_size());
        assert_eq!(LineKind::Request, line.kind());
    }

    #[test]
    fn request_line_absolute_target() {
        assert!(matches!(
            parse_request("CONNECT example.com:443 HTTP/1.0\r\n"),
            Ok(Some(StartLine::Request { target, version: Version::HTTP_1_0, .. }))
                if target == "example.com:443"
        ));
    }

    #[test]
    fn status_line() {
        assert_eq!(
            Ok(Some(StartLine::Status {
                version: Version::HTTP_1_1,
                code: 404,
                reason: "Not Found".into(),
            })),
            parse_status("HTTP/1.1 404 Not Found\r\n")
        );
    }

    #[test]
    fn status_line_empty_reason() {
        assert!(matches!(
            parse_status("HTTP/1.0 204 \r\n"),
            Ok(Some(StartLine::Status { code: 204, reason, .. })) if reason.is_empty()
        ));
    }

    #[test]
    fn status_line_reason_with_whitespace_and_obs_text() {
        let input = ByteString::from(&b"HTTP/1.1 200 Tr\xe8s  bien\r\n"[..]);
        let line = parse(LineKind::Status, &mut Tokenizer::new(input), 1000)
            .unwrap()
            .unwrap();
        assert!(matches!(
            line,
            StartLine::Status { reason, .. } if reason == &b"Tr\xe8s  bien"[..]
        ));
    }

    #[test]
    fn request_line_one_character_at_a_time() {
        let input = "GET /hello.txt HTTP/1.1\r\n";
        for i in 0..input.len() - 1 {
            let mut tok = Tokenizer::new(ByteString::from(&input[..=i]));
            assert_eq!(
                Ok(None),
                parse(LineKind::Request, &mut tok, 1000),
                "{}",
                i
            );
            assert_eq!(0, tok.parsed_size(), "{}", i);
        }
        assert!(matches!(parse_request(input), Ok(Some(_))));
    }

    #[test]
    fn status_line_one_character_at_a_time() {
        let input = "HTTP/1.1 200 OK\r\n";
        for i in 0..input.len() - 1 {
            assert_eq!(Ok(None), parse_status(&input[..=i]), "{}", i);
        }
        assert!(matches!(parse_status(input), Ok(Some(_))));
    }

    #[test]
    fn malformed_request_lines() {
        assert_eq!(Err(Error::InvalidMethod), parse_request(" /x HTTP/1.1\r\n"));
        assert_eq!(Err(Error::InvalidMethod), parse_request("G\x01T /x"));
        assert_eq!(Err(Error::InvalidMethod), parse_request("GET\t/x HTTP/1.1\r\n"));
        assert_eq!(
            Err(Error::InvalidStartLineDelimiter),
            parse_request("GET  HTTP/1.1\r\n")
        );
        assert_eq!(Err(Error::InvalidTarget), parse_request("GET /a\x7fb HTTP/1.1\r\n"));
        assert_eq!(Err(Error::InvalidVersion), parse_request("GET /hello.txt\r\n"));
        assert_eq!(Err(Error::InvalidVersion), parse_request("GET /hello.txt FOO\r\n"));
        assert_eq!(Err(Error::InvalidVersion), parse_request("GET /x HTTP/1.10\r\n"));
        assert_eq!(Err(Error::InvalidVersion), parse_request("GET /x HTTP/11\r\n"));
        assert_eq!(Err(Error::InvalidVersion), parse_request("GET /x HTTP/1.1 \r\n"));
        assert_eq!(
            Err(Error::InvalidLineTerminator),
            parse_request("GET /x HTTP/1.1\n")
        );
        assert_eq!(
            Err(Error::InvalidLineTerminator),
            parse_request("GET /x HTTP/1.1\rX")
        );
    }

    #[test]
    fn malformed_status_lines() {
        assert_eq!(Err(Error::InvalidVersion), parse_status("ICY 200 OK\r\n"));
        assert_eq!(Err(Error::InvalidVersion), parse_status("HTTP/1.1\t200 OK\r\n"));
        assert_eq!(Err(Error::InvalidStatusCode), parse_status("HTTP/1.1 20 OK\r\n"));
        assert_eq!(Err(Error::InvalidStatusCode), parse_status("HTTP/1.1 2000 OK\r\n"));
        assert_eq!(Err(Error::InvalidStatusCode), parse_status("HTTP/1.1  200 OK\r\n"));
        assert_eq!(
            Err(Error::InvalidStartLineDelimiter),
            parse_status("HTTP/1.1 200\r\n")
        );
        assert_eq!(
            Err(Error::InvalidReasonPhrase),
            parse_status("HTTP/1.1 200 O\x00K\r\n")
        );
    }

    #[test]
    fn line_too_long() {
        let target = "X".repeat(1000);
        let line = format!("GET {} HTTP/1.1\r\n", target);
        assert_eq!(
            Err(Error::StartLineTooLong {
                limit: 1000
            }),
            parse_request(&line)
        );
        assert_eq!(
            Err(Error::StartLineTooLong {
                limit: 1000
            }),
            parse_request(&line[..1000])
        );
        assert_eq!(Ok(None), parse_request(&line[..999]));
    }

    #[test]
    fn generate_round_trip() {
        for input in &["GET /x HTTP/1.1\r\n", "HTTP/1.0 503 Service Unavailable\r\n"] {
            let kind = if input.starts_with("HTTP") {
                LineKind::Status
            } else {
                LineKind::Request
            };
            let line = parse(kind, &mut Tokenizer::new(ByteString::from(*input)), 1000)
                .unwrap()
                .unwrap();
            let mut output = Vec::new();
            line.generate(&mut output);
            assert_eq!(input.as_bytes(), &output[..]);
        }
    }
}
