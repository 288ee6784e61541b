use super::{
    byte_string::ByteString,
    charset::CharacterSet,
    error::Error,
    tokenizer::Tokenizer,
    CRLF,
};

const FIELD_VALUE: CharacterSet = CharacterSet::VCHAR
    .union(&CharacterSet::WSP)
    .union(&CharacterSet::OBS_TEXT)
    .renamed("field-value");

/// Identifies field names this crate knows about, so upper layers can
/// dispatch on an enum instead of comparing strings.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FieldId {
    Accept,
    AcceptCharset,
    AcceptEncoding,
    AcceptLanguage,
    AcceptRanges,
    Age,
    Allow,
    Authorization,
    CacheControl,
    Connection,
    ContentEncoding,
    ContentLanguage,
    ContentLength,
    ContentLocation,
    ContentRange,
    ContentType,
    Cookie,
    Date,
    ETag,
    Expect,
    Expires,
    Forwarded,
    From,
    Host,
    IfMatch,
    IfModifiedSince,
    IfNoneMatch,
    IfRange,
    IfUnmodifiedSince,
    KeepAlive,
    LastModified,
    Location,
    MaxForwards,
    Pragma,
    ProxyAuthenticate,
    ProxyAuthorization,
    ProxyConnection,
    Range,
    Referer,
    RetryAfter,
    Server,
    SetCookie,
    Te,
    Trailer,
    TransferEncoding,
    Upgrade,
    UserAgent,
    Vary,
    Via,
    Warning,
    WwwAuthenticate,
    XForwardedFor,
    Other,
}

const KNOWN_FIELDS: &[(&str, FieldId)] = &[
    ("Accept", FieldId::Accept),
    ("Accept-Charset", FieldId::AcceptCharset),
    ("Accept-Encoding", FieldId::AcceptEncoding),
    ("Accept-Language", FieldId::AcceptLanguage),
    ("Accept-Ranges", FieldId::AcceptRanges),
    ("Age", FieldId::Age),
    ("Allow", FieldId::Allow),
    ("Authorization", FieldId::Authorization),
    ("Cache-Control", FieldId::CacheControl),
    ("Connection", FieldId::Connection),
    ("Content-Encoding", FieldId::ContentEncoding),
    ("Content-Language", FieldId::ContentLanguage),
    ("Content-Length", FieldId::ContentLength),
    ("Content-Location", FieldId::ContentLocation),
    ("Content-Range", FieldId::ContentRange),
    ("Content-Type", FieldId::ContentType),
    ("Cookie", FieldId::Cookie),
    ("Date", FieldId::Date),
    ("ETag", FieldId::ETag),
    ("Expect", FieldId::Expect),
    ("Expires", FieldId::Expires),
    ("Forwarded", FieldId::Forwarded),
    ("From", FieldId::From),
    ("Host", FieldId::Host),
    ("If-Match", FieldId::IfMatch),
    ("If-Modified-Since", FieldId::IfModifiedSince),
    ("If-None-Match", FieldId::IfNoneMatch),
    ("If-Range", FieldId::IfRange),
    ("If-Unmodified-Since", FieldId::IfUnmodifiedSince),
    ("Keep-Alive", FieldId::KeepAlive),
    ("Last-Modified", FieldId::LastModified),
    ("Location", FieldId::Location),
    ("Max-Forwards", FieldId::MaxForwards),
    ("Pragma", FieldId::Pragma),
    ("Proxy-Authenticate", FieldId::ProxyAuthenticate),
    ("Proxy-Authorization", FieldId::ProxyAuthorization),
    ("Proxy-Connection", FieldId::ProxyConnection),
    ("Range", FieldId::Range),
    ("Referer", FieldId::Referer),
    ("Retry-After", FieldId::RetryAfter),
    ("Server", FieldId::Server),
    ("Set-Cookie", FieldId::SetCookie),
    ("TE", FieldId::Te),
    ("Trailer", FieldId::Trailer),
    ("Transfer-Encoding", FieldId::TransferEncoding),
    ("Upgrade", FieldId::Upgrade),
    ("User-Agent", FieldId::UserAgent),
    ("Vary", FieldId::Vary),
    ("Via", FieldId::Via),
    ("Warning", FieldId::Warning),
    ("WWW-Authenticate", FieldId::WwwAuthenticate),
    ("X-Forwarded-For", FieldId::XForwardedFor),
];

impl FieldId {
    /// Find the identifier of a field name, ignoring case.  Unknown names
    /// map to [`FieldId::Other`].
    #[must_use]
    pub fn lookup(name: &[u8]) -> Self {
        KNOWN_FIELDS
            .iter()
            .find(|(known, _)| known.as_bytes().eq_ignore_ascii_case(name))
            .map_or(FieldId::Other, |&(_, id)| id)
    }

    /// The canonical spelling of a known field name.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        KNOWN_FIELDS
            .iter()
            .find(|&&(_, id)| id == self)
            .map(|&(name, _)| name)
    }
}

/// One `field-name: field-value` line of a header or trailer section.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Field {
    pub id: FieldId,
    pub name: ByteString,
    pub value: ByteString,
}

impl Field {
    #[must_use]
    pub fn new(
        name: ByteString,
        value: ByteString,
    ) -> Self {
        Self {
            id: FieldId::lookup(&name),
            name,
            value,
        }
    }

    pub fn generate(
        &self,
        output: &mut Vec<u8>,
    ) {
        output.extend_from_slice(&self.name);
        output.extend_from_slice(b": ");
        output.extend_from_slice(&self.value);
        output.extend_from_slice(CRLF.as_bytes());
    }
}

/// Parse a field name and the colon after it.
///
/// `Ok(None)` means the input ended before the colon; the tokenizer is
/// left untouched in that case.
pub fn parse_field_name(tok: &mut Tokenizer) -> Result<Option<ByteString>, Error> {
    let mut ahead = tok.clone();
    let name = ahead.prefix(&CharacterSet::TCHAR);
    match (name, ahead.peek()) {
        (_, None) => Ok(None),
        (None, Some(b':')) | (None, Some(b' ')) | (None, Some(b'\t')) => {
            Err(Error::MissingFieldName)
        },
        (None, Some(_)) => Err(Error::InvalidFieldName),
        (Some(name), Some(b':')) => {
            ahead.skip(b':');
            *tok = ahead;
            Ok(Some(name))
        },
        (Some(_), Some(b' ')) | (Some(_), Some(b'\t')) => {
            ahead.skip_all(&CharacterSet::WSP);
            match ahead.peek() {
                None | Some(b':') => Err(Error::WhitespaceBeforeColon),
                Some(_) => Err(Error::InvalidFieldName),
            }
        },
        (Some(_), Some(_)) => Err(Error::InvalidFieldName),
    }
}

/// Parse a field value with its surrounding whitespace and the CRLF
/// ending the line, returning the value with the whitespace trimmed.
///
/// `Ok(None)` means the input ended before the CRLF; the tokenizer is
/// left untouched in that case.
pub fn parse_field_value(tok: &mut Tokenizer) -> Result<Option<ByteString>, Error> {
    let mut ahead = tok.clone();
    ahead.skip_all(&CharacterSet::WSP);
    let mut value = ahead.prefix(&FIELD_VALUE).unwrap_or_default();
    match ahead.remaining().as_bytes() {
        [] | [b'\r'] => return Ok(None),
        [b'\r', b'\n', ..] => (),
        [b'\n', ..] => return Err(Error::InvalidLineTerminator),
        _ => return Err(Error::InvalidFieldValue),
    }
    ahead.skip_literal(CRLF.as_bytes());
    let trailing_whitespace = value
        .iter()
        .rev()
        .take_while(|&&byte| CharacterSet::WSP.contains(byte))
        .count();
    let value = value.consume(value.len() - trailing_whitespace);
    *tok = ahead;
    Ok(Some(value))
}

/// Parse one complete field line no longer than `limit` bytes, CRLF
/// included.
///
/// `Ok(None)` means the line has not fully arrived yet; the tokenizer is
/// left untouched in that case.
pub fn parse_field(
    tok: &mut Tokenizer,
    limit: usize,
) -> Result<Option<Field>, Error> {
    let mut ahead = tok.clone();
    let field = match parse_field_name(&mut ahead)? {
        Some(name) => parse_field_value(&mut ahead)?
            .map(|value| Field::new(name, value)),
        None => None,
    };
    match field {
        Some(_) if ahead.parsed_size() - tok.parsed_size() > limit => {
            Err(Error::FieldLineTooLong {
                limit,
            })
        },
        Some(field) => {
            *tok = ahead;
            Ok(Some(field))
        },
        None if tok.remaining().len() >= limit => Err(Error::FieldLineTooLong {
            limit,
        }),
        None => Ok(None),
    }
}
