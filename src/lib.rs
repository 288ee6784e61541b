#![warn(clippy::pedantic)]
#![allow(clippy::non_ascii_literal)]

// TODO: Before publishing to crates.io, remove these and fix the warnings they
// suppress.
//#![warn(missing_docs)]
#![allow(clippy::missing_errors_doc)]

mod byte_string;
mod charset;
mod chunked_body;
mod error;
mod field;
mod limits;
mod message;
pub mod proxy_protocol;
mod start_line;
mod tokenizer;

pub use crate::byte_string::ByteString;
pub use crate::charset::CharacterSet;
pub use crate::chunked_body::{
    encode_chunk,
    encode_last_chunk,
    ChunkedBody,
    DecodeStatus,
    Progress,
};
pub use crate::error::{
    Error,
    ErrorKind,
};
pub use crate::field::{
    Field,
    FieldId,
};
pub use crate::limits::Limits;
pub use crate::message::{
    BodyFraming,
    Message,
    ParseStatus,
    State,
};
pub use crate::start_line::{
    LineKind,
    StartLine,
    Version,
};
pub use crate::tokenizer::Tokenizer;

// This is the character sequence corresponding to a carriage return (CR)
// followed by a line feed (LF), which officially delimits each line of an
// HTTP message and of a PROXY protocol v1 header.
const CRLF: &str = "\r\n";
