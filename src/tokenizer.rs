use super::{
    byte_string::ByteString,
    charset::CharacterSet,
};

/// A cursor over the unconsumed part of a [`ByteString`].
///
/// Every method either succeeds and advances the cursor, or fails and
/// leaves the tokenizer exactly as it was, so callers can try one
/// production and fall back to another from the same position.
/// Extracted tokens are views sharing the input's backing store.
#[derive(Clone, Debug)]
pub struct Tokenizer {
    buf: ByteString,
    parsed: usize,
}

impl Tokenizer {
    #[must_use]
    pub fn new(buf: ByteString) -> Self {
        Self {
            buf,
            parsed: 0,
        }
    }

    /// The bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> &ByteString {
        &self.buf
    }

    /// Number of bytes consumed since construction.
    #[must_use]
    pub fn parsed_size(&self) -> usize {
        self.parsed
    }

    #[must_use]
    pub fn at_end(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.buf.first().copied()
    }

    fn consume(
        &mut self,
        n: usize,
    ) -> ByteString {
        self.parsed += n;
        self.buf.consume(n)
    }

    fn span(
        &self,
        set: &CharacterSet,
        limit: usize,
    ) -> usize {
        self.buf
            .iter()
            .take(limit)
            .take_while(|&&byte| set.contains(byte))
            .count()
    }

    /// Consume one `byte`.
    pub fn skip(
        &mut self,
        byte: u8,
    ) -> bool {
        if self.peek() == Some(byte) {
            self.consume(1);
            true
        } else {
            false
        }
    }

    /// Consume the exact sequence `literal`.
    pub fn skip_literal(
        &mut self,
        literal: &[u8],
    ) -> bool {
        if self.buf.starts_with(literal) {
            self.consume(literal.len());
            true
        } else {
            false
        }
    }

    /// Consume one byte belonging to `set`.
    pub fn skip_one(
        &mut self,
        set: &CharacterSet,
    ) -> bool {
        match self.peek() {
            Some(byte) if set.contains(byte) => {
                self.consume(1);
                true
            },
            _ => false,
        }
    }

    /// Consume all leading bytes belonging to `set`, returning how many
    /// there were.
    pub fn skip_all(
        &mut self,
        set: &CharacterSet,
    ) -> usize {
        let n = self.span(set, usize::MAX);
        self.consume(n);
        n
    }

    /// Consume and return the longest non-empty run of bytes belonging to
    /// `set`.
    pub fn prefix(
        &mut self,
        set: &CharacterSet,
    ) -> Option<ByteString> {
        self.prefix_limited(set, usize::MAX)
    }

    /// Like [`prefix`](#method.prefix) but never takes more than `limit`
    /// bytes.
    pub fn prefix_limited(
        &mut self,
        set: &CharacterSet,
        limit: usize,
    ) -> Option<ByteString> {
        match self.span(set, limit) {
            0 => None,
            n => Some(self.consume(n)),
        }
    }

    /// Skip leading `delimiters`, then consume and return the bytes up to
    /// (not including) the next delimiter or the end of input.
    pub fn token(
        &mut self,
        delimiters: &CharacterSet,
    ) -> Option<ByteString> {
        let leading = self.span(delimiters, usize::MAX);
        let len = self.buf[leading..]
            .iter()
            .take_while(|&&byte| !delimiters.contains(byte))
            .count();
        if len == 0 {
            return None;
        }
        self.consume(leading);
        Some(self.consume(len))
    }

    /// Parse an integer from the leading digits.
    ///
    /// When `base` is `None` it is detected from the prefix: `0x` selects
    /// hexadecimal, a leading `0` octal, anything else decimal.  An
    /// explicit base of 16 also accepts the `0x` prefix.  Fails without
    /// consuming anything on overflow, on a missing digit, or when the
    /// input starts with whitespace.
    pub fn int64(
        &mut self,
        base: Option<u32>,
        allow_sign: bool,
    ) -> Option<i64> {
        let bytes = self.buf.as_bytes();
        let mut i = 0;
        let mut negative = false;
        if allow_sign {
            match bytes.first() {
                Some(b'-') => {
                    negative = true;
                    i = 1;
                },
                Some(b'+') => i = 1,
                _ => (),
            }
        }
        let hex_prefix = bytes.len() > i + 2
            && bytes[i] == b'0'
            && bytes[i + 1].to_ascii_lowercase() == b'x'
            && bytes[i + 2].is_ascii_hexdigit();
        let base = match base {
            Some(16) | None if hex_prefix => {
                i += 2;
                16
            },
            Some(base) => base,
            None if bytes.get(i) == Some(&b'0') => 8,
            None => 10,
        };
        if !(2..=36).contains(&base) {
            return None;
        }
        let digits_start = i;
        let mut value: i64 = 0;
        while let Some(digit) =
            bytes.get(i).and_then(|&byte| char::from(byte).to_digit(base))
        {
            value = value.checked_mul(i64::from(base))?;
            value = if negative {
                value.checked_sub(i64::from(digit))?
            } else {
                value.checked_add(i64::from(digit))?
            };
            i += 1;
        }
        if i == digits_start {
            return None;
        }
        self.consume(i);
        Some(value)
    }

    /// Consume exactly `n` bytes.
    pub fn take(
        &mut self,
        n: usize,
    ) -> Option<ByteString> {
        if self.buf.len() < n {
            None
        } else {
            Some(self.consume(n))
        }
    }

    pub fn uint8(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.consume(1);
        Some(byte)
    }

    /// Consume a big-endian 16-bit integer.
    pub fn uint16(&mut self) -> Option<u16> {
        let bytes = self.take(2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }
}
