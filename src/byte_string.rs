//! This module contains [`ByteString`], the reference-counted byte buffer
//! every parser in this crate slices its results out of.  Substrings share
//! the buffer of the string they were taken from, so parsed elements such
//! as header field names and values are views rather than copies.  The
//! buffer is only copied when a string sharing it is appended to, or when
//! appending in place would mean growing it.

use super::error::Error;
use bytes::{
    Bytes,
    BytesMut,
};
use std::{
    cmp::Ordering,
    fmt,
    hash::{
        Hash,
        Hasher,
    },
    mem,
    ops::Deref,
};

/// A copy-on-write view of a shared, reference-counted byte buffer.
#[derive(Clone, Default)]
pub struct ByteString {
    bytes: Bytes,
}

fn grown_len(
    len: usize,
    extra: usize,
    max_size: usize,
) -> Result<usize, Error> {
    len.checked_add(extra)
        .filter(|&requested| requested <= max_size)
        .ok_or(Error::ByteStringTooLarge {
            requested: len.saturating_add(extra),
        })
}

impl ByteString {
    /// The largest number of bytes a byte string may hold.
    pub const MAX_SIZE: usize = 0x0fff_ffff;

    const MIN_STORE: usize = 64;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Read-only access to the visible bytes, for zero-copy I/O.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Append the given bytes.
    ///
    /// The bytes are written in place only when no other byte string
    /// shares the buffer and it has room for them.  Otherwise the visible
    /// bytes are copied once into a new buffer sized for geometric growth,
    /// which leaves behind everything already consumed from the front.
    /// Views taken earlier never observe the change.
    pub fn append<T>(
        &mut self,
        bytes: T,
    ) -> Result<(), Error>
    where
        T: AsRef<[u8]>,
    {
        self.append_within(bytes.as_ref(), Self::MAX_SIZE)
    }

    fn append_within(
        &mut self,
        bytes: &[u8],
        max_size: usize,
    ) -> Result<(), Error> {
        if bytes.is_empty() {
            return Ok(());
        }
        let requested = grown_len(self.len(), bytes.len(), max_size)?;
        let capacity = requested
            .max(self.len().saturating_mul(2))
            .max(Self::MIN_STORE)
            .min(max_size);
        let relocate = |visible: &[u8]| {
            let mut store = BytesMut::with_capacity(capacity);
            store.extend_from_slice(visible);
            store
        };
        let mut store = match mem::take(&mut self.bytes).try_into_mut() {
            Ok(unique) if unique.capacity() - unique.len() >= bytes.len() => unique,
            Ok(unique) => relocate(&unique),
            Err(shared) => relocate(&shared),
        };
        store.extend_from_slice(bytes);
        self.bytes = store.freeze();
        Ok(())
    }

    /// Return the `len` bytes starting at `start` as a new byte string
    /// sharing this one's buffer.
    pub fn substr(
        &self,
        start: usize,
        len: usize,
    ) -> Result<Self, Error> {
        if start > self.len() || len > self.len() - start {
            return Err(Error::SubstringOutOfRange {
                start,
                len,
                available: self.len(),
            });
        }
        Ok(Self {
            bytes: self.bytes.slice(start..start + len),
        })
    }

    /// Remove up to `n` leading bytes and return them.
    pub fn consume(
        &mut self,
        n: usize,
    ) -> Self {
        let n = n.min(self.len());
        Self {
            bytes: self.bytes.split_to(n),
        }
    }

    /// Position of the first `byte` at or after `start`.
    #[must_use]
    pub fn find(
        &self,
        byte: u8,
        start: usize,
    ) -> Option<usize> {
        self.as_bytes()
            .get(start..)?
            .iter()
            .position(|&b| b == byte)
            .map(|position| position + start)
    }

    /// Position of the first occurrence of `needle` at or after `start`.
    #[must_use]
    pub fn find_slice(
        &self,
        needle: &[u8],
        start: usize,
    ) -> Option<usize> {
        let haystack = self.as_bytes().get(start..)?;
        if needle.is_empty() {
            return Some(start);
        }
        haystack
            .windows(needle.len())
            .position(|window| window == needle)
            .map(|position| position + start)
    }

    /// Compare bytes with ASCII letters folded to lower case.
    #[must_use]
    pub fn compare_ignore_case(
        &self,
        other: &[u8],
    ) -> Ordering {
        self.as_bytes()
            .iter()
            .map(u8::to_ascii_lowercase)
            .cmp(other.iter().map(u8::to_ascii_lowercase))
    }

    /// Whether this non-empty byte string is a view into the very bytes
    /// `other` covers, rather than a copy of them.
    #[must_use]
    pub fn is_view_of(
        &self,
        other: &Self,
    ) -> bool {
        let inner = self.as_bytes().as_ptr_range();
        let outer = other.as_bytes().as_ptr_range();
        !self.is_empty() && outer.start <= inner.start && inner.end <= outer.end
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    // Bytes the buffer could hold from this view onward without being
    // relocated, or zero when the buffer is shared.
    #[cfg(test)]
    fn store_capacity(&mut self) -> usize {
        match mem::take(&mut self.bytes).try_into_mut() {
            Ok(unique) => {
                let capacity = unique.capacity();
                self.bytes = unique.freeze();
                capacity
            },
            Err(shared) => {
                self.bytes = shared;
                0
            },
        }
    }
}

impl Deref for ByteString {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsRef<[u8]> for ByteString {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl From<Bytes> for ByteString {
    fn from(bytes: Bytes) -> Self {
        Self {
            bytes,
        }
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from(Bytes::from(bytes))
    }
}

impl From<&[u8]> for ByteString {
    fn from(bytes: &[u8]) -> Self {
        Self::from(Bytes::copy_from_slice(bytes))
    }
}

impl From<&str> for ByteString {
    fn from(text: &str) -> Self {
        Self::from(text.as_bytes())
    }
}

impl From<String> for ByteString {
    fn from(text: String) -> Self {
        Self::from(text.into_bytes())
    }
}

impl PartialEq for ByteString {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for ByteString {}

impl PartialEq<[u8]> for ByteString {
    fn eq(
        &self,
        other: &[u8],
    ) -> bool {
        self.as_bytes() == other
    }
}

impl PartialEq<&[u8]> for ByteString {
    fn eq(
        &self,
        other: &&[u8],
    ) -> bool {
        self.as_bytes() == *other
    }
}

impl PartialEq<str> for ByteString {
    fn eq(
        &self,
        other: &str,
    ) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for ByteString {
    fn eq(
        &self,
        other: &&str,
    ) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<ByteString> for [u8] {
    fn eq(
        &self,
        other: &ByteString,
    ) -> bool {
        self == other.as_bytes()
    }
}

impl PartialEq<ByteString> for &[u8] {
    fn eq(
        &self,
        other: &ByteString,
    ) -> bool {
        *self == other.as_bytes()
    }
}

impl PartialEq<ByteString> for str {
    fn eq(
        &self,
        other: &ByteString,
    ) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<ByteString> for &str {
    fn eq(
        &self,
        other: &ByteString,
    ) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialOrd for ByteString {
    fn partial_cmp(
        &self,
        other: &Self,
    ) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ByteString {
    fn cmp(
        &self,
        other: &Self,
    ) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl Hash for ByteString {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.as_bytes().hash(state);
    }
}

impl fmt::Display for ByteString {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Debug for ByteString {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "b\"")?;
        for &byte in self.as_bytes() {
            for escaped in std::ascii::escape_default(byte) {
                write!(f, "{}", char::from(escaped))?;
            }
        }
        write!(f, "\"")
    }
}
