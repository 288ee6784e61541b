use std::{
    fmt,
    ops::{
        Add,
        AddAssign,
        Not,
        Sub,
        SubAssign,
    },
};

/// A named set of byte values, looked up by direct indexing.
///
/// The grammar sets used by the parsers are associated constants built at
/// compile time; ad hoc sets can be composed from them with `+`, `-` and
/// `!`.
#[derive(Clone, Eq, PartialEq)]
pub struct CharacterSet {
    name: &'static str,
    members: [bool; 256],
}

impl CharacterSet {
    /// `A-Z / a-z`
    pub const ALPHA: CharacterSet =
        CharacterSet::from_ranges("ALPHA", &[(b'A', b'Z'), (b'a', b'z')]);
    /// Carriage return.
    pub const CR: CharacterSet = CharacterSet::from_bytes("CR", b"\r");
    /// Control characters, `%x00-1F / %x7F`.
    pub const CTL: CharacterSet =
        CharacterSet::from_ranges("CTL", &[(0x00, 0x1F), (0x7F, 0x7F)]);
    /// `0-9`
    pub const DIGIT: CharacterSet =
        CharacterSet::from_range("DIGIT", b'0', b'9');
    /// `DIGIT / A-F / a-f`
    pub const HEXDIG: CharacterSet = CharacterSet::from_ranges(
        "HEXDIG",
        &[(b'0', b'9'), (b'A', b'F'), (b'a', b'f')],
    );
    /// Line feed.
    pub const LF: CharacterSet = CharacterSet::from_bytes("LF", b"\n");
    /// `%x80-FF`
    pub const OBS_TEXT: CharacterSet =
        CharacterSet::from_range("OBS-TEXT", 0x80, 0xFF);
    /// Space.
    pub const SP: CharacterSet = CharacterSet::from_bytes("SP", b" ");
    /// Token characters of RFC 9110 section 5.6.2.
    pub const TCHAR: CharacterSet =
        CharacterSet::from_bytes("TCHAR", b"!#$%&'*+-.^_`|~")
            .union(&CharacterSet::DIGIT)
            .union(&CharacterSet::ALPHA);
    /// Visible characters, `%x21-7E`.
    pub const VCHAR: CharacterSet =
        CharacterSet::from_range("VCHAR", 0x21, 0x7E);
    /// Space and horizontal tab.
    pub const WSP: CharacterSet = CharacterSet::from_bytes("WSP", b" \t");

    #[must_use]
    pub const fn empty(name: &'static str) -> Self {
        Self {
            name,
            members: [false; 256],
        }
    }

    #[must_use]
    pub const fn from_bytes(
        name: &'static str,
        bytes: &[u8],
    ) -> Self {
        let mut set = Self::empty(name);
        let mut i = 0;
        while i < bytes.len() {
            set.members[bytes[i] as usize] = true;
            i += 1;
        }
        set
    }

    /// The set of bytes from `low` to `high`, both included.
    #[must_use]
    pub const fn from_range(
        name: &'static str,
        low: u8,
        high: u8,
    ) -> Self {
        Self::from_ranges(name, &[(low, high)])
    }

    #[must_use]
    pub const fn from_ranges(
        name: &'static str,
        ranges: &[(u8, u8)],
    ) -> Self {
        let mut set = Self::empty(name);
        let mut r = 0;
        while r < ranges.len() {
            let mut byte = ranges[r].0 as usize;
            while byte <= ranges[r].1 as usize {
                set.members[byte] = true;
                byte += 1;
            }
            r += 1;
        }
        set
    }

    #[must_use]
    pub const fn union(
        mut self,
        other: &CharacterSet,
    ) -> Self {
        let mut i = 0;
        while i < 256 {
            if other.members[i] {
                self.members[i] = true;
            }
            i += 1;
        }
        self
    }

    #[must_use]
    pub const fn difference(
        mut self,
        other: &CharacterSet,
    ) -> Self {
        let mut i = 0;
        while i < 256 {
            if other.members[i] {
                self.members[i] = false;
            }
            i += 1;
        }
        self
    }

    #[must_use]
    pub const fn complement(mut self) -> Self {
        let mut i = 0;
        while i < 256 {
            self.members[i] = !self.members[i];
            i += 1;
        }
        self
    }

    #[must_use]
    pub const fn renamed(
        mut self,
        name: &'static str,
    ) -> Self {
        self.name = name;
        self
    }

    #[must_use]
    pub const fn contains(
        &self,
        byte: u8,
    ) -> bool {
        self.members[byte as usize]
    }

    pub fn insert(
        &mut self,
        byte: u8,
    ) {
        self.members[usize::from(byte)] = true;
    }

    pub fn remove(
        &mut self,
        byte: u8,
    ) {
        self.members[usize::from(byte)] = false;
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.iter().filter(|&&member| member).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.members.iter().any(|&member| member)
    }
}

impl Add<&CharacterSet> for CharacterSet {
    type Output = CharacterSet;

    fn add(
        self,
        other: &CharacterSet,
    ) -> CharacterSet {
        self.union(other)
    }
}

impl AddAssign<&CharacterSet> for CharacterSet {
    fn add_assign(
        &mut self,
        other: &CharacterSet,
    ) {
        for (member, &added) in self.members.iter_mut().zip(other.members.iter()) {
            *member |= added;
        }
    }
}

impl Sub<&CharacterSet> for CharacterSet {
    type Output = CharacterSet;

    fn sub(
        self,
        other: &CharacterSet,
    ) -> CharacterSet {
        self.difference(other)
    }
}

impl SubAssign<&CharacterSet> for CharacterSet {
    fn sub_assign(
        &mut self,
        other: &CharacterSet,
    ) {
        for (member, &removed) in self.members.iter_mut().zip(other.members.iter()) {
            *member &= !removed;
        }
    }
}

impl Not for CharacterSet {
    type Output = CharacterSet;

    fn not(self) -> CharacterSet {
        self.complement()
    }
}

impl fmt::Debug for CharacterSet {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "CharacterSet({}, {} members)", self.name, self.len())
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn grammar_sets() {
        assert!(CharacterSet::TCHAR.contains(b'!'));
        assert!(CharacterSet::TCHAR.contains(b'z'));
        assert!(CharacterSet::TCHAR.contains(b'7'));
        assert!(!CharacterSet::TCHAR.contains(b':'));
        assert!(!CharacterSet::TCHAR.contains(b' '));
        assert!(!CharacterSet::TCHAR.contains(b'"'));
        assert_eq!(77, CharacterSet::TCHAR.len());
        assert_eq!(94, CharacterSet::VCHAR.len());
        assert_eq!(128, CharacterSet::OBS_TEXT.len());
        assert_eq!(33, CharacterSet::CTL.len());
        assert_eq!(22, CharacterSet::HEXDIG.len());
        assert!(CharacterSet::CTL.contains(0x7F));
        assert!(CharacterSet::OBS_TEXT.contains(0xFF));
        assert!(!CharacterSet::VCHAR.contains(b' '));
    }

    #[test]
    fn composition() {
        let mut set = CharacterSet::from_bytes("IP address", b".:")
            + &CharacterSet::HEXDIG;
        assert!(set.contains(b'.'));
        assert!(set.contains(b'f'));
        assert!(!set.contains(b'g'));
        set -= &CharacterSet::DIGIT;
        assert!(!set.contains(b'4'));
        set += &CharacterSet::SP;
        assert!(set.contains(b' '));
        set.remove(b' ');
        set.insert(b'g');
        assert!(set.contains(b'g'));
        assert!(!set.contains(b' '));
        assert_eq!("IP address", set.name());
    }

    #[test]
    fn complement_of_cr() {
        let not_cr = (!CharacterSet::CR).renamed("non-CR");
        assert_eq!(255, not_cr.len());
        assert!(!not_cr.contains(b'\r'));
        assert!(not_cr.contains(b'\n'));
        assert_eq!("non-CR", not_cr.name());
        assert!(CharacterSet::empty("none").is_empty());
        assert_eq!(
            CharacterSet::WSP,
            CharacterSet::WSP + &CharacterSet::DIGIT - &CharacterSet::DIGIT
        );
    }
}
