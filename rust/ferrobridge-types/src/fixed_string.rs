use std::fmt;
use std::str;

/// Stack-allocated, fixed-capacity string. Capacity is `N` bytes; the
/// longest string it can hold is `N - 1` bytes (mirrors the original's
/// `FixedString<N>::MAX_LENGTH = N - 1` so a truncation marker always fits).
#[derive(Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FixedString<const N: usize> {
    buf: [u8; N],
    len: u8,
}

impl<const N: usize> FixedString<N> {
    pub const CAPACITY: usize = N;
    pub const MAX_LENGTH: usize = N - 1;

    pub const fn new() -> Self {
        Self { buf: [0u8; N], len: 0 }
    }

    /// Copies as much of `s` as fits (`MAX_LENGTH` bytes); longer input is
    /// silently truncated at a byte boundary.
    pub fn from_str_truncating(s: &str) -> Self {
        let mut out = Self::new();
        out.set(s);
        out
    }

    pub fn set(&mut self, s: &str) {
        let take = s.len().min(Self::MAX_LENGTH);
        let mut take = take;
        while take > 0 && !s.is_char_boundary(take) {
            take -= 1;
        }
        self.buf[..take].copy_from_slice(&s.as_bytes()[..take]);
        if take < N {
            self.buf[take..].fill(0);
        }
        self.len = take as u8;
    }

    pub fn as_str(&self) -> &str {
        str::from_utf8(&self.buf[..self.len as usize]).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<const N: usize> Default for FixedString<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> From<&str> for FixedString<N> {
    fn from(s: &str) -> Self {
        Self::from_str_truncating(s)
    }
}

impl<const N: usize> fmt::Display for FixedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<const N: usize> fmt::Debug for FixedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FixedString").field(&self.as_str()).finish()
    }
}

impl<const N: usize> PartialEq for FixedString<N> {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}
impl<const N: usize> Eq for FixedString<N> {}

impl<const N: usize> std::hash::Hash for FixedString<N> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_str().hash(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_short_strings() {
        let s: FixedString<64> = "opc-ua/line1/temp".into();
        assert_eq!(s.as_str(), "opc-ua/line1/temp");
    }

    #[test]
    fn truncates_overlong_input() {
        let long = "x".repeat(200);
        let s: FixedString<64> = FixedString::from_str_truncating(&long);
        assert_eq!(s.len(), 63);
    }

    #[test]
    fn empty_by_default() {
        let s: FixedString<16> = FixedString::default();
        assert!(s.is_empty());
        assert_eq!(s.as_str(), "");
    }

    #[test]
    fn truncates_on_char_boundary() {
        // 3-byte UTF-8 char repeated so a naive byte-cut would split it.
        let s: FixedString<5> = FixedString::from_str_truncating("\u{20ac}\u{20ac}\u{20ac}");
        assert!(std::str::from_utf8(s.as_str().as_bytes()).is_ok());
    }
}
