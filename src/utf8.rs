//! UTF-8 primitives used by the editor core.
//!
//! The rest of the crate addresses text in codepoints and translates to byte
//! offsets only through this module.

/// Byte length of the sequence introduced by `first`, or `None` for a
/// continuation or invalid leading byte.
pub(crate) fn char_len(first: u8) -> Option<usize> {
    match first {
        0x00..=0x7f => Some(1),
        0xc2..=0xdf => Some(2),
        0xe0..=0xef => Some(3),
        0xf0..=0xf4 => Some(4),
        _ => None,
    }
}

/// Decodes one codepoint from the front of `bytes`, returning it with its
/// encoded width.
pub(crate) fn decode(bytes: &[u8]) -> Option<(char, usize)> {
    let n = char_len(*bytes.first()?)?;
    let seq = bytes.get(..n)?;
    let ch = std::str::from_utf8(seq).ok()?.chars().next()?;
    Some((ch, n))
}

/// Encodes `ch` into `buf`, returning the number of bytes written.
pub(crate) fn encode(ch: char, buf: &mut [u8; 4]) -> usize {
    ch.encode_utf8(buf).len()
}

/// Number of codepoints in `s`.
pub(crate) fn count(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of the codepoint at index `pos`, or the string length when
/// `pos` is past the end.
pub(crate) fn index(s: &str, pos: usize) -> usize {
    s.char_indices().nth(pos).map_or(s.len(), |(i, _)| i)
}
