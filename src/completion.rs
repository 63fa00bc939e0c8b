//! Tab-completion candidates and the host callback contract.
//!
//! The engine itself (word extraction, rotation and list presentation) lives
//! in the session controller; this module owns the data side: the ordered
//! candidate sink handed to the callback and the callback signatures.

use std::cmp::Ordering;

/// Completion callback: receives the word under the cursor, its codepoint
/// bounds within the line, and the sink to fill. The full line is available
/// through [`Completions::line`] so a callback can look left of `start` to
/// tell a command position from an argument position.
pub type CompletionCallback = Box<dyn FnMut(&str, usize, usize, &mut Completions)>;

/// Display filter: maps a candidate to the string shown in the grid listing
/// (or `None` to show the candidate itself). The inserted text is unaffected;
/// used e.g. to list path candidates by basename while committing full paths.
pub type CompletionFilter = Box<dyn FnMut(&str) -> Option<String>>;

/// The growing, ordered candidate vector passed to the completion callback.
pub struct Completions {
    line: String,
    append_char: Option<char>,
    entries: Vec<String>,
}

fn caseless_cmp(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|b| b.to_ascii_lowercase())
        .cmp(b.bytes().map(|b| b.to_ascii_lowercase()))
}

impl Completions {
    pub(crate) fn new(line: &str) -> Self {
        Self {
            line: line.to_owned(),
            append_char: Some(' '),
            entries: Vec::new(),
        }
    }

    /// The whole line buffer as it stood when completion was invoked.
    pub fn line(&self) -> &str {
        &self.line
    }

    /// The character appended after a unique completion, if any.
    pub fn append_char(&self) -> Option<char> {
        self.append_char
    }

    /// Overrides the appended character; `None` suppresses it (e.g. when the
    /// single candidate is a directory ending in `/`).
    pub fn set_append_char(&mut self, ch: Option<char>) {
        self.append_char = ch;
    }

    /// Adds a candidate, keeping the vector in case-insensitive ascending
    /// order. Duplicates are kept; the callback is trusted.
    pub fn add(&mut self, candidate: &str) {
        let at = self
            .entries
            .iter()
            .position(|e| caseless_cmp(candidate, e) != Ordering::Greater)
            .unwrap_or(self.entries.len());
        self.entries.insert(at, candidate.to_owned());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries(&self) -> &[String] {
        &self.entries
    }
}

/// Start of the word under the cursor: the codepoint index just after the
/// last space left of `end` (a codepoint index).
pub(crate) fn word_start(line: &str, end: usize) -> usize {
    let mut start = 0;
    for (i, ch) in line.chars().take(end).enumerate() {
        if ch == ' ' {
            start = i + 1;
        }
    }
    start
}

/// Longest common prefix of all candidates, on codepoint boundaries.
pub(crate) fn common_prefix(entries: &[String]) -> &str {
    let first = match entries.first() {
        Some(f) => f,
        None => return "",
    };
    let mut len = first.len();
    for e in &entries[1..] {
        let common = first
            .bytes()
            .zip(e.bytes())
            .take_while(|(a, b)| a == b)
            .count();
        len = len.min(common);
    }
    while !first.is_char_boundary(len) {
        len -= 1;
    }
    &first[..len]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_keeps_caseless_ascending_order() {
        let mut lc = Completions::new("");
        for c in ["echo", "Cat", "grep", "cd", "CAT"] {
            lc.add(c);
        }
        // An equal-ranking candidate lands before the existing one.
        assert_eq!(lc.entries(), &["CAT", "Cat", "cd", "echo", "grep"]);
    }

    #[test]
    fn duplicates_are_kept() {
        let mut lc = Completions::new("");
        lc.add("ls");
        lc.add("ls");
        assert_eq!(lc.len(), 2);
    }

    #[test]
    fn append_char_defaults_to_space() {
        let mut lc = Completions::new("");
        assert_eq!(lc.append_char(), Some(' '));
        lc.set_append_char(None);
        assert_eq!(lc.append_char(), None);
    }

    #[test]
    fn word_start_scans_left_to_a_space() {
        assert_eq!(word_start("ls foo", 6), 3);
        assert_eq!(word_start("ls foo", 3), 3);
        assert_eq!(word_start("word", 4), 0);
        assert_eq!(word_start("", 0), 0);
        assert_eq!(word_start("a b c", 5), 4);
    }

    #[test]
    fn common_prefix_over_candidates() {
        let v = |s: &[&str]| s.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(common_prefix(&v(&["hello", "hello there"])), "hello");
        assert_eq!(common_prefix(&v(&["hat", "hop"])), "h");
        assert_eq!(common_prefix(&v(&["x", "y"])), "");
        assert_eq!(common_prefix(&v(&["solo"])), "solo");
        assert_eq!(common_prefix(&[]), "");
    }

    #[test]
    fn common_prefix_respects_char_boundaries() {
        let v = vec!["é1".to_string(), "é2".to_string()];
        assert_eq!(common_prefix(&v), "é");
    }
}
