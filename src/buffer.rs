//! The in-memory edit buffer.
//!
//! Externally every operation addresses codepoints; byte offsets exist only
//! inside this module. The buffer also owns the single-slot kill buffer
//! (`capture`) filled by bulk removals and read back by yank.

use crate::utf8;

/// What the caller must do to keep the display in sync after an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EditOutcome {
    /// Nothing changed (no room, or position out of range).
    Refused,
    /// The line must be repainted.
    Redraw,
    /// The edit happened at the end of the visible line; the caller may
    /// instead emit the minimal byte sequence itself (the typed character,
    /// or `"\b \b"` for a removal) if its writes are cell-atomic.
    Inline,
}

/// State of the line under edit.
pub(crate) struct LineState {
    buf: String,
    /// Byte capacity bound; insertions that would reach it are refused.
    max_bytes: usize,
    /// Cached codepoint count of `buf`.
    chars: usize,
    /// Cursor position in codepoints, `0..=chars`.
    pub(crate) pos: usize,
    /// Terminal width in columns; 0 forces a probe on the next repaint.
    pub(crate) cols: usize,
    /// Codepoint count of the prompt, used by the inline fast paths.
    pub(crate) prompt_chars: usize,
    /// The kill slot. Overwritten by each bulk removal.
    pub(crate) capture: Option<String>,
}

impl LineState {
    pub(crate) fn new(max_bytes: usize) -> Self {
        Self {
            buf: String::new(),
            max_bytes,
            chars: 0,
            pos: 0,
            cols: 80,
            prompt_chars: 0,
            capture: None,
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.buf
    }

    /// Length in bytes.
    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    /// Length in codepoints.
    pub(crate) fn chars(&self) -> usize {
        self.chars
    }

    pub(crate) fn take(&mut self) -> String {
        self.chars = 0;
        self.pos = 0;
        std::mem::take(&mut self.buf)
    }

    pub(crate) fn has_room(&self, bytes: usize) -> bool {
        self.buf.len() + bytes < self.max_bytes.saturating_sub(1)
    }

    /// Codepoint at index `pos`, if any.
    pub(crate) fn get_char(&self, pos: usize) -> Option<char> {
        if pos >= self.chars {
            return None;
        }
        self.buf[utf8::index(&self.buf, pos)..].chars().next()
    }

    /// Inserts `ch` at codepoint index `pos`.
    pub(crate) fn insert_char(&mut self, pos: usize, ch: char) -> EditOutcome {
        let mut enc = [0u8; 4];
        let n = utf8::encode(ch, &mut enc);
        if !self.has_room(n) || pos > self.chars {
            return EditOutcome::Refused;
        }
        // Appending a printable char to a line that still fits needs no
        // repaint; the caller can echo the bytes directly.
        let outcome = if self.pos == pos
            && self.chars == pos
            && ch >= ' '
            && self.prompt_chars + self.chars < self.cols.saturating_sub(1)
        {
            EditOutcome::Inline
        } else {
            EditOutcome::Redraw
        };
        self.buf.insert(utf8::index(&self.buf, pos), ch);
        self.chars += 1;
        if self.pos >= pos {
            self.pos += 1;
        }
        outcome
    }

    /// Removes the codepoint at index `pos`.
    pub(crate) fn remove_char(&mut self, pos: usize) -> EditOutcome {
        if pos >= self.chars {
            return EditOutcome::Refused;
        }
        let removed = match self.get_char(pos) {
            Some(ch) => ch,
            None => return EditOutcome::Refused,
        };
        // Rubbing out the last char of a fitting line is a plain backspace.
        let outcome = if self.pos == pos + 1
            && self.pos == self.chars
            && removed >= ' '
            && self.prompt_chars + self.chars < self.cols.saturating_sub(1)
        {
            EditOutcome::Inline
        } else {
            EditOutcome::Redraw
        };
        let p1 = utf8::index(&self.buf, pos);
        self.buf.drain(p1..p1 + removed.len_utf8());
        self.chars -= 1;
        if self.pos > pos {
            self.pos -= 1;
        }
        outcome
    }

    /// Copies `n` codepoints starting at `pos` into the kill slot, replacing
    /// its previous contents. Out-of-range spans leave the slot untouched.
    fn capture_chars(&mut self, pos: usize, n: usize) {
        if n == 0 || pos + n > self.chars {
            return;
        }
        let p1 = utf8::index(&self.buf, pos);
        let p2 = p1 + utf8::index(&self.buf[p1..], n);
        if p2 > p1 {
            self.capture = Some(self.buf[p1..p2].to_owned());
        }
    }

    /// Removes up to `n` codepoints at `pos`, saving them in the kill slot
    /// first. Returns the number actually removed.
    pub(crate) fn remove_chars(&mut self, pos: usize, n: usize) -> usize {
        self.capture_chars(pos, n);
        let mut removed = 0;
        while removed < n && self.remove_char(pos) != EditOutcome::Refused {
            removed += 1;
        }
        removed
    }

    /// Inserts a string at `pos`, stopping at the first refused codepoint.
    /// Returns the number of codepoints inserted.
    pub(crate) fn insert_chars(&mut self, pos: usize, s: &str) -> usize {
        let mut inserted = 0;
        for ch in s.chars() {
            if self.insert_char(pos + inserted, ch) == EditOutcome::Refused {
                break;
            }
            inserted += 1;
        }
        inserted
    }

    /// Replaces the whole buffer, truncating to the byte bound, and moves the
    /// cursor to the end.
    pub(crate) fn set_current(&mut self, s: &str) {
        let mut end = s.len().min(self.max_bytes.saturating_sub(1));
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        self.buf.clear();
        self.buf.push_str(&s[..end]);
        self.chars = utf8::count(&self.buf);
        self.pos = self.chars;
    }

    /// A throwaway state showing `text`, used to preview completion
    /// candidates over the real line.
    pub(crate) fn preview(&self, text: &str) -> LineState {
        let mut tmp = LineState::new(self.max_bytes);
        tmp.cols = self.cols;
        tmp.prompt_chars = self.prompt_chars;
        tmp.set_current(text);
        tmp
    }
}
