//! Bounded history ring with persistent storage.
//!
//! Entries are ordered oldest to newest. While a line is being edited the
//! newest slot is a scratch entry that mirrors the in-progress buffer so
//! up/down navigation and reverse search can index into it; the session
//! controller removes it when the edit completes.
//!
//! On disk, one entry per line with `\` encoded as `\\`, LF as `\n` and CR as
//! `\r`, so entries may contain any mix of those bytes.

use std::fs::File;
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use log::debug;

use crate::{Result, DEFAULT_HISTORY_MAX_LEN};

/// The history ring.
pub struct History {
    entries: Vec<String>,
    max_len: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_MAX_LEN)
    }
}

impl History {
    pub fn new(max_len: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_len,
        }
    }

    /// Appends a line. A line equal to the current newest entry is silently
    /// dropped; when the ring is full the oldest entry is evicted. Returns
    /// whether the line was stored.
    pub fn add(&mut self, line: &str) -> bool {
        if self.max_len == 0 {
            return false;
        }
        if self.entries.last().map(String::as_str) == Some(line) {
            return false;
        }
        if self.entries.len() == self.max_len {
            self.entries.remove(0);
        }
        self.entries.push(line.to_owned());
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Resizes the ring, keeping the newest `max_len` entries. A bound of
    /// zero is refused.
    pub fn set_max_len(&mut self, max_len: usize) -> bool {
        if max_len == 0 {
            return false;
        }
        if self.entries.len() > max_len {
            self.entries.drain(..self.entries.len() - max_len);
        }
        self.max_len = max_len;
        true
    }

    pub(crate) fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    /// Rewrites the entry at `index`; used to keep the scratch slot mirroring
    /// the buffer during navigation.
    pub(crate) fn set(&mut self, index: usize, line: &str) {
        if let Some(slot) = self.entries.get_mut(index) {
            line.clone_into(slot);
        }
    }

    /// Drops the newest entry (the scratch slot) when an edit completes.
    pub(crate) fn pop_newest(&mut self) {
        self.entries.pop();
    }

    /// Writes all entries to `path`, escape-encoded, one per line.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        for entry in &self.entries {
            for ch in entry.chars() {
                match ch {
                    '\\' => w.write_all(b"\\\\")?,
                    '\n' => w.write_all(b"\\n")?,
                    '\r' => w.write_all(b"\\r")?,
                    _ => {
                        let mut buf = [0u8; 4];
                        w.write_all(ch.encode_utf8(&mut buf).as_bytes())?;
                    }
                }
            }
            w.write_all(b"\n")?;
        }
        w.flush()?;
        Ok(())
    }

    /// Loads entries from `path` through [`add`](History::add). A missing
    /// file is not an error.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let mut text = String::new();
        file.read_to_string(&mut text)?;
        let mut loaded = 0;
        for record in records(&text) {
            self.add(&decode_entry(record));
            loaded += 1;
        }
        debug!("loaded {loaded} history records");
        Ok(())
    }
}

/// Splits the file into records, stripping each record's line ending
/// (any mix of trailing CR/LF artifacts) before decoding.
fn records(text: &str) -> impl Iterator<Item = &str> {
    let empty_file = text.is_empty();
    let body = text.strip_suffix('\n').unwrap_or(text);
    body.split('\n')
        .map(|rec| rec.trim_end_matches('\r'))
        .filter(move |_| !empty_file)
}

fn decode_entry(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut it = raw.chars();
    while let Some(ch) = it.next() {
        if ch == '\\' {
            match it.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(ch);
        }
    }
    out
}
