//! Scripted terminal driving full editing sessions through the public API.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::time::Duration;

use minline::{Error, Result, Terminal};

/// Script byte that makes the next timed read report a timeout; used to
/// press a bare ESC (the decoder otherwise consumes the following byte as
/// part of a sequence).
pub const PAUSE: u8 = 0xfe;

pub struct MockTerminal {
    input: VecDeque<u8>,
    pub output: Vec<u8>,
    pub beeps: usize,
    pub cursor_col: usize,
    width: usize,
    raw_entered: usize,
    raw_left: usize,
    refuse_raw: bool,
    plain: VecDeque<String>,
}

impl MockTerminal {
    pub fn new(script: &[u8]) -> Self {
        Self {
            input: script.iter().copied().collect(),
            output: Vec::new(),
            beeps: 0,
            cursor_col: 0,
            width: 80,
            raw_entered: 0,
            raw_left: 0,
            refuse_raw: false,
            plain: VecDeque::new(),
        }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// A terminal that refuses raw mode and serves `lines` from the plain
    /// stdio fallback instead.
    pub fn refusing_raw(lines: &[&str]) -> Self {
        let mut term = Self::new(b"");
        term.refuse_raw = true;
        term.plain = lines.iter().map(|s| s.to_string()).collect();
        term
    }

    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// Raw mode enters and leaves must pair up.
    pub fn assert_raw_balanced(&self) {
        assert_eq!(self.raw_entered, self.raw_left, "unbalanced raw mode");
    }
}

impl Terminal for MockTerminal {
    fn enable_raw(&mut self) -> Result<()> {
        if self.refuse_raw {
            return Err(Error::NotATerminal);
        }
        self.raw_entered += 1;
        Ok(())
    }

    fn disable_raw(&mut self) -> Result<()> {
        if self.raw_entered > self.raw_left {
            self.raw_left += 1;
        }
        Ok(())
    }

    fn read_byte(&mut self, timeout: Option<Duration>) -> Result<Option<u8>> {
        loop {
            match self.input.pop_front() {
                Some(PAUSE) => {
                    if timeout.is_some() {
                        return Ok(None);
                    }
                    // An untimed read skips the pause marker.
                }
                Some(b) => return Ok(Some(b)),
                None if timeout.is_some() => return Ok(None),
                None => return Err(Error::Eof),
            }
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.output.extend_from_slice(bytes);
        Ok(())
    }

    fn window_width(&mut self, _current: usize) -> usize {
        self.width
    }

    fn clear_screen(&mut self) -> Result<()> {
        self.output.extend_from_slice(b"\x1b[H\x1b[2J");
        Ok(())
    }

    fn cursor_to_left(&mut self) -> Result<()> {
        self.output.push(b'\r');
        Ok(())
    }

    fn erase_eol(&mut self) -> Result<()> {
        self.output.extend_from_slice(b"\x1b[0K");
        Ok(())
    }

    fn set_cursor_col(&mut self, col: usize) -> Result<()> {
        self.cursor_col = col;
        Ok(())
    }

    fn render_control(&mut self, ch: char) -> Result<()> {
        self.output.push(b'^');
        let mut buf = [0u8; 4];
        self.output.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
        Ok(())
    }

    fn beep(&mut self) {
        self.beeps += 1;
    }

    fn read_plain_line(&mut self, prompt: &str) -> Result<Option<String>> {
        self.output.extend_from_slice(prompt.as_bytes());
        Ok(self.plain.pop_front())
    }
}
