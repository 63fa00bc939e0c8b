//! Scripted in-memory terminal used by unit tests.
//!
//! Input is a fixed byte script; reads past the end look like a timeout when
//! one was given and like end of input otherwise, which exercises the same
//! paths a real terminal does.

use std::collections::VecDeque;
use std::time::Duration;

use crate::{Error, Result, Terminal};

pub(crate) struct ScriptedTerminal {
    input: VecDeque<u8>,
    output: Vec<u8>,
    width: usize,
    cursor_col: usize,
    beeps: usize,
}

impl ScriptedTerminal {
    pub(crate) fn new(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            output: Vec::new(),
            width: 80,
            cursor_col: 0,
            beeps: 0,
        }
    }

    pub(crate) fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub(crate) fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    pub(crate) fn cursor_col(&self) -> usize {
        self.cursor_col
    }

    #[allow(dead_code)]
    pub(crate) fn beeps(&self) -> usize {
        self.beeps
    }
}

impl Terminal for ScriptedTerminal {
    fn enable_raw(&mut self) -> Result<()> {
        Ok(())
    }

    fn disable_raw(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_byte(&mut self, timeout: Option<Duration>) -> Result<Option<u8>> {
        match self.input.pop_front() {
            Some(b) => Ok(Some(b)),
            None if timeout.is_some() => Ok(None),
            None => Err(Error::Eof),
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

    fn read_plain_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        // Unit tests always run with raw mode accepted.
        Ok(None)
    }
}
