//! Minimal raw-mode line editing for character-cell terminals.
//!
//! Design: complete separation of I/O from editing logic via the [`Terminal`]
//! trait. The [`Editor`] owns history and completion state and drives one
//! editing session per [`Editor::read_line`] call; the built-in
//! [`terminals::StdioTerminal`] backends cover POSIX termios and the Windows
//! console.
//!
//! ```no_run
//! use minline::{Editor, terminals::StdioTerminal};
//!
//! let mut editor = Editor::new();
//! let mut terminal = StdioTerminal::new();
//!
//! match editor.read_line(&mut terminal, "> ") {
//!     Ok(line) => println!("got: {line}"),
//!     Err(e) => eprintln!("error: {e}"),
//! }
//! ```

use std::time::Duration;

use thiserror::Error;

mod buffer;
mod completion;
mod editor;
mod history;
mod key;
mod render;
mod utf8;

pub mod terminals;

pub use completion::{CompletionCallback, CompletionFilter, Completions};
pub use editor::{columns, Editor};
pub use history::History;
pub use key::{print_key_codes, Key};

/// Maximum length of an edited line, in bytes.
pub const MAX_LINE: usize = 4096;

/// Default bound on the number of retained history entries.
pub const DEFAULT_HISTORY_MAX_LEN: usize = 100;

/// How long the escape decoder waits for each byte of a sequence.
pub(crate) const ESCAPE_TIMEOUT: Duration = Duration::from_millis(50);

/// Idle cap per byte while draining an unterminated escape sequence.
pub(crate) const DRAIN_TIMEOUT: Duration = Duration::from_millis(200);

/// Per-byte timeout while parsing an `ESC[6n` cursor report.
pub(crate) const WINDOW_PROBE_TIMEOUT: Duration = Duration::from_millis(100);

/// Errors surfaced by an editing session.
#[derive(Debug, Error)]
pub enum Error {
    /// Standard input is not connected to a terminal.
    #[error("stdin is not a terminal")]
    NotATerminal,
    /// The terminal type cannot drive raw-mode editing (`TERM` is `dumb` or `cons25`).
    #[error("unsupported terminal type")]
    UnsupportedTerm,
    /// The user pressed Ctrl-C.
    #[error("interrupted")]
    Interrupted,
    /// End of input: Ctrl-D on an empty line, or the input stream closed.
    #[error("end of input")]
    Eof,
    /// A read from or write to the terminal failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Terminal abstraction that enables platform-agnostic line editing.
///
/// Implement this trait to use the editor with any I/O system. The provided
/// methods cover byte-stream terminals speaking ANSI escape sequences; a
/// backend that receives decoded key events instead (such as the Windows
/// console) overrides [`read_key`](Terminal::read_key) and
/// [`read_literal`](Terminal::read_literal) directly.
pub trait Terminal {
    /// Puts the input in single-byte, no-echo, no-signal mode and records the
    /// prior mode for restore.
    ///
    /// Fails with [`Error::NotATerminal`] or [`Error::UnsupportedTerm`] when
    /// raw editing is impossible; the editor then falls back to
    /// [`read_plain_line`](Terminal::read_plain_line).
    fn enable_raw(&mut self) -> Result<()>;

    /// Restores the mode saved by [`enable_raw`](Terminal::enable_raw).
    ///
    /// Must be safe to call when raw mode was never entered.
    fn disable_raw(&mut self) -> Result<()>;

    /// Reads one input byte, waiting at most `timeout` (`None` waits
    /// indefinitely). Returns `Ok(None)` on timeout.
    fn read_byte(&mut self, timeout: Option<Duration>) -> Result<Option<u8>>;

    /// Writes a byte span to the terminal at the current position.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Returns the window width in columns. `current` is the previously known
    /// width; passing 0 forces a full probe on terminals without a size ioctl.
    fn window_width(&mut self, current: usize) -> usize;

    /// Clears the screen and homes the cursor.
    fn clear_screen(&mut self) -> Result<()>;

    /// Moves the cursor to column 0 of the input row.
    fn cursor_to_left(&mut self) -> Result<()>;

    /// Erases from the cursor to the end of the line.
    fn erase_eol(&mut self) -> Result<()>;

    /// Moves the cursor to column `col` of the input row.
    fn set_cursor_col(&mut self, col: usize) -> Result<()>;

    /// Renders a control character as a highlighted caret glyph (`^X`).
    fn render_control(&mut self, ch: char) -> Result<()>;

    /// Reads and decodes the next key event.
    fn read_key(&mut self) -> Result<Key> {
        key::decode_key(self)
    }

    /// Reads the next codepoint without escape-sequence interpretation.
    ///
    /// Used by Ctrl-V to insert a key literally. Returns `Ok(None)` when the
    /// input yields nothing insertable.
    fn read_literal(&mut self) -> Result<Option<char>> {
        match self.read_byte(None)? {
            Some(b) => key::read_codepoint(self, b),
            None => Ok(None),
        }
    }

    /// Writes flowed text (completion grids, diagnostics) as an ordinary
    /// stream write. Cell-addressed backends override this.
    fn print(&mut self, text: &str) -> Result<()> {
        self.write(text.as_bytes())
    }

    /// Number of prompt bytes occupied by ANSI color SGR sequences
    /// (`ESC [ [0-9;]* m`), which occupy no columns.
    fn sgr_prompt_bytes(&self, prompt: &str) -> usize {
        render::count_sgr_bytes(prompt)
    }

    /// Sounds the terminal bell.
    fn beep(&mut self) {
        use std::io::Write;
        let mut err = std::io::stderr();
        let _ = err.write_all(b"\x07");
        let _ = err.flush();
    }

    /// Line-buffered fallback used when raw mode is refused: prints the
    /// prompt, reads one line from standard input and strips the trailing
    /// newline. Returns `Ok(None)` at end of input.
    fn read_plain_line(&mut self, prompt: &str) -> Result<Option<String>> {
        use std::io::Write;
        let mut out = std::io::stdout();
        out.write_all(prompt.as_bytes())?;
        out.flush()?;
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}
