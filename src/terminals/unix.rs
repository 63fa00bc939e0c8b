//! POSIX terminal backend using termios and ANSI escape sequences.
//!
//! Keeps to a small escape vocabulary (CR, EL, CUF, cursor report) for
//! compatibility with slow or odd terminals. Raw mode is restored three ways:
//! explicitly via [`Terminal::disable_raw`], on drop, and by a process-exit
//! hook registered once so a crash mid-edit cannot leave the shell raw.

use std::env;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, Once};
use std::time::Duration;

use log::{debug, trace};

use crate::{Error, Result, Terminal, WINDOW_PROBE_TIMEOUT};

const UNSUPPORTED_TERMS: &[&str] = &["dumb", "cons25"];

static EXIT_HOOK: Once = Once::new();
static RAW_ACTIVE: AtomicBool = AtomicBool::new(false);
static SAVED_TERMIOS: Mutex<Option<(libc::c_int, libc::termios)>> = Mutex::new(None);

extern "C" fn restore_terminal_at_exit() {
    if RAW_ACTIVE.swap(false, Ordering::SeqCst) {
        if let Ok(saved) = SAVED_TERMIOS.lock() {
            if let Some((fd, orig)) = *saved {
                unsafe { libc::tcsetattr(fd, libc::TCSADRAIN, &orig) };
            }
        }
    }
}

fn is_unsupported_term() -> bool {
    env::var("TERM")
        .map(|term| UNSUPPORTED_TERMS.contains(&term.as_str()))
        .unwrap_or(false)
}

/// Unix terminal using stdin/stdout with termios.
pub struct StdioTerminal {
    fd: libc::c_int,
    stdout: io::Stdout,
    orig: Option<libc::termios>,
}

impl StdioTerminal {
    pub fn new() -> Self {
        Self {
            fd: libc::STDIN_FILENO,
            stdout: io::stdout(),
            orig: None,
        }
    }

    fn emit(&mut self, bytes: &[u8]) -> Result<()> {
        self.stdout.write_all(bytes)?;
        self.stdout.flush()?;
        Ok(())
    }

    fn read_probe_byte(&mut self) -> Option<u8> {
        self.read_byte(Some(WINDOW_PROBE_TIMEOUT)).ok().flatten()
    }

    /// Asks the terminal where the cursor is (`ESC[6n`) and parses the
    /// `ESC [ rows ; cols R` report, keeping only the column.
    fn query_cursor_col(&mut self) -> Option<usize> {
        self.emit(b"\x1b[6n").ok()?;
        if self.read_probe_byte()? != 0x1b || self.read_probe_byte()? != b'[' {
            return None;
        }
        let mut col = 0usize;
        loop {
            match self.read_probe_byte()? {
                b';' => col = 0, // ignore the row count
                b'R' => return (col != 0 && col < 1000).then_some(col),
                b @ b'0'..=b'9' => col = col * 10 + (b - b'0') as usize,
                _ => return None,
            }
        }
    }
}

impl Default for StdioTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal for StdioTerminal {
    fn enable_raw(&mut self) -> Result<()> {
        if unsafe { libc::isatty(self.fd) } == 0 {
            return Err(Error::NotATerminal);
        }
        if is_unsupported_term() {
            return Err(Error::UnsupportedTerm);
        }
        let mut raw = unsafe { std::mem::zeroed::<libc::termios>() };
        if unsafe { libc::tcgetattr(self.fd, &mut raw) } != 0 {
            return Err(io::Error::last_os_error().into());
        }
        let orig = raw;

        // no break, no CR to NL, no parity check, no strip, no flow control
        raw.c_iflag &= !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
        // no output post-processing
        raw.c_oflag &= !libc::OPOST;
        // 8-bit chars
        raw.c_cflag |= libc::CS8;
        // no echo, no canonical mode, no extended functions, no signal chars
        raw.c_lflag &= !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);
        // read returns after every single byte, without timeout
        raw.c_cc[libc::VMIN] = 1;
        raw.c_cc[libc::VTIME] = 0;

        if unsafe { libc::tcsetattr(self.fd, libc::TCSADRAIN, &raw) } != 0 {
            return Err(io::Error::last_os_error().into());
        }
        self.orig = Some(orig);
        if let Ok(mut saved) = SAVED_TERMIOS.lock() {
            *saved = Some((self.fd, orig));
        }
        RAW_ACTIVE.store(true, Ordering::SeqCst);
        EXIT_HOOK.call_once(|| {
            unsafe { libc::atexit(restore_terminal_at_exit) };
        });
        trace!("terminal raw mode enabled");
        Ok(())
    }

    fn disable_raw(&mut self) -> Result<()> {
        if let Some(orig) = self.orig.take() {
            if unsafe { libc::tcsetattr(self.fd, libc::TCSADRAIN, &orig) } != 0 {
                return Err(io::Error::last_os_error().into());
            }
            RAW_ACTIVE.store(false, Ordering::SeqCst);
            trace!("terminal raw mode restored");
        }
        Ok(())
    }

    fn read_byte(&mut self, timeout: Option<Duration>) -> Result<Option<u8>> {
        let mut pfd = libc::pollfd {
            fd: self.fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = timeout.map_or(-1, |d| d.as_millis().min(i32::MAX as u128) as libc::c_int);
        match unsafe { libc::poll(&mut pfd, 1, timeout_ms) } {
            0 => return Ok(None),
            n if n < 0 => return Err(io::Error::last_os_error().into()),
            _ => {}
        }
        let mut byte = 0u8;
        match unsafe { libc::read(self.fd, (&mut byte as *mut u8).cast(), 1) } {
            1 => Ok(Some(byte)),
            0 => Err(Error::Eof),
            _ => Err(io::Error::last_os_error().into()),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.emit(bytes)
    }

    fn window_width(&mut self, current: usize) -> usize {
        let mut ws = unsafe { std::mem::zeroed::<libc::winsize>() };
        if unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) } == 0
            && ws.ws_col != 0
        {
            return ws.ws_col as usize;
        }
        if current != 0 {
            return current;
        }
        // Probably a serial terminal: measure by parking the cursor at the
        // far right and asking where it landed, then put it back.
        debug!("window size ioctl failed; probing with cursor reports");
        let mut cols = 80;
        if let Some(here) = self.query_cursor_col() {
            let _ = self.emit(b"\x1b[999C");
            match self.query_cursor_col() {
                Some(there) => {
                    cols = there;
                    if there > here {
                        let _ = self.emit(format!("\x1b[{}D", there - here).as_bytes());
                    }
                }
                None => {
                    let _ = self.emit(b"\r");
                }
            }
        }
        cols
    }

    fn clear_screen(&mut self) -> Result<()> {
        self.emit(b"\x1b[H\x1b[2J")
    }

    fn cursor_to_left(&mut self) -> Result<()> {
        self.emit(b"\r")
    }

    fn erase_eol(&mut self) -> Result<()> {
        self.emit(b"\x1b[0K")
    }

    fn set_cursor_col(&mut self, col: usize) -> Result<()> {
        if col == 0 {
            self.emit(b"\r")
        } else {
            self.emit(format!("\r\x1b[{col}C").as_bytes())
        }
    }

    fn render_control(&mut self, ch: char) -> Result<()> {
        self.emit(format!("\x1b[7m^{ch}\x1b[0m").as_bytes())
    }
}

impl Drop for StdioTerminal {
    fn drop(&mut self) {
        let _ = self.disable_raw();
    }
}
