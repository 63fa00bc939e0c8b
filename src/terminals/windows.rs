//! Windows console backend using the Console API.
//!
//! Output goes through cell writes at a tracked (x, y) position whose row is
//! re-synced from the screen-buffer info on every width query; input comes
//! from `ReadConsoleInputW` with virtual keys translated to the same abstract
//! [`Key`] codes the ANSI decoder produces, so the core never branches on the
//! platform.

use std::io;
use std::time::Duration;

use winapi::shared::minwindef::DWORD;
use winapi::um::consoleapi::{GetConsoleMode, ReadConsoleInputW, SetConsoleMode, WriteConsoleA};
use winapi::um::handleapi::INVALID_HANDLE_VALUE;
use winapi::um::processenv::GetStdHandle;
use winapi::um::winbase::{STD_INPUT_HANDLE, STD_OUTPUT_HANDLE};
use winapi::um::wincon::{
    FillConsoleOutputAttribute, FillConsoleOutputCharacterA, GetConsoleScreenBufferInfo,
    SetConsoleCursorPosition, WriteConsoleOutputCharacterW, BACKGROUND_INTENSITY,
    CONSOLE_SCREEN_BUFFER_INFO, ENABLE_ECHO_INPUT, ENABLE_LINE_INPUT, ENABLE_PROCESSED_INPUT,
    ENABLE_WINDOW_INPUT, ENHANCED_KEY, FOREGROUND_BLUE, FOREGROUND_GREEN, FOREGROUND_RED,
    INPUT_RECORD, KEY_EVENT,
};
use winapi::um::wincontypes::{COORD, KEY_EVENT_RECORD};
use winapi::um::winnt::HANDLE;
use winapi::um::winuser::{
    GetKeyState, VK_CONTROL, VK_DELETE, VK_DOWN, VK_END, VK_HOME, VK_INSERT, VK_LEFT, VK_MENU,
    VK_NEXT, VK_PRIOR, VK_RETURN, VK_RIGHT, VK_UP,
};

use crate::key::{ENTER, ESCAPE};
use crate::{Error, Key, Result, Terminal};

const DEFAULT_ATTR: u16 = FOREGROUND_RED | FOREGROUND_GREEN | FOREGROUND_BLUE;

/// Windows terminal using stdin/stdout with the Console API.
pub struct StdioTerminal {
    inh: HANDLE,
    outh: HANDLE,
    orig_mode: Option<DWORD>,
    cols: i16,
    rows: i16,
    x: i16,
    y: i16,
}

impl StdioTerminal {
    /// Creates a terminal over the standard console handles.
    ///
    /// # Panics
    ///
    /// Panics if the standard handles cannot be obtained (extremely rare).
    pub fn new() -> Self {
        unsafe {
            let inh = GetStdHandle(STD_INPUT_HANDLE);
            let outh = GetStdHandle(STD_OUTPUT_HANDLE);
            if inh == INVALID_HANDLE_VALUE || outh == INVALID_HANDLE_VALUE {
                panic!(
                    "failed to get standard console handles: {:?}",
                    io::Error::last_os_error()
                );
            }
            Self {
                inh,
                outh,
                orig_mode: None,
                cols: 0,
                rows: 0,
                x: 0,
                y: 0,
            }
        }
    }

    /// Re-reads the screen-buffer info, tracking the input row.
    fn refresh_info(&mut self) -> bool {
        unsafe {
            let mut info = std::mem::zeroed::<CONSOLE_SCREEN_BUFFER_INFO>();
            if GetConsoleScreenBufferInfo(self.outh, &mut info) == 0 {
                return false;
            }
            self.cols = info.dwSize.X;
            self.rows = info.dwSize.Y;
            self.x = info.dwCursorPosition.X;
            self.y = info.dwCursorPosition.Y;
        }
        true
    }

    fn next_key_event(&mut self) -> Result<KEY_EVENT_RECORD> {
        loop {
            unsafe {
                let mut rec = std::mem::zeroed::<INPUT_RECORD>();
                let mut read: DWORD = 0;
                if ReadConsoleInputW(self.inh, &mut rec, 1, &mut read) == 0 {
                    return Err(io::Error::last_os_error().into());
                }
                if read == 0 {
                    return Err(Error::Eof);
                }
                if rec.EventType == KEY_EVENT {
                    let key = *rec.Event.KeyEvent();
                    if key.bKeyDown != 0 {
                        return Ok(key);
                    }
                }
            }
        }
    }

    fn fill_attr(&mut self, attr: u16, count: u32, x: i16) {
        unsafe {
            let mut n: DWORD = 0;
            let pos = COORD { X: x, Y: self.y };
            FillConsoleOutputAttribute(self.outh, attr, count, pos, &mut n);
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
        unsafe {
            let mut mode: DWORD = 0;
            if GetConsoleMode(self.inh, &mut mode) == 0 {
                return Err(Error::NotATerminal);
            }
            self.orig_mode = Some(mode);
            let raw = mode
                & !(ENABLE_LINE_INPUT
                    | ENABLE_ECHO_INPUT
                    | ENABLE_PROCESSED_INPUT
                    | ENABLE_WINDOW_INPUT);
            if SetConsoleMode(self.inh, raw) == 0 {
                return Err(io::Error::last_os_error().into());
            }
        }
        if !self.refresh_info() {
            return Err(Error::NotATerminal);
        }
        Ok(())
    }

    fn disable_raw(&mut self) -> Result<()> {
        if let Some(mode) = self.orig_mode.take() {
            unsafe {
                if SetConsoleMode(self.inh, mode) == 0 {
                    return Err(io::Error::last_os_error().into());
                }
            }
        }
        Ok(())
    }

    fn read_byte(&mut self, _timeout: Option<Duration>) -> Result<Option<u8>> {
        // The console backend receives decoded key records, never raw bytes.
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "byte reads are not used on the console backend",
        )
        .into())
    }

    fn read_key(&mut self) -> Result<Key> {
        loop {
            let rec = self.next_key_event()?;
            if rec.dwControlKeyState & ENHANCED_KEY != 0 {
                match rec.wVirtualKeyCode as i32 {
                    VK_LEFT => return Ok(Key::Left),
                    VK_RIGHT => return Ok(Key::Right),
                    VK_UP => return Ok(Key::Up),
                    VK_DOWN => return Ok(Key::Down),
                    VK_INSERT => return Ok(Key::Insert),
                    VK_DELETE => return Ok(Key::Delete),
                    VK_HOME => return Ok(Key::Home),
                    VK_END => return Ok(Key::End),
                    VK_PRIOR => return Ok(Key::PageUp),
                    VK_NEXT => return Ok(Key::PageDown),
                    VK_RETURN => return Ok(Key::Char(ENTER)),
                    _ => {}
                }
            }
            let vk = rec.wVirtualKeyCode as i32;
            if vk == VK_CONTROL || vk == VK_MENU {
                continue;
            }
            // Control characters are already translated in the char field.
            let unit = unsafe { *rec.uChar.UnicodeChar() };
            if unit == 0 {
                continue;
            }
            let ch = match char::from_u32(unit as u32) {
                Some(ch) => ch,
                None => continue,
            };
            let meta = (unsafe { GetKeyState(VK_MENU) } as u16) & 0x8000 != 0;
            if meta || ch == ESCAPE {
                // Alt- or ESC-prefixed key.
                let follow = if meta {
                    ch
                } else {
                    match self.read_key()? {
                        Key::Char(c) => c,
                        other => return Ok(other),
                    }
                };
                if follow == '.' {
                    return Ok(Key::MetaDot);
                }
                if meta {
                    // Unbound Alt combination.
                    continue;
                }
                return Ok(Key::Char(follow));
            }
            return Ok(Key::Char(ch));
        }
    }

    fn read_literal(&mut self) -> Result<Option<char>> {
        match self.read_key()? {
            Key::Char(ch) => Ok(Some(ch)),
            _ => Ok(None),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let text = String::from_utf8_lossy(bytes);
        let wide: Vec<u16> = text.encode_utf16().collect();
        unsafe {
            let mut written: DWORD = 0;
            let pos = COORD {
                X: self.x,
                Y: self.y,
            };
            if WriteConsoleOutputCharacterW(
                self.outh,
                wide.as_ptr(),
                wide.len() as DWORD,
                pos,
                &mut written,
            ) == 0
            {
                return Err(io::Error::last_os_error().into());
            }
            self.x += written as i16;
        }
        Ok(())
    }

    fn print(&mut self, text: &str) -> Result<()> {
        unsafe {
            let mut written: DWORD = 0;
            if WriteConsoleA(
                self.outh,
                text.as_ptr() as *const _,
                text.len() as DWORD,
                &mut written,
                std::ptr::null_mut(),
            ) == 0
            {
                return Err(io::Error::last_os_error().into());
            }
        }
        Ok(())
    }

    fn window_width(&mut self, current: usize) -> usize {
        if !self.refresh_info() || self.cols <= 0 {
            return if current != 0 { current } else { 80 };
        }
        self.cols as usize
    }

    fn clear_screen(&mut self) -> Result<()> {
        let cells = self.cols as u32 * self.rows as u32;
        let origin = COORD { X: 0, Y: 0 };
        unsafe {
            let mut n: DWORD = 0;
            FillConsoleOutputCharacterA(self.outh, b' ' as i8, cells, origin, &mut n);
            FillConsoleOutputAttribute(self.outh, DEFAULT_ATTR, cells, origin, &mut n);
            SetConsoleCursorPosition(self.outh, origin);
        }
        self.x = 0;
        self.y = 0;
        Ok(())
    }

    fn cursor_to_left(&mut self) -> Result<()> {
        self.fill_attr(DEFAULT_ATTR, self.cols as u32, 0);
        self.x = 0;
        Ok(())
    }

    fn erase_eol(&mut self) -> Result<()> {
        let count = (self.cols - self.x).max(0) as u32;
        unsafe {
            let mut n: DWORD = 0;
            let pos = COORD {
                X: self.x,
                Y: self.y,
            };
            FillConsoleOutputCharacterA(self.outh, b' ' as i8, count, pos, &mut n);
        }
        Ok(())
    }

    fn set_cursor_col(&mut self, col: usize) -> Result<()> {
        let pos = COORD {
            X: col as i16,
            Y: self.y,
        };
        unsafe {
            if SetConsoleCursorPosition(self.outh, pos) == 0 {
                return Err(io::Error::last_os_error().into());
            }
        }
        self.x = col as i16;
        Ok(())
    }

    fn render_control(&mut self, ch: char) -> Result<()> {
        self.fill_attr(BACKGROUND_INTENSITY, 2, self.x);
        let mut buf = [0u8; 4];
        self.write(b"^")?;
        self.write(ch.encode_utf8(&mut buf).as_bytes())
    }

    fn sgr_prompt_bytes(&self, _prompt: &str) -> usize {
        // Console prompts are assumed to carry no embedded ANSI colors.
        0
    }

    fn beep(&mut self) {}
}

impl Drop for StdioTerminal {
    fn drop(&mut self) {
        let _ = self.disable_raw();
    }
}
