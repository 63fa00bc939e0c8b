//! The interactive editing session.
//!
//! [`Editor`] owns the history ring and completion hooks and drives the key
//! dispatch loop: movement, editing, kill/yank, transpose, history
//! navigation, reverse incremental search, last-argument insertion and the
//! two tab-completion modes.

use crate::buffer::{EditOutcome, LineState};
use crate::completion::{self, CompletionCallback, CompletionFilter, Completions};
use crate::history::History;
use crate::key::{
    Key, BACKSPACE, CTRL_A, CTRL_B, CTRL_C, CTRL_D, CTRL_E, CTRL_F, CTRL_G, CTRL_H, CTRL_J,
    CTRL_K, CTRL_L, CTRL_N, CTRL_P, CTRL_R, CTRL_T, CTRL_U, CTRL_V, CTRL_W, CTRL_Y, ENTER,
    ESCAPE, TAB,
};
use crate::render::refresh_line;
use crate::{utf8, Error, Result, Terminal, DEFAULT_HISTORY_MAX_LEN, MAX_LINE};

/// One-shot query of the terminal width in columns.
pub fn columns<T: Terminal>(term: &mut T) -> Result<usize> {
    term.enable_raw()?;
    let cols = term.window_width(0);
    term.disable_raw()?;
    Ok(cols)
}

/// A line editor with history and completion.
///
/// All state that outlives a single [`read_line`](Editor::read_line) call
/// lives here, so tests and embedders can hold isolated instances instead of
/// process globals.
pub struct Editor {
    history: History,
    completion: Option<CompletionCallback>,
    filter: Option<CompletionFilter>,
    list_mode: bool,
    multiline: bool,
    max_line: usize,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    pub fn new() -> Self {
        Self::with_limits(MAX_LINE, DEFAULT_HISTORY_MAX_LEN)
    }

    /// An editor with explicit line-length (bytes) and history bounds.
    pub fn with_limits(max_line: usize, history_max: usize) -> Self {
        Self {
            history: History::new(history_max),
            completion: None,
            filter: None,
            list_mode: false,
            multiline: false,
            max_line,
        }
    }

    /// Registers the tab-completion callback, returning the prior one.
    pub fn set_completion_callback(
        &mut self,
        callback: Option<CompletionCallback>,
    ) -> Option<CompletionCallback> {
        std::mem::replace(&mut self.completion, callback)
    }

    /// Registers the candidate display filter, returning the prior one.
    pub fn set_completion_filter(
        &mut self,
        filter: Option<CompletionFilter>,
    ) -> Option<CompletionFilter> {
        std::mem::replace(&mut self.filter, filter)
    }

    /// Chooses the completion UI: `true` lists all candidates once and
    /// inserts their common prefix, `false` (the default) rotates candidates
    /// in place on repeated TAB.
    pub fn set_list_mode(&mut self, on: bool) {
        self.list_mode = on;
    }

    /// Reserved: multi-line editing is not implemented at this revision; the
    /// flag is stored and has no effect.
    pub fn set_multiline(&mut self, on: bool) {
        self.multiline = on;
    }

    pub fn multiline(&self) -> bool {
        self.multiline
    }

    pub fn history_add(&mut self, line: &str) -> bool {
        self.history.add(line)
    }

    pub fn set_history_max_len(&mut self, max_len: usize) -> bool {
        self.history.set_max_len(max_len)
    }

    pub fn history_max_len(&self) -> usize {
        self.history.max_len()
    }

    pub fn history_save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        self.history.save(path)
    }

    pub fn history_load(&mut self, path: impl AsRef<std::path::Path>) -> Result<()> {
        self.history.load(path)
    }

    /// All history entries, oldest first.
    pub fn history(&self) -> &[String] {
        self.history.entries()
    }

    /// Performs one full edit of a line under `prompt`.
    ///
    /// Returns the line on Enter. [`Error::Eof`] means Ctrl-D on an empty
    /// line (or end of input on the fallback path), [`Error::Interrupted`]
    /// means Ctrl-C. When the terminal refuses raw mode the plain stdio
    /// reader is used instead.
    pub fn read_line<T: Terminal>(&mut self, term: &mut T, prompt: &str) -> Result<String> {
        match term.enable_raw() {
            Ok(()) => {}
            Err(Error::NotATerminal) | Err(Error::UnsupportedTerm) => {
                return match term.read_plain_line(prompt)? {
                    Some(line) => Ok(line),
                    None => Err(Error::Eof),
                };
            }
            Err(e) => return Err(e),
        }
        let result = self.edit(term, prompt);
        let restored = term.disable_raw();
        let _ = term.write(b"\n");
        restored?;
        if let Ok(line) = &result {
            if !line.is_empty() {
                self.history.add(line);
            }
        }
        result
    }

    fn edit<T: Terminal>(&mut self, term: &mut T, prompt: &str) -> Result<String> {
        let mut state = LineState::new(self.max_line);
        state.prompt_chars = utf8::count(prompt);
        let mut history_index = 0usize;

        // The newest history entry is the scratch slot mirroring this buffer;
        // navigation and reverse search index into it.
        self.history.add("");
        state.set_current("");
        refresh_line(term, prompt, &mut state)?;

        let mut pending: Option<Key> = None;
        loop {
            let (mut key, reinjected) = match pending.take() {
                Some(k) => (k, true),
                None => (term.read_key()?, false),
            };

            if !reinjected
                && key == Key::Char(TAB)
                && self.completion.is_some()
                && (self.list_mode || state.pos == state.chars())
            {
                match self.complete_line(term, prompt, &mut state)? {
                    Some(k) => key = k,
                    None => continue,
                }
            }

            match key {
                Key::Char(ENTER) => {
                    self.history.pop_newest();
                    return Ok(state.take());
                }
                Key::Char(CTRL_C) => return Err(Error::Interrupted),
                Key::Char(BACKSPACE) | Key::Char(CTRL_H) => {
                    if state.pos > 0 {
                        match state.remove_char(state.pos - 1) {
                            EditOutcome::Redraw => refresh_line(term, prompt, &mut state)?,
                            EditOutcome::Inline => term.write(b"\x08 \x08")?,
                            EditOutcome::Refused => {}
                        }
                    }
                }
                Key::Char(CTRL_D) if state.len() == 0 => {
                    // Empty line: EOF.
                    self.history.pop_newest();
                    return Err(Error::Eof);
                }
                Key::Char(CTRL_D) | Key::Delete => {
                    match state.remove_char(state.pos) {
                        EditOutcome::Redraw => refresh_line(term, prompt, &mut state)?,
                        EditOutcome::Inline | EditOutcome::Refused => {}
                    }
                }
                Key::Insert => {
                    // Reserved: possible insert/overwrite toggle.
                }
                Key::Char(CTRL_W) => {
                    // Swallow spaces, then the word, into the kill slot.
                    let mut pos = state.pos;
                    while pos > 0 && state.get_char(pos - 1) == Some(' ') {
                        pos -= 1;
                    }
                    while pos > 0 && state.get_char(pos - 1) != Some(' ') {
                        pos -= 1;
                    }
                    if state.remove_chars(pos, state.pos - pos) > 0 {
                        refresh_line(term, prompt, &mut state)?;
                    }
                }
                Key::Char(CTRL_R) => {
                    pending = self.reverse_search(term, prompt, &mut state)?;
                }
                Key::Char(CTRL_T) => {
                    if state.pos > 0 && state.chars() >= 2 {
                        // At end of line, transpose the previous two chars.
                        let fixer = (state.pos == state.chars()) as usize;
                        if let Some(ch) = state.get_char(state.pos - fixer) {
                            state.remove_char(state.pos - fixer);
                            state.insert_char(state.pos - 1, ch);
                            refresh_line(term, prompt, &mut state)?;
                        }
                    }
                }
                Key::Char(CTRL_V) => {
                    if state.has_room(4)
                        && state.insert_char(state.pos, CTRL_V) != EditOutcome::Refused
                    {
                        // Show the ^V placeholder while waiting for the key.
                        refresh_line(term, prompt, &mut state)?;
                        let literal = term.read_literal()?;
                        state.remove_char(state.pos - 1);
                        if let Some(ch) = literal {
                            if ch != '\0' {
                                state.insert_char(state.pos, ch);
                            }
                        }
                        refresh_line(term, prompt, &mut state)?;
                    }
                }
                Key::Char(CTRL_B) | Key::Left => {
                    if state.pos > 0 {
                        state.pos -= 1;
                        refresh_line(term, prompt, &mut state)?;
                    }
                }
                Key::Char(CTRL_F) | Key::Right => {
                    if state.pos < state.chars() {
                        state.pos += 1;
                        refresh_line(term, prompt, &mut state)?;
                    }
                }
                Key::Char(CTRL_A) | Key::Home => {
                    state.pos = 0;
                    refresh_line(term, prompt, &mut state)?;
                }
                Key::Char(CTRL_E) | Key::End => {
                    state.pos = state.chars();
                    refresh_line(term, prompt, &mut state)?;
                }
                Key::PageUp => {
                    let jump = self.history.len().saturating_sub(history_index + 1) as isize;
                    self.navigate_history(term, prompt, &mut state, &mut history_index, jump)?;
                }
                Key::PageDown => {
                    let jump = -(history_index as isize);
                    self.navigate_history(term, prompt, &mut state, &mut history_index, jump)?;
                }
                Key::Char(CTRL_P) | Key::Up => {
                    self.navigate_history(term, prompt, &mut state, &mut history_index, 1)?;
                }
                Key::Char(CTRL_N) | Key::Down => {
                    self.navigate_history(term, prompt, &mut state, &mut history_index, -1)?;
                }
                Key::Char(CTRL_U) => {
                    if state.remove_chars(0, state.pos) > 0 {
                        refresh_line(term, prompt, &mut state)?;
                    }
                }
                Key::Char(CTRL_K) => {
                    if state.remove_chars(state.pos, state.chars() - state.pos) > 0 {
                        refresh_line(term, prompt, &mut state)?;
                    }
                }
                Key::Char(CTRL_Y) => {
                    if let Some(capture) = state.capture.take() {
                        if state.insert_chars(state.pos, &capture) > 0 {
                            refresh_line(term, prompt, &mut state)?;
                        }
                        state.capture = Some(capture);
                    }
                }
                Key::Char(CTRL_L) => {
                    term.clear_screen()?;
                    // Force a width recompute for serial terminals.
                    state.cols = 0;
                    refresh_line(term, prompt, &mut state)?;
                }
                Key::MetaDot => {
                    pending = self.insert_last_arg(term, prompt, &mut state)?;
                }
                Key::Char(c) if c == TAB || c >= ' ' => {
                    match state.insert_char(state.pos, c) {
                        EditOutcome::Redraw => refresh_line(term, prompt, &mut state)?,
                        EditOutcome::Inline => {
                            let mut buf = [0u8; 4];
                            term.write(c.encode_utf8(&mut buf).as_bytes())?;
                        }
                        EditOutcome::Refused => term.beep(),
                    }
                }
                // Unbound control characters and swallowed sequences.
                Key::Char(_) | Key::None => {}
            }
        }
    }

    /// Up/down/page movement through history. Copies the live buffer into the
    /// slot being left so the user's in-progress text rides along.
    fn navigate_history<T: Terminal>(
        &mut self,
        term: &mut T,
        prompt: &str,
        state: &mut LineState,
        index: &mut usize,
        dir: isize,
    ) -> Result<()> {
        if self.history.len() <= 1 {
            return Ok(());
        }
        let leaving = self.history.len() - 1 - *index;
        self.history.set(leaving, state.as_str());
        let next = *index as isize + dir;
        if next < 0 {
            *index = 0;
            return Ok(());
        }
        if next as usize >= self.history.len() {
            *index = self.history.len() - 1;
            return Ok(());
        }
        *index = next as usize;
        let entry = self.history.len() - 1 - *index;
        if let Some(line) = self.history.get(entry) {
            state.set_current(line);
        }
        refresh_line(term, prompt, state)
    }

    /// Reverse incremental search sub-loop (Ctrl-R).
    ///
    /// Returns a key to re-inject into the main dispatcher, or `None` when
    /// the terminating key was swallowed (accept or abort).
    fn reverse_search<T: Terminal>(
        &mut self,
        term: &mut T,
        prompt: &str,
        state: &mut LineState,
    ) -> Result<Option<Key>> {
        let mut pattern = String::new();
        let mut searchpos = self.history.len() as isize - 1;
        loop {
            let mut added = false;
            let mut skipsame = false;
            let mut searchdir = -1isize;

            let search_prompt = format!("(reverse-i-search)'{pattern}': ");
            refresh_line(term, &search_prompt, state)?;

            match term.read_key()? {
                Key::Char(BACKSPACE) | Key::Char(CTRL_H) => {
                    pattern.pop();
                    continue;
                }
                Key::Char(CTRL_P) | Key::Up | Key::Char(CTRL_R) => {
                    // Earlier match.
                    if searchpos > 0 {
                        searchpos -= 1;
                    }
                    skipsame = true;
                }
                Key::Char(CTRL_N) | Key::Down => {
                    // Later match.
                    if searchpos < self.history.len() as isize {
                        searchpos += 1;
                    }
                    searchdir = 1;
                    skipsame = true;
                }
                Key::Char(c) if c >= ' ' => {
                    pattern.push(c);
                    added = true;
                    // A new pattern char restarts from the newest entry.
                    searchpos = self.history.len() as isize - 1;
                }
                terminator => {
                    let reinject = match terminator {
                        // Abort: clear the line, swallow the key.
                        Key::Char(CTRL_G) | Key::Char(CTRL_C) => {
                            state.set_current("");
                            None
                        }
                        // Accept: leave the match in place, swallow the key.
                        Key::Char(CTRL_J) => None,
                        key => Some(key),
                    };
                    refresh_line(term, prompt, state)?;
                    return Ok(reinject);
                }
            }

            let mut found = false;
            while searchpos >= 0 && (searchpos as usize) < self.history.len() {
                let entry = self.history.get(searchpos as usize).unwrap_or("");
                if let Some(at) = entry.find(&pattern) {
                    if skipsame && entry == state.as_str() {
                        searchpos += searchdir;
                        continue;
                    }
                    let cursor = utf8::count(&entry[..at]);
                    state.set_current(entry);
                    state.pos = cursor;
                    found = true;
                    break;
                }
                searchpos += searchdir;
            }
            if !found && added {
                // The new char matches nothing; drop it from the pattern.
                pattern.pop();
            }
        }
    }

    /// Meta-.: inserts the last whitespace-separated token of the previous
    /// history line; repeated presses cycle older lines, replacing the
    /// previous insertion.
    fn insert_last_arg<T: Terminal>(
        &mut self,
        term: &mut T,
        prompt: &str,
        state: &mut LineState,
    ) -> Result<Option<Key>> {
        if self.history.len() < 2 {
            return Ok(None);
        }
        let mut index = 0usize;
        let mut inserted = 0usize;
        let mut insert_at = 0usize;
        loop {
            if index < self.history.len() - 1 {
                index += 1;
            }
            if inserted > 0 {
                state.remove_chars(insert_at, state.pos - insert_at);
            }
            let token = {
                let entry = self.history.get(self.history.len() - 1 - index).unwrap_or("");
                let tail = entry.rfind(' ').map_or(0, |i| i + 1);
                entry[tail..].to_owned()
            };
            insert_at = state.pos;
            inserted = state.insert_chars(state.pos, &token);
            refresh_line(term, prompt, state)?;
            match term.read_key()? {
                Key::MetaDot => continue,
                other => return Ok(Some(other)),
            }
        }
    }

    /// TAB handling: extract the word, collect candidates, drive the UI.
    ///
    /// Returns a key to re-inject (rotation mode hands back the terminating
    /// key), or `None` when the event was fully consumed.
    fn complete_line<T: Terminal>(
        &mut self,
        term: &mut T,
        prompt: &str,
        state: &mut LineState,
    ) -> Result<Option<Key>> {
        let end = state.pos;
        let start = completion::word_start(state.as_str(), end);
        let word = {
            let s = state.as_str();
            s[utf8::index(s, start)..utf8::index(s, end)].to_owned()
        };
        let mut candidates = Completions::new(state.as_str());
        match self.completion.as_mut() {
            Some(callback) => callback(&word, start, end, &mut candidates),
            None => return Ok(None),
        }
        if candidates.is_empty() {
            term.beep();
            return Ok(None);
        }
        if self.list_mode {
            self.complete_list(term, prompt, state, &candidates, &word)?;
            Ok(None)
        } else {
            self.complete_rotate(term, prompt, state, &candidates)
        }
    }

    /// List mode: print all candidates once and insert their common prefix.
    fn complete_list<T: Terminal>(
        &mut self,
        term: &mut T,
        prompt: &str,
        state: &mut LineState,
        candidates: &Completions,
        word: &str,
    ) -> Result<()> {
        let entries = candidates.entries();
        let prefix = completion::common_prefix(entries).to_owned();
        if entries.len() > 1 {
            self.print_grid(term, state, entries)?;
            if prefix.is_empty() || prefix == word {
                term.beep();
            }
        }
        state.insert_chars(state.pos, prefix.get(word.len()..).unwrap_or(""));
        if entries.len() == 1 {
            if let Some(append) = candidates.append_char() {
                if state.get_char(state.pos) == Some(append) {
                    state.pos += 1;
                } else {
                    state.insert_char(state.pos, append);
                }
            }
        }
        refresh_line(term, prompt, state)
    }

    /// Candidates in a column-major grid with two-space separators.
    fn print_grid<T: Terminal>(
        &mut self,
        term: &mut T,
        state: &mut LineState,
        entries: &[String],
    ) -> Result<()> {
        state.cols = term.window_width(state.cols).max(1);
        term.print("\n\r")?;
        let shown: Vec<String> = entries
            .iter()
            .map(|entry| match self.filter.as_mut() {
                Some(filter) => filter(entry).unwrap_or_else(|| entry.clone()),
                None => entry.clone(),
            })
            .collect();
        let width = shown.iter().map(|s| utf8::count(s)).max().unwrap_or(0);
        let per_row = ((state.cols + 2) / (width + 2)).max(1);
        let rows = (entries.len() + per_row - 1) / per_row;
        for row in 0..rows {
            let mut line = String::new();
            for col in 0..per_row {
                let i = col * rows + row;
                if i >= entries.len() {
                    break;
                }
                if col > 0 {
                    line.push_str("  ");
                }
                line.push_str(&shown[i]);
                for _ in utf8::count(&shown[i])..width {
                    line.push(' ');
                }
            }
            line.push_str("\r\n");
            term.print(&line)?;
        }
        Ok(())
    }

    /// Rotation mode: repeated TAB cycles candidates in place; any other key
    /// commits the shown candidate and is re-injected.
    fn complete_rotate<T: Terminal>(
        &mut self,
        term: &mut T,
        prompt: &str,
        state: &mut LineState,
        candidates: &Completions,
    ) -> Result<Option<Key>> {
        let entries = candidates.entries();
        let mut shown = 0usize;
        loop {
            if shown < entries.len() {
                let mut preview = state.preview(&entries[shown]);
                refresh_line(term, prompt, &mut preview)?;
            } else {
                // One virtual slot past the end shows the original line.
                refresh_line(term, prompt, state)?;
            }
            match term.read_key()? {
                Key::Char(TAB) => {
                    shown = (shown + 1) % (entries.len() + 1);
                    if shown == entries.len() {
                        term.beep();
                    }
                }
                Key::Char(ESCAPE) => {
                    if shown < entries.len() {
                        refresh_line(term, prompt, state)?;
                    }
                    return Ok(None);
                }
                key => {
                    if shown < entries.len() {
                        state.set_current(&entries[shown]);
                    }
                    return Ok(Some(key));
                }
            }
        }
    }
}
