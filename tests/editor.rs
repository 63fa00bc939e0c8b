//! End-to-end editing sessions over a scripted terminal.

mod common;

use common::{MockTerminal, PAUSE};
use minline::{Completions, Editor, Error};

fn run(editor: &mut Editor, script: &[u8]) -> (minline::Result<String>, MockTerminal) {
    let mut term = MockTerminal::new(script);
    let result = editor.read_line(&mut term, "> ");
    term.assert_raw_balanced();
    (result, term)
}

fn line(editor: &mut Editor, script: &[u8]) -> String {
    run(editor, script).0.unwrap()
}

#[test]
fn typed_line_is_returned_and_recorded() {
    let mut editor = Editor::new();
    assert_eq!(line(&mut editor, b"hello\x7f\x7f\r"), "hel");
    assert_eq!(editor.history(), &["hel"]);
}

#[test]
fn kill_to_end_then_yank_restores_the_line() {
    let mut editor = Editor::new();
    // Ctrl-A, Ctrl-K, Ctrl-Y: kill the whole line and put it back.
    assert_eq!(line(&mut editor, b"abc def\x01\x0b\x19\r"), "abc def");
}

#[test]
fn kill_to_start_saves_into_capture() {
    let mut editor = Editor::new();
    // Ctrl-U at end of line kills everything; Ctrl-Y restores it twice.
    assert_eq!(line(&mut editor, b"xy\x15\x19\x19\r"), "xyxy");
}

#[test]
fn ctrl_w_deletes_the_word_left_of_the_cursor() {
    let mut editor = Editor::new();
    assert_eq!(line(&mut editor, b"ab cd \x17\r"), "ab ");
    // The deleted word lands in the kill slot and is yankable.
    assert_eq!(line(&mut editor, b"one two\x17\x19\x19\r"), "one twotwo");
}

#[test]
fn transpose_swaps_the_chars_at_the_end() {
    let mut editor = Editor::new();
    assert_eq!(line(&mut editor, b"ab\x14\r"), "ba");
    // Mid-line: swap around the cursor and advance.
    assert_eq!(line(&mut editor, b"abc\x02\x02\x14\r"), "bac");
    // A single char has nothing to transpose with.
    assert_eq!(line(&mut editor, b"a\x14\r"), "a");
}

#[test]
fn ctrl_v_inserts_the_next_key_literally() {
    let mut editor = Editor::new();
    assert_eq!(line(&mut editor, b"\x16\x01\r"), "\x01");
    // NUL is rejected.
    assert_eq!(line(&mut editor, b"\x16\x00x\r"), "x");
}

#[test]
fn movement_keys_place_the_cursor() {
    let mut editor = Editor::new();
    // Left arrow, then backspace removes the char left of the new position.
    assert_eq!(line(&mut editor, b"abc\x1b[D\x7f\r"), "ac");
    // Delete removes at the cursor.
    assert_eq!(line(&mut editor, b"abc\x1b[D\x1b[3~\r"), "ab");
    // Home + insertion + End.
    assert_eq!(line(&mut editor, b"bc\x1b[Ha\x1b[Fd\r"), "abcd");
    // Ctrl-B / Ctrl-F mirror the arrows.
    assert_eq!(line(&mut editor, b"ac\x02b\x06d\r"), "abcd");
}

#[test]
fn utf8_cursor_moves_whole_codepoints() {
    let mut editor = Editor::new();
    let mut script = Vec::new();
    script.extend_from_slice("héllo".as_bytes());
    script.extend_from_slice(b"\x1b[D\x1b[D\x7f\r");
    assert_eq!(line(&mut editor, &script), "hélo");
}

#[test]
fn ctrl_d_is_eof_only_on_an_empty_line() {
    let mut editor = Editor::new();
    let (result, _) = run(&mut editor, b"\x04");
    assert!(matches!(result, Err(Error::Eof)));
    // On a non-empty line it deletes at the cursor.
    assert_eq!(line(&mut editor, b"abc\x02\x04\r"), "ab");
}

#[test]
fn ctrl_c_interrupts() {
    let mut editor = Editor::new();
    let (result, _) = run(&mut editor, b"abc\x03");
    assert!(matches!(result, Err(Error::Interrupted)));
}

#[test]
fn history_navigation_walks_entries() {
    let mut editor = Editor::new();
    editor.history_add("first");
    editor.history_add("second");
    // Up, Up, Up (clamped at the oldest), Down.
    assert_eq!(line(&mut editor, b"\x1b[A\x1b[A\x1b[A\x1b[B\r"), "second");
    // Accepting the newest entry again collapses as a duplicate.
    assert_eq!(editor.history(), &["first", "second"]);
}

#[test]
fn in_progress_text_rides_on_the_scratch_entry() {
    let mut editor = Editor::new();
    editor.history_add("first");
    editor.history_add("second");
    assert_eq!(line(&mut editor, b"work\x1b[A\x1b[B\r"), "work");
}

#[test]
fn page_keys_jump_to_the_ends_of_history() {
    let mut editor = Editor::new();
    editor.history_add("oldest");
    editor.history_add("newest");
    assert_eq!(line(&mut editor, b"\x1b[5~\r"), "oldest");
    assert_eq!(line(&mut editor, b"keep\x1b[5~\x1b[6~\r"), "keep");
}

#[test]
fn ctrl_p_and_ctrl_n_navigate_too() {
    let mut editor = Editor::new();
    editor.history_add("alpha");
    editor.history_add("beta");
    assert_eq!(line(&mut editor, b"\x10\x10\x0e\r"), "beta");
}

#[test]
fn reverse_search_finds_the_newest_match_first() {
    let mut editor = Editor::new();
    for entry in ["a", "ab", "abc"] {
        editor.history_add(entry);
    }
    // Ctrl-R, 'b', Ctrl-J (accept), Enter.
    assert_eq!(line(&mut editor, b"\x12b\x0a\r"), "abc");
}

#[test]
fn repeated_reverse_search_skips_to_earlier_matches() {
    let mut editor = Editor::new();
    for entry in ["a", "ab", "abc"] {
        editor.history_add(entry);
    }
    // The second Ctrl-R moves past the identical current hit.
    assert_eq!(line(&mut editor, b"\x12b\x12\x0a\r"), "ab");
}

#[test]
fn aborted_reverse_search_clears_the_line() {
    let mut editor = Editor::new();
    editor.history_add("needle");
    // Ctrl-R, 'n' (matches), Ctrl-G aborts; then type a fresh line.
    assert_eq!(line(&mut editor, b"\x12n\x07xy\r"), "xy");
}

#[test]
fn reverse_search_enter_is_reinjected() {
    let mut editor = Editor::new();
    editor.history_add("target line");
    // Enter terminates the search and immediately submits the match.
    assert_eq!(line(&mut editor, b"\x12target\r"), "target line");
}

#[test]
fn meta_dot_inserts_and_cycles_last_arguments() {
    let mut editor = Editor::new();
    editor.history_add("older one tail");
    editor.history_add("prev cmd last");
    assert_eq!(line(&mut editor, b"ls \x1b.\x1b.\r"), "ls tail");
    // A single press takes the previous line's last token.
    let mut editor = Editor::new();
    editor.history_add("cp src dst");
    assert_eq!(line(&mut editor, b"rm \x1b.\r"), "rm dst");
}

#[test]
fn list_mode_completion_inserts_common_prefix_and_lists() {
    let mut editor = Editor::new();
    editor.set_list_mode(true);
    editor.set_completion_callback(Some(Box::new(
        |_word: &str, _start: usize, _end: usize, sink: &mut Completions| {
            sink.add("hello there");
            sink.add("hello");
        },
    )));
    let (result, term) = run(&mut editor, b"h\t\r");
    assert_eq!(result.unwrap(), "hello");
    let out = term.output_string();
    assert!(out.contains("hello there"), "grid missing from {out:?}");
}

#[test]
fn unique_list_mode_completion_appends_a_space() {
    let mut editor = Editor::new();
    editor.set_list_mode(true);
    editor.set_completion_callback(Some(Box::new(
        |_: &str, _: usize, _: usize, sink: &mut Completions| {
            sink.add("hello");
        },
    )));
    assert_eq!(line(&mut editor, b"h\t\r"), "hello ");
}

#[test]
fn callback_can_suppress_the_append_char() {
    let mut editor = Editor::new();
    editor.set_list_mode(true);
    editor.set_completion_callback(Some(Box::new(
        |_: &str, _: usize, _: usize, sink: &mut Completions| {
            sink.add("src/");
            sink.set_append_char(None);
        },
    )));
    assert_eq!(line(&mut editor, b"s\t\r"), "src/");
}

#[test]
fn display_filter_shapes_the_grid_but_not_the_buffer() {
    let mut editor = Editor::new();
    editor.set_list_mode(true);
    editor.set_completion_callback(Some(Box::new(
        |_: &str, _: usize, _: usize, sink: &mut Completions| {
            sink.add("dir/a.txt");
            sink.add("dir/b.txt");
        },
    )));
    editor.set_completion_filter(Some(Box::new(|candidate: &str| {
        candidate.rsplit('/').next().map(|s| s.to_string())
    })));
    let (result, term) = run(&mut editor, b"\t\r");
    assert_eq!(result.unwrap(), "dir/");
    let out = term.output_string();
    assert!(out.contains("a.txt  b.txt"), "filtered grid missing from {out:?}");
}

#[test]
fn completion_callback_sees_the_whole_line() {
    let mut editor = Editor::new();
    editor.set_list_mode(true);
    editor.set_completion_callback(Some(Box::new(
        |word: &str, start: usize, end: usize, sink: &mut Completions| {
            assert_eq!(sink.line(), "git ch");
            assert_eq!((word, start, end), ("ch", 4, 6));
            sink.add("checkout");
        },
    )));
    assert_eq!(line(&mut editor, b"git ch\t\r"), "git checkout ");
}

#[test]
fn rotation_mode_commits_the_shown_candidate() {
    let mut editor = Editor::new();
    editor.set_completion_callback(Some(Box::new(
        |_: &str, _: usize, _: usize, sink: &mut Completions| {
            sink.add("mkdir");
            sink.add("make");
        },
    )));
    // Enter commits the first candidate (sorted order: make, mkdir).
    assert_eq!(line(&mut editor, b"m\t\r"), "make");
    // A second TAB advances to the next candidate.
    assert_eq!(line(&mut editor, b"m\t\t\r"), "mkdir");
}

#[test]
fn rotation_mode_escape_restores_the_original() {
    let mut editor = Editor::new();
    editor.set_completion_callback(Some(Box::new(
        |_: &str, _: usize, _: usize, sink: &mut Completions| {
            sink.add("make");
        },
    )));
    let mut script = b"m\t\x1b".to_vec();
    script.push(PAUSE);
    script.extend_from_slice(b"z\r");
    assert_eq!(line(&mut editor, &script), "mz");
}

#[test]
fn rotation_wraps_past_the_end_with_a_beep() {
    let mut editor = Editor::new();
    editor.set_completion_callback(Some(Box::new(
        |_: &str, _: usize, _: usize, sink: &mut Completions| {
            sink.add("make");
            sink.add("mkdir");
        },
    )));
    // TAB x3 lands on the virtual "original" slot, beeping; TAB x4 is back
    // to the first candidate.
    let (result, term) = run(&mut editor, b"m\t\t\t\t\r");
    assert_eq!(result.unwrap(), "make");
    assert!(term.beeps >= 1);
}

#[test]
fn empty_candidate_set_beeps_and_swallows_the_tab() {
    let mut editor = Editor::new();
    editor.set_completion_callback(Some(Box::new(
        |_: &str, _: usize, _: usize, _: &mut Completions| {},
    )));
    let (result, term) = run(&mut editor, b"x\t\r");
    assert_eq!(result.unwrap(), "x");
    assert_eq!(term.beeps, 1);
}

#[test]
fn tab_without_a_callback_is_a_literal_character() {
    let mut editor = Editor::new();
    assert_eq!(line(&mut editor, b"a\tb\r"), "a\tb");
}

#[test]
fn mid_line_tab_is_literal_in_rotation_mode() {
    let mut editor = Editor::new();
    editor.set_completion_callback(Some(Box::new(
        |_: &str, _: usize, _: usize, sink: &mut Completions| {
            sink.add("never shown");
        },
    )));
    // Cursor not at end of line: rotation-mode completion does not fire.
    assert_eq!(line(&mut editor, b"ab\x1b[D\t\r"), "a\tb");
}

#[test]
fn full_buffer_refuses_input_with_a_beep() {
    let mut editor = Editor::with_limits(5, 10);
    let (result, term) = run(&mut editor, b"abcdefg\r");
    assert_eq!(result.unwrap(), "abc");
    assert_eq!(term.beeps, 4);
}

#[test]
fn control_chars_paint_as_caret_glyphs() {
    let mut editor = Editor::new();
    let (result, term) = run(&mut editor, b"\x16\x07x\r");
    assert_eq!(result.unwrap(), "\x07x");
    assert!(term.output_string().contains("^G"));
}

#[test]
fn ctrl_l_clears_the_screen_and_repaints() {
    let mut editor = Editor::new();
    let (result, term) = run(&mut editor, b"a\x0c\r");
    assert_eq!(result.unwrap(), "a");
    assert!(term.output_string().contains("\x1b[H\x1b[2J"));
}

#[test]
fn raw_mode_refusal_falls_back_to_plain_reads() {
    let mut editor = Editor::new();
    let mut term = MockTerminal::refusing_raw(&["typed offline"]);
    assert_eq!(editor.read_line(&mut term, "> ").unwrap(), "typed offline");
    // Prompt still went out.
    assert!(term.output_string().contains("> "));
    // End of input on the fallback path reads as EOF.
    let mut term = MockTerminal::refusing_raw(&[]);
    assert!(matches!(editor.read_line(&mut term, "> "), Err(Error::Eof)));
}

#[test]
fn print_key_codes_dumps_until_quit() {
    let mut term = MockTerminal::new(b"quit");
    minline::print_key_codes(&mut term).unwrap();
    term.assert_raw_balanced();
    let out = term.output_string();
    assert!(out.contains("0x71"), "missing q dump in {out:?}");
}

#[test]
fn multiline_flag_is_stored_but_reserved() {
    let mut editor = Editor::new();
    editor.set_multiline(true);
    assert!(editor.multiline());
    assert_eq!(line(&mut editor, b"still single line\r"), "still single line");
}
