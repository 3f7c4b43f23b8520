//! Input state machines behind the modal widgets. Drawing and the blocking
//! read live in `ui.rs`; everything here is pure so it can be driven key by
//! key.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
    End,
    Enter,
    Esc,
    Backspace,
    Char(char),
    /// Ctrl+C while the screen is in raw mode.
    Interrupt,
    Other,
}

impl From<KeyEvent> for Key {
    fn from(ev: KeyEvent) -> Self {
        if ev.modifiers.contains(KeyModifiers::CONTROL) {
            return match ev.code {
                KeyCode::Char('c') | KeyCode::Char('C') => Key::Interrupt,
                _ => Key::Other,
            };
        }
        match ev.code {
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::PageUp => Key::PageUp,
            KeyCode::PageDown => Key::PageDown,
            KeyCode::Home => Key::Home,
            KeyCode::End => Key::End,
            KeyCode::Enter => Key::Enter,
            KeyCode::Esc => Key::Esc,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Char(c) => Key::Char(c),
            _ => Key::Other,
        }
    }
}

// ── Menu / single-select ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOutcome {
    Pending,
    Commit(usize),
    Cancel,
}

/// Selection over `len` options. Movement wraps; `1`-`9` commit directly.
#[derive(Debug, Clone, Copy)]
pub struct ListState {
    selected: usize,
    len: usize,
}

impl ListState {
    pub fn new(len: usize) -> Self {
        Self { selected: 0, len }
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn handle(&mut self, key: Key) -> ListOutcome {
        if self.len == 0 {
            return ListOutcome::Cancel;
        }
        match key {
            Key::Up | Key::Char('k') => {
                self.selected = (self.selected + self.len - 1) % self.len;
                ListOutcome::Pending
            }
            Key::Down | Key::Char('j') => {
                self.selected = (self.selected + 1) % self.len;
                ListOutcome::Pending
            }
            Key::Enter => ListOutcome::Commit(self.selected),
            Key::Esc | Key::Char('q') => ListOutcome::Cancel,
            Key::Char(c @ '1'..='9') => {
                let picked = c as usize - '1' as usize;
                if picked < self.len {
                    self.selected = picked;
                    ListOutcome::Commit(picked)
                } else {
                    ListOutcome::Pending
                }
            }
            _ => ListOutcome::Pending,
        }
    }

    /// First option index to draw when only `rows` fit, keeping the
    /// selection visible.
    pub fn window_start(&self, rows: usize) -> usize {
        if rows == 0 || self.selected < rows {
            0
        } else {
            self.selected + 1 - rows
        }
    }
}

// ── Paginated viewer ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerOutcome {
    Pending,
    Close,
}

/// Rows available to the viewer on a terminal `height` rows tall.
pub fn viewport_for(height: u16) -> usize {
    (height as usize).saturating_sub(6).max(1)
}

/// Split embedded newlines into rows. The viewer never shows zero rows:
/// empty input becomes one blank line.
pub fn viewer_lines<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let mut rows: Vec<String> = lines
        .iter()
        .flat_map(|l| l.as_ref().split('\n').map(str::to_string).collect::<Vec<_>>())
        .collect();
    if rows.is_empty() {
        rows.push(String::new());
    }
    rows
}

#[derive(Debug, Clone, Copy)]
pub struct ViewerState {
    offset: usize,
    total: usize,
}

impl ViewerState {
    pub fn new(total: usize) -> Self {
        Self { offset: 0, total }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn max_offset(&self, viewport: usize) -> usize {
        self.total.saturating_sub(viewport)
    }

    /// Re-clamp after the viewport changed (terminal resize).
    pub fn clamp(&mut self, viewport: usize) {
        self.offset = self.offset.min(self.max_offset(viewport));
    }

    pub fn handle(&mut self, key: Key, viewport: usize) -> ViewerOutcome {
        let viewport = viewport.max(1);
        match key {
            Key::Enter | Key::Esc | Key::Char('q') => return ViewerOutcome::Close,
            Key::Down | Key::Char('j') => {
                if self.offset + viewport < self.total {
                    self.offset += 1;
                }
            }
            Key::Up | Key::Char('k') => {
                if self.offset > 0 {
                    self.offset -= 1;
                }
            }
            Key::PageDown => {
                self.offset = (self.offset + viewport).min(self.max_offset(viewport));
            }
            Key::PageUp => {
                self.offset = self.offset.saturating_sub(viewport);
            }
            Key::Home => self.offset = 0,
            Key::End => self.offset = self.max_offset(viewport),
            _ => {}
        }
        ViewerOutcome::Pending
    }
}

// ── Line editor (prompt) ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Pending,
    Submit(String),
    Cancel,
}

#[derive(Debug, Clone, Default)]
pub struct LineEditor {
    buf: String,
}

impl LineEditor {
    pub fn text(&self) -> &str {
        &self.buf
    }

    pub fn handle(&mut self, key: Key) -> EditOutcome {
        match key {
            Key::Enter => EditOutcome::Submit(std::mem::take(&mut self.buf)),
            Key::Esc => EditOutcome::Cancel,
            Key::Backspace => {
                self.buf.pop();
                EditOutcome::Pending
            }
            Key::Char(c) if !c.is_control() => {
                self.buf.push(c);
                EditOutcome::Pending
            }
            _ => EditOutcome::Pending,
        }
    }
}

/// Trimmed answer, or `default` when the answer is blank. An empty string
/// means "no answer".
pub fn resolve_answer(raw: &str, default: &str) -> String {
    let value = raw.trim();
    if !value.is_empty() {
        return value.to_string();
    }
    default.to_string()
}

const AFFIRMATIVE: &[&str] = &["y", "yes", "s", "si", "sí"];

pub fn interpret_confirm(answer: &str, default_yes: bool) -> bool {
    let answer = answer.trim().to_lowercase();
    if answer.is_empty() {
        return default_yes;
    }
    AFFIRMATIVE.contains(&answer.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrows_wrap_and_stay_in_bounds() {
        for n in 1..6 {
            let mut s = ListState::new(n);
            for _ in 0..(n * 3) {
                s.handle(Key::Down);
                assert!(s.selected() < n);
            }
            for _ in 0..(n * 3) {
                s.handle(Key::Char('k'));
                assert!(s.selected() < n);
            }
        }
        let mut s = ListState::new(3);
        s.handle(Key::Up);
        assert_eq!(s.selected(), 2);
        s.handle(Key::Char('j'));
        assert_eq!(s.selected(), 0);
    }

    #[test]
    fn digit_shortcuts_map_to_indices_and_ignore_out_of_range() {
        let mut s = ListState::new(4);
        for (i, c) in ['1', '2', '3', '4'].into_iter().enumerate() {
            assert_eq!(s.handle(Key::Char(c)), ListOutcome::Commit(i));
        }
        let mut s = ListState::new(4);
        s.handle(Key::Down);
        assert_eq!(s.handle(Key::Char('5')), ListOutcome::Pending);
        assert_eq!(s.handle(Key::Char('9')), ListOutcome::Pending);
        assert_eq!(s.selected(), 1);
        assert_eq!(s.handle(Key::Char('0')), ListOutcome::Pending);
    }

    #[test]
    fn enter_commits_and_escape_or_q_cancels() {
        let mut s = ListState::new(3);
        s.handle(Key::Down);
        assert_eq!(s.handle(Key::Enter), ListOutcome::Commit(1));
        assert_eq!(s.handle(Key::Esc), ListOutcome::Cancel);
        assert_eq!(s.handle(Key::Char('q')), ListOutcome::Cancel);
    }

    #[test]
    fn empty_list_cancels() {
        let mut s = ListState::new(0);
        assert_eq!(s.handle(Key::Enter), ListOutcome::Cancel);
    }

    #[test]
    fn window_follows_selection() {
        let mut s = ListState::new(10);
        assert_eq!(s.window_start(4), 0);
        for _ in 0..6 {
            s.handle(Key::Down);
        }
        assert_eq!(s.window_start(4), 3);
        assert_eq!(s.window_start(0), 0);
    }

    #[test]
    fn viewport_is_at_least_one_row() {
        assert_eq!(viewport_for(24), 18);
        assert_eq!(viewport_for(6), 1);
        assert_eq!(viewport_for(2), 1);
    }

    #[test]
    fn empty_viewer_input_gets_one_blank_row() {
        let lines = viewer_lines::<&str>(&[]);
        assert_eq!(lines, vec![String::new()]);
        assert_eq!(viewer_lines(&["a", "b"]).len(), 2);
        assert_eq!(viewer_lines(&["intro\nmore", ""]), vec!["intro", "more", ""]);
    }

    #[test]
    fn line_scrolling_stops_at_the_bounds() {
        let mut v = ViewerState::new(5);
        v.handle(Key::Up, 3);
        assert_eq!(v.offset(), 0);
        for _ in 0..10 {
            v.handle(Key::Char('j'), 3);
        }
        assert_eq!(v.offset(), 2);
        v.handle(Key::Char('k'), 3);
        assert_eq!(v.offset(), 1);
    }

    #[test]
    fn paging_clamps_rather_than_overshoots() {
        let mut v = ViewerState::new(25);
        let vp = 10;
        for _ in 0..5 {
            v.handle(Key::PageDown, vp);
            assert!(v.offset() <= v.max_offset(vp));
        }
        assert_eq!(v.offset(), 15);
        v.handle(Key::PageUp, vp);
        assert_eq!(v.offset(), 5);
        v.handle(Key::PageUp, vp);
        assert_eq!(v.offset(), 0);
    }

    #[test]
    fn short_content_never_scrolls() {
        let mut v = ViewerState::new(1);
        for key in [Key::Down, Key::PageDown, Key::End] {
            v.handle(key, 18);
            assert_eq!(v.offset(), 0);
        }
    }

    #[test]
    fn resize_reclamps_offset() {
        let mut v = ViewerState::new(30);
        v.handle(Key::End, 5);
        assert_eq!(v.offset(), 25);
        v.clamp(20);
        assert_eq!(v.offset(), 10);
    }

    #[test]
    fn viewer_exits_on_enter_q_escape() {
        let mut v = ViewerState::new(3);
        for key in [Key::Enter, Key::Char('q'), Key::Esc] {
            assert_eq!(v.handle(key, 1), ViewerOutcome::Close);
        }
        assert_eq!(v.handle(Key::Char('x'), 1), ViewerOutcome::Pending);
    }

    #[test]
    fn editor_collects_and_edits_text() {
        let mut e = LineEditor::default();
        for c in "vmx".chars() {
            e.handle(Key::Char(c));
        }
        e.handle(Key::Backspace);
        assert_eq!(e.text(), "vm");
        assert_eq!(e.handle(Key::Enter), EditOutcome::Submit("vm".into()));
        assert_eq!(e.handle(Key::Esc), EditOutcome::Cancel);
    }

    #[test]
    fn answers_fall_back_to_default() {
        assert_eq!(resolve_answer("  win11 ", "x"), "win11");
        assert_eq!(resolve_answer("   ", "janus-win11"), "janus-win11");
        assert_eq!(resolve_answer("", ""), "");
    }

    #[test]
    fn confirm_defaults_and_tokens() {
        assert!(interpret_confirm("", true));
        assert!(!interpret_confirm("", false));
        for no in ["n", "no", "N", "NO"] {
            assert!(!interpret_confirm(no, true));
            assert!(!interpret_confirm(no, false));
        }
        for yes in ["y", "YES", "s", "Si", "sí"] {
            assert!(interpret_confirm(yes, false));
        }
        assert!(!interpret_confirm("maybe", true));
    }

    #[test]
    fn ctrl_c_is_an_interrupt() {
        let ev = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(Key::from(ev), Key::Interrupt);
        let ev = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE);
        assert_eq!(Key::from(ev), Key::Char('c'));
    }
}
