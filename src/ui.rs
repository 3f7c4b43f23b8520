use anyhow::Result;
use crossterm::{
    cursor::{Hide, Show},
    event::{self, poll, read, Event, KeyEventKind},
    execute,
    style::Stylize,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Span,
    Frame, Terminal,
};
use std::io::{stdout, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::AppError;
use crate::i18n::Catalog;
use crate::launcher::Console;
use crate::session::Session;
use crate::status::{render_hint, render_status_line};
use crate::widgets::{
    interpret_confirm, resolve_answer, viewer_lines, viewport_for, EditOutcome, Key, LineEditor,
    ListOutcome, ListState, ViewerOutcome, ViewerState,
};

pub type Term = Terminal<CrosstermBackend<std::io::Stdout>>;

// ── Layout ────────────────────────────────────────────────────────────────────

const CONTENT_TOP: u16 = 4;
const H_PAD: u16 = 2;

/// Rows between the screen title and the status line.
pub fn content_area(area: Rect) -> Rect {
    Rect {
        x: area.x + H_PAD.min(area.width),
        y: area.y + CONTENT_TOP.min(area.height),
        width: area.width.saturating_sub(H_PAD * 2),
        height: area.height.saturating_sub(6),
    }
}

/// Write `text` at (`x`, `y`), truncated so it never reaches the right edge
/// of `bounds`. Anything outside `bounds` is dropped.
pub fn write_clipped(buf: &mut Buffer, bounds: Rect, x: u16, y: u16, text: &str, style: Style) {
    if y < bounds.top() || y >= bounds.bottom() || x < bounds.left() || x >= bounds.right() {
        return;
    }
    let max = (bounds.right() - x).saturating_sub(1) as usize;
    if max == 0 {
        return;
    }
    buf.set_stringn(x, y, text, max, style);
}

// ── Colour helpers ────────────────────────────────────────────────────────────

/// Styles for the chrome. Without colour every distinction collapses to
/// bold or reverse video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    color: bool,
}

impl Palette {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn has_color(&self) -> bool {
        self.color
    }

    pub fn title_bar(&self) -> Style {
        if self.color {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default()
        }
    }

    pub fn app_title(&self) -> Style {
        self.title_bar().add_modifier(Modifier::BOLD)
    }

    pub fn screen_title(&self) -> Style {
        if self.color {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        }
    }

    pub fn selected(&self) -> Style {
        if self.color {
            Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::REVERSED)
        }
    }

    pub fn normal(&self) -> Style {
        Style::default()
    }

    pub fn status(&self) -> Style {
        if self.color {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        }
    }

    pub fn hint(&self) -> Style {
        Style::default()
    }
}

// ── Chrome ────────────────────────────────────────────────────────────────────

/// Resolved text for one frame of chrome.
#[derive(Debug, Clone, Default)]
pub struct Chrome {
    pub app_title: String,
    pub app_subtitle: String,
    pub title: String,
    pub status: String,
    pub hint: String,
}

impl Chrome {
    pub fn new(session: &Session, catalog: &Catalog, title: &str) -> Self {
        Self {
            app_title: session.t(catalog, "app_title"),
            app_subtitle: session.t(catalog, "app_subtitle"),
            title: title.to_string(),
            status: session.status.clone(),
            hint: session.t(catalog, "menu_hint"),
        }
    }
}

/// Title bar, screen title, status line and hint. Returns the content area.
pub fn draw_chrome(buf: &mut Buffer, area: Rect, palette: &Palette, chrome: &Chrome) -> Rect {
    if area.height == 0 || area.width == 0 {
        return content_area(area);
    }
    let top = area.y;
    let bar = " ".repeat(area.width as usize);
    if palette.has_color() {
        write_clipped(buf, area, area.x, top, &bar, palette.title_bar());
    }
    write_clipped(buf, area, area.x + 2, top, &chrome.app_title, palette.app_title());

    let sub_w = Span::raw(chrome.app_subtitle.as_str()).width() as u16;
    let sub_x = area.x + area.width.saturating_sub(sub_w + 2).max(2);
    write_clipped(buf, area, sub_x, top, &chrome.app_subtitle, palette.title_bar());

    if area.height > 2 {
        write_clipped(buf, area, area.x + 2, top + 2, &chrome.title, palette.screen_title());
    }

    render_status_line(buf, area, palette, &chrome.status);
    render_hint(buf, area, palette, &chrome.hint);
    content_area(area)
}

pub fn render_list(buf: &mut Buffer, content: Rect, palette: &Palette, labels: &[&str], state: &ListState) {
    let rows = content.height as usize;
    let start = state.window_start(rows);
    for (row, (i, label)) in labels.iter().enumerate().skip(start).take(rows).enumerate() {
        let style = if i == state.selected() {
            palette.selected()
        } else {
            palette.normal()
        };
        let line = format!("{}. {label}", i + 1);
        write_clipped(buf, content, content.x, content.y + row as u16, &line, style);
    }
}

pub fn render_page(buf: &mut Buffer, content: Rect, palette: &Palette, lines: &[String], offset: usize) {
    for (row, line) in lines.iter().skip(offset).take(content.height as usize).enumerate() {
        write_clipped(buf, content, content.x, content.y + row as u16, line, palette.normal());
    }
}

// ── Interactive screen ────────────────────────────────────────────────────────

/// The full-screen UI. Owns the terminal except while a child process runs
/// (see `Console::suspend`).
pub struct Tui {
    terminal: Term,
    palette: Palette,
    /// Condition flag of the SIGINT handler that falls back to the default
    /// action.
    exit_on_interrupt: Arc<AtomicBool>,
}

impl Tui {
    pub fn enter(palette: Palette, exit_on_interrupt: Arc<AtomicBool>) -> Result<Self> {
        enable_raw_mode()?;
        let mut out = stdout();
        execute!(out, EnterAlternateScreen, Hide)?;
        let terminal = Terminal::new(CrosstermBackend::new(out))?;
        Ok(Self {
            terminal,
            palette,
            exit_on_interrupt,
        })
    }

    pub fn restore(&mut self) -> Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }

    fn draw<F>(&mut self, chrome: &Chrome, body: F) -> Result<()>
    where
        F: FnOnce(&mut Frame, Rect, &Palette),
    {
        let palette = self.palette;
        self.terminal.draw(|f| {
            let area = f.area();
            let content = draw_chrome(f.buffer_mut(), area, &palette, chrome);
            body(f, content, &palette);
        })?;
        Ok(())
    }

    /// Block for one key press. Resizes come back as `Key::Other` so the
    /// caller redraws.
    fn read_key(&mut self) -> Result<Key> {
        loop {
            match event::read()? {
                Event::Key(ev) if ev.kind == KeyEventKind::Press => {
                    let key = Key::from(ev);
                    if key == Key::Interrupt {
                        return Err(AppError::Interrupted.into());
                    }
                    return Ok(key);
                }
                Event::Resize(..) => return Ok(Key::Other),
                _ => {}
            }
        }
    }

    // ── Menu / single-select ──────────────────────────────────────────────────

    /// Numbered list of labels; returns the value of the committed option or
    /// `None` when cancelled.
    pub fn pick<T: Clone>(
        &mut self,
        session: &Session,
        catalog: &Catalog,
        title: &str,
        options: &[(String, T)],
    ) -> Result<Option<T>> {
        if options.is_empty() {
            return Ok(None);
        }
        let chrome = Chrome::new(session, catalog, title);
        let labels: Vec<&str> = options.iter().map(|(l, _)| l.as_str()).collect();
        let mut state = ListState::new(options.len());

        loop {
            self.draw(&chrome, |f, content, palette| {
                render_list(f.buffer_mut(), content, palette, &labels, &state);
            })?;
            match state.handle(self.read_key()?) {
                ListOutcome::Commit(i) => return Ok(Some(options[i].1.clone())),
                ListOutcome::Cancel => return Ok(None),
                ListOutcome::Pending => {}
            }
        }
    }

    // ── Pager ─────────────────────────────────────────────────────────────────

    pub fn show_text<S: AsRef<str>>(
        &mut self,
        session: &Session,
        catalog: &Catalog,
        title: &str,
        lines: &[S],
    ) -> Result<()> {
        let chrome = Chrome::new(session, catalog, title);
        let entries = viewer_lines(lines);
        let mut state = ViewerState::new(entries.len());

        loop {
            let viewport = viewport_for(self.terminal.size()?.height);
            state.clamp(viewport);
            let offset = state.offset();
            self.draw(&chrome, |f, content, palette| {
                render_page(f.buffer_mut(), content, palette, &entries, offset);
            })?;
            if state.handle(self.read_key()?, viewport) == ViewerOutcome::Close {
                return Ok(());
            }
        }
    }

    // ── Text input ────────────────────────────────────────────────────────────

    /// Free-text prompt. Blank input yields `default`; an empty result means
    /// the caller should abandon the action.
    pub fn prompt(
        &mut self,
        session: &Session,
        catalog: &Catalog,
        message: &str,
        default: &str,
    ) -> Result<String> {
        Ok(match self.read_line(session, catalog, message, default)? {
            Some(raw) => resolve_answer(&raw, default),
            None => String::new(),
        })
    }

    pub fn confirm(
        &mut self,
        session: &Session,
        catalog: &Catalog,
        message: &str,
        default_yes: bool,
    ) -> Result<bool> {
        let hint_key = if default_yes {
            "prompt_yes_no_default_yes"
        } else {
            "prompt_yes_no_default_no"
        };
        let text = format!("{message} {}", session.t(catalog, hint_key));
        Ok(match self.read_line(session, catalog, &text, "")? {
            Some(answer) => interpret_confirm(&answer, default_yes),
            None => false,
        })
    }

    /// Cursor is visible only while the line is being edited.
    fn read_line(
        &mut self,
        session: &Session,
        catalog: &Catalog,
        message: &str,
        default: &str,
    ) -> Result<Option<String>> {
        self.terminal.show_cursor()?;
        let result = self.edit_line(session, catalog, message, default);
        let _ = self.terminal.hide_cursor();
        result
    }

    fn edit_line(
        &mut self,
        session: &Session,
        catalog: &Catalog,
        message: &str,
        default: &str,
    ) -> Result<Option<String>> {
        let chrome = Chrome::new(session, catalog, &session.t(catalog, "prompt_title"));
        let shown = if default.is_empty() {
            message.to_string()
        } else {
            format!("{message} [{default}]")
        };
        let mut editor = LineEditor::default();

        loop {
            self.draw(&chrome, |f, content, palette| {
                let mut row = content.y;
                for line in shown.lines() {
                    write_clipped(f.buffer_mut(), content, content.x, row, line, palette.normal());
                    row = row.saturating_add(1);
                }
                row = row.saturating_add(1);
                let text = editor.text();
                write_clipped(f.buffer_mut(), content, content.x, row, "> ", palette.normal());
                write_clipped(f.buffer_mut(), content, content.x + 2, row, text, palette.normal());
                if row < content.bottom() && content.width > 0 {
                    let typed = Span::raw(text).width() as u16;
                    let x = (content.x + 2)
                        .saturating_add(typed)
                        .min(content.right().saturating_sub(1));
                    f.set_cursor_position((x, row));
                }
            })?;
            match editor.handle(self.read_key()?) {
                EditOutcome::Submit(raw) => return Ok(Some(raw)),
                EditOutcome::Cancel => return Ok(None),
                EditOutcome::Pending => {}
            }
        }
    }
}

/// While held, SIGINT terminates the process the way it would without a
/// handler installed.
struct InterruptExits<'a>(&'a AtomicBool);

impl<'a> InterruptExits<'a> {
    fn arm(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for InterruptExits<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn drain_pending_input(max_for: Duration) {
    let deadline = Instant::now() + max_for;
    while Instant::now() < deadline {
        match poll(Duration::from_millis(0)) {
            Ok(true) => {
                let _ = read();
            }
            _ => break,
        }
    }
}

impl Console for Tui {
    fn suspend(&mut self) -> Result<()> {
        disable_raw_mode()?;
        execute!(stdout(), LeaveAlternateScreen, Show)?;
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        enable_raw_mode()?;
        execute!(stdout(), EnterAlternateScreen, Hide)?;
        self.terminal.clear()?;
        drain_pending_input(Duration::from_millis(80));
        Ok(())
    }

    fn confirm(
        &mut self,
        session: &Session,
        catalog: &Catalog,
        message: &str,
        default_yes: bool,
    ) -> Result<bool> {
        Tui::confirm(self, session, catalog, message, default_yes)
    }

    fn say(&mut self, text: &str) {
        println!("{text}");
    }

    fn banner(&mut self, text: &str, ok: bool) {
        if !self.palette.has_color() {
            println!("{text}");
        } else if ok {
            println!("{}", text.green());
        } else {
            println!("{}", text.red());
        }
    }

    fn pause(&mut self, prompt: &str) -> Result<()> {
        print!("{prompt}");
        std::io::stdout().flush()?;
        let mut line = String::new();
        // The terminal is already restored here, so Ctrl+C can end the
        // program on the spot.
        let _armed = InterruptExits::arm(&self.exit_on_interrupt);
        // EOF just means there is nothing to wait for.
        let _ = std::io::stdin().lock().read_line(&mut line);
        Ok(())
    }
}
