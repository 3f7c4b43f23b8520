use ratatui::{buffer::Buffer, layout::Rect};

use crate::ui::{write_clipped, Palette};

// ── Status line / navigation hint ─────────────────────────────────────────────

/// Last status message on the second-to-last row. Nothing is drawn for an
/// empty status or a screen too short to hold it beside the title bar.
pub fn render_status_line(buf: &mut Buffer, area: Rect, palette: &Palette, status: &str) {
    if status.is_empty() || area.height < 3 {
        return;
    }
    let row = area.bottom() - 2;
    let text = status.lines().next().unwrap_or("");
    write_clipped(buf, area, area.x + 2, row, text, palette.status());
}

/// Fixed key hint on the last row.
pub fn render_hint(buf: &mut Buffer, area: Rect, palette: &Palette, hint: &str) {
    if area.height < 2 {
        return;
    }
    let row = area.bottom() - 1;
    write_clipped(buf, area, area.x + 2, row, hint, palette.hint());
}
