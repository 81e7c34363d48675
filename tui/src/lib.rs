//! TUI rendering for MockMaster using ratatui.

mod active;
mod format;
mod input;
mod result;
mod setup;
mod theme;

#[cfg(test)]
mod test_support;

pub use format::format_clock;
pub use input::{InputPump, handle_events};
pub use theme::{Glyphs, Palette, glyphs, palette, spinner_frame, styles};

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Paragraph},
};

use mockmaster_engine::{App, View};

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
    let options = app.ui_options();
    let palette = palette(options);
    let glyphs = glyphs(options);
    // Clear with background color
    let bg_block = Block::default().style(Style::default().bg(palette.bg_dark));
    frame.render_widget(bg_block, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Length(1),
            Constraint::Min(1),    // Body
            Constraint::Length(1), // Key hints
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0], &palette, &glyphs);
    match app.view() {
        View::Setup => setup::draw_setup(frame, app, chunks[2], &palette, &glyphs),
        View::Active => active::draw_active(frame, app, chunks[2], &palette, &glyphs),
        View::Result => result::draw_result(frame, app, chunks[2], &palette, &glyphs),
    }
    draw_key_hints(frame, app, chunks[3], &palette);
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect, palette: &Palette, glyphs: &Glyphs) {
    let mut title = vec![
        Span::styled(" MockMaster", styles::title(palette)),
        Span::styled(
            format!(" {} {}", glyphs.separator, app.view().label()),
            Style::default().fg(palette.text_secondary),
        ),
    ];
    if app.is_generating() {
        title.push(Span::styled(
            format!("  {}", spinner_frame(app.tick_count(), app.ui_options())),
            Style::default().fg(palette.primary),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(title)), area);

    let settings = app.settings();
    let (status_text, status_style) = if app.is_configured() {
        (
            format!(
                "{} {} {} {} ",
                glyphs.status_ready,
                settings.provider.display_name(),
                glyphs.separator,
                settings.model
            ),
            Style::default().fg(palette.success),
        )
    } else {
        let env_var = settings
            .provider
            .env_vars()
            .first()
            .copied()
            .unwrap_or_default();
        (
            format!(
                "{} No API key {} Set {env_var} ",
                glyphs.status_missing, glyphs.separator
            ),
            Style::default().fg(palette.error),
        )
    };
    frame.render_widget(
        Paragraph::new(Span::styled(status_text, status_style)).alignment(Alignment::Right),
        area,
    );
}

fn key_hints(app: &App) -> &'static [(&'static str, &'static str)] {
    match app.view() {
        View::Setup if app.is_generating() => &[("Esc", "cancel"), ("Ctrl+C", "cancel")],
        View::Setup => &[
            ("Enter", "generate"),
            ("Tab", "next field"),
            ("←/→", "change"),
            ("Ctrl+C", "quit"),
        ],
        View::Active => &[
            ("1-4", "answer"),
            ("↑/↓", "select"),
            ("Enter", "next"),
            ("←", "back"),
            ("f", "finish"),
            ("Esc", "new topic"),
        ],
        View::Result => &[
            ("↑/↓", "select"),
            ("Enter", "expand"),
            ("r", "retry"),
            ("n", "new topic"),
            ("q", "quit"),
        ],
    }
}

fn draw_key_hints(frame: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let mut spans = vec![Span::raw(" ")];
    for (i, (key, action)) in key_hints(app).iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled("  ", styles::key_hint(palette)));
        }
        spans.push(Span::styled(*key, styles::key_highlight(palette)));
        spans.push(Span::styled(format!(" {action}"), styles::key_hint(palette)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
