//! Setup screen: topic input, difficulty and question count selectors.

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use mockmaster_engine::{App, Difficulty, ui::SetupField};

use crate::theme::{Glyphs, Palette, spinner_frame, styles};

const FORM_WIDTH: u16 = 72;
const FORM_HEIGHT: u16 = 16;
const TOPIC_PLACEHOLDER: &str = "e.g. Photosynthesis, World War II, Rust ownership";

pub(crate) fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

pub(crate) fn draw_setup(
    frame: &mut Frame,
    app: &App,
    area: Rect,
    palette: &Palette,
    glyphs: &Glyphs,
) {
    let form = app.setup();
    let rect = centered(area, FORM_WIDTH, FORM_HEIGHT);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(styles::border(palette))
        .title(Line::from(Span::styled(
            " Create a Mock Test ",
            styles::title(palette),
        )));
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    let rows = Layout::vertical([
        Constraint::Length(1), // intro
        Constraint::Length(1),
        Constraint::Length(3), // topic
        Constraint::Length(1), // difficulty
        Constraint::Length(1), // count
        Constraint::Length(1),
        Constraint::Length(1), // submit
        Constraint::Min(0),    // status
    ])
    .split(inner);

    frame.render_widget(
        Paragraph::new(Span::styled(
            " Enter a topic and an AI examiner will write the questions.",
            Style::default().fg(palette.text_muted),
        )),
        rows[0],
    );

    draw_topic(frame, app, rows[2], palette);

    let difficulty_spans = Difficulty::ALL
        .iter()
        .map(|level| (level.as_str().to_string(), *level == form.difficulty()))
        .collect::<Vec<_>>();
    frame.render_widget(
        selector_line(
            "Difficulty",
            &difficulty_spans,
            form.focus() == SetupField::Difficulty,
            palette,
            glyphs,
        ),
        rows[3],
    );

    let count_spans = form
        .count_choices()
        .iter()
        .map(|count| (count.to_string(), *count == form.count()))
        .collect::<Vec<_>>();
    frame.render_widget(
        selector_line(
            "Questions",
            &count_spans,
            form.focus() == SetupField::Count,
            palette,
            glyphs,
        ),
        rows[4],
    );

    let submit_style = if form.can_submit() && !app.is_generating() {
        styles::key_highlight(palette)
    } else {
        Style::default().fg(palette.text_disabled)
    };
    let minutes = form.count().get();
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::raw(" "),
            Span::styled("[ Enter: Generate Quiz ]", submit_style),
            Span::styled(
                format!("  {minutes} min time limit"),
                Style::default().fg(palette.text_muted),
            ),
        ])),
        rows[6],
    );

    draw_status(frame, app, rows[7], palette);
}

fn draw_topic(frame: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let form = app.setup();
    let focused = form.focus() == SetupField::Topic;
    let border_style = if focused {
        styles::focused_border(palette)
    } else {
        styles::border(palette)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(border_style)
        .title(" Topic ");
    let inner = block.inner(area);

    let draft = form.topic();
    let content_width = inner.width.saturating_sub(1) as usize;
    let (line, cursor_x) = if draft.text().is_empty() {
        (
            Line::from(Span::styled(
                TOPIC_PLACEHOLDER,
                Style::default().fg(palette.text_muted),
            )),
            0,
        )
    } else {
        let (visible, cursor) = scroll_to_cursor(draft.text(), draft.byte_index(), content_width);
        (
            Line::from(Span::styled(
                visible,
                Style::default().fg(palette.text_primary),
            )),
            cursor,
        )
    };

    frame.render_widget(Paragraph::new(line).block(block), area);

    if focused && !app.is_generating() {
        frame.set_cursor_position((inner.x.saturating_add(cursor_x), inner.y));
    }
}

/// Slice `text` so the cursor at `cursor_byte` stays within `width` columns.
/// Returns the visible text and the cursor column inside it.
fn scroll_to_cursor(text: &str, cursor_byte: usize, width: usize) -> (String, u16) {
    if width == 0 {
        return (String::new(), 0);
    }
    let cursor_display_pos = text[..cursor_byte].width();
    if cursor_display_pos < width {
        return (text.to_string(), cursor_display_pos as u16);
    }

    let scroll_target = cursor_display_pos - width + 1;
    let mut byte_offset = text.len();
    let mut skipped_width = 0;
    for (idx, grapheme) in text.grapheme_indices(true) {
        if skipped_width >= scroll_target {
            byte_offset = idx;
            break;
        }
        skipped_width += grapheme.width();
    }
    (
        text[byte_offset..].to_string(),
        cursor_display_pos.saturating_sub(skipped_width) as u16,
    )
}

fn selector_line<'a>(
    label: &'a str,
    choices: &[(String, bool)],
    focused: bool,
    palette: &Palette,
    glyphs: &Glyphs,
) -> Paragraph<'a> {
    let label_style = if focused {
        styles::title(palette)
    } else {
        Style::default().fg(palette.text_secondary)
    };
    let marker = if focused { glyphs.selected } else { " " };
    let mut spans = vec![
        Span::styled(format!("{marker}{label:<11}"), label_style),
    ];
    for (name, active) in choices {
        let (radio, style) = if *active {
            (
                glyphs.radio_on,
                Style::default()
                    .fg(palette.primary)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            (glyphs.radio_off, Style::default().fg(palette.text_muted))
        };
        spans.push(Span::styled(format!("{radio} {name}  "), style));
    }
    Paragraph::new(Line::from(spans))
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    if let Some(request) = app.pending_request() {
        let spinner = spinner_frame(app.tick_count(), app.ui_options());
        let text = format!(
            " {spinner} Generating {} {} questions on \"{}\"... (Esc to cancel)",
            request.count, request.difficulty, request.topic
        );
        frame.render_widget(
            Paragraph::new(Span::styled(text, Style::default().fg(palette.primary)))
                .wrap(Wrap { trim: false }),
            area,
        );
        return;
    }

    if let Some(notice) = app.notice() {
        frame.render_widget(
            Paragraph::new(Span::styled(
                format!(" {}", notice.message()),
                Style::default().fg(palette.error),
            ))
            .wrap(Wrap { trim: false }),
            area,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{centered, scroll_to_cursor};
    use ratatui::layout::Rect;

    #[test]
    fn short_text_is_not_scrolled() {
        assert_eq!(scroll_to_cursor("abc", 3, 10), ("abc".to_string(), 3));
    }

    #[test]
    fn long_text_scrolls_to_keep_cursor_visible() {
        let (visible, cursor) = scroll_to_cursor("abcdefghij", 10, 5);
        assert_eq!(visible, "ghij");
        assert_eq!(cursor, 4);
    }

    #[test]
    fn narrow_box_with_cursor_mid_text_does_not_panic() {
        assert_eq!(scroll_to_cursor("abcdef", 3, 0), (String::new(), 0));
        let (visible, cursor) = scroll_to_cursor("abcdef", 3, 1);
        assert_eq!(visible, "def");
        assert_eq!(cursor, 0);
    }

    #[test]
    fn centered_rect_fits_small_areas() {
        let area = Rect::new(0, 0, 40, 10);
        assert_eq!(centered(area, 72, 16), area);
        assert_eq!(centered(Rect::new(0, 0, 100, 30), 72, 16), Rect::new(14, 7, 72, 16));
    }
}
