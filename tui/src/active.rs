//! Active quiz screen: one question at a time with the countdown.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Gauge, Paragraph, Wrap},
};

use mockmaster_engine::{App, OptionIndex};

use crate::format::{format_clock, progress_ratio};
use crate::theme::{Glyphs, Palette, styles};

pub(crate) fn draw_active(
    frame: &mut Frame,
    app: &App,
    area: Rect,
    palette: &Palette,
    glyphs: &Glyphs,
) {
    let Some(session) = app.session() else {
        return;
    };
    let Some(question) = session.current_question() else {
        return;
    };
    let quiz = session.quiz();
    let index = session.state().current_question_index();
    let chosen = session.state().answer_for(question.id());
    let countdown = app.timer().countdown();

    let rows = Layout::vertical([
        Constraint::Length(1), // position + clock
        Constraint::Length(1), // progress
        Constraint::Length(1),
        Constraint::Min(4), // question card
        Constraint::Length(1), // status
    ])
    .split(area);

    let position = Line::from(vec![
        Span::styled(
            format!("Question {} / {}", index + 1, quiz.len()),
            styles::title(palette),
        ),
        Span::styled(
            format!("  {} {} {}", glyphs.separator, quiz.topic(), quiz.difficulty()),
            Style::default().fg(palette.text_muted),
        ),
    ]);
    frame.render_widget(Paragraph::new(position), rows[0]);
    frame.render_widget(
        Paragraph::new(Span::styled(
            format!("Time {}", format_clock(countdown.remaining())),
            styles::clock(palette, countdown.is_urgent()),
        ))
        .alignment(Alignment::Right),
        rows[0],
    );

    let ratio = progress_ratio(index, quiz.len());
    frame.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(palette.primary).bg(palette.bg_panel))
            .ratio(ratio)
            .label(format!("{:.0}%", ratio * 100.0)),
        rows[1],
    );

    let mut lines = vec![
        Line::from(Span::styled(
            question.text().to_string(),
            Style::default()
                .fg(palette.text_primary)
                .add_modifier(Modifier::BOLD),
        )),
        Line::default(),
    ];
    for option in OptionIndex::ALL {
        let is_chosen = chosen == Some(option);
        let under_cursor = app.option_cursor() == option.get();
        let marker = if under_cursor { glyphs.selected } else { " " };
        let style = if is_chosen {
            styles::selected_option(palette)
        } else if under_cursor {
            Style::default()
                .fg(palette.text_primary)
                .bg(palette.bg_highlight)
        } else {
            Style::default().fg(palette.text_secondary)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{marker} "), Style::default().fg(palette.primary)),
            Span::styled(
                format!(" {}. {} ", option.letter(), question.option(option)),
                style,
            ),
        ]));
    }

    let card = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(styles::border(palette)),
    );
    frame.render_widget(card, rows[3]);

    let (status, status_style) = if chosen.is_some() {
        (
            format!("{} Answer recorded", glyphs.correct),
            Style::default().fg(palette.success),
        )
    } else {
        (
            "Select an option".to_string(),
            Style::default().fg(palette.text_muted),
        )
    };
    let next_label = if session.is_last_question() {
        "Enter: Finish"
    } else {
        "Enter: Next"
    };
    let next_style = if chosen.is_some() {
        styles::key_highlight(palette)
    } else {
        Style::default().fg(palette.text_disabled)
    };
    frame.render_widget(Paragraph::new(Span::styled(status, status_style)), rows[4]);
    frame.render_widget(
        Paragraph::new(Span::styled(next_label, next_style)).alignment(Alignment::Right),
        rows[4],
    );
}
