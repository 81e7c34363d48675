//! Results screen: score summary and per-question breakdown.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};

use mockmaster_engine::{
    App, OptionIndex, Question, QuestionOutcome, QuizSession, ScoreTier, ui::BreakdownState,
};

use crate::format::{truncate_with_ellipsis, wrap_text};
use crate::theme::{Glyphs, Palette, styles};

const DETAIL_INDENT: &str = "      ";

fn tier_color(tier: ScoreTier, palette: &Palette) -> Color {
    match tier {
        ScoreTier::Perfect | ScoreTier::Excellent => palette.success,
        ScoreTier::Good => palette.warning,
        ScoreTier::KeepPracticing => palette.error,
    }
}

pub(crate) fn draw_result(
    frame: &mut Frame,
    app: &App,
    area: Rect,
    palette: &Palette,
    glyphs: &Glyphs,
) {
    let Some(session) = app.session() else {
        return;
    };
    let Some(summary) = session.summary() else {
        return;
    };

    let rows = Layout::vertical([Constraint::Length(6), Constraint::Min(3)]).split(area);

    let color = tier_color(summary.tier, palette);
    let summary_lines = vec![
        Line::from(Span::styled(
            format!("{}%", summary.percentage),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("{} / {} correct", summary.correct, summary.total),
            Style::default().fg(palette.text_primary),
        )),
        Line::from(Span::styled(
            summary.tier.headline(),
            Style::default().fg(color),
        )),
        Line::from(Span::styled(
            format!(
                "{} {} {}",
                session.quiz().topic(),
                glyphs.separator,
                session.quiz().difficulty()
            ),
            Style::default().fg(palette.text_muted),
        )),
    ];
    frame.render_widget(
        Paragraph::new(summary_lines)
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(styles::border(palette))
                    .title(Line::from(Span::styled(" Results ", styles::title(palette)))),
            ),
        rows[0],
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(styles::border(palette))
        .title(" Detailed Breakdown ");
    let inner = block.inner(rows[1]);
    let (lines, selected_span) =
        breakdown_lines(session, app.breakdown(), inner.width as usize, palette, glyphs);

    let visible = inner.height as usize;
    let (start, end) = selected_span;
    let scroll = (end + 1).saturating_sub(visible).min(start);
    frame.render_widget(
        Paragraph::new(lines)
            .scroll((scroll as u16, 0))
            .block(block),
        rows[1],
    );
}

/// Build breakdown rows. Also returns the first and last line of the selected entry.
fn breakdown_lines(
    session: &QuizSession,
    breakdown: &BreakdownState,
    width: usize,
    palette: &Palette,
    glyphs: &Glyphs,
) -> (Vec<Line<'static>>, (usize, usize)) {
    let mut lines = Vec::new();
    let mut selected_span = (0, 0);
    let detail_width = width.saturating_sub(DETAIL_INDENT.len());

    for ((index, question), outcome) in session
        .quiz()
        .questions()
        .iter()
        .enumerate()
        .zip(session.outcomes())
    {
        let start = lines.len();
        let selected = breakdown.selected() == index;
        let expanded = breakdown.is_expanded(index);

        let (mark, mark_color) = match outcome {
            QuestionOutcome::Correct => (glyphs.correct, palette.success),
            QuestionOutcome::Incorrect { .. } => (glyphs.incorrect, palette.error),
            QuestionOutcome::Unanswered => (glyphs.unanswered, palette.text_muted),
        };
        let fold = if expanded { glyphs.expanded } else { glyphs.collapsed };
        let row_style = if selected {
            Style::default()
                .fg(palette.text_primary)
                .bg(palette.bg_highlight)
        } else {
            Style::default().fg(palette.text_secondary)
        };
        let prefix = format!("{fold} {mark} {}. ", index + 1);
        let text_width = width.saturating_sub(prefix.chars().count());
        lines.push(Line::from(vec![
            Span::styled(format!("{fold} "), row_style),
            Span::styled(format!("{mark} "), row_style.fg(mark_color)),
            Span::styled(
                format!("{}. {}", index + 1, truncate_with_ellipsis(question.text(), text_width)),
                row_style,
            ),
        ]));

        if expanded {
            let chosen = match outcome {
                QuestionOutcome::Incorrect { chosen } => Some(chosen),
                QuestionOutcome::Correct => Some(question.correct_answer()),
                QuestionOutcome::Unanswered => None,
            };
            lines.extend(option_lines(question, chosen, detail_width, palette, glyphs));
            if chosen.is_none() {
                lines.push(Line::from(Span::styled(
                    format!("{DETAIL_INDENT}Not answered"),
                    Style::default().fg(palette.text_muted),
                )));
            }
            lines.push(Line::from(Span::styled(
                format!("{DETAIL_INDENT}Explanation:"),
                Style::default().fg(palette.accent),
            )));
            for chunk in wrap_text(question.explanation(), detail_width) {
                lines.push(Line::from(Span::styled(
                    format!("{DETAIL_INDENT}{chunk}"),
                    Style::default()
                        .fg(palette.text_muted)
                        .add_modifier(Modifier::ITALIC),
                )));
            }
        }

        if selected {
            selected_span = (start, lines.len().saturating_sub(1));
        }
    }

    (lines, selected_span)
}

fn option_lines(
    question: &Question,
    chosen: Option<OptionIndex>,
    width: usize,
    palette: &Palette,
    glyphs: &Glyphs,
) -> Vec<Line<'static>> {
    OptionIndex::ALL
        .iter()
        .map(|option| {
            let text = truncate_with_ellipsis(question.option(*option), width.saturating_sub(16));
            let is_correct = question.is_correct(*option);
            let is_chosen = chosen == Some(*option);
            let (suffix, style) = match (is_correct, is_chosen) {
                (true, _) => (
                    format!(" {}", glyphs.correct),
                    Style::default()
                        .fg(palette.success)
                        .add_modifier(Modifier::BOLD),
                ),
                (false, true) => (
                    format!(" {} (your answer)", glyphs.incorrect),
                    Style::default().fg(palette.error),
                ),
                (false, false) => (String::new(), Style::default().fg(palette.text_secondary)),
            };
            Line::from(Span::styled(
                format!("{DETAIL_INDENT}{}. {text}{suffix}", option.letter()),
                style,
            ))
        })
        .collect()
}
