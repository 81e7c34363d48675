use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Render seconds as `m:ss`.
#[must_use]
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Fraction of the quiz reached, counting the current question.
pub(crate) fn progress_ratio(current_index: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((current_index + 1) as f64 / total as f64).clamp(0.0, 1.0)
}

/// Cut `raw` to at most `max` display columns, ending in `…` when shortened.
pub(crate) fn truncate_with_ellipsis(raw: &str, max: usize) -> String {
    if raw.width() <= max {
        return raw.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut width = 0;
    for grapheme in raw.graphemes(true) {
        let w = grapheme.width();
        if width + w + 1 > max {
            break;
        }
        out.push_str(grapheme);
        width += w;
    }
    out.push('…');
    out
}

/// Greedy word wrap to `width` display columns. Words wider than a line are split.
pub(crate) fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_width = 0;

    for word in text.split_whitespace() {
        let word_width = word.width();
        let needed = if line.is_empty() { word_width } else { line_width + 1 + word_width };
        if needed <= width {
            if !line.is_empty() {
                line.push(' ');
                line_width += 1;
            }
            line.push_str(word);
            line_width += word_width;
            continue;
        }

        if !line.is_empty() {
            lines.push(std::mem::take(&mut line));
            line_width = 0;
        }
        for grapheme in word.graphemes(true) {
            let w = grapheme.width();
            if line_width + w > width && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                line_width = 0;
            }
            line.push_str(grapheme);
            line_width += w;
        }
    }

    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}
