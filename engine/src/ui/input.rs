//! Single-line text entry used by the setup form.

use unicode_segmentation::UnicodeSegmentation;

/// Handles text editing with proper Unicode grapheme cluster support.
///
/// `cursor` counts graphemes, not bytes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DraftInput {
    text: String,
    cursor: usize,
}

impl DraftInput {
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.cursor = self.cursor.saturating_add(1).min(self.grapheme_count());
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor = self.grapheme_count();
    }

    pub fn enter_char(&mut self, new_char: char) {
        if new_char.is_control() {
            return;
        }
        let index = self.byte_index();
        self.text.insert(index, new_char);
        self.place_cursor_after(index + new_char.len_utf8());
    }

    /// Insert pasted text, flattening newlines and tabs to spaces.
    pub fn enter_text(&mut self, text: &str) {
        let cleaned: String = text
            .chars()
            .map(|c| if c.is_whitespace() { ' ' } else { c })
            .filter(|c| !c.is_control())
            .collect();
        if cleaned.is_empty() {
            return;
        }
        let index = self.byte_index();
        self.text.insert_str(index, &cleaned);
        self.place_cursor_after(index + cleaned.len());
    }

    /// Put the cursor after the grapheme containing the byte before `end`.
    /// Inserted combining marks can merge into the previous grapheme.
    fn place_cursor_after(&mut self, end: usize) {
        self.cursor = self
            .text
            .grapheme_indices(true)
            .take_while(|(start, _)| *start < end)
            .count();
    }

    /// Delete the grapheme before the cursor.
    pub fn delete_char(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let start = self.byte_index_at(self.cursor - 1);
        let end = self.byte_index_at(self.cursor);
        self.text.replace_range(start..end, "");
        self.move_cursor_left();
    }

    /// Delete the grapheme under the cursor.
    pub fn delete_char_forward(&mut self) {
        if self.cursor >= self.grapheme_count() {
            return;
        }
        let start = self.byte_index_at(self.cursor);
        let end = self.byte_index_at(self.cursor + 1);
        self.text.replace_range(start..end, "");
    }

    pub fn delete_word_backwards(&mut self) {
        while self.cursor > 0 && self.grapheme_is_whitespace(self.cursor - 1) {
            self.delete_char();
        }
        while self.cursor > 0 && !self.grapheme_is_whitespace(self.cursor - 1) {
            self.delete_char();
        }
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.cursor = self.grapheme_count();
    }

    #[must_use]
    pub fn grapheme_count(&self) -> usize {
        self.text.graphemes(true).count()
    }

    fn grapheme_is_whitespace(&self, index: usize) -> bool {
        self.text
            .graphemes(true)
            .nth(index)
            .is_some_and(|grapheme| grapheme.chars().all(char::is_whitespace))
    }

    #[must_use]
    pub fn byte_index(&self) -> usize {
        self.byte_index_at(self.cursor)
    }

    fn byte_index_at(&self, grapheme_index: usize) -> usize {
        self.text
            .grapheme_indices(true)
            .nth(grapheme_index)
            .map_or(self.text.len(), |(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::DraftInput;

    #[test]
    fn typing_and_cursor_movement() {
        let mut draft = DraftInput::default();
        for c in "Rust".chars() {
            draft.enter_char(c);
        }
        assert_eq!(draft.text(), "Rust");
        assert_eq!(draft.cursor(), 4);

        draft.move_cursor_home();
        draft.enter_char('>');
        assert_eq!(draft.text(), ">Rust");

        draft.move_cursor_end();
        draft.delete_char();
        assert_eq!(draft.text(), ">Rus");
    }

    #[test]
    fn set_text_handles_graphemes() {
        let mut draft = DraftInput::default();
        draft.set_text("caf\u{e9} \u{1f980}");
        assert_eq!(draft.cursor(), 6);
        draft.delete_char();
        assert_eq!(draft.text(), "caf\u{e9} ");
    }

    #[test]
    fn combining_mark_mid_text_keeps_cursor_on_its_grapheme() {
        let mut draft = DraftInput::default();
        draft.set_text("cafe tea");
        draft.move_cursor_home();
        for _ in 0..4 {
            draft.move_cursor_right();
        }
        draft.enter_char('\u{301}');
        assert_eq!(draft.cursor(), 4);
        assert_eq!(draft.grapheme_count(), 8);

        draft.enter_char('s');
        assert_eq!(draft.text(), "cafe\u{301}s tea");
        assert_eq!(draft.cursor(), 5);
    }

    #[test]
    fn delete_forward_at_end_is_noop() {
        let mut draft = DraftInput::default();
        draft.set_text("ab");
        draft.delete_char_forward();
        assert_eq!(draft.text(), "ab");
        draft.move_cursor_left();
        draft.delete_char_forward();
        assert_eq!(draft.text(), "a");
    }

    #[test]
    fn delete_word_backwards_removes_trailing_word() {
        let mut draft = DraftInput::default();
        draft.set_text("World War  ");
        draft.delete_word_backwards();
        assert_eq!(draft.text(), "World ");
    }

    #[test]
    fn paste_flattens_newlines_and_skips_controls() {
        let mut draft = DraftInput::default();
        draft.enter_text("Cell\nbiology\u{7}");
        assert_eq!(draft.text(), "Cell biology");
        draft.enter_char('\u{1b}');
        assert_eq!(draft.text(), "Cell biology");
    }

    #[test]
    fn blank_detection() {
        let mut draft = DraftInput::default();
        assert!(draft.is_blank());
        draft.set_text("   ");
        assert!(draft.is_blank());
        draft.enter_char('x');
        assert!(!draft.is_blank());
    }
}
