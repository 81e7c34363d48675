//! Setup form state: topic, difficulty and question count.

use mockmaster_types::{Difficulty, QuestionCount};

use super::DraftInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetupField {
    #[default]
    Topic,
    Difficulty,
    Count,
}

impl SetupField {
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Topic => Self::Difficulty,
            Self::Difficulty => Self::Count,
            Self::Count => Self::Topic,
        }
    }

    #[must_use]
    pub const fn prev(self) -> Self {
        match self {
            Self::Topic => Self::Count,
            Self::Difficulty => Self::Topic,
            Self::Count => Self::Difficulty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SetupForm {
    topic: DraftInput,
    difficulty: Difficulty,
    count_choices: Vec<QuestionCount>,
    count_index: usize,
    focus: SetupField,
}

impl Default for SetupForm {
    fn default() -> Self {
        Self::new(Difficulty::default(), QuestionCount::default())
    }
}

impl SetupForm {
    /// A form preselecting `difficulty` and `count`. A count outside the
    /// presets is added to the choices.
    #[must_use]
    pub fn new(difficulty: Difficulty, count: QuestionCount) -> Self {
        let mut count_choices: Vec<QuestionCount> = QuestionCount::PRESETS
            .iter()
            .filter_map(|n| QuestionCount::new(*n).ok())
            .collect();
        if !count_choices.contains(&count) {
            count_choices.push(count);
            count_choices.sort_by_key(|c| c.get());
        }
        let count_index = count_choices.iter().position(|c| *c == count).unwrap_or(0);

        Self {
            topic: DraftInput::default(),
            difficulty,
            count_choices,
            count_index,
            focus: SetupField::Topic,
        }
    }

    #[must_use]
    pub fn topic(&self) -> &DraftInput {
        &self.topic
    }

    pub fn topic_mut(&mut self) -> &mut DraftInput {
        &mut self.topic
    }

    #[must_use]
    pub const fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn count(&self) -> QuestionCount {
        self.count_choices
            .get(self.count_index)
            .copied()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn count_choices(&self) -> &[QuestionCount] {
        &self.count_choices
    }

    #[must_use]
    pub const fn focus(&self) -> SetupField {
        self.focus
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_prev(&mut self) {
        self.focus = self.focus.prev();
    }

    /// Cycle the focused selector forward. No-op on the topic field.
    pub fn select_next(&mut self) {
        match self.focus {
            SetupField::Topic => {}
            SetupField::Difficulty => self.difficulty = self.difficulty.next(),
            SetupField::Count => {
                self.count_index = (self.count_index + 1) % self.count_choices.len().max(1);
            }
        }
    }

    pub fn select_prev(&mut self) {
        match self.focus {
            SetupField::Topic => {}
            SetupField::Difficulty => self.difficulty = self.difficulty.prev(),
            SetupField::Count => {
                let len = self.count_choices.len().max(1);
                self.count_index = (self.count_index + len - 1) % len;
            }
        }
    }

    /// Submission needs a non-blank topic.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        !self.topic.is_blank()
    }

    /// Clear the topic and return focus to it. Selectors keep their values.
    pub fn clear_topic(&mut self) {
        self.topic.clear();
        self.focus = SetupField::Topic;
    }
}
