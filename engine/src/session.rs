//! Per-session quiz progress and scoring.
//!
//! [`QuizState`] transitions are pure functions of the state and the [`Quiz`] it
//! belongs to; [`QuizSession`] pairs the two so they cannot drift apart.

use std::collections::HashMap;

use mockmaster_types::{OptionIndex, Question, QuestionId, Quiz};

use crate::timer::SessionId;

/// Why an event was dropped without changing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NoQuiz,
    Finished,
    UnknownQuestion,
    OptionOutOfRange,
    AtBoundary,
    /// Retry is only offered once the quiz has been scored.
    NotFinished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Applied,
    Ignored(IgnoreReason),
}

impl EventOutcome {
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuizState {
    current_question_index: usize,
    answers: HashMap<QuestionId, OptionIndex>,
    is_finished: bool,
    score: usize,
}

impl QuizState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn current_question_index(&self) -> usize {
        self.current_question_index
    }

    #[must_use]
    pub fn answers(&self) -> &HashMap<QuestionId, OptionIndex> {
        &self.answers
    }

    #[must_use]
    pub fn answer_for(&self, id: QuestionId) -> Option<OptionIndex> {
        self.answers.get(&id).copied()
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.is_finished
    }

    /// Number of correct answers. Only meaningful once finished.
    #[must_use]
    pub const fn score(&self) -> usize {
        self.score
    }

    /// Store (or overwrite) the answer for `id`.
    pub fn record_answer(&mut self, quiz: &Quiz, id: QuestionId, option: usize) -> EventOutcome {
        if self.is_finished {
            return EventOutcome::Ignored(IgnoreReason::Finished);
        }
        if quiz.question_by_id(id).is_none() {
            return EventOutcome::Ignored(IgnoreReason::UnknownQuestion);
        }
        let Ok(option) = OptionIndex::new(option) else {
            return EventOutcome::Ignored(IgnoreReason::OptionOutOfRange);
        };
        self.answers.insert(id, option);
        EventOutcome::Applied
    }

    pub fn advance(&mut self, quiz: &Quiz) -> EventOutcome {
        if self.is_finished {
            return EventOutcome::Ignored(IgnoreReason::Finished);
        }
        if self.current_question_index + 1 >= quiz.len() {
            return EventOutcome::Ignored(IgnoreReason::AtBoundary);
        }
        self.current_question_index += 1;
        EventOutcome::Applied
    }

    pub fn go_back(&mut self) -> EventOutcome {
        if self.is_finished {
            return EventOutcome::Ignored(IgnoreReason::Finished);
        }
        if self.current_question_index == 0 {
            return EventOutcome::Ignored(IgnoreReason::AtBoundary);
        }
        self.current_question_index -= 1;
        EventOutcome::Applied
    }

    /// Score the quiz and mark the state finished. A second call changes nothing.
    pub fn finish(&mut self, quiz: &Quiz) -> EventOutcome {
        if self.is_finished {
            return EventOutcome::Ignored(IgnoreReason::Finished);
        }
        self.score = score(quiz, &self.answers);
        self.is_finished = true;
        EventOutcome::Applied
    }
}

/// Count answers that equal the question's correct option. Unanswered counts as wrong.
#[must_use]
pub fn score(quiz: &Quiz, answers: &HashMap<QuestionId, OptionIndex>) -> usize {
    quiz.questions()
        .iter()
        .filter(|q| answers.get(&q.id()).is_some_and(|a| q.is_correct(*a)))
        .count()
}

/// A quiz together with the progress made on it.
#[derive(Debug, Clone)]
pub struct QuizSession {
    id: SessionId,
    quiz: Quiz,
    state: QuizState,
}

impl QuizSession {
    #[must_use]
    pub fn new(id: SessionId, quiz: Quiz) -> Self {
        Self {
            id,
            quiz,
            state: QuizState::new(),
        }
    }

    /// Start over on the same quiz under a new session id.
    pub fn restart(&mut self, id: SessionId) {
        self.id = id;
        self.state = QuizState::new();
    }

    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub const fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    #[must_use]
    pub const fn state(&self) -> &QuizState {
        &self.state
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.quiz.question(self.state.current_question_index())
    }

    #[must_use]
    pub fn is_last_question(&self) -> bool {
        self.state.current_question_index() + 1 >= self.quiz.len()
    }

    pub fn record_answer(&mut self, id: QuestionId, option: usize) -> EventOutcome {
        self.state.record_answer(&self.quiz, id, option)
    }

    pub fn advance(&mut self) -> EventOutcome {
        self.state.advance(&self.quiz)
    }

    pub fn go_back(&mut self) -> EventOutcome {
        self.state.go_back()
    }

    pub fn finish(&mut self) -> EventOutcome {
        self.state.finish(&self.quiz)
    }

    /// Score summary; `None` until finished.
    #[must_use]
    pub fn summary(&self) -> Option<ScoreSummary> {
        self.state
            .is_finished()
            .then(|| ScoreSummary::new(self.state.score(), self.quiz.len()))
    }

    /// Per-question result for the breakdown view.
    #[must_use]
    pub fn outcomes(&self) -> Vec<QuestionOutcome> {
        self.quiz
            .questions()
            .iter()
            .map(|q| QuestionOutcome::of(q, self.state.answer_for(q.id())))
            .collect()
    }
}

// ============================================================================
// Result presentation data
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreTier {
    Perfect,
    Excellent,
    Good,
    KeepPracticing,
}

impl ScoreTier {
    #[must_use]
    pub const fn from_percentage(percentage: u32) -> Self {
        match percentage {
            100.. => Self::Perfect,
            80..=99 => Self::Excellent,
            60..=79 => Self::Good,
            _ => Self::KeepPracticing,
        }
    }

    #[must_use]
    pub const fn headline(self) -> &'static str {
        match self {
            Self::Perfect => "Perfect Score!",
            Self::Excellent => "Excellent Job!",
            Self::Good => "Good Effort!",
            Self::KeepPracticing => "Keep practicing!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreSummary {
    pub correct: usize,
    pub total: usize,
    /// Rounded to the nearest whole percent.
    pub percentage: u32,
    pub tier: ScoreTier,
}

impl ScoreSummary {
    #[must_use]
    pub fn new(correct: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            0
        } else {
            (correct as f64 / total as f64 * 100.0).round() as u32
        };
        Self {
            correct,
            total,
            percentage,
            tier: ScoreTier::from_percentage(percentage),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionOutcome {
    Correct,
    Incorrect { chosen: OptionIndex },
    Unanswered,
}

impl QuestionOutcome {
    #[must_use]
    pub fn of(question: &Question, answer: Option<OptionIndex>) -> Self {
        match answer {
            Some(choice) if question.is_correct(choice) => Self::Correct,
            Some(chosen) => Self::Incorrect { chosen },
            None => Self::Unanswered,
        }
    }

    #[must_use]
    pub const fn is_correct(self) -> bool {
        matches!(self, Self::Correct)
    }
}
