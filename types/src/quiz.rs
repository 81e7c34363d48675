//! Quiz data model.
//!
//! A [`Quiz`] is immutable once built: the constructors here are the only way
//! in, and they reject anything that would let a session reach an invalid
//! state later (duplicate ids, out-of-range answers, missing options).

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::NonEmptyString;

/// Every question carries exactly this many options.
pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizValidationError {
    #[error("topic must not be empty")]
    EmptyTopic,
    #[error("question count must be positive (got {0})")]
    InvalidQuestionCount(usize),
    #[error("unknown difficulty '{0}'")]
    UnknownDifficulty(String),
    #[error("option index {0} is out of range")]
    OptionIndexOutOfRange(usize),
    #[error("question {id} has empty text")]
    EmptyQuestionText { id: QuestionId },
    #[error("question {id} has {found} options; expected 4")]
    WrongOptionCount { id: QuestionId, found: usize },
    #[error("question {id} has an empty option")]
    EmptyOption { id: QuestionId },
    #[error("question {id} repeats an option")]
    DuplicateOption { id: QuestionId },
    #[error("question {id} marks option {index} as correct")]
    CorrectIndexOutOfRange { id: QuestionId, index: i64 },
    #[error("question {id} has an empty explanation")]
    EmptyExplanation { id: QuestionId },
    #[error("quiz has no questions")]
    NoQuestions,
    #[error("question id {0} appears more than once")]
    DuplicateQuestionId(QuestionId),
}

// ============================================================================
// Difficulty
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub const ALL: [Self; 4] = [Self::Easy, Self::Medium, Self::Hard, Self::Expert];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
            Self::Expert => "Expert",
        }
    }

    /// Case-insensitive parse of a difficulty label.
    pub fn parse(raw: &str) -> Result<Self, QuizValidationError> {
        let trimmed = raw.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| QuizValidationError::UnknownDifficulty(trimmed.to_string()))
    }

    /// Next level, wrapping from Expert back to Easy.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Easy => Self::Medium,
            Self::Medium => Self::Hard,
            Self::Hard => Self::Expert,
            Self::Expert => Self::Easy,
        }
    }

    #[must_use]
    pub const fn prev(self) -> Self {
        match self {
            Self::Easy => Self::Expert,
            Self::Medium => Self::Easy,
            Self::Hard => Self::Medium,
            Self::Expert => Self::Hard,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Difficulty {
    type Error = QuizValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Difficulty> for String {
    fn from(value: Difficulty) -> Self {
        value.as_str().to_string()
    }
}

// ============================================================================
// Small validated newtypes
// ============================================================================

/// Identifier of a question, unique within its quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(u32);

impl QuestionId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Position of an option within a question, always in `0..4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionIndex(u8);

impl OptionIndex {
    pub const ALL: [Self; OPTIONS_PER_QUESTION] = [Self(0), Self(1), Self(2), Self(3)];

    pub fn new(index: usize) -> Result<Self, QuizValidationError> {
        if index < OPTIONS_PER_QUESTION {
            Ok(Self(index as u8))
        } else {
            Err(QuizValidationError::OptionIndexOutOfRange(index))
        }
    }

    #[must_use]
    pub const fn get(self) -> usize {
        self.0 as usize
    }

    /// Display letter, `A` through `D`.
    #[must_use]
    pub const fn letter(self) -> char {
        (b'A' + self.0) as char
    }

    /// Inverse of [`OptionIndex::letter`], case-insensitive.
    #[must_use]
    pub fn from_letter(letter: char) -> Option<Self> {
        let upper = letter.to_ascii_uppercase();
        if upper.is_ascii_uppercase() {
            Self::new((upper as u8 - b'A') as usize).ok()
        } else {
            None
        }
    }
}

/// Requested number of questions. Any positive count is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct QuestionCount(usize);

impl QuestionCount {
    /// Choices offered by the setup form.
    pub const PRESETS: [usize; 4] = [5, 10, 15, 20];

    pub fn new(count: usize) -> Result<Self, QuizValidationError> {
        if count == 0 {
            Err(QuizValidationError::InvalidQuestionCount(count))
        } else {
            Ok(Self(count))
        }
    }

    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl Default for QuestionCount {
    fn default() -> Self {
        Self(Self::PRESETS[0])
    }
}

impl TryFrom<usize> for QuestionCount {
    type Error = QuizValidationError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<QuestionCount> for usize {
    fn from(value: QuestionCount) -> Self {
        value.0
    }
}

impl fmt::Display for QuestionCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Quiz subject as typed by the user, stored trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(NonEmptyString);

impl Topic {
    pub fn new(raw: &str) -> Result<Self, QuizValidationError> {
        NonEmptyString::trimmed(raw)
            .map(Self)
            .map_err(|_| QuizValidationError::EmptyTopic)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Question / Quiz
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: NonEmptyString,
    options: [String; OPTIONS_PER_QUESTION],
    correct_answer: OptionIndex,
    explanation: NonEmptyString,
}

impl Question {
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        options: Vec<String>,
        correct_answer_index: i64,
        explanation: impl Into<String>,
    ) -> Result<Self, QuizValidationError> {
        let text = NonEmptyString::new(text.into())
            .map_err(|_| QuizValidationError::EmptyQuestionText { id })?;
        let explanation = NonEmptyString::new(explanation.into())
            .map_err(|_| QuizValidationError::EmptyExplanation { id })?;

        let found = options.len();
        let options: [String; OPTIONS_PER_QUESTION] = options
            .try_into()
            .map_err(|_| QuizValidationError::WrongOptionCount { id, found })?;

        if options.iter().any(|option| option.trim().is_empty()) {
            return Err(QuizValidationError::EmptyOption { id });
        }
        let mut seen = HashSet::with_capacity(OPTIONS_PER_QUESTION);
        if !options.iter().all(|option| seen.insert(option.trim())) {
            return Err(QuizValidationError::DuplicateOption { id });
        }

        let correct_answer = usize::try_from(correct_answer_index)
            .ok()
            .and_then(|index| OptionIndex::new(index).ok())
            .ok_or(QuizValidationError::CorrectIndexOutOfRange {
                id,
                index: correct_answer_index,
            })?;

        Ok(Self {
            id,
            text,
            options,
            correct_answer,
            explanation,
        })
    }

    #[must_use]
    pub const fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    #[must_use]
    pub const fn options(&self) -> &[String; OPTIONS_PER_QUESTION] {
        &self.options
    }

    #[must_use]
    pub fn option(&self, index: OptionIndex) -> &str {
        &self.options[index.get()]
    }

    #[must_use]
    pub const fn correct_answer(&self) -> OptionIndex {
        self.correct_answer
    }

    #[must_use]
    pub fn is_correct(&self, choice: OptionIndex) -> bool {
        choice == self.correct_answer
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        self.explanation.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    topic: Topic,
    difficulty: Difficulty,
    questions: Vec<Question>,
    created_at: DateTime<Utc>,
}

impl Quiz {
    pub fn new(
        topic: Topic,
        difficulty: Difficulty,
        questions: Vec<Question>,
    ) -> Result<Self, QuizValidationError> {
        if questions.is_empty() {
            return Err(QuizValidationError::NoQuestions);
        }
        let mut seen = HashSet::with_capacity(questions.len());
        if let Some(dup) = questions.iter().find(|q| !seen.insert(q.id())) {
            return Err(QuizValidationError::DuplicateQuestionId(dup.id()));
        }

        Ok(Self {
            topic,
            difficulty,
            questions,
            created_at: Utc::now(),
        })
    }

    #[must_use]
    pub const fn topic(&self) -> &Topic {
        &self.topic
    }

    #[must_use]
    pub const fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Always false for a constructed quiz; provided for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn question_by_id(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Difficulty, OptionIndex, Question, QuestionCount, QuestionId, Quiz, QuizValidationError,
        Topic,
    };

    fn options() -> Vec<String> {
        ["Red", "Green", "Blue", "Yellow"]
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn question(id: u32, correct: i64) -> Question {
        Question::new(QuestionId::new(id), "Pick one", options(), correct, "Because").unwrap()
    }

    #[test]
    fn difficulty_parse_is_case_insensitive() {
        assert_eq!(Difficulty::parse("hard").unwrap(), Difficulty::Hard);
        assert_eq!(Difficulty::parse(" EXPERT ").unwrap(), Difficulty::Expert);
        assert_eq!(
            Difficulty::parse("impossible"),
            Err(QuizValidationError::UnknownDifficulty("impossible".to_string()))
        );
        assert_eq!(Difficulty::default(), Difficulty::Medium);
    }

    #[test]
    fn difficulty_cycles_through_all_levels() {
        let mut level = Difficulty::Easy;
        for expected in [
            Difficulty::Medium,
            Difficulty::Hard,
            Difficulty::Expert,
            Difficulty::Easy,
        ] {
            level = level.next();
            assert_eq!(level, expected);
            assert_eq!(level.prev().next(), level);
        }
    }

    #[test]
    fn option_index_letters() {
        let letters: String = OptionIndex::ALL.iter().map(|i| i.letter()).collect();
        assert_eq!(letters, "ABCD");
        assert_eq!(OptionIndex::from_letter('c'), Some(OptionIndex::ALL[2]));
        assert_eq!(OptionIndex::from_letter('e'), None);
        assert_eq!(OptionIndex::from_letter('1'), None);
        assert!(OptionIndex::new(4).is_err());
    }

    #[test]
    fn question_count_bounds() {
        assert!(QuestionCount::new(0).is_err());
        assert_eq!(QuestionCount::new(51).unwrap().get(), 51);
        assert_eq!(QuestionCount::new(500).unwrap().get(), 500);
        assert_eq!(QuestionCount::new(20).unwrap().get(), 20);
        assert_eq!(QuestionCount::default().get(), 5);
    }

    #[test]
    fn topic_is_trimmed_and_non_empty() {
        assert_eq!(Topic::new("  Photosynthesis ").unwrap().as_str(), "Photosynthesis");
        assert_eq!(Topic::new(" \t "), Err(QuizValidationError::EmptyTopic));
    }

    #[test]
    fn question_rejects_three_options() {
        let mut opts = options();
        opts.pop();
        let err = Question::new(QuestionId::new(1), "Q", opts, 0, "E").unwrap_err();
        assert_eq!(
            err,
            QuizValidationError::WrongOptionCount {
                id: QuestionId::new(1),
                found: 3
            }
        );
    }

    #[test]
    fn question_rejects_out_of_range_answer() {
        for bad in [-1, 4] {
            let err = Question::new(QuestionId::new(2), "Q", options(), bad, "E").unwrap_err();
            assert!(matches!(
                err,
                QuizValidationError::CorrectIndexOutOfRange { index, .. } if index == bad
            ));
        }
    }

    #[test]
    fn question_rejects_duplicate_and_blank_options() {
        let dup = vec!["A".into(), "B".into(), " A ".into(), "C".into()];
        assert!(matches!(
            Question::new(QuestionId::new(1), "Q", dup, 0, "E"),
            Err(QuizValidationError::DuplicateOption { .. })
        ));
        let blank = vec!["A".into(), "B".into(), " ".into(), "C".into()];
        assert!(matches!(
            Question::new(QuestionId::new(1), "Q", blank, 0, "E"),
            Err(QuizValidationError::EmptyOption { .. })
        ));
    }

    #[test]
    fn question_rejects_blank_text_and_explanation() {
        assert!(matches!(
            Question::new(QuestionId::new(1), "  ", options(), 0, "E"),
            Err(QuizValidationError::EmptyQuestionText { .. })
        ));
        assert!(matches!(
            Question::new(QuestionId::new(1), "Q", options(), 0, ""),
            Err(QuizValidationError::EmptyExplanation { .. })
        ));
    }

    #[test]
    fn quiz_rejects_duplicate_ids_and_empty_list() {
        let topic = Topic::new("Colors").unwrap();
        let err = Quiz::new(
            topic.clone(),
            Difficulty::Easy,
            vec![question(1, 0), question(1, 2)],
        )
        .unwrap_err();
        assert_eq!(err, QuizValidationError::DuplicateQuestionId(QuestionId::new(1)));

        assert_eq!(
            Quiz::new(topic, Difficulty::Easy, Vec::new()).unwrap_err(),
            QuizValidationError::NoQuestions
        );
    }

    #[test]
    fn quiz_lookup_by_id() {
        let quiz = Quiz::new(
            Topic::new("Colors").unwrap(),
            Difficulty::Hard,
            vec![question(7, 1), question(9, 3)],
        )
        .unwrap();
        assert_eq!(quiz.len(), 2);
        let q = quiz.question_by_id(QuestionId::new(9)).unwrap();
        assert_eq!(q.correct_answer(), OptionIndex::ALL[3]);
        assert_eq!(q.option(OptionIndex::ALL[3]), "Yellow");
        assert!(quiz.question_by_id(QuestionId::new(8)).is_none());
    }
}
