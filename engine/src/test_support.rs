use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mockmaster_providers::{GenerateFut, GenerationError, QuizGateway, QuizRequest};
use mockmaster_types::{Difficulty, Question, QuestionId, Quiz, Topic};

fn question(id: u32, correct: u8) -> Question {
    Question::new(
        QuestionId::new(id),
        format!("Question {id}?"),
        vec![
            "First".to_string(),
            "Second".to_string(),
            "Third".to_string(),
            "Fourth".to_string(),
        ],
        i64::from(correct),
        format!("Because option {correct} is right."),
    )
    .unwrap()
}

/// Quiz with ids `1..=n` whose correct options are `correct`, in order.
pub(crate) fn quiz_with_answers(correct: &[u8]) -> Quiz {
    quiz_for(&Topic::new("Test topic").unwrap(), Difficulty::Medium, correct)
}

fn quiz_for(topic: &Topic, difficulty: Difficulty, correct: &[u8]) -> Quiz {
    let questions = correct
        .iter()
        .zip(1u32..)
        .map(|(answer, id)| question(id, *answer))
        .collect();
    Quiz::new(topic.clone(), difficulty, questions).unwrap()
}

/// Correct option of question number `id` in quizzes built by [`FakeGateway`].
pub(crate) fn generated_answer(id: u32) -> usize {
    (id as usize - 1) % 4
}

#[derive(Debug, Clone)]
pub(crate) enum FakeResponse {
    /// Build a quiz matching the request.
    Generate,
    /// Return this quiz regardless of the request.
    Fixed(Quiz),
    Fail,
    /// Never complete.
    Pending,
}

#[derive(Clone)]
pub(crate) struct FakeGateway {
    calls: Arc<AtomicUsize>,
    response: Arc<Mutex<FakeResponse>>,
}

impl FakeGateway {
    pub(crate) fn new(response: FakeResponse) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            response: Arc::new(Mutex::new(response)),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn respond_with(&self, response: FakeResponse) {
        *self.response.lock().unwrap() = response;
    }
}

impl QuizGateway for FakeGateway {
    fn generate(&self, request: QuizRequest) -> GenerateFut {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self.response.lock().unwrap().clone();
        Box::pin(async move {
            match response {
                FakeResponse::Generate => {
                    let correct: Vec<u8> = (1..=request.count.get())
                        .map(|id| generated_answer(id as u32) as u8)
                        .collect();
                    Ok(quiz_for(&request.topic, request.difficulty, &correct))
                }
                FakeResponse::Fixed(quiz) => Ok(quiz),
                FakeResponse::Fail => Err(GenerationError::EmptyResponse),
                FakeResponse::Pending => std::future::pending().await,
            }
        })
    }
}
