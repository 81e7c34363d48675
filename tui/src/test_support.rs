use std::sync::Arc;

use mockmaster_engine::{
    App, Difficulty, GenerateFut, Question, QuestionId, Quiz, QuizGateway, QuizRequest, Settings,
    View,
};

/// Gateway that answers every request with a quiz of the requested size.
/// Question `n` has its correct answer at option `(n - 1) % 4`.
pub(crate) struct EchoGateway;

impl QuizGateway for EchoGateway {
    fn generate(&self, request: QuizRequest) -> GenerateFut {
        Box::pin(async move {
            let questions = (1..=request.count.get() as u32)
                .map(|id| {
                    Question::new(
                        QuestionId::new(id),
                        format!("What is fact number {id}?"),
                        vec![
                            format!("Alpha {id}"),
                            format!("Beta {id}"),
                            format!("Gamma {id}"),
                            format!("Delta {id}"),
                        ],
                        i64::from((id - 1) % 4),
                        format!("Fact {id} is explained here."),
                    )
                    .unwrap()
                })
                .collect();
            Ok(Quiz::new(request.topic, request.difficulty, questions).unwrap())
        })
    }
}

pub(crate) fn setup_app() -> App {
    App::with_gateway(Some(Arc::new(EchoGateway)), Settings::default())
}

/// App sitting on the first question of an `n` question quiz.
pub(crate) async fn active_app(n: usize) -> App {
    let mut app = setup_app();
    app.start_quiz("Photosynthesis", Difficulty::Medium, n)
        .unwrap();
    while app.is_generating() {
        tokio::task::yield_now().await;
        app.tick();
    }
    assert_eq!(app.view(), View::Active);
    app
}
