//! Core engine for MockMaster: quiz session state machine and orchestration.
//!
//! This crate contains the [`App`] controller without TUI dependencies. The
//! front end calls event methods, calls [`App::tick`] once per frame and reads
//! state back for rendering.

use std::sync::Arc;

use tokio::sync::watch;

pub use mockmaster_providers::{
    self, ApiConfig, GenerateFut, GenerationError, ProviderGateway, QuizGateway, QuizRequest,
};
pub use mockmaster_types::{
    Difficulty, OptionIndex, Provider, Question, QuestionCount, QuestionId, Quiz,
    QuizValidationError, Topic, UiOptions,
};

mod config;
mod session;
mod state;
mod timer;
pub mod ui;

#[cfg(test)]
mod test_support;

pub use config::{
    ApiKeys, AppConfig, ConfigError, MockMasterConfig, ProviderEndpointConfig, QuizConfig,
    Settings, config_path, expand_env_vars,
};
pub use session::{
    EventOutcome, IgnoreReason, QuestionOutcome, QuizSession, QuizState, ScoreSummary, ScoreTier,
    score,
};
pub use state::{Notice, View};
pub use timer::{
    Countdown, QuizTimer, SECONDS_PER_QUESTION, SessionId, TickOutcome, TimerState, TimerTick,
    URGENT_THRESHOLD_SECS, time_budget,
};

use state::{GenerationState, GenerationTask};
use ui::{BreakdownState, SetupForm};

#[derive(Debug, thiserror::Error)]
pub enum StartQuizError {
    #[error(transparent)]
    Validation(#[from] QuizValidationError),
    #[error("a quiz is already being generated")]
    Busy,
    #[error("no API key configured for {provider}")]
    NotConfigured { provider: Provider },
    #[error("a quiz can only be started from the setup screen")]
    NotInSetup,
}

/// Owner of the quiz, its progress, the timer and the current view.
pub struct App {
    settings: Settings,
    gateway: Option<Arc<dyn QuizGateway>>,
    view: View,
    view_tx: watch::Sender<View>,
    session: Option<QuizSession>,
    last_session: SessionId,
    timer: QuizTimer,
    generation: GenerationState,
    notice: Option<Notice>,
    setup: SetupForm,
    breakdown: BreakdownState,
    option_cursor: usize,
    revision: u64,
    tick: usize,
    should_quit: bool,
}

impl App {
    /// Load config, resolve settings and build the provider gateway.
    ///
    /// A broken config file or a missing API key does not fail startup; both
    /// surface as a [`Notice`] on the setup screen.
    #[must_use]
    pub fn new(system_instruction: &str) -> Self {
        let (config, config_notice) = match MockMasterConfig::load() {
            Ok(config) => (config, None),
            Err(e) => (None, Some(Notice::Config(e.to_string()))),
        };
        let settings = Settings::resolve(config.as_ref());

        let gateway = settings.api_config().map(|api| {
            Arc::new(ProviderGateway::new(api, system_instruction)) as Arc<dyn QuizGateway>
        });
        tracing::info!(
            provider = %settings.provider,
            model = %settings.model,
            configured = gateway.is_some(),
            "MockMaster starting"
        );

        let mut app = Self::with_gateway(gateway, settings);
        if config_notice.is_some() {
            app.notice = config_notice;
        }
        app
    }

    /// Build with an explicit gateway. `None` means no provider is configured.
    #[must_use]
    pub fn with_gateway(gateway: Option<Arc<dyn QuizGateway>>, settings: Settings) -> Self {
        let notice = gateway.is_none().then_some(Notice::MissingApiKey {
            provider: settings.provider,
        });
        let setup = SetupForm::new(settings.default_difficulty, settings.default_questions);
        let (view_tx, _) = watch::channel(View::Setup);

        Self {
            settings,
            gateway,
            view: View::Setup,
            view_tx,
            session: None,
            last_session: SessionId::new(0),
            timer: QuizTimer::new(),
            generation: GenerationState::Idle,
            notice,
            setup,
            breakdown: BreakdownState::default(),
            option_cursor: 0,
            revision: 0,
            tick: 0,
            should_quit: false,
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    #[must_use]
    pub const fn view(&self) -> View {
        self.view
    }

    /// Receiver that observes every view transition.
    #[must_use]
    pub fn subscribe_view(&self) -> watch::Receiver<View> {
        self.view_tx.subscribe()
    }

    /// Incremented on every state mutation.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn session(&self) -> Option<&QuizSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub const fn timer(&self) -> &QuizTimer {
        &self.timer
    }

    #[must_use]
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Whether a provider gateway is available to generate quizzes.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.gateway.is_some()
    }

    #[must_use]
    pub fn is_generating(&self) -> bool {
        matches!(self.generation, GenerationState::InFlight(_))
    }

    /// The request currently being generated, if any.
    #[must_use]
    pub fn pending_request(&self) -> Option<&QuizRequest> {
        match &self.generation {
            GenerationState::InFlight(task) => Some(&task.request),
            GenerationState::Idle => None,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub const fn ui_options(&self) -> UiOptions {
        self.settings.ui
    }

    #[must_use]
    pub fn setup(&self) -> &SetupForm {
        &self.setup
    }

    pub fn setup_mut(&mut self) -> &mut SetupForm {
        self.bump();
        &mut self.setup
    }

    #[must_use]
    pub fn breakdown(&self) -> &BreakdownState {
        &self.breakdown
    }

    pub fn breakdown_mut(&mut self) -> &mut BreakdownState {
        self.bump();
        &mut self.breakdown
    }

    /// Highlighted option on the active question.
    #[must_use]
    pub const fn option_cursor(&self) -> usize {
        self.option_cursor
    }

    #[must_use]
    pub const fn tick_count(&self) -> usize {
        self.tick
    }

    #[must_use]
    pub const fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn request_quit(&mut self) {
        self.should_quit = true;
    }

    pub fn dismiss_notice(&mut self) {
        if self.notice.take().is_some() {
            self.bump();
        }
    }

    // ------------------------------------------------------------------------
    // Generation
    // ------------------------------------------------------------------------

    /// Validate the settings and spawn quiz generation.
    ///
    /// The result is picked up by [`App::tick`]. Must be called from within a
    /// Tokio runtime.
    pub fn start_quiz(
        &mut self,
        topic: &str,
        difficulty: Difficulty,
        num_questions: usize,
    ) -> Result<(), StartQuizError> {
        if self.view != View::Setup {
            return Err(StartQuizError::NotInSetup);
        }
        if self.is_generating() {
            tracing::debug!("Rejecting start_quiz while generation is in flight");
            return Err(StartQuizError::Busy);
        }

        let request = QuizRequest {
            topic: Topic::new(topic)?,
            difficulty,
            count: QuestionCount::new(num_questions)?,
        };

        let Some(gateway) = self.gateway.as_ref() else {
            return Err(StartQuizError::NotConfigured {
                provider: self.settings.provider,
            });
        };

        tracing::info!(
            topic = %request.topic,
            %difficulty,
            count = num_questions,
            "Starting quiz generation"
        );
        let handle = tokio::spawn(gateway.generate(request.clone()));
        self.generation = GenerationState::InFlight(GenerationTask { request, handle });
        self.notice = None;
        self.bump();
        Ok(())
    }

    /// Start a quiz from the setup form. Failures other than `Busy` become a notice.
    pub fn submit_setup(&mut self) -> Result<(), StartQuizError> {
        let topic = self.setup.topic().text().to_string();
        let difficulty = self.setup.difficulty();
        let count = self.setup.count().get();

        let result = self.start_quiz(&topic, difficulty, count);
        match &result {
            Err(StartQuizError::Validation(e)) => {
                self.notice = Some(Notice::InvalidSettings(e.clone()));
                self.bump();
            }
            Err(StartQuizError::NotConfigured { provider }) => {
                self.notice = Some(Notice::MissingApiKey {
                    provider: *provider,
                });
                self.bump();
            }
            Ok(()) | Err(StartQuizError::Busy | StartQuizError::NotInSetup) => {}
        }
        result
    }

    /// Abort an in-flight generation. Returns whether anything was cancelled.
    pub fn cancel_generation(&mut self) -> bool {
        match std::mem::take(&mut self.generation) {
            GenerationState::InFlight(task) => {
                task.handle.abort();
                tracing::info!(topic = %task.request.topic, "Quiz generation cancelled");
                self.bump();
                true
            }
            GenerationState::Idle => false,
        }
    }

    fn poll_generation(&mut self) {
        use futures_util::future::FutureExt;

        let finished = match &self.generation {
            GenerationState::InFlight(task) => task.handle.is_finished(),
            GenerationState::Idle => return,
        };
        if !finished {
            return;
        }

        let GenerationState::InFlight(GenerationTask {
            request,
            mut handle,
        }) = std::mem::take(&mut self.generation)
        else {
            return;
        };

        match (&mut handle).now_or_never() {
            Some(Ok(Ok(quiz))) if quiz.len() == request.count.get() => self.begin_session(quiz),
            Some(Ok(Ok(quiz))) => {
                self.generation_failed(&format!(
                    "expected {} questions, got {}",
                    request.count,
                    quiz.len()
                ));
            }
            Some(Ok(Err(e))) => self.generation_failed(&e.to_string()),
            Some(Err(e)) => self.generation_failed(&format!("task failed: {e}")),
            None => {
                // is_finished() was true but the join handle isn't ready yet.
                self.generation = GenerationState::InFlight(GenerationTask { request, handle });
            }
        }
    }

    fn generation_failed(&mut self, detail: &str) {
        tracing::warn!(detail, "Quiz generation failed");
        self.notice = Some(Notice::GenerationFailed);
        self.bump();
    }

    fn begin_session(&mut self, quiz: Quiz) {
        let id = self.next_session_id();
        let budget = time_budget(quiz.len());
        tracing::info!(
            session = %id,
            topic = %quiz.topic(),
            questions = quiz.len(),
            budget,
            "Quiz started"
        );
        self.session = Some(QuizSession::new(id, quiz));
        self.timer.start(id, budget);
        self.option_cursor = 0;
        self.breakdown.reset();
        self.set_view(View::Active);
    }

    fn next_session_id(&mut self) -> SessionId {
        self.last_session = self.last_session.next();
        self.last_session
    }

    // ------------------------------------------------------------------------
    // Quiz events
    // ------------------------------------------------------------------------

    /// Store (or overwrite) the answer to question `id`.
    pub fn record_answer(&mut self, id: QuestionId, option: usize) -> EventOutcome {
        let outcome = match self.session.as_mut() {
            Some(session) => session.record_answer(id, option),
            None => EventOutcome::Ignored(IgnoreReason::NoQuiz),
        };
        self.after_event("record_answer", outcome);
        if outcome.is_applied() {
            self.option_cursor = option;
        }
        outcome
    }

    /// Answer the question currently on screen.
    pub fn answer_current(&mut self, option: OptionIndex) -> EventOutcome {
        let Some(id) = self
            .session
            .as_ref()
            .and_then(QuizSession::current_question)
            .map(Question::id)
        else {
            self.after_event("answer_current", EventOutcome::Ignored(IgnoreReason::NoQuiz));
            return EventOutcome::Ignored(IgnoreReason::NoQuiz);
        };
        self.record_answer(id, option.get())
    }

    /// Answer with the option under the cursor.
    pub fn answer_at_cursor(&mut self) -> EventOutcome {
        match OptionIndex::new(self.option_cursor) {
            Ok(option) => self.answer_current(option),
            Err(_) => EventOutcome::Ignored(IgnoreReason::OptionOutOfRange),
        }
    }

    pub fn move_option_cursor(&mut self, delta: isize) {
        let max = OptionIndex::ALL.len() - 1;
        let next = self.option_cursor.saturating_add_signed(delta).min(max);
        if next != self.option_cursor {
            self.option_cursor = next;
            self.bump();
        }
    }

    pub fn advance(&mut self) -> EventOutcome {
        let outcome = match self.session.as_mut() {
            Some(session) => session.advance(),
            None => EventOutcome::Ignored(IgnoreReason::NoQuiz),
        };
        self.after_event("advance", outcome);
        if outcome.is_applied() {
            self.sync_option_cursor();
        }
        outcome
    }

    pub fn go_back(&mut self) -> EventOutcome {
        let outcome = match self.session.as_mut() {
            Some(session) => session.go_back(),
            None => EventOutcome::Ignored(IgnoreReason::NoQuiz),
        };
        self.after_event("go_back", outcome);
        if outcome.is_applied() {
            self.sync_option_cursor();
        }
        outcome
    }

    /// Score the quiz, stop the clock and show results. Idempotent.
    pub fn finish(&mut self) -> EventOutcome {
        let outcome = match self.session.as_mut() {
            Some(session) => session.finish(),
            None => EventOutcome::Ignored(IgnoreReason::NoQuiz),
        };
        self.after_event("finish", outcome);
        if outcome.is_applied() {
            self.timer.stop();
            if let Some(summary) = self.session.as_ref().and_then(QuizSession::summary) {
                tracing::info!(
                    correct = summary.correct,
                    total = summary.total,
                    percentage = summary.percentage,
                    "Quiz finished"
                );
            }
            self.breakdown.reset();
            self.set_view(View::Result);
        }
        outcome
    }

    /// Take the same quiz again with fresh progress and a full clock.
    /// Only valid from the results view.
    pub fn retry(&mut self) -> EventOutcome {
        let reason = match self.view {
            View::Result => None,
            View::Active => Some(IgnoreReason::NotFinished),
            View::Setup => Some(IgnoreReason::NoQuiz),
        };
        if let Some(reason) = reason {
            self.after_event("retry", EventOutcome::Ignored(reason));
            return EventOutcome::Ignored(reason);
        }
        let id = self.next_session_id();
        let Some(session) = self.session.as_mut() else {
            self.after_event("retry", EventOutcome::Ignored(IgnoreReason::NoQuiz));
            return EventOutcome::Ignored(IgnoreReason::NoQuiz);
        };
        session.restart(id);
        let budget = time_budget(session.quiz().len());
        tracing::info!(session = %id, budget, "Quiz restarted");

        self.timer.start(id, budget);
        self.option_cursor = 0;
        self.breakdown.reset();
        self.set_view(View::Active);
        EventOutcome::Applied
    }

    /// Drop the quiz and return to setup. Valid from any view.
    pub fn reset(&mut self) {
        self.cancel_generation();
        self.timer.stop();
        if self.session.take().is_some() {
            tracing::info!("Quiz discarded");
        }
        self.option_cursor = 0;
        self.breakdown.reset();
        self.setup.clear_topic();
        if matches!(self.notice, Some(Notice::GenerationFailed)) {
            self.notice = None;
        }
        self.set_view(View::Setup);
    }

    // ------------------------------------------------------------------------
    // Frame tick
    // ------------------------------------------------------------------------

    /// Poll background work: the generation task and pending timer ticks.
    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        self.poll_generation();

        let remaining = self.timer.countdown().remaining();
        if self.timer.poll() {
            tracing::info!("Time expired");
            self.finish();
        } else if self.timer.countdown().remaining() != remaining {
            self.bump();
        }
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn set_view(&mut self, view: View) {
        if self.view != view {
            tracing::info!(from = ?self.view, to = ?view, "View transition");
        }
        self.view = view;
        self.view_tx.send_replace(view);
        self.bump();
    }

    fn sync_option_cursor(&mut self) {
        self.option_cursor = self
            .session
            .as_ref()
            .and_then(|session| {
                let question = session.current_question()?;
                session.state().answer_for(question.id())
            })
            .map_or(0, OptionIndex::get);
    }

    fn after_event(&mut self, event: &'static str, outcome: EventOutcome) {
        match outcome {
            EventOutcome::Applied => self.bump(),
            EventOutcome::Ignored(reason) => {
                tracing::debug!(event, ?reason, "Event ignored");
            }
        }
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
