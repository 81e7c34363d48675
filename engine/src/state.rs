//! View routing and generation task state.

use mockmaster_providers::{GenerationError, QuizRequest};
use mockmaster_types::{Provider, Quiz, QuizValidationError};
use tokio::task::JoinHandle;

/// Which screen is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Setup,
    Active,
    Result,
}

impl View {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            View::Setup => "Setup",
            View::Active => "Quiz",
            View::Result => "Results",
        }
    }
}

#[derive(Debug)]
pub(crate) struct GenerationTask {
    pub(crate) request: QuizRequest,
    pub(crate) handle: JoinHandle<Result<Quiz, GenerationError>>,
}

/// Single-flight guard around quiz generation.
#[derive(Debug, Default)]
pub(crate) enum GenerationState {
    #[default]
    Idle,
    InFlight(GenerationTask),
}

/// Message shown under the setup form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    GenerationFailed,
    MissingApiKey { provider: Provider },
    InvalidSettings(QuizValidationError),
    Config(String),
}

impl Notice {
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Notice::GenerationFailed => {
                "Failed to generate quiz. Check your API key or try a different topic.".to_string()
            }
            Notice::MissingApiKey { provider } => {
                let vars = provider.env_vars().join(" or ");
                format!("No API key for {provider}. Set {vars} or add it to ~/.mockmaster/config.toml.")
            }
            Notice::InvalidSettings(e) => format!("Invalid quiz settings: {e}"),
            Notice::Config(detail) => format!("Config error: {detail}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Notice, View};
    use mockmaster_types::Provider;

    #[test]
    fn default_view_is_setup() {
        assert_eq!(View::default(), View::Setup);
    }

    #[test]
    fn generation_failure_message_is_generic() {
        assert_eq!(
            Notice::GenerationFailed.message(),
            "Failed to generate quiz. Check your API key or try a different topic."
        );
    }

    #[test]
    fn missing_key_notice_names_env_vars() {
        let message = Notice::MissingApiKey {
            provider: Provider::Gemini,
        }
        .message();
        assert!(message.contains("GEMINI_API_KEY or GOOGLE_API_KEY"));
    }
}
