//! Quiz generation clients.
//!
//! # Architecture
//!
//! [`QuizGateway`] is the seam the session controller depends on. The production
//! implementation, [`ProviderGateway`], dispatches on the configured provider:
//!
//! - [`gemini`] - Google Gemini `generateContent` with a response schema
//! - [`openai`] - OpenAI Responses API with a strict `json_schema` text format
//!
//! Both return the model's raw JSON payload, which goes through the
//! [`schema`] validation boundary before a [`Quiz`] exists.
//!
//! # Error Handling
//!
//! Every failure is a [`GenerationError`]. The detail is meant for logs; the
//! controller shows users a single generic message.

pub mod gemini;
pub mod openai;
pub mod retry;
pub mod schema;

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use mockmaster_types::{
    ApiKey, Difficulty, ModelName, Provider, QuestionCount, Quiz, QuizValidationError, Topic,
};
use thiserror::Error;

pub use mockmaster_types;

/// Canonical Gemini API base URL.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Canonical OpenAI API base URL.
pub const OPENAI_API_BASE_URL: &str = "https://api.openai.com/v1";

const CONNECT_TIMEOUT_SECS: u64 = 30;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_MAX_IDLE_PER_HOST: usize = 8;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Shared HTTPS-only client.
pub fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::none())
            .https_only(true)
            .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
            .build()
            .unwrap_or_else(|e| {
                tracing::error!("Failed to build hardened HTTP client: {e}. Using defaults.");
                reqwest::Client::new()
            })
    })
}

pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request failed after {attempts} attempt(s): {source}")]
    Connection {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("failed to read response: {0}")]
    Body(#[source] reqwest::Error),
    #[error("response contained no quiz content")]
    EmptyResponse,
    #[error("generation blocked: {0}")]
    Blocked(String),
    #[error("response is not valid JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),
    #[error("response does not match the question schema: {0}")]
    Schema(String),
    #[error(transparent)]
    Invalid(#[from] QuizValidationError),
}

/// What to generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizRequest {
    pub topic: Topic,
    pub difficulty: Difficulty,
    pub count: QuestionCount,
}

impl QuizRequest {
    /// User prompt sent to the model.
    #[must_use]
    pub fn prompt(&self) -> String {
        format!(
            "Create a multiple-choice mock test about \"{topic}\".\n\
             Difficulty Level: {difficulty}.\n\
             Number of Questions: {count}.\n\n\
             Ensure the questions are challenging and relevant to the difficulty level.\n\
             Provide exactly 4 options for each question.\n\
             Number the questions with ids starting at 1.\n\
             The output must be a valid JSON array.",
            topic = self.topic,
            difficulty = self.difficulty,
            count = self.count,
        )
    }
}

/// Boxed future returned by [`QuizGateway::generate`].
pub type GenerateFut = Pin<Box<dyn Future<Output = Result<Quiz, GenerationError>> + Send>>;

/// Produces quizzes. The returned future owns everything it needs so it can be spawned.
pub trait QuizGateway: Send + Sync {
    fn generate(&self, request: QuizRequest) -> GenerateFut;
}

/// Provider + model configuration.
///
/// The constructor enforces that the API key and model belong to the same provider.
///
/// ```rust
/// use mockmaster_providers::ApiConfig;
/// use mockmaster_types::{ApiKey, Provider};
///
/// let config = ApiConfig::new(ApiKey::new(Provider::Gemini, "test"), Provider::Gemini.default_model())
///     .unwrap();
/// assert_eq!(config.provider(), Provider::Gemini);
/// ```
#[derive(Debug, Clone)]
pub struct ApiConfig {
    api_key: ApiKey,
    model: ModelName,
    base_url: Option<String>,
    timeout: Duration,
    retry: retry::RetryConfig,
}

#[derive(Debug, Error)]
pub enum ApiConfigError {
    #[error("API key provider {key:?} does not match model provider {model:?}")]
    ProviderMismatch { key: Provider, model: Provider },
}

impl ApiConfig {
    pub fn new(api_key: ApiKey, model: ModelName) -> Result<Self, ApiConfigError> {
        let key_provider = api_key.provider();
        let model_provider = model.provider();
        if key_provider != model_provider {
            return Err(ApiConfigError::ProviderMismatch {
                key: key_provider,
                model: model_provider,
            });
        }

        Ok(Self {
            api_key,
            model,
            base_url: None,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retry: retry::RetryConfig::default(),
        })
    }

    /// Override the provider's API base URL (proxies, test servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: retry::RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        self.api_key.provider()
    }

    #[must_use]
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    #[must_use]
    pub fn model(&self) -> &ModelName {
        &self.model
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        match (&self.base_url, self.provider()) {
            (Some(url), _) => url,
            (None, Provider::Gemini) => GEMINI_API_BASE_URL,
            (None, Provider::OpenAI) => OPENAI_API_BASE_URL,
        }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub const fn retry(&self) -> &retry::RetryConfig {
        &self.retry
    }
}

/// Send with retries and turn every non-2xx outcome into a [`GenerationError`].
pub(crate) async fn send_request<F>(
    build_request: F,
    config: &ApiConfig,
) -> Result<reqwest::Response, GenerationError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = match retry::send_with_retry(build_request, config.retry()).await {
        retry::RetryOutcome::Success(resp) => return Ok(resp),
        retry::RetryOutcome::HttpError(resp) => resp,
        retry::RetryOutcome::ConnectionError { attempts, source } => {
            return Err(GenerationError::Connection { attempts, source });
        }
        retry::RetryOutcome::NonRetryable(source) => {
            return Err(GenerationError::Connection {
                attempts: 1,
                source,
            });
        }
    };

    let status = response.status().as_u16();
    let body = read_capped_error_body(response).await;
    Err(GenerationError::Api { status, body })
}

/// [`QuizGateway`] backed by a real provider API.
#[derive(Clone)]
pub struct ProviderGateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    config: ApiConfig,
    client: reqwest::Client,
    system_instruction: String,
}

impl ProviderGateway {
    #[must_use]
    pub fn new(config: ApiConfig, system_instruction: impl Into<String>) -> Self {
        Self::with_client(config, system_instruction, http_client().clone())
    }

    /// Like [`ProviderGateway::new`] with a caller-supplied HTTP client.
    #[must_use]
    pub fn with_client(
        config: ApiConfig,
        system_instruction: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                config,
                client,
                system_instruction: system_instruction.into(),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }
}

impl GatewayInner {
    async fn generate(&self, request: &QuizRequest) -> Result<Quiz, GenerationError> {
        let payload = match self.config.provider() {
            Provider::Gemini => {
                gemini::generate(&self.client, &self.config, &self.system_instruction, request)
                    .await?
            }
            Provider::OpenAI => {
                openai::generate(&self.client, &self.config, &self.system_instruction, request)
                    .await?
            }
        };
        schema::build_quiz(&payload, request)
    }
}

impl QuizGateway for ProviderGateway {
    fn generate(&self, request: QuizRequest) -> GenerateFut {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            let provider = inner.config.provider();
            tracing::info!(
                %provider,
                model = %inner.config.model(),
                topic = %request.topic,
                difficulty = %request.difficulty,
                count = request.count.get(),
                "Requesting quiz generation"
            );
            let result = inner.generate(&request).await;
            match &result {
                Ok(quiz) => tracing::info!(questions = quiz.len(), "Quiz generated"),
                Err(e) => tracing::warn!(%provider, error = %e, "Quiz generation failed"),
            }
            result
        })
    }
}


#[cfg(test)]
mod integration_tests {
    use super::{ApiConfig, GenerationError, ProviderGateway, QuizGateway, QuizRequest, retry};
    use mockmaster_types::{ApiKey, Difficulty, Provider, QuestionCount, Topic};
    use serde_json::{Value, json};
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry_config() -> retry::RetryConfig {
        retry::RetryConfig {
            max_retries: 1,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            jitter_factor: 0.0,
        }
    }

    fn gateway(server: &MockServer, provider: Provider) -> ProviderGateway {
        let config = ApiConfig::new(ApiKey::new(provider, "test-key"), provider.default_model())
            .unwrap()
            .with_base_url(server.uri())
            .with_retry(fast_retry_config());
        ProviderGateway::with_client(config, "You are an examiner.", reqwest::Client::new())
    }

    fn request(count: usize) -> QuizRequest {
        QuizRequest {
            topic: Topic::new("Photosynthesis").unwrap(),
            difficulty: Difficulty::Medium,
            count: QuestionCount::new(count).unwrap(),
        }
    }

    fn questions(count: u32) -> Value {
        (1..=count)
            .map(|id| {
                json!({
                    "id": id,
                    "text": format!("Question {id}?"),
                    "options": ["Light", "Water", "Carbon dioxide", "Soil"],
                    "correctAnswerIndex": id % 4,
                    "explanation": "Plants need it."
                })
            })
            .collect()
    }

    fn gemini_body(text: &str) -> Value {
        json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }]
        })
    }

    #[tokio::test]
    async fn gemini_generates_quiz() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-3-flash-preview:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "generationConfig": {"responseMimeType": "application/json"}
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(gemini_body(&questions(5).to_string())),
            )
            .expect(1)
            .mount(&server)
            .await;

        let quiz = gateway(&server, Provider::Gemini)
            .generate(request(5))
            .await
            .unwrap();

        assert_eq!(quiz.len(), 5);
        assert_eq!(quiz.difficulty(), Difficulty::Medium);
        assert_eq!(quiz.questions()[0].options()[1], "Water");
    }

    #[tokio::test]
    async fn openai_generates_quiz() {
        let server = MockServer::start().await;
        let payload = json!({ "questions": questions(3) }).to_string();
        Mock::given(method("POST"))
            .and(path("/responses"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "completed",
                "output": [{
                    "type": "message",
                    "role": "assistant",
                    "content": [{"type": "output_text", "text": payload}]
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let quiz = gateway(&server, Provider::OpenAI)
            .generate(request(3))
            .await
            .unwrap();

        assert_eq!(quiz.len(), 3);
    }

    #[tokio::test]
    async fn short_question_list_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(gemini_body(&questions(2).to_string())),
            )
            .mount(&server)
            .await;

        let err = gateway(&server, Provider::Gemini)
            .generate(request(5))
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Schema(_)), "{err:?}");
    }

    #[tokio::test]
    async fn non_json_text_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(gemini_body("Sure! Here is your quiz")),
            )
            .mount(&server)
            .await;

        let err = gateway(&server, Provider::Gemini)
            .generate(request(5))
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::MalformedJson(_)), "{err:?}");
    }

    #[tokio::test]
    async fn auth_failure_reports_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .expect(1)
            .mount(&server)
            .await;

        let err = gateway(&server, Provider::Gemini)
            .generate(request(5))
            .await
            .unwrap_err();

        match err {
            GenerationError::Api { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid key");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
