use std::path::{Path, PathBuf};
use std::time::Duration;

use mockmaster_providers::ApiConfig;
use mockmaster_types::{ApiKey, Difficulty, ModelName, Provider, QuestionCount, UiOptions};
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Environment override for `[app] provider`.
pub const PROVIDER_ENV_VAR: &str = "MOCKMASTER_PROVIDER";

#[derive(Debug, Default, Deserialize)]
pub struct MockMasterConfig {
    pub app: Option<AppConfig>,
    pub api_keys: Option<ApiKeys>,
    pub quiz: Option<QuizConfig>,
    pub google: Option<ProviderEndpointConfig>,
    pub openai: Option<ProviderEndpointConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    /// `"gemini"` or `"openai"`.
    pub provider: Option<String>,
    pub model: Option<String>,
    /// Use ASCII-only glyphs for icons and spinners.
    #[serde(default)]
    pub ascii_only: bool,
    #[serde(default)]
    pub high_contrast: bool,
    /// Disable spinner animation.
    #[serde(default)]
    pub reduced_motion: bool,
}

#[derive(Default, Deserialize)]
pub struct ApiKeys {
    pub google: Option<String>,
    pub openai: Option<String>,
}

// Manual Debug impl to prevent leaking API keys in logs.
impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn mask(opt: Option<&String>) -> &'static str {
            if opt.is_some() { "[REDACTED]" } else { "None" }
        }
        f.debug_struct("ApiKeys")
            .field("google", &mask(self.google.as_ref()))
            .field("openai", &mask(self.openai.as_ref()))
            .finish()
    }
}

impl ApiKeys {
    fn for_provider(&self, provider: Provider) -> Option<&String> {
        match provider {
            Provider::Gemini => self.google.as_ref(),
            Provider::OpenAI => self.openai.as_ref(),
        }
    }
}

/// Setup form defaults and request policy.
///
/// ```toml
/// [quiz]
/// default_difficulty = "medium"
/// default_questions = 5
/// request_timeout_secs = 120
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct QuizConfig {
    pub default_difficulty: Option<String>,
    pub default_questions: Option<usize>,
    pub request_timeout_secs: Option<u64>,
}

/// Per-provider endpoint override (`[google]` / `[openai]`).
#[derive(Debug, Default, Deserialize)]
pub struct ProviderEndpointConfig {
    pub base_url: Option<String>,
}

/// Replace `${VAR}` references with the variable's value (empty if unset).
pub fn expand_env_vars(value: &str) -> String {
    expand_with(value, |name| std::env::var(name).ok())
}

fn expand_with(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(open) = rest.find("${") {
        let after = &rest[open + 2..];
        let Some(close) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..open]);
        let name = &after[..close];
        if !name.is_empty() {
            out.push_str(&lookup(name).unwrap_or_default());
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}

impl MockMasterConfig {
    /// Load `~/.mockmaster/config.toml`. A missing file is `Ok(None)`.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".mockmaster").join("config.toml"))
}

/// Effective settings after merging the config file with the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: Provider,
    pub model: ModelName,
    pub api_key: Option<ApiKey>,
    pub base_url: Option<String>,
    pub request_timeout: Duration,
    pub default_difficulty: Difficulty,
    pub default_questions: QuestionCount,
    pub ui: UiOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self::resolve_with(None, |_| None)
    }
}

impl Settings {
    #[must_use]
    pub fn resolve(config: Option<&MockMasterConfig>) -> Self {
        Self::resolve_with(config, |name| std::env::var(name).ok())
    }

    /// Resolve against an arbitrary environment lookup.
    ///
    /// Invalid values are logged and replaced by defaults.
    pub fn resolve_with(
        config: Option<&MockMasterConfig>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let app = config.and_then(|c| c.app.as_ref());
        let quiz = config.and_then(|c| c.quiz.as_ref());

        let provider = env(PROVIDER_ENV_VAR)
            .or_else(|| app.and_then(|a| a.provider.clone()))
            .and_then(|raw| match Provider::parse(&raw) {
                Ok(provider) => Some(provider),
                Err(e) => {
                    tracing::warn!(provider = %e.raw(), "Unknown provider in config; using default");
                    None
                }
            })
            .unwrap_or_default();

        let model = app
            .and_then(|a| a.model.as_deref())
            .and_then(|raw| match ModelName::parse(provider, raw) {
                Ok(model) => Some(model),
                Err(e) => {
                    tracing::warn!(error = %e, "Invalid model in config; using provider default");
                    None
                }
            })
            .unwrap_or_else(|| provider.default_model());

        let configured_key = config
            .and_then(|c| c.api_keys.as_ref())
            .and_then(|keys| keys.for_provider(provider))
            .map(|raw| expand_with(raw, &env))
            .filter(|key| !key.trim().is_empty());
        let api_key = configured_key
            .or_else(|| {
                provider
                    .env_vars()
                    .iter()
                    .find_map(|name| env(name).filter(|key| !key.trim().is_empty()))
            })
            .map(|key| ApiKey::new(provider, key.trim()));

        let endpoint = config.and_then(|c| match provider {
            Provider::Gemini => c.google.as_ref(),
            Provider::OpenAI => c.openai.as_ref(),
        });
        let base_url = endpoint
            .and_then(|e| e.base_url.as_deref())
            .map(|raw| expand_with(raw, &env))
            .filter(|url| !url.trim().is_empty());

        let request_timeout = Duration::from_secs(
            quiz.and_then(|q| q.request_timeout_secs)
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        );

        let default_difficulty = quiz
            .and_then(|q| q.default_difficulty.as_deref())
            .and_then(|raw| Difficulty::parse(raw).ok())
            .unwrap_or_default();

        let default_questions = quiz
            .and_then(|q| q.default_questions)
            .and_then(|n| QuestionCount::new(n).ok())
            .unwrap_or_default();

        let ui = app.map_or_else(UiOptions::default, |a| UiOptions {
            ascii_only: a.ascii_only,
            high_contrast: a.high_contrast,
            reduced_motion: a.reduced_motion,
        });

        Self {
            provider,
            model,
            api_key,
            base_url,
            request_timeout,
            default_difficulty,
            default_questions,
            ui,
        }
    }

    /// Gateway configuration, or `None` when no API key is available.
    #[must_use]
    pub fn api_config(&self) -> Option<ApiConfig> {
        let key = self.api_key.clone()?;
        let config = match ApiConfig::new(key, self.model.clone()) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Unusable provider configuration");
                return None;
            }
        };
        let config = config.with_timeout(self.request_timeout);
        Some(match &self.base_url {
            Some(url) => config.with_base_url(url.as_str()),
            None => config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn expand_env_vars_no_vars() {
        assert_eq!(expand_env_vars("hello world"), "hello world");
    }

    #[test]
    fn expand_env_vars_single_var() {
        unsafe {
            std::env::set_var("MOCKMASTER_TEST_CONFIG_VAR", "replaced");
        }
        let result = expand_env_vars("prefix ${MOCKMASTER_TEST_CONFIG_VAR} suffix");
        assert_eq!(result, "prefix replaced suffix");
        unsafe {
            std::env::remove_var("MOCKMASTER_TEST_CONFIG_VAR");
        }
    }

    #[test]
    fn expand_missing_var_becomes_empty() {
        let result = expand_with("before ${MISSING} after", |_| None);
        assert_eq!(result, "before  after");
    }

    #[test]
    fn expand_adjacent_and_unicode() {
        let env = env_from(&[("A", "\u{3b1}"), ("B", "\u{3b2}")]);
        assert_eq!(expand_with("${A}${B}!", &env), "\u{3b1}\u{3b2}!");
    }

    #[test]
    fn expand_unclosed_and_empty_names_preserved() {
        assert_eq!(expand_with("${UNCLOSED", |_| None), "${UNCLOSED");
        assert_eq!(expand_with("x${}y", |_| None), "xy");
    }

    #[test]
    fn parse_empty_config() {
        let config: MockMasterConfig = toml::from_str("").unwrap();
        assert!(config.app.is_none());
        assert!(config.api_keys.is_none());
        assert!(config.quiz.is_none());
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
[app]
provider = "openai"
model = "gpt-5.2"
ascii_only = true
reduced_motion = true

[api_keys]
google = "AIza-test"
openai = "sk-openai-test"

[quiz]
default_difficulty = "hard"
default_questions = 10
request_timeout_secs = 30

[google]
base_url = "https://proxy.example/google"

[openai]
base_url = "https://proxy.example/openai"
"#;
        let config: MockMasterConfig = toml::from_str(toml_str).unwrap();
        let app = config.app.as_ref().unwrap();
        assert_eq!(app.provider.as_deref(), Some("openai"));
        assert!(app.ascii_only);
        assert!(!app.high_contrast);
        let keys = config.api_keys.as_ref().unwrap();
        assert_eq!(keys.google.as_deref(), Some("AIza-test"));
        let quiz = config.quiz.as_ref().unwrap();
        assert_eq!(quiz.default_questions, Some(10));
        assert_eq!(
            config.openai.as_ref().unwrap().base_url.as_deref(),
            Some("https://proxy.example/openai")
        );

        let settings = Settings::resolve_with(Some(&config), |_| None);
        assert_eq!(settings.provider, Provider::OpenAI);
        assert_eq!(settings.model.as_str(), "gpt-5.2");
        assert_eq!(
            settings.api_key.as_ref().map(ApiKey::expose_secret),
            Some("sk-openai-test")
        );
        assert_eq!(
            settings.base_url.as_deref(),
            Some("https://proxy.example/openai")
        );
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.default_difficulty, Difficulty::Hard);
        assert_eq!(settings.default_questions.get(), 10);
        assert!(settings.ui.ascii_only);
        assert!(settings.ui.reduced_motion);
    }

    #[test]
    fn api_keys_debug_redacts_values() {
        let keys = ApiKeys {
            google: Some("AIzaSyC789".to_string()),
            openai: Some("sk-secret456".to_string()),
        };
        let debug_output = format!("{keys:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sk-secret456"));
        assert!(!debug_output.contains("AIzaSyC789"));
    }

    #[test]
    fn api_keys_debug_shows_none() {
        let debug_output = format!("{:?}", ApiKeys::default());
        assert!(debug_output.contains("None"));
        assert!(!debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn defaults_without_config_or_env() {
        let settings = Settings::default();
        assert_eq!(settings.provider, Provider::default());
        assert!(settings.api_key.is_none());
        assert!(settings.api_config().is_none());
        assert_eq!(settings.default_difficulty, Difficulty::Medium);
        assert_eq!(settings.default_questions.get(), 5);
        assert_eq!(
            settings.request_timeout,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
    }

    #[test]
    fn environment_supplies_provider_and_key() {
        let env = env_from(&[
            ("MOCKMASTER_PROVIDER", "gemini"),
            ("GOOGLE_API_KEY", "from-google-var"),
        ]);
        let settings = Settings::resolve_with(None, env);
        assert_eq!(settings.provider, Provider::Gemini);
        assert_eq!(
            settings.api_key.as_ref().map(ApiKey::expose_secret),
            Some("from-google-var")
        );
        let api = settings.api_config().unwrap();
        assert_eq!(api.provider(), Provider::Gemini);
    }

    #[test]
    fn config_key_references_are_expanded() {
        let config: MockMasterConfig = toml::from_str(
            r#"
[app]
provider = "gemini"
[api_keys]
google = "${MY_GEMINI_KEY}"
"#,
        )
        .unwrap();
        let settings = Settings::resolve_with(Some(&config), env_from(&[("MY_GEMINI_KEY", "k1")]));
        assert_eq!(
            settings.api_key.as_ref().map(ApiKey::expose_secret),
            Some("k1")
        );
    }

    #[test]
    fn empty_expanded_key_falls_back_to_environment() {
        let config: MockMasterConfig = toml::from_str(
            r#"
[app]
provider = "gemini"
[api_keys]
google = "${UNSET}"
"#,
        )
        .unwrap();
        let settings =
            Settings::resolve_with(Some(&config), env_from(&[("GEMINI_API_KEY", "fallback")]));
        assert_eq!(
            settings.api_key.as_ref().map(ApiKey::expose_secret),
            Some("fallback")
        );
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config: MockMasterConfig = toml::from_str(
            r#"
[app]
provider = "gemini"
model = "gpt-5.2"
[quiz]
default_difficulty = "impossible"
default_questions = 0
request_timeout_secs = 0
"#,
        )
        .unwrap();
        let settings = Settings::resolve_with(Some(&config), |_| None);
        assert_eq!(settings.model, Provider::Gemini.default_model());
        assert_eq!(settings.default_difficulty, Difficulty::Medium);
        assert_eq!(settings.default_questions.get(), 5);
        assert_eq!(
            settings.request_timeout,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
    }

    #[test]
    fn load_from_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let result = MockMasterConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn load_from_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[app\nprovider = ").unwrap();

        let err = MockMasterConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.path(), path.as_path());
    }

    #[test]
    fn load_from_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[quiz]\ndefault_questions = 15\n").unwrap();

        let config = MockMasterConfig::load_from(&path).unwrap().unwrap();
        assert_eq!(config.quiz.unwrap().default_questions, Some(15));
    }
}
