//! Google Gemini `generateContent` client.
//!
//! Uses JSON mode (`responseMimeType: application/json`) with a `responseSchema`
//! so the model returns the question array directly. Note the mixed casing the
//! API expects: `system_instruction` is snake_case, `generationConfig` camelCase.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::{ApiConfig, GenerationError, QuizRequest, schema, send_request};

/// Response schema in Gemini's OpenAPI subset (no `additionalProperties`).
fn response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": { "type": "INTEGER", "description": "1-based question number" },
                "text": { "type": "STRING", "description": "The question prompt" },
                "options": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "description": "Exactly 4 answer options"
                },
                "correctAnswerIndex": {
                    "type": "INTEGER",
                    "description": "Index of the correct option (0-3)"
                },
                "explanation": {
                    "type": "STRING",
                    "description": "Why the correct answer is right"
                }
            },
            "required": ["id", "text", "options", "correctAnswerIndex", "explanation"],
            "propertyOrdering": ["id", "text", "options", "correctAnswerIndex", "explanation"]
        }
    })
}

fn build_request_body(system_instruction: &str, request: &QuizRequest) -> Value {
    let mut body = json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": request.prompt() }]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema()
        }
    });

    if !system_instruction.trim().is_empty() {
        body["system_instruction"] = json!({
            "parts": [{ "text": system_instruction }]
        });
    }

    body
}

// ========================================================================
// Response types
// ========================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Response {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Known Gemini finish reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Language,
    Blocklist,
    ProhibitedContent,
    Spii,
    Other,
    Unknown,
}

impl FinishReason {
    fn parse(s: &str) -> Self {
        match s {
            "STOP" => Self::Stop,
            "MAX_TOKENS" => Self::MaxTokens,
            "SAFETY" => Self::Safety,
            "RECITATION" => Self::Recitation,
            "LANGUAGE" => Self::Language,
            "BLOCKLIST" => Self::Blocklist,
            "PROHIBITED_CONTENT" => Self::ProhibitedContent,
            "SPII" => Self::Spii,
            "OTHER" => Self::Other,
            _ => Self::Unknown,
        }
    }

    /// Error message if this reason means the output is unusable.
    ///
    /// `MAX_TOKENS` counts as usable here; a truncated array fails JSON parsing anyway.
    fn error_message(self) -> Option<&'static str> {
        match self {
            Self::Stop | Self::MaxTokens | Self::Unknown => None,
            Self::Safety => Some("content filtered by safety settings"),
            Self::Recitation => Some("recitation"),
            Self::Language => Some("unsupported language"),
            Self::Blocklist => Some("content contains blocked terms"),
            Self::ProhibitedContent => Some("prohibited content detected"),
            Self::Spii => Some("sensitive PII detected"),
            Self::Other => Some("stopped for an unknown reason"),
        }
    }
}

/// Pull the generated text out of a response, surfacing blocks as errors.
fn extract_text(response: Response) -> Result<String, GenerationError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(GenerationError::Blocked(format!("prompt blocked: {reason}")));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(GenerationError::EmptyResponse)?;

    if let Some(message) = candidate
        .finish_reason
        .as_deref()
        .map(FinishReason::parse)
        .and_then(FinishReason::error_message)
    {
        return Err(GenerationError::Blocked(message.to_string()));
    }

    let text: String = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter(|part| !part.thought)
        .filter_map(|part| part.text)
        .collect();

    if text.trim().is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text)
}

/// Call `generateContent` and return the question array payload.
pub async fn generate(
    client: &reqwest::Client,
    config: &ApiConfig,
    system_instruction: &str,
    request: &QuizRequest,
) -> Result<Value, GenerationError> {
    let url = format!(
        "{}/models/{}:generateContent",
        config.base_url(),
        config.model().as_str()
    );
    let body = build_request_body(system_instruction, request);
    let api_key = config.api_key();

    let response = send_request(
        || {
            client
                .post(&url)
                .timeout(config.timeout())
                .header("x-goog-api-key", api_key)
                .header("content-type", "application/json")
                .json(&body)
        },
        config,
    )
    .await?;

    let parsed: Response = response.json().await.map_err(GenerationError::Body)?;
    let text = extract_text(parsed)?;
    schema::parse_payload(&text)
}
