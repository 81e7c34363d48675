//! OpenAI Responses API client.
//!
//! Strict structured outputs require an object at the root, so the question
//! array is wrapped as `{"questions": [...]}` and unwrapped again here.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::{ApiConfig, GenerationError, QuizRequest, schema, send_request};

const SCHEMA_NAME: &str = "quiz_questions";

fn text_format() -> Value {
    json!({
        "type": "json_schema",
        "name": SCHEMA_NAME,
        "strict": true,
        "schema": {
            "type": "object",
            "additionalProperties": false,
            "required": ["questions"],
            "properties": {
                "questions": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "additionalProperties": false,
                        "required": ["id", "text", "options", "correctAnswerIndex", "explanation"],
                        "properties": {
                            "id": { "type": "integer", "description": "1-based question number" },
                            "text": { "type": "string" },
                            "options": {
                                "type": "array",
                                "items": { "type": "string" },
                                "description": "Exactly 4 answer options"
                            },
                            "correctAnswerIndex": {
                                "type": "integer",
                                "description": "Index of the correct option (0-3)"
                            },
                            "explanation": { "type": "string" }
                        }
                    }
                }
            }
        }
    })
}

fn build_request_body(config: &ApiConfig, system_instruction: &str, request: &QuizRequest) -> Value {
    let mut body = json!({
        "model": config.model().as_str(),
        "input": [{
            "role": "user",
            "content": [{ "type": "input_text", "text": request.prompt() }]
        }],
        "text": { "format": text_format() },
        "store": false
    });

    if !system_instruction.trim().is_empty() {
        body["instructions"] = json!(system_instruction);
    }

    body
}

// ========================================================================
// Response types
// ========================================================================

#[derive(Debug, Deserialize)]
struct Response {
    status: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
    incomplete_details: Option<IncompleteDetails>,
    error: Option<ErrorInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum OutputItem {
    #[serde(rename = "message")]
    Message {
        #[serde(default)]
        content: Vec<ContentPart>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "output_text")]
    OutputText { text: String },
    #[serde(rename = "refusal")]
    Refusal { refusal: String },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct IncompleteDetails {
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorInfo {
    message: Option<String>,
}

fn extract_text(response: Response) -> Result<String, GenerationError> {
    if let Some(error) = response.error {
        return Err(GenerationError::Blocked(
            error.message.unwrap_or_else(|| "unknown error".to_string()),
        ));
    }
    if response.status.as_deref() == Some("incomplete") {
        let reason = response
            .incomplete_details
            .and_then(|d| d.reason)
            .unwrap_or_else(|| "unknown".to_string());
        return Err(GenerationError::Blocked(format!("response incomplete: {reason}")));
    }

    let mut text = String::new();
    for item in response.output {
        let OutputItem::Message { content } = item else {
            continue;
        };
        for part in content {
            match part {
                ContentPart::OutputText { text: chunk } => text.push_str(&chunk),
                ContentPart::Refusal { refusal } => {
                    return Err(GenerationError::Blocked(format!("refused: {refusal}")));
                }
                ContentPart::Unknown => {}
            }
        }
    }

    if text.trim().is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text)
}

fn unwrap_questions(payload: Value) -> Result<Value, GenerationError> {
    match payload {
        Value::Object(mut map) => map
            .remove("questions")
            .ok_or_else(|| GenerationError::Schema("missing \"questions\" field".to_string())),
        // Tolerate a bare array in case the model ignores the wrapper.
        array @ Value::Array(_) => Ok(array),
        _ => Err(GenerationError::Schema(
            "expected an object with a \"questions\" array".to_string(),
        )),
    }
}

/// Call the Responses API and return the question array payload.
pub async fn generate(
    client: &reqwest::Client,
    config: &ApiConfig,
    system_instruction: &str,
    request: &QuizRequest,
) -> Result<Value, GenerationError> {
    let url = format!("{}/responses", config.base_url());
    let body = build_request_body(config, system_instruction, request);
    let auth_header = format!("Bearer {}", config.api_key());

    let response = send_request(
        || {
            client
                .post(&url)
                .timeout(config.timeout())
                .header("Authorization", &auth_header)
                .header("content-type", "application/json")
                .json(&body)
        },
        config,
    )
    .await?;

    let parsed: Response = response.json().await.map_err(GenerationError::Body)?;
    let text = extract_text(parsed)?;
    unwrap_questions(schema::parse_payload(&text)?)
}
