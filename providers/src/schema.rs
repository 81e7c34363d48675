//! Validation boundary between raw model output and the typed quiz model.
//!
//! Model output is untrusted. It is parsed as JSON, checked against a JSON Schema,
//! then converted field by field into [`Question`]s, so structural problems
//! surface as [`GenerationError`]s instead of reaching a quiz session.

use serde::Deserialize;
use serde_json::{Value, json};

use mockmaster_types::{Question, QuestionId, Quiz};

use crate::{GenerationError, QuizRequest};

/// JSON Schema for the question list returned by a provider.
#[must_use]
pub fn question_list_schema(count: usize) -> Value {
    json!({
        "type": "array",
        "minItems": count,
        "maxItems": count,
        "items": {
            "type": "object",
            "required": ["id", "text", "options", "correctAnswerIndex", "explanation"],
            "properties": {
                "id": { "type": "integer", "minimum": 0 },
                "text": { "type": "string", "minLength": 1 },
                "options": {
                    "type": "array",
                    "items": { "type": "string", "minLength": 1 },
                    "minItems": 4,
                    "maxItems": 4
                },
                "correctAnswerIndex": { "type": "integer", "minimum": 0, "maximum": 3 },
                "explanation": { "type": "string", "minLength": 1 }
            }
        }
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    id: u32,
    text: String,
    options: Vec<String>,
    correct_answer_index: i64,
    explanation: String,
}

/// Parse model output text into a JSON value.
///
/// Tolerates a surrounding Markdown code fence, which some models add even in JSON mode.
pub fn parse_payload(text: &str) -> Result<Value, GenerationError> {
    let trimmed = strip_code_fence(text.trim());
    if trimmed.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    serde_json::from_str(trimmed).map_err(GenerationError::MalformedJson)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Validate a question list and build the quiz it describes.
pub fn build_quiz(payload: &Value, request: &QuizRequest) -> Result<Quiz, GenerationError> {
    let count = request.count.get();
    let schema = question_list_schema(count);
    let validator = jsonschema::validator_for(&schema)
        .map_err(|e| GenerationError::Schema(format!("invalid question schema: {e}")))?;
    if let Err(err) = validator.validate(payload) {
        return Err(GenerationError::Schema(err.to_string()));
    }

    let raw: Vec<RawQuestion> =
        serde_json::from_value(payload.clone()).map_err(GenerationError::MalformedJson)?;

    let questions = raw
        .into_iter()
        .map(|q| {
            Question::new(
                QuestionId::new(q.id),
                q.text,
                q.options,
                q.correct_answer_index,
                q.explanation,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    Quiz::new(request.topic.clone(), request.difficulty, questions)
        .map_err(GenerationError::Invalid)
}

#[cfg(test)]
mod tests {
    use super::{build_quiz, parse_payload};
    use crate::{GenerationError, QuizRequest};
    use mockmaster_types::{Difficulty, OptionIndex, QuestionCount, QuizValidationError, Topic};
    use serde_json::{Value, json};

    fn request(count: usize) -> QuizRequest {
        QuizRequest {
            topic: Topic::new("Photosynthesis").unwrap(),
            difficulty: Difficulty::Medium,
            count: QuestionCount::new(count).unwrap(),
        }
    }

    fn question(id: u32, correct: u8) -> Value {
        json!({
            "id": id,
            "text": format!("Question {id}?"),
            "options": ["Chlorophyll", "Glucose", "Oxygen", "Water"],
            "correctAnswerIndex": correct,
            "explanation": "Because plants."
        })
    }

    #[test]
    fn well_formed_payload_builds_quiz() {
        let payload = json!([question(1, 2), question(2, 0)]);
        let quiz = build_quiz(&payload, &request(2)).unwrap();
        assert_eq!(quiz.len(), 2);
        assert_eq!(quiz.topic().as_str(), "Photosynthesis");
        assert_eq!(quiz.questions()[0].correct_answer(), OptionIndex::ALL[2]);
    }

    #[test]
    fn three_options_are_rejected() {
        let mut q = question(1, 0);
        q["options"] = json!(["a", "b", "c"]);
        let err = build_quiz(&json!([q]), &request(1)).unwrap_err();
        assert!(matches!(err, GenerationError::Schema(_)), "{err:?}");
    }

    #[test]
    fn out_of_range_answer_is_rejected() {
        let err = build_quiz(&json!([question(1, 4)]), &request(1)).unwrap_err();
        assert!(matches!(err, GenerationError::Schema(_)), "{err:?}");
    }

    #[test]
    fn wrong_question_count_is_rejected() {
        let payload = json!([question(1, 0), question(2, 1)]);
        let err = build_quiz(&payload, &request(3)).unwrap_err();
        assert!(matches!(err, GenerationError::Schema(_)), "{err:?}");
    }

    #[test]
    fn missing_field_is_rejected() {
        let mut q = question(1, 0);
        q.as_object_mut().unwrap().remove("explanation");
        let err = build_quiz(&json!([q]), &request(1)).unwrap_err();
        assert!(matches!(err, GenerationError::Schema(_)), "{err:?}");
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let payload = json!([question(1, 0), question(1, 1)]);
        let err = build_quiz(&payload, &request(2)).unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Invalid(QuizValidationError::DuplicateQuestionId(_))
        ));
    }

    #[test]
    fn duplicate_options_are_rejected() {
        let mut q = question(1, 0);
        q["options"] = json!(["same", "same", "other", "another"]);
        let err = build_quiz(&json!([q]), &request(1)).unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Invalid(QuizValidationError::DuplicateOption { .. })
        ));
    }

    #[test]
    fn payload_parsing() {
        assert!(matches!(
            parse_payload("not json"),
            Err(GenerationError::MalformedJson(_))
        ));
        assert!(matches!(
            parse_payload("   "),
            Err(GenerationError::EmptyResponse)
        ));
        let fenced = "```json\n[1, 2]\n```";
        assert_eq!(parse_payload(fenced).unwrap(), json!([1, 2]));
    }
}
