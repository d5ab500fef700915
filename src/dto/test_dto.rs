use crate::error::{Error, Result};
use crate::generation::coerce_to_list;
use crate::models::generation::{
    ClosedBreakdown, DifficultyDistribution, GenerationParams, GenerationRequest, GenerationSummary,
};
use crate::models::question::Question;
use crate::models::test::{Test, TestRow, TestSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ClosedBreakdownPayload {
    #[validate(range(min = 0, max = 1000, message = "true_false is out of range"))]
    pub true_false: i64,
    #[validate(range(min = 0, max = 1000, message = "single_choice is out of range"))]
    pub single_choice: i64,
    #[validate(range(min = 0, max = 1000, message = "multi_choice is out of range"))]
    pub multi_choice: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateTestPayload {
    #[serde(default)]
    #[validate(nested)]
    pub closed: ClosedBreakdownPayload,

    #[serde(default)]
    #[validate(range(min = 0, max = 1000, message = "num_open is out of range"))]
    pub num_open: i64,

    #[serde(default)]
    #[validate(range(min = 0, max = 1000, message = "easy is out of range"))]
    pub easy: i64,
    #[serde(default)]
    #[validate(range(min = 0, max = 1000, message = "medium is out of range"))]
    pub medium: i64,
    #[serde(default)]
    #[validate(range(min = 0, max = 1000, message = "hard is out of range"))]
    pub hard: i64,

    #[serde(default, deserialize_with = "trim_optional_string")]
    pub text: Option<String>,

    pub file_id: Option<Uuid>,
}

impl GenerateTestPayload {
    /// Validates the payload and turns it into a pipeline request. Every
    /// failure here is an `InvalidRequestShape`.
    pub fn into_request(self) -> Result<GenerationRequest> {
        self.validate()
            .map_err(|e| Error::InvalidRequestShape(e.to_string()))?;

        let params = GenerationParams::new(
            ClosedBreakdown {
                true_false: count(self.closed.true_false)?,
                single_choice: count(self.closed.single_choice)?,
                multi_choice: count(self.closed.multi_choice)?,
            },
            count(self.num_open)?,
            DifficultyDistribution {
                easy: count(self.easy)?,
                medium: count(self.medium)?,
                hard: count(self.hard)?,
            },
        )?;
        GenerationRequest::new(params, self.text, self.file_id)
    }
}

fn count(value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::InvalidRequestShape(format!("count {} is out of range", value)))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateTestResponse {
    pub test_id: Uuid,
    pub num_questions: usize,
}

impl From<GenerationSummary> for GenerateTestResponse {
    fn from(summary: GenerationSummary) -> Self {
        Self {
            test_id: summary.test_id,
            num_questions: summary.num_questions,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestOut {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub question_count: i64,
}

impl From<TestSummary> for TestOut {
    fn from(s: TestSummary) -> Self {
        Self {
            id: s.id,
            title: s.title,
            created_at: s.created_at,
            question_count: s.question_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestTitleOut {
    pub id: Uuid,
    pub title: String,
}

impl From<TestRow> for TestTitleOut {
    fn from(row: TestRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOut {
    pub id: Option<Uuid>,
    pub text: String,
    pub is_closed: bool,
    pub difficulty: i16,
    pub choices: Option<Vec<String>>,
    pub correct_choices: Option<Vec<String>>,
}

impl From<&Question> for QuestionOut {
    fn from(q: &Question) -> Self {
        let (choices, correct_choices) = if q.is_closed() {
            (Some(q.choices().to_vec()), Some(q.correct_choices().to_vec()))
        } else {
            (None, None)
        };
        Self {
            id: q.id(),
            text: q.text().to_string(),
            is_closed: q.is_closed(),
            difficulty: i16::from(q.difficulty()),
            choices,
            correct_choices,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestDetailOut {
    pub test_id: Option<Uuid>,
    pub title: String,
    pub created_at: Option<DateTime<Utc>>,
    pub questions: Vec<QuestionOut>,
}

impl From<&Test> for TestDetailOut {
    fn from(test: &Test) -> Self {
        Self {
            test_id: test.id,
            title: test.title.clone(),
            created_at: test.created_at,
            questions: test.questions().iter().map(QuestionOut::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RenameTestPayload {
    #[serde(deserialize_with = "trim_string")]
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionCreate {
    pub text: String,
    #[serde(default = "default_is_closed")]
    pub is_closed: bool,
    #[serde(default = "default_difficulty")]
    pub difficulty: i16,
    #[serde(default, deserialize_with = "coerce_choices")]
    pub choices: Option<Vec<String>>,
    #[serde(default, deserialize_with = "coerce_choices")]
    pub correct_choices: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionUpdate {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub is_closed: Option<bool>,
    #[serde(default)]
    pub difficulty: Option<i16>,
    #[serde(default, deserialize_with = "coerce_choices")]
    pub choices: Option<Vec<String>>,
    #[serde(default, deserialize_with = "coerce_choices")]
    pub correct_choices: Option<Vec<String>>,
}

fn default_is_closed() -> bool {
    true
}

fn default_difficulty() -> i16 {
    1
}

// Accepts a list, a JSON-encoded list string or a scalar
fn coerce_choices<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    Ok(value.and_then(|v| coerce_to_list(&v)))
}

fn trim_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(s.trim().to_string())
}

// Trims strings and turns empty ones into None
fn trim_optional_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Difficulty;
    use crate::models::test::MAX_TITLE_CHARS;
    use serde_json::json;

    #[test]
    fn payload_becomes_request() {
        let payload: GenerateTestPayload = serde_json::from_value(json!({
            "closed": { "true_false": 1, "single_choice": 2 },
            "num_open": 1,
            "easy": 2, "medium": 1, "hard": 1,
            "text": "  Plate tectonics  "
        }))
        .unwrap();
        let request = payload.into_request().unwrap();
        assert_eq!(request.params.closed().total(), 3);
        assert_eq!(request.params.total_questions(), 4);
        assert_eq!(request.text.as_deref(), Some("Plate tectonics"));
        assert_eq!(request.file_id, None);
    }

    #[test]
    fn mismatched_difficulty_is_invalid_request_shape() {
        let payload: GenerateTestPayload = serde_json::from_value(json!({
            "closed": { "single_choice": 2 },
            "easy": 1,
            "text": "source"
        }))
        .unwrap();
        assert!(matches!(payload.into_request(), Err(Error::InvalidRequestShape(_))));
    }

    #[test]
    fn missing_source_is_invalid_request_shape() {
        let payload: GenerateTestPayload = serde_json::from_value(json!({
            "num_open": 1, "easy": 1, "text": "   "
        }))
        .unwrap();
        assert!(matches!(payload.into_request(), Err(Error::InvalidRequestShape(_))));
    }

    #[test]
    fn oversized_counts_fail_validation() {
        let payload: GenerateTestPayload = serde_json::from_value(json!({
            "num_open": 5000, "easy": 5000, "text": "source"
        }))
        .unwrap();
        assert!(matches!(payload.into_request(), Err(Error::InvalidRequestShape(_))));
    }

    #[test]
    fn negative_counts_are_invalid_request_shape() {
        let payload: GenerateTestPayload = serde_json::from_value(json!({
            "num_open": -1, "easy": 0, "closed": { "single_choice": 1 }, "text": "source"
        }))
        .unwrap();
        assert!(matches!(payload.into_request(), Err(Error::InvalidRequestShape(_))));
    }

    #[test]
    fn question_create_coerces_choices() {
        let payload: QuestionCreate = serde_json::from_value(json!({
            "text": "Pick one",
            "choices": "[\"A\", \"B\"]",
            "correct_choices": "'A'"
        }))
        .unwrap();
        assert!(payload.is_closed);
        assert_eq!(payload.difficulty, 1);
        assert_eq!(payload.choices, Some(vec!["A".to_string(), "B".to_string()]));
        assert_eq!(payload.correct_choices, Some(vec!["A".to_string()]));
    }

    #[test]
    fn open_questions_render_without_choices() {
        let q = Question::new("Explain.", false, Difficulty::Medium, vec![], vec![]).unwrap();
        let out = QuestionOut::from(&q);
        assert_eq!(out.choices, None);
        assert_eq!(out.difficulty, 2);
    }

    #[test]
    fn rename_payload_limits_length() {
        let long = RenameTestPayload {
            title: "x".repeat(MAX_TITLE_CHARS + 1),
        };
        assert!(long.validate().is_err());
        assert!(RenameTestPayload { title: "Quiz".into() }.validate().is_ok());
    }

    #[test]
    fn rename_payload_is_measured_after_trimming() {
        let padded = format!("   {}   ", "x".repeat(MAX_TITLE_CHARS));
        let payload: RenameTestPayload = serde_json::from_value(json!({ "title": padded })).unwrap();
        assert_eq!(payload.title.chars().count(), MAX_TITLE_CHARS);
        assert!(payload.validate().is_ok());

        let blank: RenameTestPayload = serde_json::from_value(json!({ "title": "   " })).unwrap();
        assert!(blank.validate().is_err());
    }
}
