use crate::models::question::Question;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_TEST_TITLE: &str = "Untitled Test";
pub const MAX_TITLE_CHARS: usize = 200;

/// Aggregate root: a test owned by one user with its ordered questions.
#[derive(Debug, Clone)]
pub struct Test {
    pub id: Option<Uuid>,
    pub owner_id: Uuid,
    pub title: String,
    pub created_at: Option<DateTime<Utc>>,
    questions: Vec<Question>,
}

impl Test {
    pub fn new(owner_id: Uuid, title: &str) -> Self {
        Self {
            id: None,
            owner_id,
            title: normalize_title(title).unwrap_or_else(|| DEFAULT_TEST_TITLE.to_string()),
            created_at: None,
            questions: Vec::new(),
        }
    }

    /// Questions are validated at construction, so only an already valid
    /// `Question` can reach the aggregate.
    pub fn add_question(&mut self, question: Question) {
        self.questions.push(question);
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }
}

/// Trims a title and caps its length; `None` when nothing is left.
pub fn normalize_title(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_TITLE_CHARS).collect::<String>().trim_end().to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestSummary {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub question_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_title_falls_back_to_default() {
        let test = Test::new(Uuid::new_v4(), "   ");
        assert_eq!(test.title, DEFAULT_TEST_TITLE);
    }

    #[test]
    fn long_titles_are_capped() {
        let title = "a".repeat(MAX_TITLE_CHARS * 2);
        assert_eq!(normalize_title(&title).unwrap().chars().count(), MAX_TITLE_CHARS);
        assert_eq!(normalize_title("  Biology  ").as_deref(), Some("Biology"));
    }
}
