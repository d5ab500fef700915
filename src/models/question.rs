use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum Difficulty {
    Easy = 1,
    Medium = 2,
    Hard = 3,
}

impl TryFrom<i16> for Difficulty {
    type Error = Error;

    fn try_from(value: i16) -> Result<Self> {
        match value {
            1 => Ok(Difficulty::Easy),
            2 => Ok(Difficulty::Medium),
            3 => Ok(Difficulty::Hard),
            other => Err(Error::InvalidQuestionShape(format!(
                "difficulty must be 1, 2 or 3, got {}",
                other
            ))),
        }
    }
}

impl From<Difficulty> for i16 {
    fn from(value: Difficulty) -> Self {
        value as i16
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        f.write_str(label)
    }
}

/// A validated quiz question.
///
/// Closed questions always carry at least one choice and their correct
/// choices are a subset of the choices. Open questions never carry choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: Option<Uuid>,
    text: String,
    is_closed: bool,
    difficulty: Difficulty,
    choices: Vec<String>,
    correct_choices: Vec<String>,
}

impl Question {
    pub fn new(
        text: impl Into<String>,
        is_closed: bool,
        difficulty: Difficulty,
        choices: Vec<String>,
        correct_choices: Vec<String>,
    ) -> Result<Self> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(Error::InvalidQuestionShape(
                "question text cannot be empty".to_string(),
            ));
        }

        let (choices, correct_choices) = if is_closed {
            validate_choices(&choices, &correct_choices)?;
            (choices, correct_choices)
        } else {
            (Vec::new(), Vec::new())
        };

        Ok(Self {
            id: None,
            text,
            is_closed,
            difficulty,
            choices,
            correct_choices,
        })
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_closed(&self) -> bool {
        self.is_closed
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn correct_choices(&self) -> &[String] {
        &self.correct_choices
    }
}

fn validate_choices(choices: &[String], correct_choices: &[String]) -> Result<()> {
    if choices.is_empty() {
        return Err(Error::InvalidQuestionShape(
            "closed question must define choices".to_string(),
        ));
    }
    let available: HashSet<&str> = choices.iter().map(String::as_str).collect();
    if let Some(stray) = correct_choices
        .iter()
        .find(|c| !available.contains(c.as_str()))
    {
        return Err(Error::InvalidQuestionShape(format!(
            "correct choice {:?} is not one of the choices",
            stray
        )));
    }
    Ok(())
}

/// Persisted form of a question; choice lists are stored as JSONB.
#[derive(Debug, Clone, FromRow)]
pub struct QuestionRow {
    pub id: Uuid,
    pub test_id: Uuid,
    pub position: i32,
    pub text: String,
    pub is_closed: bool,
    pub difficulty: i16,
    pub choices: Json<Vec<String>>,
    pub correct_choices: Json<Vec<String>>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = Error;

    fn try_from(row: QuestionRow) -> Result<Self> {
        let question = Question::new(
            row.text,
            row.is_closed,
            Difficulty::try_from(row.difficulty)?,
            row.choices.0,
            row.correct_choices.0,
        )?;
        Ok(question.with_id(row.id))
    }
}
