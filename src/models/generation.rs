use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Requested number of closed questions per subtype.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedBreakdown {
    pub true_false: u32,
    pub single_choice: u32,
    pub multi_choice: u32,
}

impl ClosedBreakdown {
    pub fn total(&self) -> u32 {
        self.true_false + self.single_choice + self.multi_choice
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyDistribution {
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

impl DifficultyDistribution {
    pub fn total(&self) -> u32 {
        self.easy + self.medium + self.hard
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationParams {
    closed: ClosedBreakdown,
    num_open: u32,
    difficulty: DifficultyDistribution,
}

impl GenerationParams {
    pub fn new(
        closed: ClosedBreakdown,
        num_open: u32,
        difficulty: DifficultyDistribution,
    ) -> Result<Self> {
        let expected = closed.total() + num_open;
        if difficulty.total() != expected {
            return Err(Error::InvalidRequestShape(format!(
                "easy + medium + hard ({}) must equal closed + open question count ({})",
                difficulty.total(),
                expected
            )));
        }
        Ok(Self {
            closed,
            num_open,
            difficulty,
        })
    }

    pub fn closed(&self) -> &ClosedBreakdown {
        &self.closed
    }

    pub fn num_open(&self) -> u32 {
        self.num_open
    }

    pub fn difficulty(&self) -> &DifficultyDistribution {
        &self.difficulty
    }

    pub fn total_questions(&self) -> u32 {
        self.closed.total() + self.num_open
    }
}

/// A validated generation request. Text wins over `file_id` when both are
/// present; the file is then only used for its title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub params: GenerationParams,
    pub text: Option<String>,
    pub file_id: Option<Uuid>,
}

impl GenerationRequest {
    pub fn new(params: GenerationParams, text: Option<String>, file_id: Option<Uuid>) -> Result<Self> {
        let text = text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        if text.is_none() && file_id.is_none() {
            return Err(Error::InvalidRequestShape(
                "provide either text or file_id".to_string(),
            ));
        }
        Ok(Self {
            params,
            text,
            file_id,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub test_id: Uuid,
    pub num_questions: usize,
}
