use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Done,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Done => "done",
            ProcessingStatus::Failed => "failed",
        }
    }
}

impl FromStr for ProcessingStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(ProcessingStatus::Pending),
            "done" => Ok(ProcessingStatus::Done),
            "failed" => Ok(ProcessingStatus::Failed),
            other => Err(Error::BadRequest(format!(
                "processing_status must be pending, done or failed, got '{}'",
                other
            ))),
        }
    }
}

/// An uploaded file together with the text extracted from it.
/// `filename` and `stored_path` come from the joined `files` row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Material {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub file_id: Uuid,
    pub filename: String,
    pub stored_path: String,
    pub mime_type: Option<String>,
    pub size_bytes: i64,
    pub checksum: String,
    pub extracted_text: Option<String>,
    pub processing_status: String,
    pub processing_error: Option<String>,
    pub created_at: DateTime<Utc>,
}
