use crate::models::material::Material;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialOut {
    pub id: Uuid,
    pub file_id: Uuid,
    pub filename: String,
    pub mime_type: Option<String>,
    pub size_bytes: i64,
    pub checksum: String,
    pub status: String,
    pub processing_error: Option<String>,
    pub extracted_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Material> for MaterialOut {
    fn from(m: Material) -> Self {
        Self {
            id: m.id,
            file_id: m.file_id,
            filename: m.filename,
            mime_type: m.mime_type,
            size_bytes: m.size_bytes,
            checksum: m.checksum,
            status: m.processing_status,
            processing_error: m.processing_error,
            extracted_text: m.extracted_text,
            created_at: m.created_at,
        }
    }
}

/// Listing entry; the extracted text is only returned by the detail view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialListItem {
    pub id: Uuid,
    pub filename: String,
    pub status: String,
    pub text_chars: usize,
    pub created_at: DateTime<Utc>,
}

impl From<Material> for MaterialListItem {
    fn from(m: Material) -> Self {
        Self {
            id: m.id,
            filename: m.filename,
            status: m.processing_status,
            text_chars: m.extracted_text.as_deref().map_or(0, |t| t.chars().count()),
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialUpdate {
    #[serde(default)]
    pub extracted_text: Option<String>,
    #[serde(default)]
    pub processing_status: Option<String>,
}
