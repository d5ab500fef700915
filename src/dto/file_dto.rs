use crate::models::file::StoredFile;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUploadResponse {
    pub file_id: Uuid,
    pub filename: String,
}

impl From<StoredFile> for FileUploadResponse {
    fn from(file: StoredFile) -> Self {
        Self {
            file_id: file.id,
            filename: file.filename,
        }
    }
}
