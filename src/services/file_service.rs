use crate::error::{Error, Result};
use crate::models::event::{DomainEvent, FileUploaded};
use crate::models::file::{mime_for_extension, StoredFile};
use crate::services::event_service::EventSink;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use uuid::Uuid;

pub const ALLOWED_EXTENSIONS: [&str; 8] = ["pdf", "png", "jpg", "jpeg", "txt", "md", "csv", "docx"];

/// Matches the width of `files.filename`.
pub const MAX_FILENAME_CHARS: usize = 255;

/// Lookup side of file storage as seen by the generation pipeline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn get_file(&self, file_id: Uuid) -> Result<Option<StoredFile>>;
}

#[derive(Clone)]
pub struct FileService {
    pool: PgPool,
    uploads_dir: PathBuf,
    events: Arc<dyn EventSink>,
}

impl FileService {
    pub fn new(pool: PgPool, uploads_dir: impl Into<PathBuf>, events: Arc<dyn EventSink>) -> Self {
        Self {
            pool,
            uploads_dir: uploads_dir.into(),
            events,
        }
    }

    pub async fn upload_file(&self, owner_id: Uuid, filename: &str, data: &[u8]) -> Result<StoredFile> {
        let filename = sanitize_filename(filename);
        let ext = validate_upload(&filename, data)?;

        fs::create_dir_all(&self.uploads_dir).await.map_err(|e| {
            tracing::error!(dir = %self.uploads_dir.display(), error = %e, "Failed to create uploads dir");
            Error::Internal(format!("Failed to prepare storage: {}", e))
        })?;

        let file_id = Uuid::new_v4();
        let stored_path = self.uploads_dir.join(format!("{}.{}", file_id, ext));
        fs::write(&stored_path, data).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to write uploaded file");
            Error::Internal(format!("Failed to save file: {}", e))
        })?;

        let checksum = hex::encode(Sha256::digest(data));
        let stored_path_str = stored_path.to_string_lossy().into_owned();

        let inserted = sqlx::query_as::<_, StoredFile>(
            r#"
            INSERT INTO files (id, owner_id, filename, stored_path, mime_type, size_bytes, checksum)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, owner_id, filename, stored_path, mime_type, size_bytes, checksum, uploaded_at
            "#,
        )
        .bind(file_id)
        .bind(owner_id)
        .bind(&filename)
        .bind(&stored_path_str)
        .bind(mime_for_extension(&ext))
        .bind(data.len() as i64)
        .bind(&checksum)
        .fetch_one(&self.pool)
        .await;

        let file = match inserted {
            Ok(file) => file,
            Err(e) => {
                let _ = fs::remove_file(&stored_path).await;
                return Err(e.into());
            }
        };

        tracing::info!(file_id = %file.id, owner_id = %owner_id, size = file.size_bytes, "File uploaded");
        self.events
            .publish(DomainEvent::FileUploaded(FileUploaded::new(file.id, owner_id, checksum)));
        Ok(file)
    }

    /// Removes the `files` row (cascading to anything built on it) and the
    /// stored bytes. A missing file on disk is only logged.
    pub async fn delete_file(&self, file_id: Uuid, stored_path: &str) -> Result<()> {
        sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(file_id)
            .execute(&self.pool)
            .await?;

        if let Err(e) = fs::remove_file(stored_path).await {
            tracing::warn!(file_id = %file_id, path = stored_path, error = %e, "Failed to remove stored file");
        }
        tracing::info!(file_id = %file_id, "File deleted");
        Ok(())
    }
}

#[async_trait]
impl FileStore for FileService {
    async fn get_file(&self, file_id: Uuid) -> Result<Option<StoredFile>> {
        let file = sqlx::query_as::<_, StoredFile>(
            r#"
            SELECT id, owner_id, filename, stored_path, mime_type, size_bytes, checksum, uploaded_at
            FROM files
            WHERE id = $1
            "#,
        )
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(file)
    }
}

/// Keeps only the final path component of a client supplied name.
fn sanitize_filename(filename: &str) -> String {
    let name = Path::new(filename.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .trim();
    if name.is_empty() {
        "upload".to_string()
    } else {
        name.to_string()
    }
}

/// Checks extension, emptiness and magic bytes. Returns the lower-cased extension.
fn validate_upload(filename: &str, data: &[u8]) -> Result<String> {
    if filename.chars().count() > MAX_FILENAME_CHARS {
        return Err(Error::BadRequest(format!(
            "File name must be at most {} characters",
            MAX_FILENAME_CHARS
        )));
    }

    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(Error::BadRequest(format!(
            "File type .{} is not allowed",
            if ext.is_empty() { "?" } else { ext.as_str() }
        )));
    }
    if data.is_empty() {
        return Err(Error::BadRequest("Uploaded file is empty".into()));
    }

    let content_ok = match ext.as_str() {
        "pdf" => data.starts_with(b"%PDF"),
        "png" => data.starts_with(&[0x89, 0x50, 0x4E, 0x47]),
        "jpg" | "jpeg" => data.starts_with(&[0xFF, 0xD8]),
        // docx is a zip container
        "docx" => data.starts_with(b"PK"),
        _ => true,
    };
    if !content_ok {
        return Err(Error::BadRequest(format!("Invalid {} file content", ext.to_uppercase())));
    }

    Ok(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_types_with_matching_content() {
        assert_eq!(validate_upload("notes.TXT", b"hello").unwrap(), "txt");
        assert_eq!(validate_upload("paper.pdf", b"%PDF-1.7 ...").unwrap(), "pdf");
        assert_eq!(validate_upload("scan.jpeg", &[0xFF, 0xD8, 0xFF]).unwrap(), "jpeg");
        assert_eq!(validate_upload("doc.docx", b"PK\x03\x04").unwrap(), "docx");
    }

    #[test]
    fn rejects_unknown_types_empty_files_and_bad_magic() {
        assert!(matches!(validate_upload("run.exe", b"MZ"), Err(Error::BadRequest(_))));
        assert!(matches!(validate_upload("noext", b"text"), Err(Error::BadRequest(_))));
        assert!(matches!(validate_upload("a.txt", b""), Err(Error::BadRequest(_))));
        assert!(matches!(validate_upload("fake.pdf", b"hello"), Err(Error::BadRequest(_))));
        assert!(matches!(validate_upload("fake.png", b"GIF89a"), Err(Error::BadRequest(_))));
    }

    #[test]
    fn overlong_names_are_rejected_before_storage() {
        let long = format!("{}.txt", "a".repeat(MAX_FILENAME_CHARS));
        assert!(matches!(validate_upload(&long, b"hello"), Err(Error::BadRequest(_))));

        let fits = format!("{}.txt", "ą".repeat(MAX_FILENAME_CHARS - 4));
        assert_eq!(validate_upload(&fits, b"hello").unwrap(), "txt");
    }

    #[test]
    fn client_paths_are_stripped_from_filenames() {
        assert_eq!(sanitize_filename("../../etc/notes.txt"), "notes.txt");
        assert_eq!(sanitize_filename("  lecture.pdf "), "lecture.pdf");
        assert_eq!(sanitize_filename(""), "upload");
    }

    #[test]
    fn checksum_is_hex_sha256() {
        assert_eq!(
            hex::encode(Sha256::digest(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
