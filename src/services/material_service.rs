use crate::dto::material_dto::MaterialUpdate;
use crate::error::{Error, Result};
use crate::models::event::{DomainEvent, MaterialUploaded};
use crate::models::file::StoredFile;
use crate::models::material::{Material, ProcessingStatus};
use crate::services::event_service::EventSink;
use crate::services::extract_service::ContentExtractor;
use crate::services::file_service::FileService;
use crate::utils::text::truncate_chars;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Extensions accepted as study materials.
pub const MATERIAL_EXTENSIONS: [&str; 4] = ["pdf", "docx", "txt", "md"];

const EMPTY_TEXT_ERROR: &str = "Could not extract text (unsupported or empty)";

/// Uploaded study materials: the stored file plus its eagerly extracted text.
#[derive(Clone)]
pub struct MaterialService {
    pool: PgPool,
    files: FileService,
    extractor: Arc<dyn ContentExtractor>,
    events: Arc<dyn EventSink>,
    max_text_chars: usize,
}

impl MaterialService {
    pub fn new(
        pool: PgPool,
        files: FileService,
        extractor: Arc<dyn ContentExtractor>,
        events: Arc<dyn EventSink>,
        max_text_chars: usize,
    ) -> Self {
        Self {
            pool,
            files,
            extractor,
            events,
            max_text_chars,
        }
    }

    /// Stores the file, extracts its text and records the outcome. Extraction
    /// failures do not fail the upload; they end up in `processing_error`.
    pub async fn upload_material(&self, owner_id: Uuid, filename: &str, data: &[u8]) -> Result<Material> {
        check_material_extension(filename)?;

        let file = self.files.upload_file(owner_id, filename, data).await?;
        let outcome = ProcessingOutcome::from_extraction(self.extractor.extract(&file).await, self.max_text_chars);
        if let Some(reason) = &outcome.processing_error {
            tracing::warn!(file_id = %file.id, reason = %reason, "Material text extraction failed");
        }

        let inserted: std::result::Result<(Uuid, DateTime<Utc>), sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO materials
                (owner_id, file_id, mime_type, size_bytes, checksum, extracted_text, processing_status, processing_error)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, created_at
            "#,
        )
        .bind(owner_id)
        .bind(file.id)
        .bind(&file.mime_type)
        .bind(file.size_bytes)
        .bind(&file.checksum)
        .bind(&outcome.extracted_text)
        .bind(outcome.status.as_str())
        .bind(&outcome.processing_error)
        .fetch_one(&self.pool)
        .await;

        let (id, created_at) = match inserted {
            Ok(row) => row,
            Err(e) => {
                if let Err(cleanup) = self.files.delete_file(file.id, &file.stored_path).await {
                    tracing::error!(file_id = %file.id, error = %cleanup, "Failed to clean up orphaned file");
                }
                return Err(e.into());
            }
        };

        let material = outcome.into_material(id, owner_id, file, created_at);
        tracing::info!(
            material_id = %material.id,
            owner_id = %owner_id,
            status = %material.processing_status,
            "Material uploaded"
        );
        self.events.publish(DomainEvent::MaterialUploaded(MaterialUploaded::new(
            material.id,
            owner_id,
            material.checksum.clone(),
        )));
        Ok(material)
    }

    pub async fn list_materials(&self, owner_id: Uuid) -> Result<Vec<Material>> {
        let materials = sqlx::query_as::<_, Material>(
            r#"
            SELECT m.id, m.owner_id, m.file_id, f.filename, f.stored_path, m.mime_type, m.size_bytes,
                   m.checksum, m.extracted_text, m.processing_status, m.processing_error, m.created_at
            FROM materials m
            JOIN files f ON f.id = m.file_id
            WHERE m.owner_id = $1
            ORDER BY m.created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(materials)
    }

    pub async fn get_material(&self, owner_id: Uuid, material_id: Uuid) -> Result<Material> {
        sqlx::query_as::<_, Material>(
            r#"
            SELECT m.id, m.owner_id, m.file_id, f.filename, f.stored_path, m.mime_type, m.size_bytes,
                   m.checksum, m.extracted_text, m.processing_status, m.processing_error, m.created_at
            FROM materials m
            JOIN files f ON f.id = m.file_id
            WHERE m.id = $1 AND m.owner_id = $2
            "#,
        )
        .bind(material_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| material_not_found(material_id))
    }

    pub async fn update_material(&self, owner_id: Uuid, material_id: Uuid, payload: MaterialUpdate) -> Result<Material> {
        let mut material = self.get_material(owner_id, material_id).await?;
        apply_material_update(&mut material, payload, self.max_text_chars)?;

        sqlx::query(
            r#"
            UPDATE materials
            SET extracted_text = $3, processing_status = $4, processing_error = $5
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(material_id)
        .bind(owner_id)
        .bind(&material.extracted_text)
        .bind(&material.processing_status)
        .bind(&material.processing_error)
        .execute(&self.pool)
        .await?;

        tracing::info!(material_id = %material_id, status = %material.processing_status, "Material updated");
        Ok(material)
    }

    /// Deletes the material together with its underlying file.
    pub async fn delete_material(&self, owner_id: Uuid, material_id: Uuid) -> Result<()> {
        let material = self.get_material(owner_id, material_id).await?;
        self.files.delete_file(material.file_id, &material.stored_path).await?;
        tracing::info!(material_id = %material_id, "Material deleted");
        Ok(())
    }
}

fn check_material_extension(filename: &str) -> Result<()> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if MATERIAL_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(Error::BadRequest(format!(
            "Allowed material types: {}",
            MATERIAL_EXTENSIONS.join(", ")
        )))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ProcessingOutcome {
    status: ProcessingStatus,
    extracted_text: Option<String>,
    processing_error: Option<String>,
}

impl ProcessingOutcome {
    fn from_extraction(extracted: Result<String>, max_chars: usize) -> Self {
        match extracted {
            Ok(text) if !text.trim().is_empty() => Self {
                status: ProcessingStatus::Done,
                extracted_text: Some(truncate_chars(&text, max_chars).to_string()),
                processing_error: None,
            },
            Ok(_) => Self::failed(EMPTY_TEXT_ERROR.to_string()),
            Err(Error::ExtractionFailed(reason)) => Self::failed(reason),
            Err(other) => Self::failed(other.to_string()),
        }
    }

    fn failed(reason: String) -> Self {
        Self {
            status: ProcessingStatus::Failed,
            extracted_text: None,
            processing_error: Some(reason),
        }
    }

    fn into_material(self, id: Uuid, owner_id: Uuid, file: StoredFile, created_at: DateTime<Utc>) -> Material {
        Material {
            id,
            owner_id,
            file_id: file.id,
            filename: file.filename,
            stored_path: file.stored_path,
            mime_type: file.mime_type,
            size_bytes: file.size_bytes,
            checksum: file.checksum,
            extracted_text: self.extracted_text,
            processing_status: self.status.as_str().to_string(),
            processing_error: self.processing_error,
            created_at,
        }
    }
}

/// New text marks the material as processed and clears any error; an
/// explicit status is applied last and wins.
fn apply_material_update(material: &mut Material, patch: MaterialUpdate, max_chars: usize) -> Result<()> {
    let status = patch
        .processing_status
        .as_deref()
        .map(str::parse::<ProcessingStatus>)
        .transpose()?;

    if let Some(text) = patch.extracted_text {
        material.extracted_text = Some(truncate_chars(&text, max_chars).to_string());
        material.processing_status = ProcessingStatus::Done.as_str().to_string();
        material.processing_error = None;
    }
    if let Some(status) = status {
        material.processing_status = status.as_str().to_string();
    }
    Ok(())
}

fn material_not_found(material_id: Uuid) -> Error {
    Error::NotFound(format!("Material {} not found", material_id))
}
