use crate::error::{Error, Result};
use crate::models::file::StoredFile;
use async_trait::async_trait;
use std::path::Path;
use tokio::fs;
use tokio::process::Command;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Best-effort plain text of a stored file.
    async fn extract(&self, file: &StoredFile) -> Result<String>;
}

/// Extracts text with local tools: plain reads for text formats,
/// `pdftotext` for PDFs, `tesseract` for images and LibreOffice for DOCX.
#[derive(Clone)]
pub struct LocalContentExtractor {
    ocr_language: String,
}

impl LocalContentExtractor {
    pub fn new(ocr_language: impl Into<String>) -> Self {
        Self {
            ocr_language: ocr_language.into(),
        }
    }

    async fn extract_pdf(&self, path: &str) -> Result<String> {
        run_tool(
            Command::new("pdftotext").arg("-layout").arg(path).arg("-"),
            "pdftotext",
        )
        .await
    }

    async fn extract_image(&self, path: &str) -> Result<String> {
        run_tool(
            Command::new("tesseract")
                .arg(path)
                .arg("stdout")
                .arg("-l")
                .arg(&self.ocr_language),
            "tesseract",
        )
        .await
    }

    async fn extract_document(&self, path: &str) -> Result<String> {
        let temp_dir = std::env::temp_dir().join(format!("quizgen_totxt_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&temp_dir).await?;

        let result = self.convert_with_libreoffice(path, &temp_dir).await;
        let _ = fs::remove_dir_all(&temp_dir).await;
        result
    }

    async fn convert_with_libreoffice(&self, path: &str, out_dir: &Path) -> Result<String> {
        run_tool(
            Command::new("libreoffice")
                .arg("--headless")
                .arg("--norestore")
                .arg("--convert-to")
                .arg("txt:Text")
                .arg("--outdir")
                .arg(out_dir)
                .arg(path),
            "libreoffice",
        )
        .await?;

        let mut entries = fs::read_dir(out_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let p = entry.path();
            if p.extension().and_then(|e| e.to_str()) == Some("txt") {
                let data = fs::read(&p).await?;
                return Ok(String::from_utf8_lossy(&data).into_owned());
            }
        }
        Err(Error::ExtractionFailed(
            "LibreOffice produced no text output".to_string(),
        ))
    }
}

#[async_trait]
impl ContentExtractor for LocalContentExtractor {
    async fn extract(&self, file: &StoredFile) -> Result<String> {
        let path = file.stored_path.as_str();
        let ext = file.extension();

        let text = match ext.as_str() {
            "txt" | "md" | "csv" => {
                let data = fs::read(path).await.map_err(|e| {
                    tracing::error!(file_id = %file.id, error = %e, "Failed to read stored file");
                    Error::ExtractionFailed(format!("could not read {}", file.filename))
                })?;
                String::from_utf8_lossy(&data).into_owned()
            }
            "pdf" => self.extract_pdf(path).await?,
            "png" | "jpg" | "jpeg" => self.extract_image(path).await?,
            "docx" => self.extract_document(path).await?,
            other => {
                return Err(Error::ExtractionFailed(format!(
                    "unsupported file type .{}",
                    other
                )))
            }
        };

        let text = text.trim().to_string();
        if text.is_empty() {
            tracing::warn!(file_id = %file.id, ext = %ext, "Extraction produced no text");
            return Err(Error::ExtractionFailed(format!(
                "no text could be extracted from {}",
                file.filename
            )));
        }

        tracing::info!(file_id = %file.id, ext = %ext, chars = text.chars().count(), "Text extracted");
        Ok(text)
    }
}

async fn run_tool(command: &mut Command, tool: &str) -> Result<String> {
    let output = command.output().await.map_err(|e| {
        tracing::error!(tool, error = %e, "Failed to run extraction tool");
        Error::ExtractionFailed(format!("{} is not available", tool))
    })?;

    if !output.status.success() {
        tracing::error!(
            tool,
            stderr = %String::from_utf8_lossy(&output.stderr),
            "Extraction tool failed"
        );
        return Err(Error::ExtractionFailed(format!("{} failed", tool)));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
