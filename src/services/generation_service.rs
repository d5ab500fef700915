use crate::database::test_store::TestStore;
use crate::error::{Error, Result};
use crate::generation::{build_prompt, parse_generation_response, select_questions};
use crate::models::event::{DomainEvent, TestGenerated};
use crate::models::generation::{GenerationRequest, GenerationSummary};
use crate::models::test::{normalize_title, Test};
use crate::services::ai_service::GenerativeModel;
use crate::services::event_service::EventSink;
use crate::services::extract_service::ContentExtractor;
use crate::services::file_service::FileStore;
use crate::utils::text::truncate_chars;
use std::sync::Arc;
use uuid::Uuid;

/// Title used when the test was generated from pasted text and the model
/// did not name it.
pub const RAW_TEXT_TITLE: &str = "From raw text";

/// Runs the whole generation pipeline for one request:
/// source resolution, prompt, model call, parsing, quota reconciliation,
/// atomic persistence and the completion event.
#[derive(Clone)]
pub struct GenerationService {
    model: Arc<dyn GenerativeModel>,
    extractor: Arc<dyn ContentExtractor>,
    files: Arc<dyn FileStore>,
    store: Arc<dyn TestStore>,
    events: Arc<dyn EventSink>,
    max_source_chars: usize,
    max_questions: u32,
}

struct ResolvedSource {
    text: String,
    fallback_title: String,
}

impl GenerationService {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        extractor: Arc<dyn ContentExtractor>,
        files: Arc<dyn FileStore>,
        store: Arc<dyn TestStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            model,
            extractor,
            files,
            store,
            events,
            max_source_chars: 20_000,
            max_questions: 50,
        }
    }

    pub fn with_limits(mut self, max_source_chars: usize, max_questions: u32) -> Self {
        self.max_source_chars = max_source_chars;
        self.max_questions = max_questions;
        self
    }

    pub async fn generate_test_from_input(
        &self,
        request: GenerationRequest,
        owner_id: Uuid,
    ) -> Result<GenerationSummary> {
        let total = request.params.total_questions();
        if total == 0 {
            return Err(Error::InvalidRequestShape(
                "at least one question must be requested".to_string(),
            ));
        }
        if total > self.max_questions {
            return Err(Error::InvalidRequestShape(format!(
                "at most {} questions can be requested, got {}",
                self.max_questions, total
            )));
        }

        let source = self.resolve_source(&request, owner_id).await?;
        let source_text = truncate_chars(&source.text, self.max_source_chars);

        let prompt = build_prompt(source_text, &request.params);
        tracing::info!(
            owner_id = %owner_id,
            source_chars = source_text.chars().count(),
            prompt_chars = prompt.chars().count(),
            requested = total,
            "Prompt built"
        );

        let raw = self.model.invoke(&prompt).await?;
        let parsed = parse_generation_response(&raw)?;
        let parsed_count = parsed.questions.len();

        let closed_quota = request.params.closed().total() as usize;
        let open_quota = request.params.num_open() as usize;
        let selected = select_questions(parsed.questions, closed_quota, open_quota);
        tracing::info!(
            parsed = parsed_count,
            selected = selected.len(),
            closed_quota,
            open_quota,
            "Questions reconciled"
        );
        if selected.is_empty() {
            return Err(Error::EmptyGenerationResult);
        }

        let title = parsed
            .title
            .as_deref()
            .and_then(normalize_title)
            .unwrap_or(source.fallback_title);

        let mut test = Test::new(owner_id, &title);
        for question in selected {
            test.add_question(question);
        }

        let mut tx = self.store.begin().await?;
        let created = tx.create_test(&test).await?;
        let test_id = created
            .id
            .ok_or_else(|| Error::Internal("persisted test has no id".to_string()))?;
        for (position, question) in test.questions().iter().enumerate() {
            tx.add_question(test_id, position as i32, question).await?;
        }
        tx.commit().await?;

        let num_questions = test.questions().len();
        tracing::info!(test_id = %test_id, owner_id = %owner_id, num_questions, "Test generated");
        self.events.publish(DomainEvent::TestGenerated(TestGenerated::new(
            test_id,
            owner_id,
            num_questions,
        )));

        Ok(GenerationSummary {
            test_id,
            num_questions,
        })
    }

    async fn resolve_source(&self, request: &GenerationRequest, owner_id: Uuid) -> Result<ResolvedSource> {
        let file = match request.file_id {
            Some(file_id) => {
                let file = self
                    .files
                    .get_file(file_id)
                    .await?
                    .filter(|f| f.owner_id == owner_id)
                    .ok_or_else(|| {
                        tracing::warn!(file_id = %file_id, owner_id = %owner_id, "Source file not available");
                        Error::SourceNotFound(format!("file {} not found", file_id))
                    })?;
                Some(file)
            }
            None => None,
        };

        let fallback_title = file
            .as_ref()
            .and_then(|f| normalize_title(&f.filename))
            .unwrap_or_else(|| RAW_TEXT_TITLE.to_string());

        let text = match (&request.text, &file) {
            (Some(text), _) => text.clone(),
            (None, Some(file)) => self.extractor.extract(file).await?,
            (None, None) => {
                return Err(Error::InvalidRequestShape(
                    "provide either text or file_id".to_string(),
                ))
            }
        };

        Ok(ResolvedSource {
            text,
            fallback_title,
        })
    }
}
