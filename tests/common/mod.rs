#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use quizgen_backend::database::test_store::{TestStore, TestTransaction};
use quizgen_backend::error::{Error, Result};
use quizgen_backend::models::event::DomainEvent;
use quizgen_backend::models::file::StoredFile;
use quizgen_backend::models::question::Question;
use quizgen_backend::models::test::Test;
use quizgen_backend::services::ai_service::GenerativeModel;
use quizgen_backend::services::event_service::EventSink;
use quizgen_backend::services::extract_service::ContentExtractor;
use quizgen_backend::services::file_service::FileStore;
use quizgen_backend::services::generation_service::GenerationService;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Model that answers every prompt with a canned response and remembers prompts.
pub struct CannedModel {
    response: std::result::Result<String, String>,
    pub prompts: Mutex<Vec<String>>,
}

impl CannedModel {
    pub fn replying(raw: &str) -> Self {
        Self {
            response: Ok(raw.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            response: Err(reason.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl GenerativeModel for CannedModel {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.response
            .clone()
            .map_err(Error::GenerationBackend)
    }
}

/// Extractor that returns a fixed text per file name, failing on unknown files.
#[derive(Default)]
pub struct FixedExtractor {
    pub texts: HashMap<String, String>,
}

#[async_trait]
impl ContentExtractor for FixedExtractor {
    async fn extract(&self, file: &StoredFile) -> Result<String> {
        self.texts
            .get(&file.filename)
            .cloned()
            .ok_or_else(|| Error::ExtractionFailed(format!("no text in {}", file.filename)))
    }
}

#[derive(Default)]
pub struct InMemoryFiles {
    pub files: Mutex<HashMap<Uuid, StoredFile>>,
}

impl InMemoryFiles {
    pub fn insert(&self, owner_id: Uuid, filename: &str) -> Uuid {
        let file = StoredFile {
            id: Uuid::new_v4(),
            owner_id,
            filename: filename.to_string(),
            stored_path: format!("/uploads/{}", filename),
            mime_type: None,
            size_bytes: 1,
            checksum: String::new(),
            uploaded_at: Utc::now(),
        };
        let id = file.id;
        self.files.lock().unwrap().insert(id, file);
        id
    }
}

#[async_trait]
impl FileStore for InMemoryFiles {
    async fn get_file(&self, file_id: Uuid) -> Result<Option<StoredFile>> {
        Ok(self.files.lock().unwrap().get(&file_id).cloned())
    }
}

#[derive(Debug, Clone)]
pub struct StoredQuestion {
    pub test_id: Uuid,
    pub position: i32,
    pub question: Question,
}

#[derive(Default)]
pub struct Tables {
    pub tests: Vec<Test>,
    pub questions: Vec<StoredQuestion>,
}

/// Transactional in-memory store: writes become visible only on commit.
/// `fail_on_question` makes the n-th (1-based) question insert fail.
#[derive(Default)]
pub struct InMemoryStore {
    pub tables: Arc<Mutex<Tables>>,
    pub fail_on_question: Option<usize>,
}

impl InMemoryStore {
    pub fn failing_on_question(n: usize) -> Self {
        Self {
            fail_on_question: Some(n),
            ..Default::default()
        }
    }

    pub fn test_count(&self) -> usize {
        self.tables.lock().unwrap().tests.len()
    }

    pub fn question_count(&self) -> usize {
        self.tables.lock().unwrap().questions.len()
    }
}

struct InMemoryTransaction {
    tables: Arc<Mutex<Tables>>,
    pending: Tables,
    fail_on_question: Option<usize>,
}

#[async_trait]
impl TestStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn TestTransaction>> {
        Ok(Box::new(InMemoryTransaction {
            tables: self.tables.clone(),
            pending: Tables::default(),
            fail_on_question: self.fail_on_question,
        }))
    }
}

#[async_trait]
impl TestTransaction for InMemoryTransaction {
    async fn create_test(&mut self, test: &Test) -> Result<Test> {
        let mut created = Test::new(test.owner_id, &test.title);
        created.id = Some(Uuid::new_v4());
        created.created_at = Some(Utc::now());
        self.pending.tests.push(created.clone());
        Ok(created)
    }

    async fn add_question(&mut self, test_id: Uuid, position: i32, question: &Question) -> Result<Question> {
        if self.fail_on_question == Some(self.pending.questions.len() + 1) {
            return Err(Error::Internal("injected write failure".into()));
        }
        let stored = question.clone().with_id(Uuid::new_v4());
        self.pending.questions.push(StoredQuestion {
            test_id,
            position,
            question: stored.clone(),
        });
        Ok(stored)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        tables.tests.extend(self.pending.tests);
        tables.questions.extend(self.pending.questions);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingEvents {
    pub events: Mutex<Vec<DomainEvent>>,
}

impl EventSink for RecordingEvents {
    fn publish(&self, event: DomainEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub struct Pipeline {
    pub model: Arc<CannedModel>,
    pub files: Arc<InMemoryFiles>,
    pub store: Arc<InMemoryStore>,
    pub events: Arc<RecordingEvents>,
    pub service: GenerationService,
}

pub fn pipeline(model: CannedModel, extractor: FixedExtractor, store: InMemoryStore) -> Pipeline {
    let model = Arc::new(model);
    let files = Arc::new(InMemoryFiles::default());
    let store = Arc::new(store);
    let events = Arc::new(RecordingEvents::default());
    let service = GenerationService::new(
        model.clone(),
        Arc::new(extractor),
        files.clone(),
        store.clone(),
        events.clone(),
    );
    Pipeline {
        model,
        files,
        store,
        events,
        service,
    }
}

pub const THREE_QUESTIONS: &str = r#"{
  "title": "Photosynthesis basics",
  "questions": [
    {"text": "Photosynthesis needs light.", "is_closed": true, "difficulty": 1,
     "choices": ["True", "False"], "correct_choices": ["True"]},
    {"text": "Which pigment absorbs light?", "is_closed": true, "difficulty": 2,
     "choices": "[\"Chlorophyll\", \"Keratin\", \"Melanin\"]", "correct_choices": [0]},
    {"text": "Explain the role of stomata.", "is_closed": false, "difficulty": 3,
     "choices": null, "correct_choices": null}
  ]
}"#;
