pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod generation;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::database::test_store::PgTestStore;
use crate::error::{Error, Result};
use crate::services::{
    ai_service::GeminiClient, event_service::AuditEventSink, event_service::EventSink,
    extract_service::LocalContentExtractor, file_service::FileService,
    generation_service::GenerationService, material_service::MaterialService,
    test_service::TestService,
};
use reqwest::Client;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub jwt_secret: Arc<str>,
    pub test_service: TestService,
    pub file_service: FileService,
    pub material_service: MaterialService,
    pub generation_service: GenerationService,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        let events: Arc<dyn EventSink> = Arc::new(AuditEventSink::new(pool.clone()));
        let file_service = FileService::new(pool.clone(), &config.uploads_dir, events.clone());
        let extractor = Arc::new(LocalContentExtractor::new(&config.ocr_language));
        let material_service = MaterialService::new(
            pool.clone(),
            file_service.clone(),
            extractor.clone(),
            events.clone(),
            config.max_material_chars,
        );
        let generation_service = GenerationService::new(
            Arc::new(GeminiClient::new(http_client, config)),
            extractor,
            Arc::new(file_service.clone()),
            Arc::new(PgTestStore::new(pool.clone())),
            events,
        )
        .with_limits(config.max_source_chars, config.max_questions);

        Ok(Self {
            test_service: TestService::new(pool.clone()),
            file_service,
            material_service,
            generation_service,
            jwt_secret: Arc::from(config.jwt_secret.as_str()),
            pool,
        })
    }
}
