use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    TestGenerated(TestGenerated),
    FileUploaded(FileUploaded),
    MaterialUploaded(MaterialUploaded),
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::TestGenerated(_) => "test_generated",
            DomainEvent::FileUploaded(_) => "file_uploaded",
            DomainEvent::MaterialUploaded(_) => "material_uploaded",
        }
    }

    pub fn entity_id(&self) -> Uuid {
        match self {
            DomainEvent::TestGenerated(e) => e.test_id,
            DomainEvent::FileUploaded(e) => e.file_id,
            DomainEvent::MaterialUploaded(e) => e.material_id,
        }
    }

    pub fn owner_id(&self) -> Uuid {
        match self {
            DomainEvent::TestGenerated(e) => e.owner_id,
            DomainEvent::FileUploaded(e) => e.owner_id,
            DomainEvent::MaterialUploaded(e) => e.owner_id,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::TestGenerated(e) => e.occurred_at,
            DomainEvent::FileUploaded(e) => e.occurred_at,
            DomainEvent::MaterialUploaded(e) => e.occurred_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestGenerated {
    pub test_id: Uuid,
    pub owner_id: Uuid,
    pub question_count: usize,
    pub occurred_at: DateTime<Utc>,
}

impl TestGenerated {
    pub fn new(test_id: Uuid, owner_id: Uuid, question_count: usize) -> Self {
        Self {
            test_id,
            owner_id,
            question_count,
            occurred_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileUploaded {
    pub file_id: Uuid,
    pub owner_id: Uuid,
    pub checksum: String,
    pub occurred_at: DateTime<Utc>,
}

impl FileUploaded {
    pub fn new(file_id: Uuid, owner_id: Uuid, checksum: String) -> Self {
        Self {
            file_id,
            owner_id,
            checksum,
            occurred_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialUploaded {
    pub material_id: Uuid,
    pub owner_id: Uuid,
    pub checksum: String,
    pub occurred_at: DateTime<Utc>,
}

impl MaterialUploaded {
    pub fn new(material_id: Uuid, owner_id: Uuid, checksum: String) -> Self {
        Self {
            material_id,
            owner_id,
            checksum,
            occurred_at: Utc::now(),
        }
    }
}
