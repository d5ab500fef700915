use crate::error::Result;
use crate::models::question::Question;
use crate::models::test::Test;
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Opens units of work for persisting a generated test.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TestStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn TestTransaction>>;
}

/// One unit of work. Dropping it without `commit` discards every write.
#[async_trait]
pub trait TestTransaction: Send {
    async fn create_test(&mut self, test: &Test) -> Result<Test>;

    async fn add_question(&mut self, test_id: Uuid, position: i32, question: &Question) -> Result<Question>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

#[derive(Clone)]
pub struct PgTestStore {
    pool: PgPool,
}

impl PgTestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TestStore for PgTestStore {
    async fn begin(&self) -> Result<Box<dyn TestTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTestTransaction { tx }))
    }
}

pub struct PgTestTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl TestTransaction for PgTestTransaction {
    async fn create_test(&mut self, test: &Test) -> Result<Test> {
        let (id, created_at): (Uuid, chrono::DateTime<chrono::Utc>) = sqlx::query_as(
            r#"
            INSERT INTO tests (owner_id, title)
            VALUES ($1, $2)
            RETURNING id, created_at
            "#,
        )
        .bind(test.owner_id)
        .bind(&test.title)
        .fetch_one(&mut *self.tx)
        .await?;

        let mut created = Test::new(test.owner_id, &test.title);
        created.id = Some(id);
        created.created_at = Some(created_at);
        Ok(created)
    }

    async fn add_question(&mut self, test_id: Uuid, position: i32, question: &Question) -> Result<Question> {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO questions (test_id, position, text, is_closed, difficulty, choices, correct_choices)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(test_id)
        .bind(position)
        .bind(question.text())
        .bind(question.is_closed())
        .bind(i16::from(question.difficulty()))
        .bind(Json(question.choices()))
        .bind(Json(question.correct_choices()))
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(question.clone().with_id(id))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
