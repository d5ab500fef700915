use crate::dto::test_dto::{QuestionCreate, QuestionUpdate};
use crate::error::{Error, Result};
use crate::models::question::{Difficulty, Question, QuestionRow};
use crate::models::test::{normalize_title, Test, TestRow, TestSummary};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

/// Owner-scoped reads and edits of persisted tests. A test owned by someone
/// else is reported exactly like a missing one.
#[derive(Clone)]
pub struct TestService {
    pool: PgPool,
}

impl TestService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_tests_for_user(&self, owner_id: Uuid) -> Result<Vec<TestSummary>> {
        let tests = sqlx::query_as::<_, TestSummary>(
            r#"
            SELECT t.id, t.title, t.created_at, COUNT(q.id) AS question_count
            FROM tests t
            LEFT JOIN questions q ON q.test_id = t.id
            WHERE t.owner_id = $1
            GROUP BY t.id
            ORDER BY t.created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tests)
    }

    pub async fn get_test_detail(&self, owner_id: Uuid, test_id: Uuid) -> Result<Test> {
        let row = self.owned_test(owner_id, test_id).await?;

        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, test_id, position, text, is_closed, difficulty, choices, correct_choices
            FROM questions
            WHERE test_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;

        let mut test = Test::new(row.owner_id, &row.title);
        test.id = Some(row.id);
        test.created_at = Some(row.created_at);
        for question_row in rows {
            let question_id = question_row.id;
            let question = Question::try_from(question_row).map_err(|e| {
                tracing::error!(test_id = %test_id, question_id = %question_id, error = %e, "Stored question is invalid");
                Error::Internal(format!("stored question {} is invalid", question_id))
            })?;
            test.add_question(question);
        }
        Ok(test)
    }

    pub async fn rename_test(&self, owner_id: Uuid, test_id: Uuid, title: &str) -> Result<TestRow> {
        let title = normalize_title(title)
            .ok_or_else(|| Error::BadRequest("title cannot be empty".to_string()))?;

        let row = sqlx::query_as::<_, TestRow>(
            r#"
            UPDATE tests SET title = $3
            WHERE id = $1 AND owner_id = $2
            RETURNING id, owner_id, title, created_at
            "#,
        )
        .bind(test_id)
        .bind(owner_id)
        .bind(&title)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| test_not_found(test_id))?;

        tracing::info!(test_id = %test_id, "Test renamed");
        Ok(row)
    }

    pub async fn delete_test(&self, owner_id: Uuid, test_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM tests WHERE id = $1 AND owner_id = $2")
            .bind(test_id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(test_not_found(test_id));
        }
        tracing::info!(test_id = %test_id, "Test deleted");
        Ok(())
    }

    pub async fn add_question(&self, owner_id: Uuid, test_id: Uuid, payload: QuestionCreate) -> Result<Question> {
        let difficulty = Difficulty::try_from(payload.difficulty).map_err(as_bad_request)?;
        let question = Question::new(
            payload.text,
            payload.is_closed,
            difficulty,
            payload.choices.unwrap_or_default(),
            payload.correct_choices.unwrap_or_default(),
        )
        .map_err(as_bad_request)?;

        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent appends to the same test
        sqlx::query("SELECT id FROM tests WHERE id = $1 AND owner_id = $2 FOR UPDATE")
            .bind(test_id)
            .bind(owner_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| test_not_found(test_id))?;

        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO questions (test_id, position, text, is_closed, difficulty, choices, correct_choices)
            SELECT $1, COALESCE(MAX(position) + 1, 0), $2, $3, $4, $5, $6
            FROM questions
            WHERE test_id = $1
            RETURNING id
            "#,
        )
        .bind(test_id)
        .bind(question.text())
        .bind(question.is_closed())
        .bind(i16::from(question.difficulty()))
        .bind(Json(question.choices()))
        .bind(Json(question.correct_choices()))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(test_id = %test_id, question_id = %id, "Question added");
        Ok(question.with_id(id))
    }

    pub async fn update_question(
        &self,
        owner_id: Uuid,
        test_id: Uuid,
        question_id: Uuid,
        payload: QuestionUpdate,
    ) -> Result<Question> {
        self.owned_test(owner_id, test_id).await?;

        let current = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, test_id, position, text, is_closed, difficulty, choices, correct_choices
            FROM questions
            WHERE id = $1 AND test_id = $2
            "#,
        )
        .bind(question_id)
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| question_not_found(question_id))?;

        let updated = apply_update(current, payload)?;

        sqlx::query(
            r#"
            UPDATE questions
            SET text = $3, is_closed = $4, difficulty = $5, choices = $6, correct_choices = $7
            WHERE id = $1 AND test_id = $2
            "#,
        )
        .bind(question_id)
        .bind(test_id)
        .bind(updated.text())
        .bind(updated.is_closed())
        .bind(i16::from(updated.difficulty()))
        .bind(Json(updated.choices()))
        .bind(Json(updated.correct_choices()))
        .execute(&self.pool)
        .await?;

        tracing::info!(test_id = %test_id, question_id = %question_id, "Question updated");
        Ok(updated)
    }

    pub async fn delete_question(&self, owner_id: Uuid, test_id: Uuid, question_id: Uuid) -> Result<()> {
        self.owned_test(owner_id, test_id).await?;

        let result = sqlx::query("DELETE FROM questions WHERE id = $1 AND test_id = $2")
            .bind(question_id)
            .bind(test_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(question_not_found(question_id));
        }
        tracing::info!(test_id = %test_id, question_id = %question_id, "Question deleted");
        Ok(())
    }

    async fn owned_test(&self, owner_id: Uuid, test_id: Uuid) -> Result<TestRow> {
        sqlx::query_as::<_, TestRow>(
            r#"
            SELECT id, owner_id, title, created_at
            FROM tests
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(test_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| test_not_found(test_id))
    }
}

/// Merges a partial update into the stored question and validates the result
/// as a whole.
fn apply_update(current: QuestionRow, patch: QuestionUpdate) -> Result<Question> {
    let difficulty = Difficulty::try_from(patch.difficulty.unwrap_or(current.difficulty)).map_err(as_bad_request)?;
    let question = Question::new(
        patch.text.unwrap_or(current.text),
        patch.is_closed.unwrap_or(current.is_closed),
        difficulty,
        patch.choices.unwrap_or(current.choices.0),
        patch.correct_choices.unwrap_or(current.correct_choices.0),
    )
    .map_err(as_bad_request)?;
    Ok(question.with_id(current.id))
}

/// Shape errors on user edits are client mistakes, not model failures.
fn as_bad_request(err: Error) -> Error {
    match err {
        Error::InvalidQuestionShape(msg) => Error::BadRequest(msg),
        other => other,
    }
}

fn test_not_found(test_id: Uuid) -> Error {
    Error::NotFound(format!("Test {} not found", test_id))
}

fn question_not_found(question_id: Uuid) -> Error {
    Error::NotFound(format!("Question {} not found", question_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(is_closed: bool) -> QuestionRow {
        QuestionRow {
            id: Uuid::new_v4(),
            test_id: Uuid::new_v4(),
            position: 0,
            text: "Capital of Poland?".into(),
            is_closed,
            difficulty: 1,
            choices: Json(if is_closed { vec!["Warsaw".into(), "Krakow".into()] } else { vec![] }),
            correct_choices: Json(if is_closed { vec!["Warsaw".into()] } else { vec![] }),
        }
    }

    #[test]
    fn partial_update_keeps_untouched_fields() {
        let current = stored(true);
        let id = current.id;
        let updated = apply_update(
            current,
            QuestionUpdate {
                difficulty: Some(3),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.id(), Some(id));
        assert_eq!(updated.difficulty(), Difficulty::Hard);
        assert_eq!(updated.choices(), ["Warsaw", "Krakow"]);
    }

    #[test]
    fn update_is_validated_as_a_whole() {
        let err = apply_update(
            stored(true),
            QuestionUpdate {
                correct_choices: Some(vec!["Berlin".into()]),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));

        let err = apply_update(
            stored(false),
            QuestionUpdate {
                is_closed: Some(true),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[test]
    fn closing_an_open_question_with_choices_succeeds() {
        let updated = apply_update(
            stored(false),
            QuestionUpdate {
                is_closed: Some(true),
                choices: Some(vec!["Yes".into(), "No".into()]),
                correct_choices: Some(vec!["No".into()]),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(updated.is_closed());
        assert_eq!(updated.correct_choices(), ["No"]);
    }

    #[test]
    fn invalid_difficulty_is_a_bad_request() {
        let err = apply_update(
            stored(true),
            QuestionUpdate {
                difficulty: Some(7),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }
}
