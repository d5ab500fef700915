use crate::models::event::DomainEvent;
use sqlx::PgPool;

/// Fire-and-forget publication of domain events. Publishing never fails the
/// caller; sinks deal with their own errors.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    fn publish(&self, event: DomainEvent);
}

/// Logs every event and records it in `domain_events` in the background.
#[derive(Clone)]
pub struct AuditEventSink {
    pool: PgPool,
}

impl AuditEventSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl EventSink for AuditEventSink {
    fn publish(&self, event: DomainEvent) {
        tracing::info!(
            event = event.name(),
            entity_id = %event.entity_id(),
            owner_id = %event.owner_id(),
            "Domain event published"
        );

        let payload = match serde_json::to_value(&event) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(event = event.name(), error = %e, "Failed to serialize domain event");
                return;
            }
        };

        let pool = self.pool.clone();
        tokio::spawn(async move {
            let result = sqlx::query(
                r#"
                INSERT INTO domain_events (event_type, entity_id, owner_id, payload, occurred_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(event.name())
            .bind(event.entity_id())
            .bind(event.owner_id())
            .bind(payload)
            .bind(event.occurred_at())
            .execute(&pool)
            .await;

            if let Err(e) = result {
                tracing::error!(event = event.name(), error = %e, "Failed to record domain event");
            }
        });
    }
}

/// Sink that only logs; used when no database is attached.
#[derive(Clone, Default)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn publish(&self, event: DomainEvent) {
        tracing::info!(
            event = event.name(),
            entity_id = %event.entity_id(),
            owner_id = %event.owner_id(),
            "Domain event published"
        );
    }
}
