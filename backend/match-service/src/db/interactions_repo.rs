use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use super::InteractionStore;
use crate::error::Result;
use crate::models::{ActionKind, InteractionEvent, NewInteraction, SentMessage};

/// Postgres-backed interaction store. Events are append-only; nothing here
/// updates or deletes a recorded row.
#[derive(Clone)]
pub struct InteractionRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct InteractionRow {
    id: Uuid,
    user_id: Uuid,
    target_id: Uuid,
    action: String,
    weight: f32,
    created_at: DateTime<Utc>,
}

impl InteractionRow {
    fn into_event(self) -> Option<InteractionEvent> {
        let Some(action) = ActionKind::parse(&self.action) else {
            warn!(action = %self.action, id = %self.id, "Skipping event with unknown action kind");
            return None;
        };
        Some(InteractionEvent {
            id: self.id,
            user_id: self.user_id,
            target_id: self.target_id,
            action,
            weight: self.weight,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    recipient_id: Uuid,
    body: String,
}

impl InteractionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InteractionStore for InteractionRepository {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<InteractionEvent>> {
        let rows = sqlx::query_as::<_, InteractionRow>(
            r#"
            SELECT id, user_id, target_id, action, weight, created_at
            FROM interactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().filter_map(InteractionRow::into_event).collect())
    }

    async fn find_likes_by_source(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let targets: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT target_id
            FROM interactions
            WHERE user_id = $1 AND action = 'like'
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(targets)
    }

    async fn find_messages_by_sender(&self, user_id: Uuid) -> Result<Vec<SentMessage>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT recipient_id, body
            FROM messages
            WHERE sender_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SentMessage {
                recipient_id: row.recipient_id,
                body: row.body,
            })
            .collect())
    }

    async fn create(&self, event: NewInteraction) -> Result<InteractionEvent> {
        let row = sqlx::query_as::<_, InteractionRow>(
            r#"
            INSERT INTO interactions (user_id, target_id, action, weight)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, target_id, action, weight, created_at
            "#,
        )
        .bind(event.user_id)
        .bind(event.target_id)
        .bind(event.action.as_str())
        .bind(event.weight)
        .fetch_one(&self.pool)
        .await?;

        row.into_event().ok_or_else(|| {
            crate::error::AppError::Internal("inserted interaction row is unreadable".to_string())
        })
    }
}
