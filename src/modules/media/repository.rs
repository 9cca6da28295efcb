use super::model::{EncodingStatus, VideoStatus};
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Video status '{0}' not found")]
    NotFound(String),
    #[error("Video status '{name}' cannot move to {to:?}")]
    InvalidTransition { name: String, to: EncodingStatus },
    #[error("Video status '{0}' already exists")]
    Duplicate(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persisted lifecycle of encoding jobs, keyed by job name.
///
/// Every mutation stamps `updated_at`. Transitions only move forward:
/// Pending -> Processing -> Success | Failed.
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn create_pending(&self, name: &str) -> Result<VideoStatus, StoreError>;
    async fn set_processing(&self, name: &str) -> Result<VideoStatus, StoreError>;
    async fn set_success(&self, name: &str) -> Result<VideoStatus, StoreError>;
    async fn set_failed(&self, name: &str, message: &str) -> Result<VideoStatus, StoreError>;
    async fn get(&self, name: &str) -> Result<Option<VideoStatus>, StoreError>;
}

#[derive(Clone)]
pub struct PgStatusStore {
    pool: PgPool,
}

impl PgStatusStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS video_status (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name TEXT NOT NULL UNIQUE,
                status SMALLINT NOT NULL DEFAULT 0,
                message TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("✅ video_status table ready");
        Ok(())
    }

    async fn transition(
        &self,
        name: &str,
        to: EncodingStatus,
        message: Option<&str>,
    ) -> Result<VideoStatus, StoreError> {
        // Only Pending has no predecessor and it is never a transition target.
        let from = to
            .required_previous()
            .ok_or_else(|| StoreError::InvalidTransition { name: name.to_string(), to })?;

        let updated = sqlx::query_as::<_, VideoStatus>(
            r#"
            UPDATE video_status
            SET
                status = $1,
                message = $2,
                updated_at = NOW()
            WHERE name = $3 AND status = $4
            RETURNING id, name, status, message, created_at, updated_at
            "#,
        )
        .bind(to)
        .bind(message)
        .bind(name)
        .bind(from)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(record) => Ok(record),
            None => match self.get(name).await? {
                Some(_) => Err(StoreError::InvalidTransition { name: name.to_string(), to }),
                None => Err(StoreError::NotFound(name.to_string())),
            },
        }
    }
}

#[async_trait]
impl StatusStore for PgStatusStore {
    async fn create_pending(&self, name: &str) -> Result<VideoStatus, StoreError> {
        sqlx::query_as::<_, VideoStatus>(
            r#"
            INSERT INTO video_status (name, status)
            VALUES ($1, $2)
            RETURNING id, name, status, message, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(EncodingStatus::Pending)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
                StoreError::Duplicate(name.to_string())
            } else {
                StoreError::Database(e)
            }
        })
    }

    async fn set_processing(&self, name: &str) -> Result<VideoStatus, StoreError> {
        self.transition(name, EncodingStatus::Processing, None).await
    }

    async fn set_success(&self, name: &str) -> Result<VideoStatus, StoreError> {
        self.transition(name, EncodingStatus::Success, None).await
    }

    async fn set_failed(&self, name: &str, message: &str) -> Result<VideoStatus, StoreError> {
        self.transition(name, EncodingStatus::Failed, Some(message)).await
    }

    async fn get(&self, name: &str) -> Result<Option<VideoStatus>, StoreError> {
        let record = sqlx::query_as::<_, VideoStatus>(
            r#"
            SELECT id, name, status, message, created_at, updated_at
            FROM video_status
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}
