//! SQLite session repository implementation.
//!
//! Implements `SessionRepository` from `pulsefeed-core` using sqlx with
//! split read/write pools, and `ChannelSelector` by merging the user's
//! stored subscriptions with the configured default channels.

use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::debug;

use pulsefeed_core::feed::ChannelSelector;
use pulsefeed_core::repository::SessionRepository;
use pulsefeed_types::error::RepositoryError;
use pulsefeed_types::session::{TrainingState, UserSession};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SessionRepository` and
/// `ChannelSelector`.
pub struct SqliteSessionRepository {
    pool: DatabasePool,
    /// Channels appended for every user when selecting scrape targets.
    default_channels: Vec<String>,
}

impl SqliteSessionRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool, default_channels: Vec<String>) -> Self {
        Self {
            pool,
            default_channels,
        }
    }
}

// ---------------------------------------------------------------------------
// Internal row types
// ---------------------------------------------------------------------------

struct SessionRow {
    user_id: i64,
    language: String,
    training_state: String,
    created_at: String,
    updated_at: String,
}

impl SessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            user_id: row.try_get("user_id")?,
            language: row.try_get("language")?,
            training_state: row.try_get("training_state")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_session(self) -> Result<UserSession, RepositoryError> {
        Ok(UserSession {
            user_id: self.user_id,
            language: self.language,
            training_state: self
                .training_state
                .parse()
                .map_err(RepositoryError::Query)?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid timestamp '{s}': {e}")))
}

fn map_sqlx(e: sqlx::Error) -> RepositoryError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::Connection
        }
        other => RepositoryError::Query(other.to_string()),
    }
}

impl SessionRepository for SqliteSessionRepository {
    async fn get_session(&self, user_id: i64) -> Result<Option<UserSession>, RepositoryError> {
        let row = sqlx::query(
            "SELECT user_id, language, training_state, created_at, updated_at
             FROM sessions WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(map_sqlx)?;

        match row {
            Some(row) => Ok(Some(SessionRow::from_row(&row).map_err(map_sqlx)?.into_session()?)),
            None => Ok(None),
        }
    }

    async fn upsert_session(&self, session: &UserSession) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO sessions (user_id, language, training_state, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                 language = excluded.language,
                 training_state = excluded.training_state,
                 updated_at = excluded.updated_at",
        )
        .bind(session.user_id)
        .bind(&session.language)
        .bind(session.training_state.to_string())
        .bind(session.created_at.to_rfc3339())
        .bind(session.updated_at.to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn set_training_state(
        &self,
        user_id: i64,
        state: TrainingState,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE sessions SET training_state = ?, updated_at = ? WHERE user_id = ?",
        )
        .bind(state.to_string())
        .bind(Utc::now().to_rfc3339())
        .bind(user_id)
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        debug!(user_id, %state, "training state persisted");
        Ok(())
    }

    async fn replace_subscriptions(
        &self,
        user_id: i64,
        channels: &[String],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(map_sqlx)?;

        sqlx::query("DELETE FROM subscriptions WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        let now = Utc::now().to_rfc3339();
        for channel in channels {
            sqlx::query(
                "INSERT INTO subscriptions (user_id, channel, created_at) VALUES (?, ?, ?)",
            )
            .bind(user_id)
            .bind(channel)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        }

        tx.commit().await.map_err(map_sqlx)?;
        Ok(())
    }

    async fn subscriptions(&self, user_id: i64) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT channel FROM subscriptions WHERE user_id = ? ORDER BY created_at, channel",
        )
        .bind(user_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx)?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("channel").map_err(map_sqlx))
            .collect()
    }
}

impl ChannelSelector for SqliteSessionRepository {
    /// The user's subscribed channels, with the configured defaults
    /// appended (deduplicated, subscription order first).
    async fn channels_for(&self, user_id: i64) -> Result<Vec<String>, RepositoryError> {
        let mut channels = self.subscriptions(user_id).await?;
        for channel in &self.default_channels {
            if !channels.contains(channel) {
                channels.push(channel.clone());
            }
        }
        Ok(channels)
    }
}
