//! Scrape job types.
//!
//! A scrape job represents one in-flight or completed trigger against the
//! scrape worker for a single source channel. Jobs are owned by the feed
//! orchestrator's coordinator and observed through a completion signal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

/// Status of a scrape job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ScrapeJobStatus {
    Pending,
    Running,
    Succeeded {
        /// Number of new items the worker ingested into the content store.
        items_ingested: u32,
    },
    Failed,
}

impl ScrapeJobStatus {
    /// Whether the job has reached a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ScrapeJobStatus::Succeeded { .. } | ScrapeJobStatus::Failed
        )
    }
}

impl fmt::Display for ScrapeJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeJobStatus::Pending => write!(f, "pending"),
            ScrapeJobStatus::Running => write!(f, "running"),
            ScrapeJobStatus::Succeeded { items_ingested } => {
                write!(f, "succeeded ({items_ingested} items)")
            }
            ScrapeJobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One scrape trigger: target channel and requester. Status lives in the
/// coordinator's completion signal, not on the job record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeJob {
    pub job_id: Uuid,
    /// Source channel handle, without the leading `@`.
    pub channel: String,
    /// User whose feed request triggered this job.
    pub requested_by: i64,
    pub created_at: DateTime<Utc>,
}

impl ScrapeJob {
    pub fn new(channel: impl Into<String>, requested_by: i64) -> Self {
        Self {
            job_id: Uuid::now_v7(),
            channel: channel.into(),
            requested_by,
            created_at: Utc::now(),
        }
    }
}

/// Result of a completed scrape call against the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeOutcome {
    pub items_ingested: u32,
}
