//! Job records and the payloads of the two capsule jobs.

use crate::capsule::CapsuleId;
use crate::error::{CapsuleError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

/// Job that discloses a buried capsule.
pub const REVEAL_JOB: &str = "capsule_reveal";
/// Job that warns the author shortly before the reveal.
pub const NOTIFICATION_JOB: &str = "capsule_reveal_notification";

/// Payload of [`REVEAL_JOB`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealJobPayload {
    pub capsule_id: CapsuleId,
    /// User messaged once the reveal post is up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
}

/// Payload of [`NOTIFICATION_JOB`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationJobPayload {
    pub title: String,
    pub author: String,
    pub reveal_at: DateTime<Utc>,
    /// Comma-separated user names.
    pub recipients: String,
}

impl NotificationJobPayload {
    /// Individual recipients, trimmed, blanks dropped.
    pub fn recipient_list(&self) -> Vec<&str> {
        self.recipients
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .collect()
    }
}

/// Encode a payload for [`crate::host::JobScheduler::run_at`].
pub fn encode_payload<T: Serialize>(payload: &T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(payload)?)
}

/// Decode a payload handed to a job handler.
///
/// # Errors
///
/// Returns [`CapsuleError::Serialization`] naming the job on a shape mismatch.
pub fn decode_payload<T: DeserializeOwned>(job_name: &str, payload: &serde_json::Value) -> Result<T> {
    serde_json::from_value(payload.clone())
        .map_err(|e| CapsuleError::Serialization(format!("bad {job_name} payload: {e}")))
}

/// Execution state of a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for its fire time.
    Pending,
    /// Claimed and handed to the handler. Terminal.
    Fired,
    /// The handler returned an error. Terminal, never retried.
    Failed,
    /// Cancelled before it fired.
    Cancelled,
}

impl JobStatus {
    pub fn is_finished(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// One-shot job held by the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub id: String,
    pub name: String,
    pub payload: serde_json::Value,
    pub fire_at: DateTime<Utc>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl ScheduledJob {
    pub fn new(
        name: impl Into<String>,
        payload: serde_json::Value,
        fire_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            payload,
            fire_at,
            status: JobStatus::Pending,
            created_at: now,
            finished_at: None,
            last_error: None,
        }
    }

    /// Pending and its fire time has been reached.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Pending && self.fire_at <= now
    }
}
