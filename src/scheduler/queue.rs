//! Durable one-shot job queue.
//!
//! Jobs are claimed at most once: [`JobQueue::claim_due`] flips them to
//! `Fired` before any handler runs. Failed jobs stay failed; there is no
//! automatic retry. State is optionally persisted as JSON after every
//! change, in the same versioned shape as the other state files.

use super::jobs::{JobStatus, ScheduledJob};
use crate::error::{CapsuleError, Result};
use crate::host::JobScheduler;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

const DEFAULT_HISTORY_LIMIT: usize = 400;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct QueueState {
    #[serde(default = "default_state_version")]
    version: u8,
    #[serde(default)]
    jobs: Vec<ScheduledJob>,
}

fn default_state_version() -> u8 {
    1
}

/// Queue of one-shot jobs, shared between the scheduling side and the runner.
#[derive(Debug)]
pub struct JobQueue {
    jobs: Mutex<Vec<ScheduledJob>>,
    state_path: Option<PathBuf>,
    max_history_entries: usize,
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl JobQueue {
    /// In-memory queue.
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            state_path: None,
            max_history_entries: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Queue persisted at `path`, loading any jobs already there.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::Scheduler`] if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let jobs = load_jobs_from_path(&path)?;
        debug!("loaded {} jobs from {}", jobs.len(), path.display());
        Ok(Self {
            jobs: Mutex::new(jobs),
            state_path: Some(path),
            max_history_entries: DEFAULT_HISTORY_LIMIT,
        })
    }

    /// Override how many finished jobs are kept.
    pub fn with_history_limit(mut self, max_entries: usize) -> Self {
        self.max_history_entries = max_entries.max(1);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ScheduledJob>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a pending job and return its id.
    ///
    /// # Errors
    ///
    /// If the queue cannot be persisted the job is dropped again and
    /// [`CapsuleError::Scheduler`] is returned.
    pub fn enqueue(
        &self,
        name: &str,
        payload: serde_json::Value,
        fire_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let job = ScheduledJob::new(name, payload, fire_at, now);
        let id = job.id.clone();
        let mut jobs = self.lock();
        jobs.push(job);
        if let Err(e) = self.persist(&jobs) {
            jobs.retain(|j| j.id != id);
            return Err(e);
        }
        info!(job_id = %id, job = name, %fire_at, "job scheduled");
        Ok(id)
    }

    /// Mark every due job `Fired` and return them, oldest fire time first.
    ///
    /// History is trimmed before claiming, so a job claimed here keeps its
    /// record until [`Self::record_failure`] has had a chance to run.
    pub fn claim_due(&self, now: DateTime<Utc>) -> Vec<ScheduledJob> {
        let mut jobs = self.lock();
        let trimmed = self.trim_history(&mut jobs);
        let mut claimed = Vec::new();
        for job in jobs.iter_mut().filter(|j| j.is_due(now)) {
            job.status = JobStatus::Fired;
            job.finished_at = Some(now);
            claimed.push(job.clone());
        }
        if claimed.is_empty() && !trimmed {
            return claimed;
        }
        claimed.sort_by_key(|j| j.fire_at);
        if let Err(e) = self.persist(&jobs) {
            error!("cannot persist job queue: {e}");
        }
        claimed
    }

    /// Record that a fired job's handler failed.
    pub fn record_failure(&self, job_id: &str, message: &str) {
        let mut jobs = self.lock();
        let Some(job) = jobs.iter_mut().find(|j| j.id == job_id) else {
            warn!(job_id, "failure reported for unknown job: {message}");
            return;
        };
        job.status = JobStatus::Failed;
        job.last_error = Some(message.to_owned());
        if let Err(e) = self.persist(&jobs) {
            error!("cannot persist job queue: {e}");
        }
    }

    /// Cancel a pending job. Returns `false` for unknown or finished jobs.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::Scheduler`] if the change cannot be persisted.
    pub fn cancel_job(&self, job_id: &str, now: DateTime<Utc>) -> Result<bool> {
        let mut jobs = self.lock();
        let Some(job) = jobs
            .iter_mut()
            .find(|j| j.id == job_id && j.status == JobStatus::Pending)
        else {
            return Ok(false);
        };
        job.status = JobStatus::Cancelled;
        job.finished_at = Some(now);
        self.persist(&jobs)?;
        debug!(job_id, "job cancelled");
        Ok(true)
    }

    /// Snapshot of all jobs.
    pub fn jobs(&self) -> Vec<ScheduledJob> {
        self.lock().clone()
    }

    pub fn job(&self, job_id: &str) -> Option<ScheduledJob> {
        self.lock().iter().find(|j| j.id == job_id).cloned()
    }

    pub fn pending_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|j| j.status == JobStatus::Pending)
            .count()
    }

    pub fn state_path(&self) -> Option<&Path> {
        self.state_path.as_deref()
    }

    /// Drop the oldest finished jobs beyond the history limit. Returns
    /// whether anything was removed.
    fn trim_history(&self, jobs: &mut Vec<ScheduledJob>) -> bool {
        let finished = jobs.iter().filter(|j| j.status.is_finished()).count();
        if finished <= self.max_history_entries {
            return false;
        }
        let mut drop_count = finished.saturating_sub(self.max_history_entries);
        jobs.retain(|j| {
            if drop_count > 0 && j.status.is_finished() {
                drop_count -= 1;
                false
            } else {
                true
            }
        });
        true
    }

    fn persist(&self, jobs: &[ScheduledJob]) -> Result<()> {
        match &self.state_path {
            Some(path) => save_jobs_to_path(path, jobs),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl JobScheduler for JobQueue {
    async fn run_at(
        &self,
        job_name: &str,
        payload: serde_json::Value,
        at: DateTime<Utc>,
    ) -> Result<String> {
        self.enqueue(job_name, payload, at, Utc::now())
    }

    async fn cancel(&self, job_id: &str) -> Result<bool> {
        self.cancel_job(job_id, Utc::now())
    }
}

fn load_jobs_from_path(path: &Path) -> Result<Vec<ScheduledJob>> {
    let bytes = match std::fs::read(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(CapsuleError::Scheduler(format!("cannot read job queue: {e}")));
        }
    };

    let state: QueueState = serde_json::from_slice(&bytes)
        .map_err(|e| CapsuleError::Scheduler(format!("cannot parse job queue: {e}")))?;
    Ok(state.jobs)
}

fn save_jobs_to_path(path: &Path, jobs: &[ScheduledJob]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| CapsuleError::Scheduler(format!("cannot create queue dir: {e}")))?;
    }

    let state = QueueState {
        version: default_state_version(),
        jobs: jobs.to_vec(),
    };
    let json = serde_json::to_string_pretty(&state)
        .map_err(|e| CapsuleError::Scheduler(format!("cannot serialize job queue: {e}")))?;
    std::fs::write(path, json)
        .map_err(|e| CapsuleError::Scheduler(format!("cannot write job queue: {e}")))
}
