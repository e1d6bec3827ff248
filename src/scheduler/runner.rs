//! Job runner background loop.
//!
//! Spawns a tokio task that periodically claims due jobs from the
//! [`JobQueue`] and hands each one to a [`JobHandler`]. A handler error
//! marks the job failed; it is logged and never retried.

use super::queue::JobQueue;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Interval between runner ticks (seconds).
const TICK_INTERVAL_SECS: u64 = 1;

/// Receives fired jobs.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn on_run(&self, job_name: &str, payload: &serde_json::Value) -> Result<()>;
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Jobs whose handler completed.
    pub completed: Vec<String>,
    /// Jobs whose handler returned an error.
    pub failed: Vec<String>,
}

impl TickReport {
    pub fn ran_any(&self) -> bool {
        !self.completed.is_empty() || !self.failed.is_empty()
    }
}

/// Drives a [`JobQueue`].
pub struct JobRunner {
    queue: Arc<JobQueue>,
    handler: Arc<dyn JobHandler>,
    tick_interval_secs: u64,
}

impl JobRunner {
    pub fn new(queue: Arc<JobQueue>, handler: Arc<dyn JobHandler>) -> Self {
        Self {
            queue,
            handler,
            tick_interval_secs: TICK_INTERVAL_SECS,
        }
    }

    /// Override the tick period. Zero is raised to one second.
    pub fn with_tick_interval(mut self, secs: u64) -> Self {
        self.tick_interval_secs = secs.max(1);
        self
    }

    /// Start the runner loop.
    pub fn run(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!("job runner started with {} pending jobs", self.queue.pending_count());
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(self.tick_interval_secs));

            loop {
                interval.tick().await;
                self.tick(Utc::now()).await;
            }
        })
    }

    /// Execute one runner tick: claim and run every job due at `now`.
    pub async fn tick(&self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();
        for job in self.queue.claim_due(now) {
            debug!(job_id = %job.id, job = %job.name, "running job");
            match self.handler.on_run(&job.name, &job.payload).await {
                Ok(()) => report.completed.push(job.id),
                Err(e) => {
                    error!(job_id = %job.id, job = %job.name, "job failed: {e}");
                    self.queue.record_failure(&job.id, &e.to_string());
                    report.failed.push(job.id);
                }
            }
        }
        report
    }
}
