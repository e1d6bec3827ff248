//! Burial, reveal and notification workflow.
//!
//! Burial is the only step that surfaces errors: the session turns them
//! into its error page and retries. Everything that runs later inside a job
//! is best effort, so one failed host call never stops the others.

use super::compose;
use crate::capsule::{Capsule, CapsuleId};
use crate::config::RevealConfig;
use crate::error::{CapsuleError, Result};
use crate::host::{Comment, HostServices};
use crate::scheduler::jobs::{self, NOTIFICATION_JOB, REVEAL_JOB};
use crate::scheduler::{JobHandler, NotificationJobPayload, RevealJobPayload};
use crate::time;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

/// Outcome of a reveal job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RevealReport {
    pub guesses: Vec<Comment>,
    pub reveal_post_id: Option<String>,
    pub teaser_updated: bool,
    pub notified: bool,
}

/// Outcome of a notification job, per recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationReport {
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
}

/// Schedules and executes the deferred side of a capsule's lifecycle.
#[derive(Clone)]
pub struct RevealWorkflow {
    services: HostServices,
    config: RevealConfig,
}

impl RevealWorkflow {
    pub fn new(services: HostServices, config: RevealConfig) -> Self {
        Self { services, config }
    }

    pub fn services(&self) -> &HostServices {
        &self.services
    }

    /// Seal a capsule: teaser post, reveal job, notification job, then
    /// persist it with `buried = true`.
    ///
    /// Each side effect records its id on `capsule` as soon as it succeeds
    /// and is skipped when already present, so calling this again after a
    /// failure does not post or schedule anything twice. `capsule.buried`
    /// only flips once the record is stored.
    ///
    /// # Errors
    ///
    /// [`CapsuleError::CapsuleSealed`] if already buried,
    /// [`CapsuleError::RevealNotInFuture`] if the reveal instant has passed,
    /// otherwise the first failing host call.
    pub async fn bury(&self, capsule: &mut Capsule, author: &str, now: DateTime<Utc>) -> Result<()> {
        if capsule.buried {
            return Err(CapsuleError::CapsuleSealed(capsule.id.to_string()));
        }
        time::ensure_future(capsule.reveal_at, now)?;

        let author = capsule.author_name.get_or_insert_with(|| author.to_owned()).clone();

        if capsule.teaser_post_id.is_none() {
            let post = compose::teaser_post(capsule, &author);
            let post_id = self.services.publisher.create_post(post).await?;
            debug!(capsule_id = %capsule.id, %post_id, "teaser posted");
            capsule.teaser_post_id = Some(post_id);
        }

        if capsule.reveal_job_id.is_none() {
            let job_id = self
                .schedule_reveal(&capsule.id, capsule.reveal_at, Some(author.clone()))
                .await?;
            capsule.reveal_job_id = Some(job_id);
        }

        let notify_at = capsule.reveal_at - self.config.notify_lead();
        if capsule.notification_job_id.is_none() && time::is_future(notify_at, now) {
            let payload = NotificationJobPayload {
                title: capsule.title.clone(),
                author: author.clone(),
                reveal_at: capsule.reveal_at,
                recipients: author.clone(),
            };
            let job_id = self.schedule_notification(&payload, notify_at).await?;
            capsule.notification_job_id = Some(job_id);
        }

        let mut sealed = capsule.clone();
        sealed.buried = true;
        self.services.store.save(&sealed).await?;
        *capsule = sealed;
        info!(capsule_id = %capsule.id, reveal_at = %capsule.reveal_at, "capsule buried");
        Ok(())
    }

    /// Cancel the jobs an unfinished burial left behind and forget their ids.
    ///
    /// Each id is cleared as soon as its job is cancelled, so a failure
    /// part way through leaves only the remaining id on `capsule`.
    ///
    /// # Errors
    ///
    /// [`CapsuleError::CapsuleSealed`] if the capsule is buried, otherwise
    /// the first failing scheduler call.
    pub async fn release_jobs(&self, capsule: &mut Capsule) -> Result<()> {
        if capsule.buried {
            return Err(CapsuleError::CapsuleSealed(capsule.id.to_string()));
        }
        for slot in [&mut capsule.reveal_job_id, &mut capsule.notification_job_id] {
            if let Some(job_id) = slot.as_deref() {
                let cancelled = self.services.scheduler.cancel(job_id).await?;
                debug!(capsule_id = %capsule.id, job_id, cancelled, "released job");
                *slot = None;
            }
        }
        Ok(())
    }

    /// Register the one-shot reveal job.
    pub async fn schedule_reveal(
        &self,
        capsule_id: &CapsuleId,
        fire_at: DateTime<Utc>,
        recipient: Option<String>,
    ) -> Result<String> {
        let payload = jobs::encode_payload(&RevealJobPayload {
            capsule_id: capsule_id.clone(),
            recipient,
        })?;
        self.services
            .scheduler
            .run_at(REVEAL_JOB, payload, fire_at)
            .await
    }

    /// Register the one-shot pre-reveal notification job.
    pub async fn schedule_notification(
        &self,
        payload: &NotificationJobPayload,
        fire_at: DateTime<Utc>,
    ) -> Result<String> {
        let payload = jobs::encode_payload(payload)?;
        self.services
            .scheduler
            .run_at(NOTIFICATION_JOB, payload, fire_at)
            .await
    }

    /// Body of the reveal job.
    ///
    /// # Errors
    ///
    /// Only a failed capsule read is returned; later steps are logged.
    pub async fn run_reveal(&self, payload: &RevealJobPayload) -> Result<RevealReport> {
        let capsule = match self.services.store.get(&payload.capsule_id).await {
            Ok(capsule) => capsule,
            Err(e) => {
                error!(capsule_id = %payload.capsule_id, "cannot load capsule for reveal: {e}");
                return Err(e);
            }
        };

        let mut report = RevealReport::default();

        if let Some(teaser_id) = &capsule.teaser_post_id {
            match self.services.publisher.comments(teaser_id).await {
                Ok(comments) => {
                    report.guesses = compose::rank_guesses(comments, self.config.guess_count);
                }
                Err(e) => warn!(capsule_id = %capsule.id, "cannot fetch guesses: {e}"),
            }
        }

        let post = compose::reveal_post(&capsule, &report.guesses);
        match self.services.publisher.create_post(post).await {
            Ok(post_id) => {
                info!(capsule_id = %capsule.id, %post_id, "capsule revealed");
                report.reveal_post_id = Some(post_id);
            }
            Err(e) => warn!(capsule_id = %capsule.id, "cannot publish reveal post: {e}"),
        }

        if let (Some(teaser_id), Some(reveal_id)) = (&capsule.teaser_post_id, &report.reveal_post_id) {
            let body = compose::teaser_revealed_body(reveal_id);
            match self.services.publisher.edit_post(teaser_id, &body).await {
                Ok(()) => report.teaser_updated = true,
                Err(e) => warn!(capsule_id = %capsule.id, "cannot update teaser post: {e}"),
            }
        }

        if let Some(recipient) = &payload.recipient {
            let text = compose::reveal_message(&capsule, report.reveal_post_id.as_deref());
            match self
                .services
                .messenger
                .send_message(recipient, &self.config.message_subject, &text)
                .await
            {
                Ok(()) => report.notified = true,
                Err(e) => warn!(capsule_id = %capsule.id, %recipient, "cannot notify: {e}"),
            }
        }

        Ok(report)
    }

    /// Body of the notification job. Never fails; each recipient is
    /// messaged independently.
    pub async fn run_notification(&self, payload: &NotificationJobPayload) -> NotificationReport {
        let text = compose::notification_message(payload);
        let mut report = NotificationReport::default();
        for recipient in payload.recipient_list() {
            match self
                .services
                .messenger
                .send_message(recipient, &self.config.message_subject, &text)
                .await
            {
                Ok(()) => {
                    debug!(recipient, "reveal notification sent");
                    report.delivered.push(recipient.to_owned());
                }
                Err(e) => {
                    warn!(recipient, "cannot send reveal notification: {e}");
                    report.failed.push(recipient.to_owned());
                }
            }
        }
        report
    }
}

#[async_trait]
impl JobHandler for RevealWorkflow {
    async fn on_run(&self, job_name: &str, payload: &serde_json::Value) -> Result<()> {
        match job_name {
            REVEAL_JOB => {
                let payload: RevealJobPayload = jobs::decode_payload(job_name, payload)?;
                self.run_reveal(&payload).await.map(|_| ())
            }
            NOTIFICATION_JOB => {
                let payload: NotificationJobPayload = jobs::decode_payload(job_name, payload)?;
                self.run_notification(&payload).await;
                Ok(())
            }
            other => Err(CapsuleError::Scheduler(format!("unknown job {other:?}"))),
        }
    }
}
