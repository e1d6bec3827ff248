//! One-shot job scheduling for reveals and notifications.
//!
//! [`JobQueue`] is the durable queue behind the
//! [`JobScheduler`](crate::host::JobScheduler) contract and [`JobRunner`]
//! fires due jobs into a [`JobHandler`].

pub mod jobs;
pub mod queue;
pub mod runner;

pub use jobs::{
    JobStatus, NOTIFICATION_JOB, NotificationJobPayload, REVEAL_JOB, RevealJobPayload,
    ScheduledJob,
};
pub use queue::JobQueue;
pub use runner::{JobHandler, JobRunner, TickReport};
