//! Timecapsule: the lifecycle of a community time capsule.
//!
//! A capsule is drafted, buried until a future reveal instant, shown as a
//! teaser with a live countdown and finally revealed.
//!
//! # Architecture
//!
//! - **Time**: reveal date parsing/formatting and countdowns (`time`)
//! - **Capsule**: the persisted record and its key-value adapter (`capsule`)
//! - **Session**: the per-viewer page state machine and its screen
//!   descriptions (`session`)
//! - **Reveal**: burial side effects and the deferred reveal and
//!   notification jobs (`reveal`)
//! - **Scheduler**: the one-shot job queue and its runner (`scheduler`)
//!
//! Everything that talks to the outside world goes through the traits in
//! `host`; in-memory and file-backed implementations are included.

pub mod capsule;
pub mod config;
pub mod error;
pub mod host;
pub mod reveal;
pub mod scheduler;
pub mod session;
pub mod time;

pub use capsule::{Capsule, CapsuleDraft, CapsuleEdit, CapsuleId, CapsuleStore, Theme};
pub use config::CapsuleConfig;
pub use error::{CapsuleError, Result};
pub use host::HostServices;
pub use reveal::RevealWorkflow;
pub use scheduler::{JobQueue, JobRunner};
pub use session::{Action, Page, Session, SessionContext};
