//! Collaborator contracts for the hosting platform.
//!
//! The capsule lifecycle only ever talks to a key-value store, a one-shot
//! job scheduler, a post/comment publisher and a private messenger. New
//! hosts only need to implement these traits.

pub mod file;
pub mod memory;

use crate::capsule::CapsuleStore;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// String key-value storage. Values are JSON capsule records.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String) -> Result<()>;
}

/// Registers a named job to run once at or after an instant.
#[async_trait]
pub trait JobScheduler: Send + Sync {
    /// Returns the id of the queued job.
    async fn run_at(
        &self,
        job_name: &str,
        payload: serde_json::Value,
        at: DateTime<Utc>,
    ) -> Result<String>;

    /// Cancel a job that has not fired yet. Returns `true` when cancelled.
    async fn cancel(&self, job_id: &str) -> Result<bool>;
}

/// Post to publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub body: String,
}

/// A comment on a published post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub body: String,
    pub score: i64,
}

/// Post and comment API.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Returns the new post id.
    async fn create_post(&self, post: NewPost) -> Result<String>;

    async fn comments(&self, post_id: &str) -> Result<Vec<Comment>>;

    async fn edit_post(&self, post_id: &str, body: &str) -> Result<()>;
}

/// Private messages to a single named user.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, recipient: &str, subject: &str, text: &str) -> Result<()>;
}

/// Handles to every collaborator, shared by sessions and jobs.
#[derive(Clone)]
pub struct HostServices {
    pub store: CapsuleStore,
    pub scheduler: Arc<dyn JobScheduler>,
    pub publisher: Arc<dyn Publisher>,
    pub messenger: Arc<dyn Messenger>,
}

impl HostServices {
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        scheduler: Arc<dyn JobScheduler>,
        publisher: Arc<dyn Publisher>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            store: CapsuleStore::new(kv),
            scheduler,
            publisher,
            messenger,
        }
    }
}
