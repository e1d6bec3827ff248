//! In-process collaborators for tests, demos and single-node use.
//!
//! Each type carries a failure switch so callers can exercise the error
//! paths of the lifecycle without a real host.

use super::{Comment, KeyValueStore, Messenger, NewPost, Publisher};
use crate::error::{CapsuleError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Hash-map backed [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Raw stored value, bypassing the failure switches.
    pub fn raw(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CapsuleError::HostApiFailed(format!("read of {key} refused")));
        }
        Ok(lock(&self.entries).get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CapsuleError::StoreWriteFailed(format!("write of {key} refused")));
        }
        lock(&self.entries).insert(key.to_owned(), value);
        Ok(())
    }
}

/// A post created through [`RecordingPublisher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPost {
    pub id: String,
    pub title: String,
    pub body: String,
}

/// [`Publisher`] that keeps posts in memory and serves seeded comments.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    posts: Mutex<Vec<PublishedPost>>,
    comments: Mutex<HashMap<String, Vec<Comment>>>,
    next_id: AtomicU64,
    fail_posts: AtomicBool,
    fail_comments: AtomicBool,
    fail_edits: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_posts(&self, fail: bool) {
        self.fail_posts.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_comments(&self, fail: bool) {
        self.fail_comments.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_edits(&self, fail: bool) {
        self.fail_edits.store(fail, Ordering::SeqCst);
    }

    /// Seed a comment on a post.
    pub fn add_comment(&self, post_id: &str, author: &str, body: &str, score: i64) {
        let mut comments = lock(&self.comments);
        let list = comments.entry(post_id.to_owned()).or_default();
        let id = format!("{post_id}_c{}", list.len() + 1);
        list.push(Comment {
            id,
            author: author.to_owned(),
            body: body.to_owned(),
            score,
        });
    }

    pub fn posts(&self) -> Vec<PublishedPost> {
        lock(&self.posts).clone()
    }

    pub fn post(&self, id: &str) -> Option<PublishedPost> {
        lock(&self.posts).iter().find(|p| p.id == id).cloned()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn create_post(&self, post: NewPost) -> Result<String> {
        if self.fail_posts.load(Ordering::SeqCst) {
            return Err(CapsuleError::HostApiFailed("post submission refused".to_owned()));
        }
        let id = format!("t3_{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        lock(&self.posts).push(PublishedPost {
            id: id.clone(),
            title: post.title,
            body: post.body,
        });
        Ok(id)
    }

    async fn comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        if self.fail_comments.load(Ordering::SeqCst) {
            return Err(CapsuleError::HostApiFailed(format!("comments of {post_id} unavailable")));
        }
        Ok(lock(&self.comments).get(post_id).cloned().unwrap_or_default())
    }

    async fn edit_post(&self, post_id: &str, body: &str) -> Result<()> {
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(CapsuleError::HostApiFailed(format!("edit of {post_id} refused")));
        }
        let mut posts = lock(&self.posts);
        let post = posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| CapsuleError::HostApiFailed(format!("no post {post_id}")))?;
        post.body = body.to_owned();
        Ok(())
    }
}

/// A message delivered through [`RecordingMessenger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: String,
    pub subject: String,
    pub text: String,
}

/// [`Messenger`] that records deliveries.
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<SentMessage>>,
    unreachable: Mutex<HashSet<String>>,
    fail_all: AtomicBool,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Make deliveries to one recipient fail.
    pub fn mark_unreachable(&self, recipient: &str) {
        lock(&self.unreachable).insert(recipient.to_owned());
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_message(&self, recipient: &str, subject: &str, text: &str) -> Result<()> {
        if self.fail_all.load(Ordering::SeqCst) || lock(&self.unreachable).contains(recipient) {
            return Err(CapsuleError::HostApiFailed(format!("cannot message {recipient}")));
        }
        lock(&self.sent).push(SentMessage {
            recipient: recipient.to_owned(),
            subject: subject.to_owned(),
            text: text.to_owned(),
        });
        Ok(())
    }
}
