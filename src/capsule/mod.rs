//! Capsule record and its key-value store adapter.

pub mod model;
pub mod store;

pub use model::{Capsule, CapsuleDraft, CapsuleEdit, CapsuleId, LifecycleStage, Theme};
pub use store::CapsuleStore;
