//! Capsule lifecycle state machine.
//!
//! `state` holds the data, `machine` the transition rules, `screen` the
//! pure rendering description and `driver` the task that runs a session.

pub mod driver;
pub mod machine;
pub mod screen;
pub mod selector;
pub mod state;

pub use driver::{SessionHandle, spawn};
pub use machine::Session;
pub use screen::{Intent, Screen, ScreenAction, describe};
pub use selector::{DateTimeSelector, SelectorAction, SelectorField};
pub use state::{Action, Page, SessionContext, SessionState};
