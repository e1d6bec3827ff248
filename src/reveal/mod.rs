//! Reveal scheduling workflow and the content it publishes.

pub mod compose;
pub mod teaser;
pub mod workflow;

pub use teaser::{TeaserLayout, TextPlacement, teaser_asset_path};
pub use workflow::{NotificationReport, RevealReport, RevealWorkflow};
