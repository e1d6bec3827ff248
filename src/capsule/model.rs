//! The persisted capsule record and its draft/edit inputs.

use crate::error::{CapsuleError, Result};
use crate::time;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Store key of a capsule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapsuleId(String);

impl CapsuleId {
    /// Id derived from the creation instant (milliseconds since epoch).
    pub fn from_timestamp(now: DateTime<Utc>) -> Self {
        Self(now.timestamp_millis().to_string())
    }

    /// Id taken from the hosting post.
    pub fn from_post_id(post_id: impl Into<String>) -> Self {
        Self(post_id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapsuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What kind of content the capsule holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Theme {
    Prediction,
    Announcement,
    Nostalgia,
    Challenge,
    Story,
    Advice,
    Other,
    Picture,
    #[default]
    General,
}

impl Theme {
    /// Every theme, in form order.
    pub const ALL: [Theme; 9] = [
        Self::Prediction,
        Self::Announcement,
        Self::Nostalgia,
        Self::Challenge,
        Self::Story,
        Self::Advice,
        Self::Other,
        Self::Picture,
        Self::General,
    ];

    /// Label shown in forms and posts.
    pub fn label(self) -> &'static str {
        match self {
            Self::Prediction => "Prediction",
            Self::Announcement => "Announcement",
            Self::Nostalgia => "Nostalgia",
            Self::Challenge => "Challenge",
            Self::Story => "Story",
            Self::Advice => "Advice",
            Self::Other => "Other",
            Self::Picture => "Picture",
            Self::General => "General",
        }
    }

    /// Lowercase name used in asset paths.
    pub fn slug(self) -> String {
        self.label().to_ascii_lowercase()
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Theme {
    type Err = CapsuleError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CapsuleError::InvalidDraft(format!("unknown theme {wanted:?}")))
    }
}

/// Raw draft form submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapsuleDraft {
    pub title: String,
    pub description: String,
    /// Reveal date as typed, `MM/DD/YYYY HH:MM AM/PM`.
    pub reveal_date: String,
    pub theme: Theme,
    pub image: Option<String>,
}

impl CapsuleDraft {
    /// Title and description are required.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::InvalidDraft`] naming the first blank field.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(CapsuleError::InvalidDraft("title is required".to_owned()));
        }
        if self.description.trim().is_empty() {
            return Err(CapsuleError::InvalidDraft("description is required".to_owned()));
        }
        if self.reveal_date.trim().is_empty() {
            return Err(CapsuleError::InvalidDraft("reveal date is required".to_owned()));
        }
        Ok(())
    }
}

/// A single-field change made from the confirmation screen.
#[derive(Debug, Clone, PartialEq)]
pub enum CapsuleEdit {
    Title(String),
    Description(String),
    Theme(Theme),
    Image(Option<String>),
    RevealAt(DateTime<Utc>),
}

/// Where a capsule is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    /// Editable, nothing scheduled yet.
    Draft,
    /// Sealed and waiting for its reveal instant.
    Buried,
    /// Reveal instant reached.
    Revealed,
}

/// The persisted capsule record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capsule {
    pub id: CapsuleId,
    pub title: String,
    pub description: String,
    pub theme: Theme,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub reveal_at: DateTime<Utc>,
    pub buried: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teaser_post_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reveal_job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_job_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Capsule {
    /// Create an unburied capsule from a validated draft.
    pub fn from_draft(
        id: CapsuleId,
        draft: &CapsuleDraft,
        reveal_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: draft.title.trim().to_owned(),
            description: draft.description.trim().to_owned(),
            theme: draft.theme,
            image: draft.image.clone().filter(|i| !i.trim().is_empty()),
            reveal_at,
            buried: false,
            author_name: None,
            teaser_post_id: None,
            reveal_job_id: None,
            notification_job_id: None,
            created_at: now,
        }
    }

    /// Apply one field edit.
    ///
    /// # Errors
    ///
    /// [`CapsuleError::CapsuleSealed`] once buried;
    /// [`CapsuleError::RevealNotInFuture`] for a reveal instant `<= now`;
    /// [`CapsuleError::InvalidDraft`] for a blank title or description.
    pub fn apply_edit(&mut self, edit: CapsuleEdit, now: DateTime<Utc>) -> Result<()> {
        if self.buried {
            return Err(CapsuleError::CapsuleSealed(self.id.to_string()));
        }
        match edit {
            CapsuleEdit::Title(title) => {
                if title.trim().is_empty() {
                    return Err(CapsuleError::InvalidDraft("title is required".to_owned()));
                }
                self.title = title.trim().to_owned();
            }
            CapsuleEdit::Description(description) => {
                if description.trim().is_empty() {
                    return Err(CapsuleError::InvalidDraft(
                        "description is required".to_owned(),
                    ));
                }
                self.description = description.trim().to_owned();
            }
            CapsuleEdit::Theme(theme) => self.theme = theme,
            CapsuleEdit::Image(image) => self.image = image.filter(|i| !i.trim().is_empty()),
            CapsuleEdit::RevealAt(reveal_at) => {
                time::ensure_future(reveal_at, now)?;
                self.reveal_at = reveal_at;
            }
        }
        Ok(())
    }

    pub fn is_revealed(&self, now: DateTime<Utc>) -> bool {
        time::is_revealed(self.reveal_at, now)
    }

    pub fn stage(&self, now: DateTime<Utc>) -> LifecycleStage {
        match (self.buried, self.is_revealed(now)) {
            (false, _) => LifecycleStage::Draft,
            (true, false) => LifecycleStage::Buried,
            (true, true) => LifecycleStage::Revealed,
        }
    }

    /// Author recorded at burial, or a placeholder.
    pub fn author_or_anonymous(&self) -> &str {
        self.author_name.as_deref().unwrap_or("anonymous")
    }

    pub fn reveal_date_string(&self) -> String {
        time::format_local_date_time(self.reveal_at)
    }
}
