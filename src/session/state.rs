//! Pages, actions and the explicit per-session state.

use super::selector::{DateTimeSelector, SelectorAction};
use crate::capsule::{Capsule, CapsuleDraft, CapsuleEdit};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::fmt;

/// Pages kept in [`SessionState::trail`].
const TRAIL_LIMIT: usize = 64;

/// Every screen a session can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Main,
    ConfirmDraft,
    Burying,
    BuriedSuccess,
    ErrorPage,
    About,
    Teaser,
    Reveal,
    RevealContent,
    ViewImage,
    DateTimeSelector,
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Main => "main",
            Self::ConfirmDraft => "confirm_draft",
            Self::Burying => "burying",
            Self::BuriedSuccess => "buried_success",
            Self::ErrorPage => "error",
            Self::About => "about",
            Self::Teaser => "teaser",
            Self::Reveal => "reveal",
            Self::RevealContent => "reveal_content",
            Self::ViewImage => "view_image",
            Self::DateTimeSelector => "date_time_selector",
        };
        f.write_str(name)
    }
}

/// Inputs to [`Session::dispatch`](super::Session::dispatch).
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    OpenAbout,
    Back,
    /// Draft form submitted, from the main page or to rewrite a draft.
    SubmitDraft(CapsuleDraft),
    Edit(CapsuleEdit),
    /// Reveal date typed as text on the confirmation page.
    EditRevealDate(String),
    /// "Yes, Bury Capsule".
    Confirm,
    ViewTeaser,
    /// Periodic timer.
    Tick,
    /// Open a revealed capsule.
    Open,
    ViewImage,
    Retry,
    OpenDateTimeSelector,
    Selector(SelectorAction),
    ApplyDateTime,
}

/// Host facts about the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub subreddit_name: String,
    /// Viewer, recorded as the author at burial.
    pub username: Option<String>,
    /// Post hosting the session. Doubles as the capsule id.
    pub post_id: Option<String>,
}

/// The transition a retry repeats.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPoint {
    pub from: Page,
    pub action: Action,
}

/// Everything a session knows. Transitions only ever change this value.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub page: Page,
    pub context: SessionContext,
    pub capsule: Option<Capsule>,
    /// Last computed countdown, refreshed on teaser ticks.
    pub countdown: String,
    /// Message shown on the error page.
    pub error: Option<String>,
    pub retry: Option<RetryPoint>,
    /// Page to return to when leaving the image view.
    pub image_return: Option<Page>,
    /// Scratch record of the date/time selector.
    pub selector: Option<DateTimeSelector>,
    /// When the burying animation ends.
    pub burying_until: Option<DateTime<Utc>>,
    /// Validation message from the last rejected input.
    pub notice: Option<String>,
    trail: VecDeque<Page>,
}

impl SessionState {
    pub fn new(context: SessionContext) -> Self {
        let mut trail = VecDeque::with_capacity(TRAIL_LIMIT);
        trail.push_back(Page::Main);
        Self {
            page: Page::Main,
            context,
            capsule: None,
            countdown: crate::time::ZERO_COUNTDOWN.to_owned(),
            error: None,
            retry: None,
            image_return: None,
            selector: None,
            burying_until: None,
            notice: None,
            trail,
        }
    }

    /// Move to `page` and record it.
    pub(crate) fn enter(&mut self, page: Page) {
        self.page = page;
        if self.trail.len() == TRAIL_LIMIT {
            self.trail.pop_front();
        }
        self.trail.push_back(page);
    }

    /// Pages entered so far, oldest first, bounded.
    pub fn trail(&self) -> impl Iterator<Item = Page> + '_ {
        self.trail.iter().copied()
    }

    /// How many times `page` was entered.
    pub fn entries_of(&self, page: Page) -> usize {
        self.trail.iter().filter(|p| **p == page).count()
    }
}
