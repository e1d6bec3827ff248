//! Pure description of what a session shows.
//!
//! [`describe`] turns the session state into a [`Screen`] any UI layer can
//! draw. It performs no I/O and never changes the state.

use super::selector::{SelectorAction, SelectorField};
use super::state::{Action, Page, SessionState};
use crate::capsule::Capsule;
use crate::config::CapsuleConfig;
use crate::reveal::compose;
use crate::reveal::teaser::{self, TeaserLayout, TextPlacement};

/// Background shown on every page except while burying.
pub const DEFAULT_BACKGROUND: &str = "background.jpg";
/// Background shown while burying.
pub const BURYING_BACKGROUND: &str = "digging.gif";

const TEASER_WIDTH: f32 = 800.0;
const TEASER_HEIGHT: f32 = 450.0;

const ERROR_HEADING: &str = "We are facing some issues creating your time capsule please check back a few minutes later. :(";
const ABOUT_LINES: [&str; 2] = [
    "Create a time capsule to be revealed in the future.",
    "The time capsule will be buried in the subreddit you are currently in and will be revealed on the date you set.",
];

/// What pressing a button does.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Feed this action back into the session.
    Dispatch(Action),
    /// Show the capsule draft form; its submission becomes
    /// [`Action::SubmitDraft`].
    ShowDraftForm,
    /// Navigate the viewer away.
    OpenUrl(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenAction {
    pub label: String,
    pub intent: Intent,
}

impl ScreenAction {
    fn dispatch(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            intent: Intent::Dispatch(action),
        }
    }

    fn new(label: impl Into<String>, intent: Intent) -> Self {
        Self {
            label: label.into(),
            intent,
        }
    }
}

/// Teaser image with its text placed.
#[derive(Debug, Clone, PartialEq)]
pub struct Artwork {
    pub asset: String,
    pub text: Vec<TextPlacement>,
}

/// Everything needed to draw one page.
#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    pub page: Page,
    pub background: &'static str,
    pub heading: String,
    pub lines: Vec<String>,
    pub actions: Vec<ScreenAction>,
    pub artwork: Option<Artwork>,
    /// Message from the last rejected input, if any.
    pub notice: Option<String>,
}

impl Screen {
    fn new(page: Page, heading: impl Into<String>) -> Self {
        Self {
            page,
            background: if page == Page::Burying {
                BURYING_BACKGROUND
            } else {
                DEFAULT_BACKGROUND
            },
            heading: heading.into(),
            lines: Vec::new(),
            actions: Vec::new(),
            artwork: None,
            notice: None,
        }
    }

    fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    fn action(mut self, action: ScreenAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Label lookup, mostly for hosts wiring buttons by text.
    pub fn find_action(&self, label: &str) -> Option<&ScreenAction> {
        self.actions.iter().find(|a| a.label == label)
    }
}

/// Describe the current page.
pub fn describe(state: &SessionState, config: &CapsuleConfig) -> Screen {
    let subreddit = if state.context.subreddit_name.is_empty() {
        config.session.subreddit_name.as_str()
    } else {
        state.context.subreddit_name.as_str()
    };
    let notify_line = format!(
        "You will be notified {} minutes before the reveal.",
        config.reveal.notify_lead_minutes
    );
    let capsule = state.capsule.as_ref();

    let mut screen = match state.page {
        Page::Main => Screen::new(Page::Main, format!("<Time Capsule ~ {subreddit}>"))
            .action(ScreenAction::new("Create time capsule", Intent::ShowDraftForm))
            .action(ScreenAction::dispatch("Help", Action::OpenAbout)),
        Page::ConfirmDraft => {
            let mut screen = Screen::new(Page::ConfirmDraft, "Are you sure about the capsule's content?")
                .line(format!("( Creating in {subreddit} subreddit. )"));
            if let Some(c) = capsule {
                screen = summary(screen, c);
            }
            screen = screen
                .action(ScreenAction::dispatch("Yes, Bury Capsule", Action::Confirm))
                .action(ScreenAction::new("No, Edit Content..", Intent::ShowDraftForm))
                .action(ScreenAction::dispatch(
                    "Pick reveal date",
                    Action::OpenDateTimeSelector,
                ));
            if capsule.is_some_and(|c| c.image.is_some()) {
                screen = screen.action(ScreenAction::dispatch("View image", Action::ViewImage));
            }
            screen
        }
        Page::Burying => Screen::new(Page::Burying, "Burying your time capsule...."),
        Page::BuriedSuccess => {
            let mut screen = Screen::new(Page::BuriedSuccess, "Your time capsule was successfully buried!")
                .line(format!("It will be revealed to the {subreddit} on"))
                .line(capsule.map(Capsule::reveal_date_string).unwrap_or_default())
                .line(notify_line);
            let post = state
                .context
                .post_id
                .as_deref()
                .or_else(|| capsule.and_then(|c| c.teaser_post_id.as_deref()));
            if let Some(post_id) = post {
                screen = screen.action(ScreenAction::new(
                    "See your post ->",
                    Intent::OpenUrl(compose::post_url(subreddit, post_id)),
                ));
            }
            screen.action(ScreenAction::dispatch("View teaser", Action::ViewTeaser))
        }
        Page::ErrorPage => Screen::new(Page::ErrorPage, ERROR_HEADING)
            .line(state.error.clone().unwrap_or_default())
            .action(ScreenAction::dispatch("Retry", Action::Retry))
            .action(ScreenAction::dispatch("Go Back", Action::Back)),
        Page::About => Screen::new(Page::About, "Time Capsule")
            .line(ABOUT_LINES[0])
            .line(ABOUT_LINES[1])
            .line(notify_line)
            .action(ScreenAction::dispatch("Back", Action::Back)),
        Page::Teaser => {
            let mut screen = Screen::new(
                Page::Teaser,
                capsule.map(|c| c.title.clone()).unwrap_or_default(),
            )
            .line(format!("Revealing in {}", state.countdown));
            if let Some(c) = capsule {
                let lines = teaser::teaser_lines(c);
                screen.artwork = Some(Artwork {
                    asset: teaser::teaser_asset_path(Some(c.theme)),
                    text: TeaserLayout::new(TEASER_WIDTH, TEASER_HEIGHT).place(lines.as_slice()),
                });
            }
            screen
        }
        Page::Reveal => Screen::new(Page::Reveal, "The time capsule has been revealed!")
            .line(capsule.map(|c| c.title.clone()).unwrap_or_default())
            .action(ScreenAction::dispatch("Open", Action::Open)),
        Page::RevealContent => {
            let mut screen = Screen::new(
                Page::RevealContent,
                capsule.map(|c| c.title.clone()).unwrap_or_default(),
            );
            if let Some(c) = capsule {
                screen = screen
                    .line(c.description.clone())
                    .line(format!("Theme: {}", c.theme))
                    .line(format!("Buried by u/{}", c.author_or_anonymous()))
                    .line(format!("Revealed on {}", c.reveal_date_string()));
                if c.image.is_some() {
                    screen = screen.action(ScreenAction::dispatch("View image", Action::ViewImage));
                }
            }
            screen.action(ScreenAction::dispatch("Back", Action::Back))
        }
        Page::ViewImage => Screen::new(Page::ViewImage, "Image")
            .line(capsule.and_then(|c| c.image.clone()).unwrap_or_default())
            .action(ScreenAction::dispatch("Back", Action::Back)),
        Page::DateTimeSelector => {
            let mut screen = Screen::new(Page::DateTimeSelector, "Pick the reveal date")
                .line(state.selector.map(|s| s.to_string()).unwrap_or_default());
            for field in SelectorField::ALL {
                screen = screen
                    .action(ScreenAction::dispatch(
                        format!("{} +", field.label()),
                        Action::Selector(SelectorAction::Increment(field)),
                    ))
                    .action(ScreenAction::dispatch(
                        format!("{} -", field.label()),
                        Action::Selector(SelectorAction::Decrement(field)),
                    ));
            }
            screen
                .action(ScreenAction::dispatch("Apply", Action::ApplyDateTime))
                .action(ScreenAction::dispatch("Back", Action::Back))
        }
    };

    screen.notice = state.notice.clone();
    screen
}

fn summary(screen: Screen, capsule: &Capsule) -> Screen {
    let screen = screen
        .line(format!("Title: {}", capsule.title))
        .line(format!("Description: {}", capsule.description))
        .line(format!("Theme: {}", capsule.theme))
        .line(format!("Reveal date: {}", capsule.reveal_date_string()));
    match &capsule.image {
        Some(image) => screen.line(format!("Image: {image}")),
        None => screen,
    }
}
