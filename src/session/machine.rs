//! Page transition rules of a capsule session.
//!
//! One [`Session`] serves one viewer. Transitions run one at a time: the
//! caller (normally the [`driver`](super::driver)) must not dispatch
//! concurrently, and every time-driven edge re-checks the current page
//! before it moves, so repeated ticks are harmless.

use super::state::{Action, Page, RetryPoint, SessionContext, SessionState};
use crate::capsule::{Capsule, CapsuleDraft, CapsuleEdit, CapsuleId};
use crate::config::CapsuleConfig;
use crate::error::{CapsuleError, Result};
use crate::reveal::RevealWorkflow;
use crate::session::selector::DateTimeSelector;
use crate::time;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// A single viewer's capsule session.
pub struct Session {
    state: SessionState,
    workflow: RevealWorkflow,
    config: CapsuleConfig,
}

impl Session {
    /// Start a session, resuming the capsule stored under the hosting post.
    ///
    /// A buried capsule opens on the teaser, or on the reveal page once its
    /// reveal instant has passed. Otherwise the session starts on the main
    /// page, holding any saved draft so the next submission replaces it.
    ///
    /// # Errors
    ///
    /// Propagates a failed capsule read.
    pub async fn load(
        workflow: RevealWorkflow,
        config: CapsuleConfig,
        context: SessionContext,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let stored = match &context.post_id {
            Some(post_id) => {
                workflow
                    .services()
                    .store
                    .load(&CapsuleId::from_post_id(post_id.as_str()))
                    .await?
            }
            None => None,
        };

        let mut state = SessionState::new(context);
        if let Some(capsule) = stored {
            let page = match (capsule.buried, capsule.is_revealed(now)) {
                (true, true) => Page::Reveal,
                (true, false) => Page::Teaser,
                (false, _) => Page::Main,
            };
            state.countdown = time::countdown(capsule.reveal_at, now);
            debug!(capsule_id = %capsule.id, %page, "resuming stored capsule");
            state.capsule = Some(capsule);
            if page != Page::Main {
                state.enter(page);
            }
        }

        Ok(Self {
            state,
            workflow,
            config,
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn page(&self) -> Page {
        self.state.page
    }

    pub fn config(&self) -> &CapsuleConfig {
        &self.config
    }

    /// Apply one action.
    ///
    /// Host failures move the session to the error page and return `Ok`;
    /// [`Action::Retry`] there repeats the failed action from the page it
    /// was dispatched on. Rejected input (bad date, blank field, past reveal, sealed capsule)
    /// leaves the page unchanged, sets [`SessionState::notice`] and is
    /// returned as `Err`. Actions that mean nothing on the current page
    /// are ignored.
    pub async fn dispatch(&mut self, action: Action, now: DateTime<Utc>) -> Result<()> {
        if self.state.page == Page::ErrorPage && action == Action::Retry {
            let Some(retry) = self.state.retry.take() else {
                debug!("retry without a pending transition");
                return Ok(());
            };
            self.state.error = None;
            self.state.enter(retry.from);
            return self.apply(retry.action, now).await;
        }
        self.apply(action, now).await
    }

    async fn apply(&mut self, action: Action, now: DateTime<Utc>) -> Result<()> {
        let page = self.state.page;
        let retry_action = action.clone();
        let result = match (page, action) {
            (Page::Main, Action::OpenAbout) => {
                self.state.enter(Page::About);
                Ok(())
            }
            (Page::About, Action::Back) => {
                self.state.enter(Page::Main);
                Ok(())
            }
            (Page::Main, Action::SubmitDraft(draft)) => self.create_draft(&draft, now).await,
            (Page::ConfirmDraft, Action::SubmitDraft(draft)) => {
                self.rewrite_draft(&draft, now).await
            }
            (Page::ConfirmDraft, Action::Edit(edit)) => self.edit(edit, now).await,
            (Page::ConfirmDraft, Action::EditRevealDate(text)) => {
                match self.parse_reveal_date(&text, now) {
                    Ok(at) => self.edit(CapsuleEdit::RevealAt(at), now).await,
                    Err(e) => Err(e),
                }
            }
            (Page::ConfirmDraft, Action::Confirm) => self.bury(now).await,
            (Page::ConfirmDraft, Action::OpenDateTimeSelector) => {
                self.open_selector();
                Ok(())
            }
            (Page::DateTimeSelector, Action::Selector(step)) => {
                if let Some(selector) = self.state.selector.as_mut() {
                    selector.apply(step);
                }
                Ok(())
            }
            (Page::DateTimeSelector, Action::ApplyDateTime) => self.apply_selector(now).await,
            (Page::DateTimeSelector, Action::Back) => {
                self.state.selector = None;
                self.state.enter(Page::ConfirmDraft);
                Ok(())
            }
            (Page::Burying, Action::Tick) => {
                if self.state.burying_until.is_none_or(|until| now >= until) {
                    self.state.burying_until = None;
                    self.state.enter(Page::BuriedSuccess);
                }
                Ok(())
            }
            (Page::BuriedSuccess, Action::ViewTeaser) => {
                self.refresh_countdown(now);
                self.state.enter(Page::Teaser);
                Ok(())
            }
            (Page::Teaser, Action::Tick) => {
                self.teaser_tick(now);
                Ok(())
            }
            (Page::Reveal, Action::Open) => {
                self.state.enter(Page::RevealContent);
                Ok(())
            }
            (Page::RevealContent, Action::Back) => {
                self.state.enter(Page::Reveal);
                Ok(())
            }
            (Page::ConfirmDraft | Page::RevealContent, Action::ViewImage) => {
                if self.capsule_image().is_some() {
                    self.state.image_return = Some(page);
                    self.state.enter(Page::ViewImage);
                } else {
                    debug!(%page, "no image to view");
                }
                Ok(())
            }
            (Page::ViewImage, Action::Back) => {
                let back = self.state.image_return.take().unwrap_or(Page::Main);
                self.state.enter(back);
                Ok(())
            }
            (Page::ErrorPage, Action::Back) => {
                self.state.error = None;
                self.state.retry = None;
                self.state.selector = None;
                self.state.enter(Page::Main);
                Ok(())
            }
            (_, Action::Tick) => Ok(()),
            (page, action) => {
                debug!(%page, ?action, "action ignored");
                Ok(())
            }
        };

        let result = match result {
            Err(e) if e.is_host_failure() => {
                warn!(%page, "host call failed: {e}");
                self.state.error = Some(e.to_string());
                self.state.retry = Some(RetryPoint {
                    from: page,
                    action: retry_action,
                });
                self.state.enter(Page::ErrorPage);
                Ok(())
            }
            other => other,
        };

        match &result {
            Ok(()) => self.state.notice = None,
            Err(e) => self.state.notice = Some(e.to_string()),
        }
        result
    }

    fn parse_reveal_date(&self, text: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        if self.config.dates.lenient_parsing {
            Ok(time::parse_local_date_time_or_now(text, now))
        } else {
            time::parse_local_date_time(text)
        }
    }

    fn capsule_id(&self, now: DateTime<Utc>) -> CapsuleId {
        match &self.state.context.post_id {
            Some(post_id) => CapsuleId::from_post_id(post_id.as_str()),
            None => CapsuleId::from_timestamp(now),
        }
    }

    fn capsule_image(&self) -> Option<&str> {
        self.state.capsule.as_ref().and_then(|c| c.image.as_deref())
    }

    /// Build a fresh draft from the form and store it.
    ///
    /// A draft already held by the session keeps its id and teaser post;
    /// the jobs its unfinished burial scheduled are cancelled first.
    async fn create_draft(&mut self, draft: &CapsuleDraft, now: DateTime<Utc>) -> Result<()> {
        draft.validate()?;
        let reveal_at = self.parse_reveal_date(&draft.reveal_date, now)?;
        time::ensure_future(reveal_at, now)?;

        let mut teaser_post_id = None;
        let id = match self.state.capsule.as_mut() {
            Some(previous) if previous.buried => {
                return Err(CapsuleError::CapsuleSealed(previous.id.to_string()));
            }
            Some(previous) => {
                self.workflow.release_jobs(previous).await?;
                teaser_post_id = previous.teaser_post_id.clone();
                previous.id.clone()
            }
            None => self.capsule_id(now),
        };
        let mut capsule = Capsule::from_draft(id, draft, reveal_at, now);
        capsule.teaser_post_id = teaser_post_id;
        self.workflow.services().store.save(&capsule).await?;
        debug!(capsule_id = %capsule.id, "draft saved");
        self.state.capsule = Some(capsule);
        self.state.enter(Page::ConfirmDraft);
        Ok(())
    }

    /// Resubmitted form: every field replaced, nothing applied unless all
    /// of them are valid.
    async fn rewrite_draft(&mut self, draft: &CapsuleDraft, now: DateTime<Utc>) -> Result<()> {
        draft.validate()?;
        let reveal_at = self.parse_reveal_date(&draft.reveal_date, now)?;
        let Some(current) = self.state.capsule.as_ref() else {
            return self.create_draft(draft, now).await;
        };
        let mut updated = current.clone();
        for edit in [
            CapsuleEdit::Title(draft.title.clone()),
            CapsuleEdit::Description(draft.description.clone()),
            CapsuleEdit::Theme(draft.theme),
            CapsuleEdit::Image(draft.image.clone()),
            CapsuleEdit::RevealAt(reveal_at),
        ] {
            updated.apply_edit(edit, now)?;
        }
        self.store_draft(updated).await
    }

    async fn edit(&mut self, edit: CapsuleEdit, now: DateTime<Utc>) -> Result<()> {
        let mut updated = self
            .state
            .capsule
            .clone()
            .ok_or_else(|| CapsuleError::InvalidDraft("no capsule to edit".to_owned()))?;
        updated.apply_edit(edit, now)?;
        self.store_draft(updated).await
    }

    /// Save an edited draft, then adopt it. The session keeps the previous
    /// draft when the write fails.
    async fn store_draft(&mut self, capsule: Capsule) -> Result<()> {
        self.workflow.services().store.save(&capsule).await?;
        debug!(capsule_id = %capsule.id, "draft saved");
        self.state.capsule = Some(capsule);
        Ok(())
    }

    fn open_selector(&mut self) {
        let Some(capsule) = &self.state.capsule else {
            return;
        };
        self.state.selector = Some(DateTimeSelector::from_instant(capsule.reveal_at));
        self.state.enter(Page::DateTimeSelector);
    }

    async fn apply_selector(&mut self, now: DateTime<Utc>) -> Result<()> {
        let Some(selector) = self.state.selector else {
            self.state.enter(Page::ConfirmDraft);
            return Ok(());
        };
        let reveal_at = selector.confirm(now)?;
        self.edit(CapsuleEdit::RevealAt(reveal_at), now).await?;
        self.state.selector = None;
        self.state.enter(Page::ConfirmDraft);
        Ok(())
    }

    async fn bury(&mut self, now: DateTime<Utc>) -> Result<()> {
        let Some(capsule) = self.state.capsule.as_mut() else {
            return Err(CapsuleError::InvalidDraft("no capsule to bury".to_owned()));
        };
        let author = self
            .state
            .context
            .username
            .clone()
            .unwrap_or_else(|| "anonymous".to_owned());

        self.workflow.bury(capsule, &author, now).await?;
        self.state.burying_until = Some(now + self.config.burying_delay());
        self.state.enter(Page::Burying);
        Ok(())
    }

    fn refresh_countdown(&mut self, now: DateTime<Utc>) {
        if let Some(capsule) = &self.state.capsule {
            self.state.countdown = time::countdown(capsule.reveal_at, now);
        }
    }

    fn teaser_tick(&mut self, now: DateTime<Utc>) {
        self.refresh_countdown(now);
        let revealed = self
            .state
            .capsule
            .as_ref()
            .is_some_and(|c| c.is_revealed(now));
        if revealed && self.state.page == Page::Teaser {
            info!("reveal instant reached");
            self.state.enter(Page::Reveal);
        }
    }
}
