//! Session event loop.
//!
//! A single task owns the [`Session`] and serialises viewer actions with
//! the periodic tick, so the countdown never races a user transition.
//! Every change of the described screen is published on a watch channel.

use super::machine::Session;
use super::screen::{Screen, describe};
use super::state::Action;
use crate::error::{CapsuleError, Result};
use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const ACTION_QUEUE_DEPTH: usize = 32;

/// Handle to a running session task.
pub struct SessionHandle {
    actions: mpsc::Sender<Action>,
    screens: watch::Receiver<Screen>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Queue an action for the session.
    ///
    /// # Errors
    ///
    /// [`CapsuleError::SessionClosed`] once the task has stopped.
    pub async fn send(&self, action: Action) -> Result<()> {
        self.actions
            .send(action)
            .await
            .map_err(|_| CapsuleError::SessionClosed)
    }

    /// The most recently published screen.
    pub fn screen(&self) -> Screen {
        self.screens.borrow().clone()
    }

    /// A receiver that is notified on each screen change.
    pub fn subscribe(&self) -> watch::Receiver<Screen> {
        self.screens.clone()
    }

    /// Stop accepting actions and wait for the task to finish.
    pub async fn shutdown(self) {
        drop(self.actions);
        if let Err(e) = self.task.await {
            debug!("session task ended abnormally: {e}");
        }
    }
}

/// Run `session` on its own task.
pub fn spawn(session: Session) -> SessionHandle {
    let tick_ms = session.config().session.tick_interval_ms.max(1);
    let (action_tx, mut action_rx) = mpsc::channel(ACTION_QUEUE_DEPTH);
    let (screen_tx, screen_rx) = watch::channel(describe(session.state(), session.config()));

    let task = tokio::spawn(async move {
        let mut session = session;
        let mut tick = tokio::time::interval(std::time::Duration::from_millis(tick_ms));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        info!(page = %session.page(), "session started");

        loop {
            let action = tokio::select! {
                received = action_rx.recv() => match received {
                    Some(action) => action,
                    None => break,
                },
                _ = tick.tick() => Action::Tick,
            };

            if let Err(e) = session.dispatch(action, Utc::now()).await {
                debug!("input rejected: {e}");
            }

            let screen = describe(session.state(), session.config());
            screen_tx.send_if_modified(|current| {
                if *current == screen {
                    false
                } else {
                    *current = screen;
                    true
                }
            });
        }

        info!(page = %session.page(), "session closed");
    });

    SessionHandle {
        actions: action_tx,
        screens: screen_rx,
        task,
    }
}
