//! Walks one capsule from draft to reveal against in-process host services.
//!
//! Reads `timecapsule/config.toml` from the user config directory when
//! present. Storage paths in the config switch the capsule store and job
//! queue to JSON files; otherwise everything stays in memory. Diagnostics go to stderr, the
//! rendered screens to stdout.

use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use timecapsule::capsule::{CapsuleDraft, CapsuleEdit, Theme};
use timecapsule::host::file::FileStore;
use timecapsule::host::memory::{MemoryStore, RecordingMessenger, RecordingPublisher};
use timecapsule::host::{HostServices, KeyValueStore};
use timecapsule::session::{self, Action, Page, Screen, SessionContext, SessionHandle};
use timecapsule::{CapsuleConfig, JobQueue, JobRunner, RevealWorkflow, Session};

const DEMO_REVEAL_SECS: i64 = 8;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    let kv: Arc<dyn KeyValueStore> = match &config.storage.capsule_store_path {
        Some(path) => Arc::new(FileStore::open(path).context("opening capsule store")?),
        None => Arc::new(MemoryStore::new()),
    };
    let queue = match &config.storage.job_queue_path {
        Some(path) => JobQueue::open(path).context("opening job queue")?,
        None => JobQueue::new(),
    };
    let queue = Arc::new(queue.with_history_limit(config.scheduler.history_limit));
    let publisher = Arc::new(RecordingPublisher::new());
    let messenger = Arc::new(RecordingMessenger::new());

    let services = HostServices::new(kv, queue.clone(), publisher.clone(), messenger.clone());
    let workflow = RevealWorkflow::new(services, config.reveal.clone());
    let runner = JobRunner::new(queue.clone(), Arc::new(workflow.clone()))
        .with_tick_interval(config.scheduler.tick_interval_secs)
        .run();

    let now = Utc::now();
    let subreddit = if config.session.subreddit_name.is_empty() {
        "timecapsule_demo".to_owned()
    } else {
        config.session.subreddit_name.clone()
    };
    let context = SessionContext {
        subreddit_name: subreddit,
        username: Some("demo_user".to_owned()),
        post_id: Some(format!("t3_demo{}", now.timestamp_millis())),
    };
    let session = Session::load(workflow, config.clone(), context, now).await?;
    let handle = session::spawn(session);
    render(&handle.screen());

    handle
        .send(Action::SubmitDraft(CapsuleDraft {
            title: "Hello from the past".to_owned(),
            description: "If you can read this, the reveal job fired.".to_owned(),
            reveal_date: timecapsule::time::format_local_date_time(now + chrono::Duration::minutes(2)),
            theme: Theme::Prediction,
            image: None,
        }))
        .await?;
    // The form only takes whole minutes; pull the reveal in so the demo is short.
    handle
        .send(Action::Edit(CapsuleEdit::RevealAt(
            Utc::now() + chrono::Duration::seconds(DEMO_REVEAL_SECS),
        )))
        .await?;
    render(&wait_for_page(&handle, Page::ConfirmDraft, 5).await?);

    handle.send(Action::Confirm).await?;
    render(&wait_for_page(&handle, Page::Burying, 5).await?);
    render(&wait_for_page(&handle, Page::BuriedSuccess, 10).await?);

    handle.send(Action::ViewTeaser).await?;
    render(&wait_for_page(&handle, Page::Teaser, 5).await?);
    render(&wait_for_page(&handle, Page::Reveal, DEMO_REVEAL_SECS as u64 + 10).await?);

    handle.send(Action::Open).await?;
    render(&wait_for_page(&handle, Page::RevealContent, 5).await?);

    // Give the runner a couple of ticks to fire the reveal job.
    tokio::time::sleep(Duration::from_secs(config.scheduler.tick_interval_secs.max(1) * 2)).await;
    for post in publisher.posts() {
        println!("posted {}: {}\n{}\n", post.id, post.title, post.body);
    }
    for message in messenger.sent() {
        println!("message to u/{} [{}]: {}", message.recipient, message.subject, message.text);
    }

    handle.shutdown().await;
    runner.abort();
    tracing::info!("demo finished");
    Ok(())
}

fn load_config() -> anyhow::Result<CapsuleConfig> {
    let path = CapsuleConfig::default_config_path();
    if path.exists() {
        tracing::info!("loading config from {}", path.display());
        CapsuleConfig::from_file(&path).with_context(|| format!("reading {}", path.display()))
    } else {
        Ok(CapsuleConfig::default())
    }
}

async fn wait_for_page(handle: &SessionHandle, page: Page, secs: u64) -> anyhow::Result<Screen> {
    let mut screens = handle.subscribe();
    let screen = tokio::time::timeout(Duration::from_secs(secs), screens.wait_for(|s| s.page == page))
        .await
        .with_context(|| format!("timed out waiting for the {page} page"))?
        .context("session stopped")?
        .clone();
    Ok(screen)
}

fn render(screen: &Screen) {
    println!("== {} [{}] ==", screen.page, screen.background);
    println!("{}", screen.heading);
    for line in &screen.lines {
        println!("  {line}");
    }
    if let Some(art) = &screen.artwork {
        println!("  (artwork {} with {} lines)", art.asset, art.text.len());
    }
    let labels: Vec<&str> = screen.actions.iter().map(|a| a.label.as_str()).collect();
    if !labels.is_empty() {
        println!("  [{}]", labels.join("] ["));
    }
    if let Some(notice) = &screen.notice {
        println!("  ! {notice}");
    }
    println!();
}
