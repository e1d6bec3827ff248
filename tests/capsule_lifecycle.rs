#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end capsule lifecycle through the public session API, with the
//! clock injected so time-driven transitions are deterministic.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use timecapsule::capsule::{CapsuleDraft, CapsuleEdit, CapsuleId, Theme};
use timecapsule::host::HostServices;
use timecapsule::host::memory::{MemoryStore, RecordingMessenger, RecordingPublisher};
use timecapsule::scheduler::{JobRunner, JobStatus, REVEAL_JOB};
use timecapsule::session::{Intent, describe};
use timecapsule::time;
use timecapsule::{
    Action, CapsuleConfig, CapsuleError, JobQueue, Page, RevealWorkflow, Session, SessionContext,
};

struct World {
    kv: Arc<MemoryStore>,
    queue: Arc<JobQueue>,
    publisher: Arc<RecordingPublisher>,
    workflow: RevealWorkflow,
}

fn world() -> World {
    let kv = Arc::new(MemoryStore::new());
    let queue = Arc::new(JobQueue::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let services = HostServices::new(
        kv.clone(),
        queue.clone(),
        publisher.clone(),
        Arc::new(RecordingMessenger::new()),
    );
    World {
        kv,
        queue,
        publisher,
        workflow: RevealWorkflow::new(services, CapsuleConfig::default().reveal),
    }
}

fn context() -> SessionContext {
    SessionContext {
        subreddit_name: "predictions".into(),
        username: Some("forecaster".into()),
        post_id: Some("t3_life".into()),
    }
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 5, 14, 30, 0).unwrap()
}

async fn open(w: &World, now: DateTime<Utc>) -> Session {
    Session::load(w.workflow.clone(), CapsuleConfig::default(), context(), now)
        .await
        .unwrap()
}

fn draft(reveal_date: String) -> CapsuleDraft {
    CapsuleDraft {
        title: "Election night".into(),
        description: "Turnout beats the last record".into(),
        reveal_date,
        theme: Theme::Prediction,
        image: None,
    }
}

/// Capsule revealing ten seconds after creation: teaser, then reveal after
/// ten seconds of ticks, then the original content.
#[tokio::test]
async fn ten_second_capsule_reaches_reveal_content() {
    let w = world();
    let now = start();
    let mut session = open(&w, now).await;

    // Typed dates carry whole minutes; set the exact instant with an edit.
    session
        .dispatch(
            Action::SubmitDraft(draft(time::format_local_date_time(now + Duration::minutes(1)))),
            now,
        )
        .await
        .unwrap();
    session
        .dispatch(Action::Edit(CapsuleEdit::RevealAt(now + Duration::seconds(10))), now)
        .await
        .unwrap();
    session.dispatch(Action::Confirm, now).await.unwrap();
    assert_eq!(session.page(), Page::Burying);

    // The burying animation lasts 3.5s; ticks move on to success.
    let mut clock = now;
    while session.page() == Page::Burying {
        clock += Duration::seconds(1);
        session.dispatch(Action::Tick, clock).await.unwrap();
    }
    assert_eq!(session.page(), Page::BuriedSuccess);
    assert_eq!(clock, now + Duration::seconds(4));

    session.dispatch(Action::ViewTeaser, clock).await.unwrap();
    assert_eq!(session.page(), Page::Teaser);

    while clock < now + Duration::seconds(15) {
        clock += Duration::seconds(1);
        session.dispatch(Action::Tick, clock).await.unwrap();
        let expected = if clock >= now + Duration::seconds(10) {
            Page::Reveal
        } else {
            Page::Teaser
        };
        assert_eq!(session.page(), expected, "at +{}s", (clock - now).num_seconds());
    }
    assert_eq!(session.state().entries_of(Page::Reveal), 1);

    session.dispatch(Action::Open, clock).await.unwrap();
    assert_eq!(session.page(), Page::RevealContent);
    let screen = describe(session.state(), &CapsuleConfig::default());
    assert_eq!(screen.heading, "Election night");
    assert_eq!(screen.lines[0], "Turnout beats the last record");
    assert!(screen.lines.contains(&"Theme: Prediction".to_owned()));

    // The store holds the sealed record under the hosting post id.
    let stored = w
        .workflow
        .services()
        .store
        .get(&CapsuleId::from_post_id("t3_life"))
        .await
        .unwrap();
    assert!(stored.buried);
    assert_eq!(stored.author_name.as_deref(), Some("forecaster"));
    assert_eq!(stored.reveal_at, now + Duration::seconds(10));
}

#[tokio::test]
async fn countdown_is_shown_while_waiting() {
    let w = world();
    let now = start();
    let mut session = open(&w, now).await;
    session
        .dispatch(
            Action::SubmitDraft(draft(time::format_local_date_time(now + Duration::days(2)))),
            now,
        )
        .await
        .unwrap();
    session.dispatch(Action::Confirm, now).await.unwrap();

    let later = now + Duration::hours(1) + Duration::seconds(5);
    let reopened = open(&w, later).await;
    assert_eq!(reopened.page(), Page::Teaser);
    assert_eq!(reopened.state().countdown, "1d 22h 59m 55s");

    let screen = describe(reopened.state(), &CapsuleConfig::default());
    assert_eq!(screen.lines, vec!["Revealing in 1d 22h 59m 55s"]);
    assert_eq!(
        screen.artwork.unwrap().asset,
        "/assets/teaser/prediction.jpg"
    );
}

#[tokio::test]
async fn failed_burial_recovers_through_retry() {
    let w = world();
    let now = start();
    let mut session = open(&w, now).await;
    session
        .dispatch(
            Action::SubmitDraft(draft(time::format_local_date_time(now + Duration::hours(6)))),
            now,
        )
        .await
        .unwrap();

    w.kv.set_fail_writes(true);
    session.dispatch(Action::Confirm, now).await.unwrap();
    assert_eq!(session.page(), Page::ErrorPage);
    let screen = describe(session.state(), &CapsuleConfig::default());
    assert_eq!(
        screen.find_action("Retry").unwrap().intent,
        Intent::Dispatch(Action::Retry)
    );

    w.kv.set_fail_writes(false);
    session.dispatch(Action::Retry, now).await.unwrap();
    assert_eq!(session.page(), Page::Burying);

    // One teaser post, one reveal job and one notification job in total.
    assert_eq!(w.publisher.posts().len(), 1);
    assert_eq!(w.queue.jobs().len(), 2);
}

#[tokio::test]
async fn abandoned_burial_then_new_draft_reveals_once() {
    let w = world();
    let runner = JobRunner::new(w.queue.clone(), Arc::new(w.workflow.clone()));
    let now = start();
    let mut session = open(&w, now).await;
    session
        .dispatch(
            Action::SubmitDraft(draft(time::format_local_date_time(now + Duration::hours(6)))),
            now,
        )
        .await
        .unwrap();

    w.kv.set_fail_writes(true);
    session.dispatch(Action::Confirm, now).await.unwrap();
    assert_eq!(session.page(), Page::ErrorPage);
    session.dispatch(Action::Back, now).await.unwrap();
    w.kv.set_fail_writes(false);

    let mut second = draft(time::format_local_date_time(now + Duration::hours(6)));
    second.title = "Recount".into();
    session.dispatch(Action::SubmitDraft(second), now).await.unwrap();
    session.dispatch(Action::Confirm, now).await.unwrap();
    assert_eq!(session.page(), Page::Burying);

    let report = runner.tick(now + Duration::hours(7)).await;
    assert_eq!(report.completed.len(), 2);
    assert!(report.failed.is_empty());

    let posts = w.publisher.posts();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[1].title, "Time Capsule Revealed: Recount");
    let reveal_jobs: Vec<_> = w
        .queue
        .jobs()
        .into_iter()
        .filter(|j| j.name == REVEAL_JOB)
        .collect();
    assert_eq!(reveal_jobs.len(), 2);
    assert_eq!(
        reveal_jobs.iter().filter(|j| j.status == JobStatus::Fired).count(),
        1
    );
}

#[tokio::test]
async fn submitted_draft_survives_reload() {
    let w = world();
    let now = start();
    let mut session = open(&w, now).await;
    session
        .dispatch(
            Action::SubmitDraft(draft(time::format_local_date_time(now + Duration::days(1)))),
            now,
        )
        .await
        .unwrap();

    let reopened = open(&w, now + Duration::minutes(5)).await;
    assert_eq!(reopened.page(), Page::Main);
    let capsule = reopened.state().capsule.as_ref().unwrap();
    assert_eq!(capsule.title, "Election night");
    assert!(!capsule.buried);
    assert_eq!(w.kv.len(), 1);
}

#[tokio::test]
async fn malformed_date_is_rejected_without_leaving_main() {
    let w = world();
    let mut session = open(&w, start()).await;
    let err = session
        .dispatch(Action::SubmitDraft(draft("13/40/2025 25:99 XX".into())), start())
        .await
        .unwrap_err();
    assert!(matches!(err, CapsuleError::InvalidDateFormat(_)));
    assert_eq!(session.page(), Page::Main);
    assert!(w.kv.is_empty());
}

#[tokio::test]
async fn burial_freezes_reveal_instant() {
    let w = world();
    let now = start();
    let mut session = open(&w, now).await;
    session
        .dispatch(
            Action::SubmitDraft(draft(time::format_local_date_time(now + Duration::hours(3)))),
            now,
        )
        .await
        .unwrap();
    session.dispatch(Action::Confirm, now).await.unwrap();
    let frozen = session.state().capsule.as_ref().unwrap().reveal_at;

    // Edits are not routed outside the confirmation page.
    session
        .dispatch(Action::Edit(CapsuleEdit::RevealAt(now + Duration::days(9))), now)
        .await
        .unwrap();
    // And the stored record refuses them outright.
    let id = CapsuleId::from_post_id("t3_life");
    let err = w
        .workflow
        .services()
        .store
        .update(&id, |c| c.apply_edit(CapsuleEdit::RevealAt(now + Duration::days(9)), now))
        .await
        .unwrap_err();
    assert!(matches!(err, CapsuleError::CapsuleSealed(_)));

    let stored = w.workflow.services().store.get(&id).await.unwrap();
    assert_eq!(stored.reveal_at, frozen);
    assert_eq!(session.state().capsule.as_ref().unwrap().reveal_at, frozen);
    let reveal_job = w.queue.job(stored.reveal_job_id.as_deref().unwrap()).unwrap();
    assert_eq!(reveal_job.fire_at, frozen);
}

#[tokio::test]
async fn concurrent_writes_keep_the_last_one() {
    let w = world();
    let now = start();
    let store = &w.workflow.services().store;
    let id = CapsuleId::from_post_id("t3_race");

    let mut first = timecapsule::Capsule::from_draft(
        id.clone(),
        &draft(String::new()),
        now + Duration::days(1),
        now,
    );
    let mut second = first.clone();
    first.title = "Original".into();
    second.title = "Rewritten".into();

    let (a, b) = tokio::join!(store.save(&first), store.save(&second));
    a.unwrap();
    b.unwrap();

    let stored = store.get(&id).await.unwrap();
    assert_eq!(stored.title, "Rewritten");
    assert_eq!(w.kv.len(), 1);
}
