#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Reveal and notification jobs driven through the job runner.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use timecapsule::capsule::{Capsule, CapsuleDraft, CapsuleId, Theme};
use timecapsule::host::HostServices;
use timecapsule::host::memory::{MemoryStore, RecordingMessenger, RecordingPublisher};
use timecapsule::scheduler::{JobRunner, JobStatus, REVEAL_JOB, RevealJobPayload};
use timecapsule::{CapsuleConfig, JobQueue, RevealWorkflow};

struct World {
    kv: Arc<MemoryStore>,
    queue: Arc<JobQueue>,
    publisher: Arc<RecordingPublisher>,
    messenger: Arc<RecordingMessenger>,
    workflow: RevealWorkflow,
    runner: JobRunner,
}

fn world() -> World {
    let kv = Arc::new(MemoryStore::new());
    let queue = Arc::new(JobQueue::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let messenger = Arc::new(RecordingMessenger::new());
    let services = HostServices::new(kv.clone(), queue.clone(), publisher.clone(), messenger.clone());
    let workflow = RevealWorkflow::new(services, CapsuleConfig::default().reveal);
    let runner = JobRunner::new(queue.clone(), Arc::new(workflow.clone()));
    World {
        kv,
        queue,
        publisher,
        messenger,
        workflow,
        runner,
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 10, 18, 0, 0).unwrap()
}

async fn buried(w: &World, reveal_in: Duration) -> Capsule {
    let draft = CapsuleDraft {
        title: "Team photo".into(),
        description: "Everyone at the 2026 kickoff".into(),
        reveal_date: String::new(),
        theme: Theme::Picture,
        image: Some("kickoff.jpg".into()),
    };
    let mut capsule = Capsule::from_draft(CapsuleId::from_timestamp(now()), &draft, now() + reveal_in, now());
    w.workflow.bury(&mut capsule, "photographer", now()).await.unwrap();
    capsule
}

#[tokio::test]
async fn runner_fires_notification_then_reveal() {
    let w = world();
    let capsule = buried(&w, Duration::hours(1)).await;
    let teaser = capsule.teaser_post_id.clone().unwrap();
    w.publisher.add_comment(&teaser, "guesser1", "a cat photo", 4);
    w.publisher.add_comment(&teaser, "guesser2", "the whole team", 15);
    w.publisher.add_comment(&teaser, "guesser3", "nothing", -2);

    // Nothing is due yet.
    assert!(!w.runner.tick(now() + Duration::minutes(49)).await.ran_any());

    let report = w.runner.tick(now() + Duration::minutes(50)).await;
    assert_eq!(report.completed, vec![capsule.notification_job_id.clone().unwrap()]);
    let sent = w.messenger.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "photographer");
    assert!(sent[0].text.contains("Team photo"));

    let report = w.runner.tick(now() + Duration::hours(1)).await;
    assert_eq!(report.completed, vec![capsule.reveal_job_id.clone().unwrap()]);

    let posts = w.publisher.posts();
    assert_eq!(posts.len(), 2);
    let reveal = &posts[1];
    assert_eq!(reveal.title, "Time Capsule Revealed: Team photo");
    assert!(reveal.body.contains("1. u/guesser2 (15 points): the whole team"));
    assert!(reveal.body.contains("2. u/guesser1 (4 points): a cat photo"));
    assert!(!reveal.body.contains("guesser3"));
    assert!(w.publisher.post(&teaser).unwrap().body.contains(&reveal.id));
    assert_eq!(w.messenger.sent().len(), 2);

    // Every job ran exactly once.
    assert!(!w.runner.tick(now() + Duration::days(1)).await.ran_any());
    assert!(w.queue.jobs().iter().all(|j| j.status == JobStatus::Fired));
}

#[tokio::test]
async fn missing_capsule_fails_the_job_without_retry() {
    let w = world();
    w.queue
        .enqueue(
            REVEAL_JOB,
            serde_json::to_value(RevealJobPayload {
                capsule_id: CapsuleId::from_post_id("t3_vanished"),
                recipient: Some("someone".into()),
            })
            .unwrap(),
            now(),
            now(),
        )
        .unwrap();

    let report = w.runner.tick(now()).await;
    assert_eq!(report.failed.len(), 1);
    let job = w.queue.job(&report.failed[0]).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.last_error.unwrap().contains("t3_vanished"));
    assert!(w.publisher.posts().is_empty());
    assert!(w.messenger.sent().is_empty());

    assert!(!w.runner.tick(now() + Duration::hours(1)).await.ran_any());
}

#[tokio::test]
async fn host_failures_inside_reveal_are_swallowed() {
    let w = world();
    let capsule = buried(&w, Duration::minutes(5)).await;
    w.publisher.set_fail_comments(true);
    w.publisher.set_fail_edits(true);
    w.messenger.set_fail_all(true);

    let report = w.runner.tick(now() + Duration::minutes(5)).await;
    assert_eq!(report.completed, vec![capsule.reveal_job_id.unwrap()]);
    assert!(report.failed.is_empty());
    // The reveal post still went out.
    assert_eq!(w.publisher.posts().len(), 2);
    assert!(w.publisher.posts()[1].body.contains("Nobody left a guess."));
}

#[tokio::test]
async fn store_read_failure_is_reported_to_the_queue() {
    let w = world();
    let capsule = buried(&w, Duration::minutes(5)).await;
    w.kv.set_fail_reads(true);

    let report = w.runner.tick(now() + Duration::minutes(5)).await;
    assert_eq!(report.failed, vec![capsule.reveal_job_id.clone().unwrap()]);

    let outcome = w
        .workflow
        .run_reveal(&RevealJobPayload {
            capsule_id: capsule.id.clone(),
            recipient: None,
        })
        .await;
    assert!(outcome.is_err());
}

#[tokio::test]
async fn persisted_queue_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.json");

    let kv = Arc::new(MemoryStore::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let messenger = Arc::new(RecordingMessenger::new());
    let queue = Arc::new(JobQueue::open(&path).unwrap());
    let services = HostServices::new(kv.clone(), queue.clone(), publisher.clone(), messenger.clone());
    let workflow = RevealWorkflow::new(services, CapsuleConfig::default().reveal);

    let draft = CapsuleDraft {
        title: "Restart".into(),
        description: "Survives".into(),
        reveal_date: String::new(),
        theme: Theme::Story,
        image: None,
    };
    let mut capsule = Capsule::from_draft(CapsuleId::from_post_id("t3_r"), &draft, now() + Duration::hours(2), now());
    workflow.bury(&mut capsule, "author", now()).await.unwrap();
    drop(workflow);
    drop(queue);

    // A new process picks the pending jobs back up.
    let queue = Arc::new(JobQueue::open(&path).unwrap());
    assert_eq!(queue.pending_count(), 2);
    let services = HostServices::new(kv, queue.clone(), publisher.clone(), messenger.clone());
    let runner = JobRunner::new(queue.clone(), Arc::new(RevealWorkflow::new(services, CapsuleConfig::default().reveal)));
    let report = runner.tick(now() + Duration::hours(2)).await;
    assert_eq!(report.completed.len(), 2);
    assert_eq!(queue.pending_count(), 0);
    assert!(publisher.posts().iter().any(|p| p.title == "Time Capsule Revealed: Restart"));
}
