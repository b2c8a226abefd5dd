//! End-to-end review loop against in-process collaborators.

use std::sync::Arc;
use std::time::Duration;

use draftloop_core::testing::{
    EchoGenerator, FailAfterGenerator, FailingSearcher, GatedGenerator, StaticSearcher,
};
use draftloop_core::tools::{Searcher, TextGenerator};
use draftloop_core::{
    Coordinator, CoordinatorConfig, FeedbackOutcome, FinishReason, PipelineError, SessionStatus,
    StatusSnapshot,
};
use tokio_test::assert_ok;

const POLL: Duration = Duration::from_millis(5);

fn coordinator_with(
    generator: Arc<dyn TextGenerator>,
    searcher: Arc<dyn Searcher>,
) -> Coordinator {
    Coordinator::new(CoordinatorConfig::default(), generator, searcher)
}

fn coordinator() -> Coordinator {
    coordinator_with(
        Arc::new(EchoGenerator::new()),
        Arc::new(StaticSearcher::new("solar capacity grew 24% last year")),
    )
}

async fn settle(coordinator: &Coordinator, id: &str) -> StatusSnapshot {
    tokio::time::timeout(
        Duration::from_secs(5),
        coordinator.wait_until_settled(id, POLL),
    )
    .await
    .expect("session did not settle")
    .expect("session vanished")
}

#[tokio::test]
async fn test_solar_energy_review_loop() {
    let coordinator = coordinator();

    let id = assert_ok!(coordinator.start_session("solar energy").await);
    let first = settle(&coordinator, &id).await;
    assert_eq!(first.status, SessionStatus::Interrupted);
    assert_eq!(first.revision_count, 0);
    assert!(first.draft.contains("solar capacity grew 24% last year"));
    assert!(first.research_notes.contains("solar energy"));

    let outcome = assert_ok!(
        coordinator
            .submit_feedback(&id, "revise", Some("add more statistics"))
            .await
    );
    assert_eq!(outcome, FeedbackOutcome::Revising);

    let revised = settle(&coordinator, &id).await;
    assert_eq!(revised.status, SessionStatus::Interrupted);
    assert_eq!(revised.revision_count, 1);
    assert_ne!(revised.draft, first.draft);
    assert!(revised.draft.contains("add more statistics"));

    let outcome = assert_ok!(coordinator.submit_feedback(&id, "approve", None).await);
    assert_eq!(outcome, FeedbackOutcome::Finalized(FinishReason::Approved));

    let done = assert_ok!(coordinator.get_status(&id).await);
    assert_eq!(done.status, SessionStatus::Finished);
    assert_eq!(done.draft, revised.draft);
    assert_eq!(done.finish_reason, Some(FinishReason::Approved));
}

#[tokio::test]
async fn test_search_failure_ends_in_error() {
    let coordinator = coordinator_with(
        Arc::new(EchoGenerator::new()),
        Arc::new(FailingSearcher::new("search backend unavailable")),
    );

    let id = assert_ok!(coordinator.start_session("solar energy").await);
    let status = settle(&coordinator, &id).await;

    assert_eq!(status.status, SessionStatus::Error);
    let detail = status.error_detail.expect("error detail");
    assert!(!detail.is_empty());
    assert!(detail.contains("search backend unavailable"));
    assert!(status.draft.is_empty());
}

#[tokio::test]
async fn test_revision_write_failure_keeps_previous_draft() {
    // Research and the first draft succeed, the revision call fails
    let coordinator = coordinator_with(
        Arc::new(FailAfterGenerator::new(2, "quota exceeded")),
        Arc::new(StaticSearcher::new("solar capacity grew 24% last year")),
    );

    let id = assert_ok!(coordinator.start_session("solar energy").await);
    let first = settle(&coordinator, &id).await;
    assert_eq!(first.status, SessionStatus::Interrupted);

    let outcome = assert_ok!(
        coordinator
            .submit_feedback(&id, "revise", Some("add more statistics"))
            .await
    );
    assert_eq!(outcome, FeedbackOutcome::Revising);

    let failed = settle(&coordinator, &id).await;
    assert_eq!(failed.status, SessionStatus::Error);
    assert_eq!(
        failed.error_detail.as_deref(),
        Some("write stage failed: quota exceeded")
    );
    assert_eq!(failed.revision_count, 0);
    assert_eq!(failed.draft, first.draft);

    let err = coordinator
        .submit_feedback(&id, "approve", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InvalidState {
            status: SessionStatus::Error,
            ..
        }
    ));
}

#[tokio::test]
async fn test_unknown_id_is_not_found_everywhere() {
    let coordinator = coordinator();

    assert_eq!(
        coordinator.get_status("missing").await.unwrap_err(),
        PipelineError::NotFound("missing".into())
    );
    assert_eq!(
        coordinator
            .submit_feedback("missing", "approve", None)
            .await
            .unwrap_err(),
        PipelineError::NotFound("missing".into())
    );
    assert_eq!(
        coordinator
            .submit_feedback("missing", "revise", Some("more"))
            .await
            .unwrap_err(),
        PipelineError::NotFound("missing".into())
    );
}

#[tokio::test]
async fn test_approve_after_finish_is_rejected() {
    let coordinator = coordinator();
    let id = assert_ok!(coordinator.start_session("solar energy").await);
    settle(&coordinator, &id).await;

    assert_ok!(coordinator.submit_feedback(&id, "approve", None).await);
    let finished = assert_ok!(coordinator.get_status(&id).await);

    let err = coordinator
        .submit_feedback(&id, "approve", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InvalidState {
            status: SessionStatus::Finished,
            ..
        }
    ));
    assert_eq!(assert_ok!(coordinator.get_status(&id).await), finished);
}

#[tokio::test]
async fn test_feedback_while_running_is_rejected() {
    let generator = Arc::new(GatedGenerator::new());
    let coordinator = coordinator_with(
        generator.clone(),
        Arc::new(StaticSearcher::new("notes")),
    );

    let id = assert_ok!(coordinator.start_session("solar energy").await);
    // Research is blocked on the gate
    tokio::time::sleep(Duration::from_millis(20)).await;
    let before = assert_ok!(coordinator.get_status(&id).await);
    assert_eq!(before.status, SessionStatus::Running);

    for action in ["approve", "revise"] {
        let err = coordinator
            .submit_feedback(&id, action, Some("shorter"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidState {
                status: SessionStatus::Running,
                ..
            }
        ));
    }
    assert_eq!(assert_ok!(coordinator.get_status(&id).await), before);

    generator.release(2);
    let settled = settle(&coordinator, &id).await;
    assert_eq!(settled.status, SessionStatus::Interrupted);
    assert_eq!(generator.calls(), 2);
}

#[tokio::test]
async fn test_each_revise_increments_once() {
    let coordinator = coordinator();
    let id = assert_ok!(coordinator.start_session("solar energy").await);
    let mut previous = settle(&coordinator, &id).await;

    for round in 1..=3 {
        let feedback = format!("revision round {}", round);
        assert_ok!(
            coordinator
                .submit_feedback(&id, "revise", Some(&feedback))
                .await
        );
        let current = settle(&coordinator, &id).await;
        assert_eq!(current.status, SessionStatus::Interrupted);
        assert_eq!(current.revision_count, previous.revision_count + 1);
        assert_ne!(current.draft, previous.draft);
        previous = current;
    }
}

#[tokio::test]
async fn test_revision_cap_finalizes() {
    let config = CoordinatorConfig {
        max_revisions: 1,
        ..Default::default()
    };
    let coordinator = Coordinator::new(
        config,
        Arc::new(EchoGenerator::new()),
        Arc::new(StaticSearcher::new("notes")),
    );
    let id = assert_ok!(coordinator.start_session("solar energy").await);
    settle(&coordinator, &id).await;

    assert_ok!(coordinator.submit_feedback(&id, "revise", Some("one")).await);
    let revised = settle(&coordinator, &id).await;

    let outcome = assert_ok!(coordinator.submit_feedback(&id, "revise", Some("two")).await);
    assert_eq!(
        outcome,
        FeedbackOutcome::Finalized(FinishReason::RevisionLimit)
    );
    let done = assert_ok!(coordinator.get_status(&id).await);
    assert_eq!(done.status, SessionStatus::Finished);
    assert_eq!(done.revision_count, 1);
    assert_eq!(done.draft, revised.draft);
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let coordinator = coordinator();
    let a = assert_ok!(coordinator.start_session("solar energy").await);
    let b = assert_ok!(coordinator.start_session("wind power").await);
    settle(&coordinator, &a).await;
    settle(&coordinator, &b).await;

    assert_ok!(coordinator.submit_feedback(&a, "approve", None).await);

    assert_eq!(
        assert_ok!(coordinator.get_status(&a).await).status,
        SessionStatus::Finished
    );
    let other = assert_ok!(coordinator.get_status(&b).await);
    assert_eq!(other.status, SessionStatus::Interrupted);
    assert_eq!(other.topic, "wind power");
    assert_eq!(coordinator.list_sessions().await.len(), 2);
}
