//! Comment channel and late-activity warnings.

use std::sync::{Arc, Mutex};

use rstest::rstest;
use serial_test::serial;
use stepwise::{BoxError, ScenarioRunner, StepComments, StepDescriptor, TaskScope};
use stepwise_testing::{LoggerHandle, RecordingNotifier, logger};

#[tokio::test]
async fn comments_from_background_tasks_are_kept() {
    let notifier = Arc::new(RecordingNotifier::default());
    let mut steps = ScenarioRunner::new(())
        .with_notifier(notifier.clone())
        .steps(vec![StepDescriptor::from_fn("a busy step", |call| {
            for worker in 0..3 {
                let comments = call.comments().clone();
                let _ = call.tasks().spawn(async move {
                    tokio::task::yield_now().await;
                    comments.comment(format!("worker {worker} done"));
                    Ok::<_, BoxError>(())
                });
            }
            call.comment("body done");
            Ok::<_, BoxError>(())
        })]);

    steps.run().await.expect("step passes");

    let mut recorded = steps.results()[0].comments().to_vec();
    assert_eq!(recorded.len(), 4);
    assert_eq!(recorded[0], "body done");
    recorded.sort();
    assert_eq!(
        recorded,
        vec!["body done", "worker 0 done", "worker 1 done", "worker 2 done"]
    );
    assert_eq!(notifier.comments_for("1. a busy step").len(), 4);
}

#[rstest]
#[serial]
#[tokio::test]
async fn late_comments_are_dropped_with_a_warning(mut logger: LoggerHandle) {
    let escaped: Arc<Mutex<Option<StepComments>>> = Arc::default();
    let slot = Arc::clone(&escaped);
    let mut steps = ScenarioRunner::new(()).steps(vec![StepDescriptor::from_fn(
        "a leaky step",
        move |call| {
            *slot.lock().expect("slot lock") = Some(call.comments().clone());
            Ok::<_, BoxError>(())
        },
    )]);
    steps.run().await.expect("step passes");

    let comments = escaped
        .lock()
        .expect("slot lock")
        .take()
        .expect("comments escaped");
    comments.comment("too late");

    assert!(steps.results()[0].comments().is_empty());
    let warnings = logger.messages_at(log::Level::Warn);
    assert!(
        warnings
            .iter()
            .any(|message| message.contains("comment on finished step ignored")
                && message.contains("too late")),
        "missing warning in {warnings:?}"
    );
}

#[rstest]
#[serial]
#[tokio::test]
async fn late_spawns_are_reported(mut logger: LoggerHandle) {
    let escaped: Arc<Mutex<Option<TaskScope>>> = Arc::default();
    let slot = Arc::clone(&escaped);
    let mut steps = ScenarioRunner::new(()).steps(vec![StepDescriptor::from_fn(
        "a step leaking its scope",
        move |call| {
            *slot.lock().expect("slot lock") = Some(call.tasks().clone());
            Ok::<_, BoxError>(())
        },
    )]);
    steps.run().await.expect("step passes");

    let scope = escaped
        .lock()
        .expect("slot lock")
        .take()
        .expect("scope escaped");
    scope
        .spawn(async { Ok::<_, BoxError>(()) })
        .await
        .expect("late task still runs");

    let warnings = logger.messages_at(log::Level::Warn);
    assert!(
        warnings
            .iter()
            .any(|message| message.contains("spawned after its step scope settled")),
        "missing warning in {warnings:?}"
    );
}
