use std::{
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use rstest::{fixture, rstest};

use super::*;
use crate::{
    argument::{EvaluationState, StepArgument},
    error::{BoxError, StepError},
    middleware::{Next, StepMiddleware},
    notify::ProgressNotifier,
    result::{StepInfo, StepResult},
    runner::ScenarioRunner,
    status::ExecutionStatus,
};

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn push(&self, event: String) { self.events.lock().expect("events lock").push(event); }

    fn events(&self) -> Vec<String> { self.events.lock().expect("events lock").clone() }
}

impl ProgressNotifier for Recorder {
    fn notify_step_start(&self, info: &StepInfo) { self.push(format!("start {info}")); }

    fn notify_step_finished(&self, result: &StepResult) { self.push(format!("finish {result}")); }

    fn notify_step_comment(&self, info: &StepInfo, comment: &str) {
        self.push(format!("comment {info}: {comment}"));
    }
}

#[fixture]
fn recorder() -> Arc<Recorder> { Arc::new(Recorder::default()) }

fn runner(recorder: &Arc<Recorder>) -> ScenarioRunner<()> {
    ScenarioRunner::new(()).with_notifier(Arc::clone(recorder) as Arc<dyn ProgressNotifier>)
}

fn passing(name: &str) -> StepDescriptor<()> {
    StepDescriptor::from_fn(name, |_| Ok::<_, BoxError>(()))
}

fn failing(name: &str, message: &'static str) -> StepDescriptor<()> {
    StepDescriptor::from_fn(name, move |_| Err::<(), _>(message))
}

fn bypassing(name: &str, reason: &'static str) -> StepDescriptor<()> {
    StepDescriptor::from_fn(name, move |_| Err::<(), _>(StepError::bypass(reason)))
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn step_without_sub_steps_passes_and_is_timed(recorder: Arc<Recorder>) {
    let mut steps = runner(&recorder).steps(vec![StepDescriptor::from_async(
        "a slow step",
        |_| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, BoxError>(())
        },
    )]);

    steps.run().await.expect("step passes");

    let result = &steps.results()[0];
    assert_eq!(result.status(), ExecutionStatus::Passed);
    assert!(result.status_details().is_none());
    let time = result.execution_time().expect("time recorded");
    assert!(time.duration() >= Duration::from_millis(100));
    assert_eq!(steps.steps()[0].state(), StepState::Finished);
    assert_eq!(
        recorder.events(),
        vec!["start 1. a slow step", "finish 1. a slow step: Passed"]
    );
}

#[rstest]
#[tokio::test]
async fn bypass_is_recorded_without_failing_the_scenario(recorder: Arc<Recorder>) {
    let mut steps = runner(&recorder).steps(vec![
        bypassing("a skipped step", "not supported here"),
        passing("a later step"),
    ]);

    steps.run().await.expect("bypass does not fail the run");

    let results = steps.results();
    assert_eq!(results[0].status(), ExecutionStatus::Bypassed);
    assert_eq!(
        results[0].status_details(),
        Some("Step 1: not supported here")
    );
    assert!(results[0].execution_exception().is_none());
    assert_eq!(results[1].status(), ExecutionStatus::Passed);
}

#[rstest]
#[tokio::test]
async fn three_step_scenario_stops_at_first_failure(recorder: Arc<Recorder>) {
    let mut steps = runner(&recorder).steps(vec![
        passing("X").with_type("Given"),
        failing("Y", "Y throws").with_type("When"),
        passing("Z").with_type("Then"),
    ]);

    let err = steps.run().await.expect_err("second step fails");

    assert_eq!(err.to_string(), "Y throws");
    let results = steps.results();
    let statuses: Vec<_> = results.iter().map(StepResult::status).collect();
    assert_eq!(
        statuses,
        vec![
            ExecutionStatus::Passed,
            ExecutionStatus::Failed,
            ExecutionStatus::NotRun
        ]
    );
    assert_eq!(results[1].status_details(), Some("Step 2: Y throws"));
    assert_eq!(
        results[1]
            .execution_exception()
            .map(ToString::to_string)
            .as_deref(),
        Some("Y throws")
    );
    assert!(results[2].status_details().is_none());
    assert_eq!(
        recorder.events(),
        vec![
            "start 1. Given X",
            "finish 1. Given X: Passed",
            "start 2. When Y",
            "finish 2. When Y: Failed (Step 2: Y throws)",
        ]
    );
}

#[rstest]
#[tokio::test]
async fn status_mapper_classifies_failures(recorder: Arc<Recorder>) {
    let mut steps = runner(&recorder)
        .with_status_mapper(|error| {
            if error.to_string().contains("inconclusive") {
                ExecutionStatus::Ignored
            } else {
                ExecutionStatus::Failed
            }
        })
        .steps(vec![failing("a flaky step", "inconclusive result")]);

    let err = steps.run().await.expect_err("mapped errors still propagate");

    assert_eq!(err.to_string(), "inconclusive result");
    assert_eq!(steps.results()[0].status(), ExecutionStatus::Ignored);
}

#[rstest]
#[tokio::test]
async fn failed_parameter_evaluation_renders_placeholder(recorder: Arc<Recorder>) {
    let invoked = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&invoked);
    let mut steps = runner(&recorder).steps(vec![
        StepDescriptor::from_fn("the user NAME logs in", move |_| {
            flag.store(true, Ordering::SeqCst);
            Ok::<_, BoxError>(())
        })
        .with_argument(StepArgument::deferred("name", |_: &()| {
            Err::<String, _>("user lookup failed")
        })),
    ]);

    let err = steps.run().await.expect_err("evaluation failure propagates");

    assert!(matches!(err, StepError::ParameterEvaluation { ref parameter, .. } if parameter == "name"));
    assert!(!invoked.load(Ordering::SeqCst));
    let step = &steps.steps()[0];
    assert_eq!(step.arguments()[0].state(), EvaluationState::Failed);
    let result = step.result();
    assert_eq!(result.info().name(), "the user \"<?>\" logs in");
    assert_eq!(result.status(), ExecutionStatus::Failed);
    assert_eq!(
        result.status_details(),
        Some(format!("Step 1: {err}").as_str())
    );
    assert!(result.execution_time().is_none());
    let events = recorder.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], "start 1. the user \"<?>\" logs in");
    assert!(events[1].starts_with("finish 1. the user \"<?>\" logs in: Failed"));
}

#[rstest]
#[tokio::test]
async fn evaluated_arguments_reach_the_body_and_the_name(recorder: Arc<Recorder>) {
    let mut steps = runner(&recorder).steps(vec![
        StepDescriptor::from_fn("the sum of A and B is SUM", |call| -> Result<(), BoxError> {
            let a: &i32 = call.args().get(0)?;
            let b: &i32 = call.args().get(1)?;
            let sum: &i32 = call.args().get(2)?;
            if a + b == *sum {
                Ok(())
            } else {
                Err(BoxError::from("wrong sum"))
            }
        })
        .with_type("Then")
        .with_argument(StepArgument::constant("a", 2))
        .with_argument(StepArgument::deferred("b", |_: &()| Ok::<_, BoxError>(3)))
        .with_argument(StepArgument::constant("sum", 5)),
    ]);

    steps.run().await.expect("arguments are delivered");

    assert_eq!(
        steps.results()[0].info().name(),
        "Then the sum of \"2\" and \"3\" is \"5\""
    );
}

#[rstest]
#[tokio::test]
async fn sub_steps_are_numbered_and_aggregated(recorder: Arc<Recorder>) {
    let mut steps = runner(&recorder).steps(vec![StepDescriptor::from_fn(
        "a composite step",
        |_| {
            Ok::<_, BoxError>(vec![
                passing("first child"),
                bypassing("second child", "nothing to do"),
                passing("third child"),
            ])
        },
    )]);

    steps.run().await.expect("composite passes");

    let parent = &steps.results()[0];
    assert_eq!(parent.status(), ExecutionStatus::Bypassed);
    assert_eq!(parent.status_details(), Some("Step 1.2: nothing to do"));
    let labels: Vec<_> = parent
        .sub_steps()
        .iter()
        .map(|sub_step| sub_step.info().to_string())
        .collect();
    assert_eq!(
        labels,
        vec!["1.1. first child", "1.2. second child", "1.3. third child"]
    );
    assert_eq!(
        recorder.events().first().map(String::as_str),
        Some("start 1. a composite step")
    );
    assert_eq!(
        recorder.events().last().map(String::as_str),
        Some("finish 1. a composite step: Bypassed (Step 1.2: nothing to do)")
    );
}

#[rstest]
#[tokio::test]
async fn failing_sub_step_stops_its_siblings(recorder: Arc<Recorder>) {
    let mut steps = runner(&recorder).steps(vec![
        StepDescriptor::from_fn("a composite step", |_| {
            Ok::<_, BoxError>(vec![
                passing("first child"),
                failing("second child", "child broke"),
                passing("third child"),
            ])
        }),
        passing("a sibling"),
    ]);

    let err = steps.run().await.expect_err("child failure propagates");

    assert_eq!(err.to_string(), "child broke");
    let results = steps.results();
    let parent = &results[0];
    assert_eq!(parent.status(), ExecutionStatus::Failed);
    let children: Vec<_> = parent.sub_steps().iter().map(StepResult::status).collect();
    assert_eq!(
        children,
        vec![
            ExecutionStatus::Passed,
            ExecutionStatus::Failed,
            ExecutionStatus::NotRun
        ]
    );
    assert_eq!(results[1].status(), ExecutionStatus::NotRun);

    let mut merged = parent.clone();
    merged.include_sub_step_details();
    assert_eq!(
        merged.status_details(),
        Some("Step 1: child broke\nStep 1.2: child broke")
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn unawaited_background_work_is_joined(recorder: Arc<Recorder>) {
    let done = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&done);
    let mut steps = runner(&recorder).steps(vec![StepDescriptor::from_fn(
        "a step with background work",
        move |call| {
            let counter = Arc::clone(&counter);
            let _ = call.tasks().spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, BoxError>(())
            });
            Ok::<_, BoxError>(())
        },
    )]);

    steps.run().await.expect("background work succeeds");

    assert_eq!(done.load(Ordering::SeqCst), 1);
    let time = steps.results()[0].execution_time().expect("time recorded");
    assert!(time.duration() >= Duration::from_millis(50));
}

#[rstest]
#[tokio::test]
async fn background_failure_fails_the_step(recorder: Arc<Recorder>) {
    let mut steps = runner(&recorder).steps(vec![StepDescriptor::from_fn(
        "a step with failing background work",
        |call| {
            let _ = call
                .tasks()
                .spawn(async { Err::<(), _>("background write failed") });
            Ok::<_, BoxError>(())
        },
    )]);

    let err = steps.run().await.expect_err("task failure surfaces");

    assert_eq!(err.to_string(), "background write failed");
    assert_eq!(
        steps.results()[0].status_details(),
        Some("Step 1: background write failed")
    );
}

#[rstest]
#[tokio::test]
async fn panicking_body_fails_the_step(recorder: Arc<Recorder>) {
    let mut steps = runner(&recorder).steps(vec![StepDescriptor::from_fn(
        "a panicking step",
        |_| -> Result<(), BoxError> { panic!("body exploded") },
    )]);

    let err = steps.run().await.expect_err("panic becomes a failure");

    assert!(matches!(err, StepError::Panicked { ref message } if message == "body exploded"));
    assert_eq!(steps.results()[0].status(), ExecutionStatus::Failed);
    assert_eq!(recorder.events().len(), 2);
}

#[rstest]
#[tokio::test]
async fn comments_are_notified_between_start_and_finish(recorder: Arc<Recorder>) {
    let mut steps = runner(&recorder).steps(vec![
        StepDescriptor::from_async("a chatty step", |call| async move {
            call.comment("first");
            tokio::task::yield_now().await;
            call.comment("second");
            Ok::<_, BoxError>(())
        }),
    ]);

    steps.run().await.expect("step passes");

    assert_eq!(steps.results()[0].comments(), ["first", "second"]);
    assert_eq!(
        recorder.events(),
        vec![
            "start 1. a chatty step",
            "comment 1. a chatty step: first",
            "comment 1. a chatty step: second",
            "finish 1. a chatty step: Passed",
        ]
    );
}

#[rstest]
#[tokio::test]
async fn returned_value_is_kept(recorder: Arc<Recorder>) {
    let mut steps = runner(&recorder).steps(vec![StepDescriptor::from_fn(
        "a step producing a value",
        |_| Ok::<_, BoxError>(StepResultDescriptor::new().with_value(42_u64)),
    )]);

    steps.run().await.expect("step passes");

    assert_eq!(steps.steps()[0].returned::<u64>(), Some(&42));
}

#[rstest]
#[tokio::test]
async fn steps_run_only_once(recorder: Arc<Recorder>) {
    let mut steps = runner(&recorder).steps(vec![passing("a step")]);
    steps.run().await.expect("first run passes");

    let err = steps.run().await.expect_err("second run is rejected");

    assert!(matches!(err, StepError::AlreadyExecuted { .. }));
    assert_eq!(steps.results()[0].status(), ExecutionStatus::Passed);
    assert_eq!(recorder.events().len(), 2);
}

struct Trace {
    recorder: Arc<Recorder>,
}

#[async_trait]
impl StepMiddleware for Trace {
    async fn execute(&self, step: &StepInfo, next: Next<'_>) -> Result<(), StepError> {
        self.recorder.push(format!("before {}", step.name()));
        let outcome = next.run().await;
        self.recorder
            .push(format!("after {} ok={}", step.name(), outcome.is_ok()));
        outcome
    }
}

#[rstest]
#[tokio::test]
async fn middleware_wraps_the_timed_invocation(recorder: Arc<Recorder>) {
    let mut steps = runner(&recorder)
        .wrap(Trace {
            recorder: Arc::clone(&recorder),
        })
        .steps(vec![
            StepDescriptor::from_fn("a step with VALUE", |call| {
                call.comment("inside");
                Err::<(), _>("fails inside")
            })
            .with_argument(StepArgument::constant("value", "x")),
        ]);

    steps.run().await.expect_err("failure passes through middleware");

    assert_eq!(
        recorder.events(),
        vec![
            "start 1. a step with \"x\"",
            "before a step with \"x\"",
            "comment 1. a step with \"x\": inside",
            "after a step with \"x\" ok=false",
            "finish 1. a step with \"x\": Failed (Step 1: fails inside)",
        ]
    );
}

#[rstest]
#[tokio::test]
#[tracing_test::traced_test]
async fn failures_are_logged_inside_the_step_span(recorder: Arc<Recorder>) {
    let mut steps = runner(&recorder).steps(vec![failing("a broken step", "gear slipped")]);

    steps.run().await.expect_err("step fails");

    assert!(logs_contain("step failed"));
    assert!(logs_contain("step{id=1"));
    assert!(logs_contain("gear slipped"));
}

#[rstest]
#[tokio::test]
#[tracing_test::traced_test]
async fn step_span_records_the_evaluated_name(recorder: Arc<Recorder>) {
    let mut steps = runner(&recorder).steps(vec![
        StepDescriptor::from_fn("a step with X", |_| Err::<(), _>("gear slipped"))
            .with_argument(StepArgument::constant("x", "x")),
    ]);

    steps.run().await.expect_err("step fails");

    assert!(logs_contain("name=a step with \"x\""));
    assert!(!logs_contain("<?>"));
}

#[rstest]
#[tokio::test]
async fn bypass_does_not_hide_background_failure(recorder: Arc<Recorder>) {
    let mut steps = runner(&recorder).steps(vec![
        StepDescriptor::from_fn("a step skipping over failed work", |call| {
            let _ = call
                .tasks()
                .spawn(async { Err::<(), _>("background write failed") });
            Err::<(), _>(StepError::bypass("skip"))
        }),
        passing("a later step"),
    ]);

    let err = steps.run().await.expect_err("task failure surfaces");

    assert_eq!(err.to_string(), "background write failed");
    let results = steps.results();
    assert_eq!(results[0].status(), ExecutionStatus::Failed);
    assert_eq!(
        results[0].status_details(),
        Some("Step 1: background write failed")
    );
    assert_eq!(results[1].status(), ExecutionStatus::NotRun);
}

#[rstest]
#[tokio::test]
async fn comments_on_steps_that_never_started_are_dropped(recorder: Arc<Recorder>) {
    let mut steps = runner(&recorder).steps(vec![failing("a", "broken"), passing("b")]);
    steps.run().await.expect_err("first step fails");

    steps.steps()[1].comment("late");

    assert!(
        recorder
            .events()
            .iter()
            .all(|event| !event.starts_with("comment"))
    );
    assert!(steps.results()[1].comments().is_empty());
}

#[rstest]
#[tokio::test]
async fn panicking_parameter_source_fails_the_step(recorder: Arc<Recorder>) {
    let invoked = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&invoked);
    let mut steps = runner(&recorder).steps(vec![
        StepDescriptor::from_fn("account ID is open", move |_| {
            flag.store(true, Ordering::SeqCst);
            Ok::<_, BoxError>(())
        })
        .with_argument(StepArgument::deferred("id", |_: &()| -> Result<u32, BoxError> {
            panic!("lookup exploded")
        })),
    ]);

    let err = steps.run().await.expect_err("panic becomes an evaluation failure");

    assert!(matches!(err, StepError::ParameterEvaluation { ref parameter, .. } if parameter == "id"));
    assert!(err.to_string().ends_with("step panicked: lookup exploded"));
    assert!(!invoked.load(Ordering::SeqCst));
    let result = steps.results()[0].clone();
    assert_eq!(result.info().name(), "account \"<?>\" is open");
    assert_eq!(result.status(), ExecutionStatus::Failed);
    assert_eq!(
        recorder.events(),
        vec![
            "start 1. account \"<?>\" is open".to_string(),
            format!("finish 1. account \"<?>\" is open: Failed (Step 1: {err})"),
        ]
    );
}

#[rstest]
#[tokio::test]
async fn failed_name_formatting_fails_the_step(recorder: Arc<Recorder>) {
    let invoked = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&invoked);
    let mut steps = runner(&recorder).steps(vec![
        StepDescriptor::from_fn("the FLAG is raised", move |_| {
            flag.store(true, Ordering::SeqCst);
            Ok::<_, BoxError>(())
        })
        .with_argument(
            StepArgument::constant("flag", true)
                .with_formatter(|_: &bool| Err::<String, _>("unprintable")),
        ),
    ]);

    let err = steps.run().await.expect_err("formatting failure propagates");

    assert!(matches!(err, StepError::ParameterFormat { ref parameter, .. } if parameter == "flag"));
    assert!(!invoked.load(Ordering::SeqCst));
    let result = steps.results()[0].clone();
    assert_eq!(result.status(), ExecutionStatus::Failed);
    assert!(result.execution_time().is_none());
    let events = recorder.events();
    assert_eq!(events.len(), 2);
    assert!(events[0].starts_with("start 1."));
    assert!(events[1].starts_with("finish 1."));
    assert!(events[1].contains(": Failed"));
}
