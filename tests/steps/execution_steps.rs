//! Steps for step lifecycle behavioural tests.
use cucumber::{given, then, when};
use stepwise::{BoxError, StepArgument, StepDescriptor, StepError};
use stepwise_testing::{bypassed_step, composite_step, passing_step};

use crate::world::{StepWorld, parse_status};

#[given(expr = "a passing step {string}")]
fn given_passing(world: &mut StepWorld, name: String) { world.declare(passing_step(&name)); }

#[given(expr = "a failing step {string} raising {string}")]
fn given_failing(world: &mut StepWorld, name: String, message: String) {
    world.declare(StepDescriptor::from_fn(&name, move |_| {
        Err::<(), _>(message.clone())
    }));
}

#[given(expr = "a bypassed step {string} because {string}")]
fn given_bypassed(world: &mut StepWorld, name: String, reason: String) {
    world.declare(StepDescriptor::from_fn(&name, move |_| {
        Err::<(), _>(StepError::bypass(reason.clone()))
    }));
}

#[given(expr = "a composite step {string} with {int} passing sub-steps and a bypassed one")]
fn given_composite(world: &mut StepWorld, name: String, passing: usize) {
    world.declare(composite_step(&name, move || {
        let mut children: Vec<_> = (1..=passing)
            .map(|n| passing_step(&format!("child {n}")))
            .collect();
        children.push(bypassed_step("optional child", "not applicable"));
        children
    }));
}

#[given(expr = "a step {string} whose {string} parameter cannot be evaluated")]
fn given_unevaluable(world: &mut StepWorld, template: String, parameter: String) {
    world.declare(
        StepDescriptor::from_fn(&template, |_| Ok::<_, BoxError>(())).with_argument(
            StepArgument::deferred(parameter, |_: &()| Err::<String, _>("source unavailable")),
        ),
    );
}

#[when("the scenario runs")]
async fn when_runs(world: &mut StepWorld) { world.run_scenario().await; }

#[then(expr = "step {int} is {string}")]
fn then_status(world: &mut StepWorld, number: usize, status: String) {
    assert_eq!(world.result(number).status(), parse_status(&status));
}

#[then(expr = "step {int} is {string} with details {string}")]
fn then_status_details(world: &mut StepWorld, number: usize, status: String, details: String) {
    let result = world.result(number);
    assert_eq!(result.status(), parse_status(&status));
    assert_eq!(result.status_details(), Some(details.as_str()));
}

#[then(expr = "step {int} has {int} sub-steps")]
fn then_sub_steps(world: &mut StepWorld, number: usize, count: usize) {
    assert_eq!(world.result(number).sub_steps().len(), count);
}

#[then(expr = "step {int} name shows {string} for the unknown value")]
fn then_placeholder(world: &mut StepWorld, number: usize, placeholder: String) {
    assert!(world.result(number).info().name().contains(&placeholder));
}

#[then(expr = "step {int} was started and finished once")]
fn then_notified_once(world: &mut StepWorld, number: usize) {
    let step = world.result(number).info().to_string();
    assert_eq!(world.notification_counts(&step), (1, 1));
}

#[then(expr = "the scenario fails with {string}")]
fn then_fails(world: &mut StepWorld, message: String) {
    let err = world.outcome().as_ref().expect_err("scenario should fail");
    assert_eq!(err.to_string(), message);
}

#[then("the scenario succeeds")]
fn then_succeeds(world: &mut StepWorld) {
    assert!(world.outcome().is_ok());
}
