//! Step loop behaviour: budget exhaustion, termination, stuck detection.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;

use common::{tool_agent, MockModel};
use tether::agent::{
    Agent, AgentConfig, AgentState, RunOutcome, StepBehavior, StepContext, StepOutcome, STUCK_ADVISORY,
};
use tether::error::{Result, TetherError};
use tether::hooks::{Hook, HookEvent};
use tether::types::Role;

fn completed(outcome: RunOutcome) -> tether::agent::RunReport {
    match outcome {
        RunOutcome::Completed(report) => report,
        RunOutcome::Suspended(run) => panic!("unexpected suspension: {}", run.question),
    }
}

#[tokio::test]
async fn budget_exhaustion_reports_and_returns_to_idle() {
    let model = MockModel::new();
    model.queue_text("first");
    model.queue_text("second");
    model.queue_text("third");
    let mut agent = tool_agent(model, 3);

    let report = completed(agent.run(Some("Summarise the docs".into())).await.unwrap());

    assert_eq!(
        report.steps,
        vec![
            "Step 1: first".to_string(),
            "Step 2: second".to_string(),
            "Step 3: third".to_string(),
            "Terminated: Reached max steps (3)".to_string(),
        ]
    );
    assert_eq!(report.summary, report.steps.join("\n"));
    assert!(!report.finished);
    assert_eq!(agent.state(), AgentState::Idle);
    assert_eq!(agent.current_step(), 0);
}

#[tokio::test]
async fn terminate_finishes_the_run_early() {
    let model = MockModel::new();
    model.queue_text("looking around");
    model.queue_tool_call("t1", "terminate", json!({"status": "success"}));
    let mut agent = tool_agent(model.clone(), 5);

    let report = completed(agent.run(Some("Do the thing".into())).await.unwrap());

    assert!(report.finished);
    assert_eq!(report.steps.len(), 2);
    assert!(report.steps[1].contains("completed with status: success"));
    assert_eq!(agent.state(), AgentState::Finished);
    assert_eq!(model.remaining_turns(), 0);
}

#[tokio::test]
async fn finished_agent_accepts_a_new_task() {
    let model = MockModel::new();
    model.queue_tool_call("t1", "terminate", json!({"status": "success"}));
    model.queue_text("working on the second task");
    let mut agent = tool_agent(model, 1);

    agent.run(Some("first".into())).await.unwrap();
    assert_eq!(agent.state(), AgentState::Finished);

    let report = completed(agent.run(Some("second".into())).await.unwrap());
    assert_eq!(report.steps[0], "Step 1: working on the second task");
    assert_eq!(agent.state(), AgentState::Idle);
}

#[tokio::test]
async fn repeated_answers_prepend_the_stuck_advisory() {
    let model = MockModel::new();
    for _ in 0..4 {
        model.queue_text("I will check the file");
    }
    let mut agent = tool_agent(model.clone(), 4);

    agent.run(Some("Fix the bug".into())).await.unwrap();

    let requests = model.requests();
    assert_eq!(requests.len(), 4);
    let prompt_of = |index: usize| {
        requests[index]
            .messages
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .map(|message| message.content.clone())
            .unwrap()
    };
    assert!(!prompt_of(2).starts_with(STUCK_ADVISORY));
    assert!(prompt_of(3).starts_with(STUCK_ADVISORY));
    assert!(agent.is_stuck());
}

#[tokio::test]
async fn model_failures_are_recorded_and_the_loop_continues() {
    let model = MockModel::new();
    let mut agent = tool_agent(model, 2);

    let report = completed(agent.run(Some("anything".into())).await.unwrap());

    assert!(report.steps[0].starts_with("Step 1: Error encountered while processing:"));
    assert_eq!(report.steps.len(), 3);
    assert_eq!(agent.state(), AgentState::Idle);
}

#[tokio::test]
async fn stop_hooks_fire_once_per_completed_run_with_the_agent_name() {
    let model = MockModel::new();
    model.queue_tool_call("t1", "terminate", json!({"status": "success"}));
    let mut agent = tool_agent(model, 3);
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    agent.hooks_mut().register(Hook::function(HookEvent::Stop, "test-agent", move |ctx| {
        let counter = counter.clone();
        async move {
            assert!(ctx.result.is_some());
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, TetherError>(())
        }
    }));

    agent.run(Some("go".into())).await.unwrap();

    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

struct Slow;

#[async_trait]
impl StepBehavior for Slow {
    async fn step(&self, _ctx: &mut StepContext<'_>) -> Result<StepOutcome> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(StepOutcome::Continue("done".into()))
    }
}

#[tokio::test(start_paused = true)]
async fn timed_out_run_leaves_the_agent_in_error() {
    let mut agent = Agent::new(AgentConfig::default(), Arc::new(Slow)).unwrap();

    let err = agent
        .run_with_timeout(Some("slow task".into()), Duration::from_millis(50))
        .await
        .unwrap_err();

    assert!(matches!(err, TetherError::Timeout(50)));
    assert_eq!(agent.state(), AgentState::Error);

    // An errored agent still takes a new task.
    assert!(agent.state().accepts_new_task());
}

#[tokio::test]
async fn running_without_input_needs_prior_conversation() {
    let mut agent = tool_agent(MockModel::new(), 3);
    let err = agent.run(None).await.unwrap_err();
    assert!(matches!(err, TetherError::InvalidState(_)));
    assert_eq!(agent.state(), AgentState::Idle);
}

#[tokio::test]
async fn continuing_a_finished_run_into_the_budget_returns_to_idle() {
    let model = MockModel::new();
    model.queue_tool_call("t1", "terminate", json!({"status": "success"}));
    model.queue_text("a");
    model.queue_text("b");
    let mut agent = tool_agent(model, 2);

    let first = completed(agent.run(Some("task".into())).await.unwrap());
    assert!(first.finished);
    assert_eq!(agent.state(), AgentState::Finished);

    let report = completed(agent.run(None).await.unwrap());

    assert_eq!(
        report.steps,
        vec!["Step 2: a".to_string(), "Terminated: Reached max steps (2)".to_string()]
    );
    assert!(!report.finished);
    assert_eq!(agent.state(), AgentState::Idle);
    assert_eq!(agent.current_step(), 0);
}
