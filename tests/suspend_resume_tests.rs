//! Human-in-the-loop suspension and resumption.

mod common;

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use serde_json::json;

use common::{tool_agent, MockModel};
use tether::agent::{AgentState, RunOutcome};
use tether::error::TetherError;
use tether::hooks::{Hook, HookEvent};
use tether::types::Role;

#[tokio::test]
async fn ask_human_suspends_with_the_question() {
    let model = MockModel::new();
    model.queue_text("Let me check the details");
    model.queue_tool_call("q1", "ask_human", json!({"question": "Which city?"}));
    let mut agent = tool_agent(model, 5);

    let outcome = agent.run(Some("Book me a hotel".into())).await.unwrap();

    let RunOutcome::Suspended(run) = outcome else {
        panic!("expected suspension");
    };
    assert_eq!(run.question, "Which city?");
    assert_eq!(run.steps, vec!["Step 1: Let me check the details".to_string()]);
    assert_eq!(agent.state(), AgentState::Suspended);
    let pending = agent.suspended_call().unwrap();
    assert_eq!(pending.call.id, "q1");
    assert_eq!(pending.question, "Which city?");
}

#[tokio::test]
async fn resumed_run_observes_the_answer_as_the_tool_result() {
    let model = MockModel::new();
    model.queue_tool_call("q1", "ask_human", json!({"question": "Which city?"}));
    model.queue_tool_call("t1", "terminate", json!({"status": "success"}));
    let mut agent = tool_agent(model.clone(), 5);

    agent.run(Some("Book me a hotel".into())).await.unwrap();
    agent.resume("Lisbon").await.unwrap();

    assert_eq!(agent.state(), AgentState::Idle);
    assert!(agent.suspended_call().is_none());

    let outcome = agent.run(None).await.unwrap();
    let RunOutcome::Completed(report) = outcome else {
        panic!("expected completion");
    };
    assert!(report.finished);
    // Steps continue from where the suspended run stopped.
    assert!(report.steps[0].starts_with("Step 2:"));

    let second_request = &model.requests()[1];
    let answer = second_request
        .messages
        .iter()
        .find(|message| message.role == Role::Tool && message.tool_call_id.as_deref() == Some("q1"))
        .unwrap();
    assert_eq!(answer.content, "Lisbon");

    let task_turns = agent
        .messages()
        .iter()
        .filter(|message| message.content == "Book me a hotel")
        .count();
    assert_eq!(task_turns, 1);
}

#[tokio::test]
async fn resuming_twice_is_reported() {
    let model = MockModel::new();
    model.queue_tool_call("q1", "ask_human", json!({"question": "Proceed?"}));
    let mut agent = tool_agent(model, 5);

    agent.run(Some("Deploy".into())).await.unwrap();
    agent.resume("yes").await.unwrap();
    let err = agent.resume("yes again").await.unwrap_err();

    assert!(matches!(err, TetherError::NoPendingCall));
    let answers = agent
        .messages()
        .iter()
        .filter(|message| message.tool_call_id.as_deref() == Some("q1"))
        .count();
    assert_eq!(answers, 1);
}

#[tokio::test]
async fn new_task_while_suspended_is_rejected() {
    let model = MockModel::new();
    model.queue_tool_call("q1", "ask_human", json!({"question": "Proceed?"}));
    let mut agent = tool_agent(model, 5);

    agent.run(Some("Deploy".into())).await.unwrap();
    let err = agent.run(Some("Something else".into())).await.unwrap_err();

    assert!(matches!(err, TetherError::InvalidState(_)));
    assert_eq!(agent.state(), AgentState::Suspended);
}

#[tokio::test]
async fn resume_and_run_chains_both_and_fires_post_tool_hooks() {
    let model = MockModel::new();
    model.queue_tool_call("q1", "ask_human", json!({"question": "Budget?"}));
    model.queue_text("Booking within budget");
    let mut agent = tool_agent(model, 2);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    agent.hooks_mut().register(Hook::function(HookEvent::PostToolUse, "ask", move |ctx| {
        let sink = sink.clone();
        async move {
            sink.lock().unwrap().push(ctx.result.unwrap_or_default());
            Ok::<_, TetherError>(())
        }
    }));

    agent.run(Some("Plan the trip".into())).await.unwrap();
    let outcome = agent.resume_and_run("500 EUR").await.unwrap();

    let RunOutcome::Completed(report) = outcome else {
        panic!("expected completion");
    };
    assert_eq!(report.steps[0], "Step 2: Booking within budget");
    assert_eq!(seen.lock().unwrap().as_slice(), ["500 EUR".to_string()]);
}

#[tokio::test]
async fn suspension_does_not_fire_stop_hooks() {
    let model = MockModel::new();
    model.queue_tool_call("q1", "ask_human", json!({"question": "Proceed?"}));
    let mut agent = tool_agent(model, 5);
    let stops = Arc::new(Mutex::new(0usize));
    let counter = stops.clone();
    agent.hooks_mut().register(Hook::function(HookEvent::Stop, "", move |_ctx| {
        let counter = counter.clone();
        async move {
            *counter.lock().unwrap() += 1;
            Ok::<_, TetherError>(())
        }
    }));

    agent.run(Some("Deploy".into())).await.unwrap();

    assert_eq!(*stops.lock().unwrap(), 0);
}
