//! Reply reconciliation: folding a user's answer back into suspended state.
//!
//! Both resume surfaces (the explicit continue endpoint and a plain message
//! sent to a waiting session) interpret the raw reply through the HITL
//! handler and then pass the typed [`UserReply`] here, so the two paths
//! cannot drift apart.
//!
//! Reconciliation is ordered: cancellation wins outright, an affirmative
//! reply attaches the suggested action to the last step for execution, a
//! reply to a parameter request is spliced into the step's input, and
//! anything else becomes a rejection observation the planner can react to.

use adpilot_core::locale::{cancellation_message, is_affirmative};
use adpilot_core::{
    AgentState, AgentStep, ChatMessage, Locale, StepPhase, UserInputRequest, UserReply,
};
use serde_json::{Map, Value};
use tracing::debug;

/// What the reply did to the state. The loop decides from this whether to
/// keep running.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ReplyOutcome {
    /// Session completed with a cancellation response. Do not run the loop.
    Cancelled,
    /// The last step now carries a confirmed action awaiting execution.
    ConfirmedAction {
        action: String,
        parameters: Map<String, Value>,
    },
    /// The reply value was recorded under the named parameter and the step
    /// completed with a synthetic observation. The loop re-plans.
    ParameterSpliced { param: String, value: Value },
    /// The action was declined; the rejection is the step's observation.
    /// The loop re-plans.
    Rejected,
}

/// Apply a typed reply to a waiting session's state.
pub(crate) fn reconcile_user_reply(
    state: &mut AgentState,
    request: &UserInputRequest,
    reply: &UserReply,
    locale: Locale,
) -> ReplyOutcome {
    state.clear_waiting();

    if reply.cancelled {
        let message = cancellation_message(locale);
        state.push_message(ChatMessage::assistant(message));
        state.complete_with(message);
        debug!(session_id = %state.session_id, "user cancelled the pending request");
        return ReplyOutcome::Cancelled;
    }

    if let Some(suggested) = &request.metadata.suggested_action {
        if affirms(&reply.value, locale) {
            confirm_last_step(state, &suggested.action, suggested.parameters.clone());
            return ReplyOutcome::ConfirmedAction {
                action: suggested.action.clone(),
                parameters: suggested.parameters.clone(),
            };
        }
    }

    if let Some(param) = request.metadata.reason_param() {
        let display = value_display(&reply.value);
        splice_parameter(state, param, reply.value.clone());
        complete_last_step(state, format!("user input: {display}"));
        return ReplyOutcome::ParameterSpliced {
            param: param.to_string(),
            value: reply.value.clone(),
        };
    }

    let observation = match &reply.value {
        Value::String(text) if !text.trim().is_empty() => {
            format!("User declined the proposed action: {text}")
        }
        _ => "User declined the proposed action.".to_string(),
    };
    complete_last_step(state, observation);
    ReplyOutcome::Rejected
}

fn affirms(value: &Value, locale: Locale) -> bool {
    match value {
        Value::Bool(yes) => *yes,
        Value::String(text) => is_affirmative(text, locale),
        _ => false,
    }
}

fn value_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn next_step_number(state: &AgentState) -> u32 {
    state.steps.last().map(|s| s.step_number + 1).unwrap_or(1)
}

/// Attach the confirmed action to the last step. A completed last step is
/// never reopened; a fresh confirmed step is appended instead.
fn confirm_last_step(state: &mut AgentState, action: &str, input: Map<String, Value>) {
    match state.last_step_mut() {
        Some(step) if !matches!(step.phase, StepPhase::Completed { .. }) => {
            step.confirm(action, input);
            state.touch();
        }
        _ => {
            let number = next_step_number(state);
            let mut step = AgentStep::proposed(number, "", action, input.clone());
            step.confirm(action, input);
            state.push_step(step);
        }
    }
}

/// Insert the reply value into the last step's action input, when the step
/// is in a phase that carries one.
fn splice_parameter(state: &mut AgentState, param: &str, value: Value) {
    if let Some(step) = state.last_step_mut() {
        match &mut step.phase {
            StepPhase::ActionProposed { input, .. }
            | StepPhase::ActionConfirmedPending { input, .. } => {
                input.insert(param.to_string(), value);
            }
            _ => {}
        }
    }
    state.touch();
}

fn complete_last_step(state: &mut AgentState, observation: String) {
    match state.last_step_mut() {
        Some(step) if !matches!(step.phase, StepPhase::Completed { .. }) => {
            step.complete(observation);
            state.touch();
        }
        _ => {
            let number = next_step_number(state);
            let mut step = AgentStep::planned(number, "");
            step.complete(observation);
            state.push_step(step);
        }
    }
}
