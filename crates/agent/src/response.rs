//! The non-streaming response envelope.

use adpilot_core::locale::generic_error_message;
use adpilot_core::{AgentState, AgentStatus, Locale, SessionError, UserInputRequest};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// What a caller gets back from one `process_message` or
/// `continue_with_user_input` call.
///
/// `message` is always user-facing copy. Machine detail for aborted runs
/// travels in `error`; a paused run carries the full question in
/// `user_input_request`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub status: AgentStatus,

    pub message: String,

    /// Run summary (step and tool-call counts), when a run happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default)]
    pub requires_user_input: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_input_request: Option<UserInputRequest>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentResponse {
    /// Project a (terminal or suspended) state into the response envelope.
    pub fn from_state(state: &AgentState, locale: Locale) -> Self {
        let message = match state.status {
            AgentStatus::WaitingForUser => state
                .user_input_request
                .as_ref()
                .map(|r| r.question.clone())
                .unwrap_or_default(),
            AgentStatus::Error => generic_error_message(locale).to_string(),
            _ => state.final_response.clone().unwrap_or_default(),
        };
        Self {
            status: state.status,
            message,
            data: Some(json!({
                "steps": state.steps.len(),
                "tool_calls": state.tool_calls.len(),
            })),
            requires_user_input: state.waiting_for_user_input,
            user_input_request: state.user_input_request.clone(),
            error: state.error_message.clone(),
        }
    }

    /// A failure that happened before or outside a run (store unreachable,
    /// corrupt state). No run summary to report.
    pub fn failure(detail: impl Into<String>, locale: Locale) -> Self {
        Self {
            status: AgentStatus::Error,
            message: generic_error_message(locale).to_string(),
            data: None,
            requires_user_input: false,
            user_input_request: None,
            error: Some(detail.into()),
        }
    }

    /// A session-level rejection (unknown session, nothing pending, busy).
    /// These never touch stored state, and the error text doubles as the
    /// user-facing message.
    pub fn session_error(error: &SessionError) -> Self {
        Self {
            status: AgentStatus::Error,
            message: error.to_string(),
            data: None,
            requires_user_input: false,
            user_input_request: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == AgentStatus::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adpilot_core::{RequestKind, UserInputRequest};

    #[test]
    fn completed_state_projects_final_response() {
        let mut state = AgentState::new("sess-1", "user-1", "hi");
        state.complete_with("Hello! How can I help with your campaigns?");
        let response = AgentResponse::from_state(&state, Locale::En);

        assert_eq!(response.status, AgentStatus::Completed);
        assert_eq!(response.message, "Hello! How can I help with your campaigns?");
        assert!(!response.requires_user_input);
        assert!(response.error.is_none());
        assert_eq!(response.data.unwrap()["steps"], 0);
    }

    #[test]
    fn waiting_state_projects_the_question() {
        let mut state = AgentState::new("sess-1", "user-1", "pause it");
        state.set_waiting(UserInputRequest::new(
            RequestKind::Confirmation,
            "Pause campaign c-42?",
        ));
        let response = AgentResponse::from_state(&state, Locale::En);

        assert_eq!(response.status, AgentStatus::WaitingForUser);
        assert_eq!(response.message, "Pause campaign c-42?");
        assert!(response.requires_user_input);
        assert!(response.user_input_request.is_some());
    }

    #[test]
    fn error_state_hides_detail_behind_generic_copy() {
        let mut state = AgentState::new("sess-1", "user-1", "hi");
        state.fail_with("Planner error: upstream 500");
        let response = AgentResponse::from_state(&state, Locale::En);

        assert_eq!(response.status, AgentStatus::Error);
        assert_eq!(response.message, generic_error_message(Locale::En));
        assert_eq!(response.error.as_deref(), Some("Planner error: upstream 500"));
    }

    #[test]
    fn session_error_response() {
        let response =
            AgentResponse::session_error(&SessionError::NoPendingRequest("sess-9".into()));
        assert!(response.is_error());
        assert!(response.message.contains("sess-9"));
        assert!(response.data.is_none());
    }

    #[test]
    fn serializes_with_snake_case_status() {
        let mut state = AgentState::new("sess-1", "user-1", "hi");
        state.set_waiting(UserInputRequest::new(RequestKind::Confirmation, "Sure?"));
        let json = serde_json::to_string(&AgentResponse::from_state(&state, Locale::En)).unwrap();
        assert!(json.contains(r#""status":"waiting_for_user""#));
        assert!(json.contains(r#""requires_user_input":true"#));
    }
}
