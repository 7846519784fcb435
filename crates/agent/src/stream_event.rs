//! Agent-level streaming events.
//!
//! `AgentEvent` surfaces the ReAct trace incrementally so a caller can
//! forward it to clients over SSE or WebSocket while the run is still in
//! flight.

use adpilot_core::UserInputRequest;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Events emitted by the orchestrator during streaming execution.
///
/// Wire protocol, in the order a run produces them:
/// - `thought`            — partial reasoning text from the planner
/// - `action`             — the agent is about to invoke a tool
/// - `observation`        — tool execution completed
/// - `text`               — final user-facing response, run is complete
/// - `user_input_request` — run paused, waiting for a human reply
/// - `error`              — the run aborted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Partial reasoning text, re-yielded verbatim from the planner.
    Thought { content: String },

    /// The agent is invoking a tool. Emitted before execution starts.
    Action {
        tool: String,
        input: Map<String, Value>,
    },

    /// Tool execution completed (success or failure text).
    Observation { content: String },

    /// Final user-facing response. Terminal event for a completed run.
    Text { content: String },

    /// The run paused for human input. Terminal event for this request;
    /// the session resumes through `continue_with_user_input` or a
    /// follow-up message.
    UserInputRequest { request: UserInputRequest },

    /// The run aborted. Terminal event.
    Error { message: String },
}

impl AgentEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Thought { .. } => "thought",
            Self::Action { .. } => "action",
            Self::Observation { .. } => "observation",
            Self::Text { .. } => "text",
            Self::UserInputRequest { .. } => "user_input_request",
            Self::Error { .. } => "error",
        }
    }

    /// Whether this event ends the stream for the current request.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Text { .. } | Self::UserInputRequest { .. } | Self::Error { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adpilot_core::RequestKind;

    #[test]
    fn event_serialization_thought() {
        let event = AgentEvent::Thought {
            content: "Need campaign stats first".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"thought""#));
        assert!(json.contains(r#""content":"Need campaign stats first""#));
    }

    #[test]
    fn event_serialization_action() {
        let mut input = Map::new();
        input.insert("campaign_id".into(), Value::String("c-42".into()));
        let event = AgentEvent::Action {
            tool: "get_campaign_stats".into(),
            input,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"action""#));
        assert!(json.contains(r#""tool":"get_campaign_stats""#));
        assert!(json.contains(r#""campaign_id":"c-42""#));
    }

    #[test]
    fn event_serialization_user_input_request() {
        let request = UserInputRequest::new(RequestKind::Confirmation, "Pause campaign c-42?");
        let event = AgentEvent::UserInputRequest { request };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"user_input_request""#));
        assert!(json.contains(r#""question":"Pause campaign c-42?""#));
    }

    #[test]
    fn event_serialization_error() {
        let event = AgentEvent::Error {
            message: "planner unavailable".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"error""#));
    }

    #[test]
    fn event_type_names() {
        assert_eq!(
            AgentEvent::Thought {
                content: "x".into()
            }
            .event_type(),
            "thought"
        );
        assert_eq!(
            AgentEvent::Action {
                tool: "t".into(),
                input: Map::new()
            }
            .event_type(),
            "action"
        );
        assert_eq!(
            AgentEvent::Observation {
                content: "x".into()
            }
            .event_type(),
            "observation"
        );
        assert_eq!(AgentEvent::Text { content: "x".into() }.event_type(), "text");
        assert_eq!(
            AgentEvent::Error {
                message: "x".into()
            }
            .event_type(),
            "error"
        );
    }

    #[test]
    fn terminal_events() {
        assert!(AgentEvent::Text { content: "done".into() }.is_terminal());
        assert!(AgentEvent::Error { message: "x".into() }.is_terminal());
        assert!(
            !AgentEvent::Thought {
                content: "x".into()
            }
            .is_terminal()
        );
        assert!(
            !AgentEvent::Observation {
                content: "x".into()
            }
            .is_terminal()
        );
    }

    #[test]
    fn event_deserialization() {
        let json = r#"{"type":"observation","content":"CTR is 1.2%"}"#;
        let event: AgentEvent = serde_json::from_str(json).unwrap();
        match event {
            AgentEvent::Observation { content } => assert_eq!(content, "CTR is 1.2%"),
            _ => panic!("Wrong variant"),
        }
    }
}
