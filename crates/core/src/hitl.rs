//! Human-in-the-loop request/reply types and the handler contract.
//!
//! When the evaluator flags a proposed action, the handler turns the
//! evaluation into a [`UserInputRequest`] that is persisted with the
//! suspended state and shown to the user. Whatever surface the reply comes
//! back through, the handler interprets the raw input into a [`UserReply`]
//! that the loop reconciles.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::evaluator::{Evaluation, SuggestedAction};

/// What kind of input the agent is asking for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Approve or reject a proposed action.
    #[default]
    Confirmation,
    /// Supply a value for one named parameter.
    ParameterInput,
    /// Pick one of the offered options.
    Choice,
}

/// Metadata the loop needs to reconcile the eventual reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestMetadata {
    /// The action to attach to the last step if the user confirms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<SuggestedAction>,

    /// Why input was requested. When the suffix after the last `:` names a
    /// parameter, a free-form reply is spliced into the step's input under
    /// that name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RequestMetadata {
    /// The parameter named by `reason` (`"...:<param_name>"`), if any.
    pub fn reason_param(&self) -> Option<&str> {
        self.reason
            .as_deref()
            .and_then(|r| r.rsplit_once(':'))
            .map(|(_, param)| param.trim())
            .filter(|param| !param.is_empty())
    }
}

/// A serializable question to the user, persisted with the waiting state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInputRequest {
    /// Correlates replies arriving through out-of-band surfaces.
    pub id: String,

    #[serde(rename = "type")]
    pub kind: RequestKind,

    pub question: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    #[serde(default)]
    pub metadata: RequestMetadata,
}

impl UserInputRequest {
    pub fn new(kind: RequestKind, question: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            question: question.into(),
            options: Vec::new(),
            default_value: None,
            metadata: RequestMetadata::default(),
        }
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    pub fn with_default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_metadata(mut self, metadata: RequestMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A raw user reply, typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserReply {
    /// The user cancelled the whole request.
    pub cancelled: bool,

    /// Boolean for confirmations, string for free-form input.
    pub value: Value,

    /// The matched option for [`RequestKind::Choice`] requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_option: Option<String>,
}

impl UserReply {
    pub fn cancelled() -> Self {
        Self {
            cancelled: true,
            value: Value::Null,
            selected_option: None,
        }
    }

    pub fn of(value: Value) -> Self {
        Self {
            cancelled: false,
            value,
            selected_option: None,
        }
    }

    pub fn with_selected_option(mut self, option: impl Into<String>) -> Self {
        self.selected_option = Some(option.into());
        self
    }
}

/// Builds user-facing requests from evaluations and interprets raw replies
/// against them. Pure string/value work; implementations do no I/O.
pub trait HumanInLoopHandler: Send + Sync {
    fn build_request(&self, evaluation: &Evaluation) -> UserInputRequest;

    fn interpret_response(&self, request: &UserInputRequest, raw_input: &str) -> UserReply;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serializes_kind_as_type() {
        let req = UserInputRequest::new(RequestKind::Confirmation, "Proceed?");
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""type":"confirmation""#));
        assert!(json.contains(r#""question":"Proceed?""#));
    }

    #[test]
    fn request_round_trips() {
        let req = UserInputRequest::new(RequestKind::Choice, "Which size?")
            .with_options(vec!["1080x1080".into(), "1920x1080".into()])
            .with_default_value(json!("1080x1080"))
            .with_metadata(RequestMetadata {
                suggested_action: Some(SuggestedAction {
                    action: "generate_image".into(),
                    parameters: serde_json::Map::new(),
                }),
                reason: Some("missing required parameter:size".into()),
            });
        let bytes = serde_json::to_vec(&req).unwrap();
        let back: UserInputRequest = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(req, back);
    }

    #[test]
    fn reason_param_takes_suffix_after_last_colon() {
        let meta = RequestMetadata {
            suggested_action: None,
            reason: Some("missing required parameter:campaign_id".into()),
        };
        assert_eq!(meta.reason_param(), Some("campaign_id"));
    }

    #[test]
    fn reason_without_colon_names_no_param() {
        let meta = RequestMetadata {
            suggested_action: None,
            reason: Some("destructive action".into()),
        };
        assert_eq!(meta.reason_param(), None);

        let trailing = RequestMetadata {
            suggested_action: None,
            reason: Some("something:".into()),
        };
        assert_eq!(trailing.reason_param(), None);
    }

    #[test]
    fn fresh_requests_get_unique_ids() {
        let a = UserInputRequest::new(RequestKind::Confirmation, "q");
        let b = UserInputRequest::new(RequestKind::Confirmation, "q");
        assert_ne!(a.id, b.id);
    }
}
