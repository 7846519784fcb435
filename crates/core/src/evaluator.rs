//! The evaluation contract: does a proposed action need a human first?

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EvaluatorError;
use crate::hitl::RequestKind;
use crate::planner::PlannerDecision;
use crate::state::HistoryEntry;

/// The action a confirming reply should attach to the last step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub action: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
}

/// Outcome of evaluating one planner decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub needs_human_input: bool,

    pub kind: RequestKind,

    /// Question to put to the user when input is needed.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub question: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<SuggestedAction>,

    /// `"...:<param_name>"` when asking for one specific parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Evaluation {
    /// No human input needed; the loop executes directly.
    pub fn proceed() -> Self {
        Self {
            needs_human_input: false,
            kind: RequestKind::Confirmation,
            question: String::new(),
            options: Vec::new(),
            default_value: None,
            suggested_action: None,
            reason: None,
        }
    }

    /// Ask the user to approve the decision's action before it runs.
    pub fn confirmation(question: impl Into<String>, suggested: SuggestedAction) -> Self {
        Self {
            needs_human_input: true,
            kind: RequestKind::Confirmation,
            question: question.into(),
            options: vec!["yes".into(), "no".into()],
            default_value: None,
            suggested_action: Some(suggested),
            reason: None,
        }
    }

    /// Ask the user for one named parameter.
    pub fn parameter_input(
        question: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            needs_human_input: true,
            kind: RequestKind::ParameterInput,
            question: question.into(),
            options: Vec::new(),
            default_value: None,
            suggested_action: None,
            reason: Some(reason.into()),
        }
    }
}

/// Decides whether a proposed action requires human confirmation before
/// execution. Called once per planned action, never for resumed confirmed
/// actions or direct answers.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(
        &self,
        decision: &PlannerDecision,
        user_message: &str,
        history: &[HistoryEntry],
        user_id: &str,
    ) -> Result<Evaluation, EvaluatorError>;
}
