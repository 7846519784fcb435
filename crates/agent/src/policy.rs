//! Rule-driven evaluator.
//!
//! The default [`Evaluator`] implementation: a list of confirmation rules
//! from configuration decides which proposed actions pause for a human.
//! Rules are matched per tool name (or `*`), highest priority first. A rule
//! can also require parameters to be present; a missing one turns the pause
//! into a parameter request instead of a yes/no confirmation.

use async_trait::async_trait;
use tracing::{debug, info};

use adpilot_config::{AppConfig, ConfirmationRule};
use adpilot_core::{
    Evaluation, Evaluator, EvaluatorError, HistoryEntry, PlannerDecision, SuggestedAction,
};

/// Evaluates planner decisions against configured confirmation rules.
pub struct PolicyEvaluator {
    /// Sorted by priority, highest first.
    rules: Vec<ConfirmationRule>,
}

impl PolicyEvaluator {
    pub fn new(mut rules: Vec<ConfirmationRule>) -> Self {
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self { rules }
    }

    /// Build from the `[[confirmation]]` tables in the app config.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.confirmation.clone())
    }

    /// Evaluator that lets every action through. Useful for tests and
    /// read-only tool sets.
    pub fn permissive() -> Self {
        Self::new(Vec::new())
    }

    fn matching_rule(&self, action: &str) -> Option<&ConfirmationRule> {
        self.rules
            .iter()
            .find(|rule| rule.enabled && (rule.tool == action || rule.tool == "*"))
    }
}

#[async_trait]
impl Evaluator for PolicyEvaluator {
    async fn evaluate(
        &self,
        decision: &PlannerDecision,
        _user_message: &str,
        _history: &[HistoryEntry],
        _user_id: &str,
    ) -> Result<Evaluation, EvaluatorError> {
        let Some(action) = decision.action.as_deref() else {
            return Ok(Evaluation::proceed());
        };
        let Some(rule) = self.matching_rule(action) else {
            debug!(tool = action, "no confirmation rule matched");
            return Ok(Evaluation::proceed());
        };

        let parameters = decision.action_input.clone().unwrap_or_default();
        for required in &rule.require_params {
            let missing = parameters
                .get(required)
                .map(serde_json::Value::is_null)
                .unwrap_or(true);
            if missing {
                info!(
                    tool = action,
                    parameter = %required,
                    "rule requires a parameter the planner did not supply"
                );
                return Ok(Evaluation::parameter_input(
                    format!("I need a value for '{required}' before running {action}. What should it be?"),
                    format!("missing required parameter:{required}"),
                ));
            }
        }

        info!(tool = action, rule = %rule.tool, "action requires confirmation");
        Ok(Evaluation::confirmation(
            &rule.question,
            SuggestedAction {
                action: action.to_string(),
                parameters,
            },
        ))
    }
}
