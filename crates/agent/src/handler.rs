//! Default human-in-the-loop handler.
//!
//! Turns evaluations into user-facing requests and raw reply text into
//! typed [`UserReply`] values. Interpretation is deliberately forgiving:
//! cancellation words win over everything, affirmations are matched against
//! a locale word list, and anything else is passed through as free text so
//! the reconciler can treat it as a rejection reason or a parameter value.

use adpilot_core::locale::{is_affirmative, is_cancellation};
use adpilot_core::{
    Evaluation, HumanInLoopHandler, Locale, RequestKind, RequestMetadata, UserInputRequest,
    UserReply,
};
use serde_json::Value;

/// Locale-aware request builder and reply interpreter.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHitlHandler {
    locale: Locale,
}

impl DefaultHitlHandler {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }
}

/// Question shown when the evaluator supplied none.
fn fallback_question(kind: RequestKind, locale: Locale) -> &'static str {
    match (kind, locale) {
        (RequestKind::Confirmation, Locale::En) => "Do you want me to proceed?",
        (RequestKind::Confirmation, Locale::Vi) => "Bạn có muốn tôi thực hiện không?",
        (RequestKind::ParameterInput, Locale::En) => "Please provide the missing value.",
        (RequestKind::ParameterInput, Locale::Vi) => "Vui lòng cung cấp giá trị còn thiếu.",
        (RequestKind::Choice, Locale::En) => "Please pick one of the options.",
        (RequestKind::Choice, Locale::Vi) => "Vui lòng chọn một trong các tùy chọn.",
    }
}

impl HumanInLoopHandler for DefaultHitlHandler {
    fn build_request(&self, evaluation: &Evaluation) -> UserInputRequest {
        let question = if evaluation.question.trim().is_empty() {
            fallback_question(evaluation.kind, self.locale).to_string()
        } else {
            evaluation.question.clone()
        };
        let mut request = UserInputRequest::new(evaluation.kind, question)
            .with_metadata(RequestMetadata {
                suggested_action: evaluation.suggested_action.clone(),
                reason: evaluation.reason.clone(),
            });
        if !evaluation.options.is_empty() {
            request = request.with_options(evaluation.options.clone());
        }
        if let Some(default) = &evaluation.default_value {
            request = request.with_default_value(default.clone());
        }
        request
    }

    fn interpret_response(&self, request: &UserInputRequest, raw_input: &str) -> UserReply {
        let trimmed = raw_input.trim();
        if is_cancellation(trimmed, self.locale) {
            return UserReply::cancelled();
        }
        match request.kind {
            RequestKind::Confirmation => {
                if is_affirmative(trimmed, self.locale) {
                    UserReply::of(Value::Bool(true))
                } else {
                    // Not a yes: keep the user's words so a rejection can
                    // carry the stated reason back into the trace.
                    UserReply::of(Value::String(trimmed.to_string()))
                }
            }
            RequestKind::Choice => {
                let matched = request
                    .options
                    .iter()
                    .find(|option| option.to_lowercase() == trimmed.to_lowercase());
                match matched {
                    Some(option) => UserReply::of(Value::String(option.clone()))
                        .with_selected_option(option.clone()),
                    None => UserReply::of(Value::String(trimmed.to_string())),
                }
            }
            RequestKind::ParameterInput => UserReply::of(Value::String(trimmed.to_string())),
        }
    }
}
