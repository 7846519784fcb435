//! The planning contract: one ReAct decision per call.
//!
//! A planner sees the user message, the available tool descriptors, and
//! the execution history so far, and decides to either call a tool or stop
//! with a final answer. The streaming mode additionally surfaces the
//! reasoning text chunk by chunk while it is being generated.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::error::PlannerError;
use crate::state::HistoryEntry;
use crate::tool::ToolDescriptor;

/// Everything a planner gets to see for one decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub user_message: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryEntry>,
}

impl PlanRequest {
    pub fn new(user_message: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            user_id: user_id.into(),
            tools: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDescriptor>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.history = history;
        self
    }
}

/// One planning decision: act, or finish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerDecision {
    pub thought: String,

    /// Tool to call next. `None` means answer directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_input: Option<Map<String, Value>>,

    #[serde(default)]
    pub is_complete: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_answer: Option<String>,
}

impl PlannerDecision {
    /// A decision to call a tool.
    pub fn act(
        thought: impl Into<String>,
        action: impl Into<String>,
        input: Map<String, Value>,
    ) -> Self {
        Self {
            thought: thought.into(),
            action: Some(action.into()),
            action_input: Some(input),
            is_complete: false,
            final_answer: None,
        }
    }

    /// A decision to stop with a final answer.
    pub fn finish(thought: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            thought: thought.into(),
            action: None,
            action_input: None,
            is_complete: true,
            final_answer: Some(answer.into()),
        }
    }

    /// Completion is signalled by the flag or by the absence of an action.
    pub fn is_terminal(&self) -> bool {
        self.is_complete || self.action.is_none()
    }

    /// The final response text: the answer, falling back to the thought.
    pub fn response_text(&self) -> &str {
        self.final_answer.as_deref().unwrap_or(&self.thought)
    }
}

/// One event in a plan stream: reasoning chunks, then exactly one decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanChunk {
    Thought { content: String },
    Plan { data: PlannerDecision },
}

/// An LLM-backed (or scripted) ReAct planner.
#[async_trait]
pub trait Planner: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// One atomic planning round-trip.
    async fn plan(&self, request: PlanRequest) -> Result<PlannerDecision, PlannerError>;

    /// Streaming variant: thought chunks followed by exactly one decision.
    ///
    /// The default implementation wraps [`plan`](Self::plan) into a
    /// two-chunk stream for planners without native streaming.
    async fn plan_stream(
        &self,
        request: PlanRequest,
    ) -> Result<mpsc::Receiver<Result<PlanChunk, PlannerError>>, PlannerError> {
        let decision = self.plan(request).await?;
        let (tx, rx) = mpsc::channel(2);
        if !decision.thought.is_empty() {
            let _ = tx
                .send(Ok(PlanChunk::Thought {
                    content: decision.thought.clone(),
                }))
                .await;
        }
        let _ = tx.send(Ok(PlanChunk::Plan { data: decision })).await;
        Ok(rx)
    }
}
