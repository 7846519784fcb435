//! The agent step-state machine: the unit of persistence and resumability.
//!
//! `AgentState` is everything one session needs to suspend mid-run (for a
//! human confirmation) and resume later, possibly in another process. It
//! serializes losslessly to JSON bytes; every save is a full-state upsert.
//!
//! A step's execution phase is an explicit tagged sum ([`StepPhase`]) so
//! "is this action confirmed but not yet executed" is a type-level match
//! rather than a null-field convention.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::hitl::UserInputRequest;
use crate::message::{Attachment, ChatMessage};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Created, loop not yet entered.
    #[default]
    Idle,
    /// Waiting on the planner.
    Thinking,
    /// Executing a tool.
    Acting,
    /// Suspended pending a user reply.
    WaitingForUser,
    /// Terminal: final response available.
    Completed,
    /// Terminal: run aborted.
    Error,
}

impl AgentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentStatus::Completed | AgentStatus::Error)
    }
}

/// Execution phase of one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum StepPhase {
    /// No action: the planner answered directly (or is about to).
    Planned,

    /// The planner proposed a tool call that has not run yet.
    ActionProposed {
        action: String,
        input: Map<String, Value>,
    },

    /// The user confirmed the action; execution is still pending. This is
    /// what a resumed loop iteration executes without re-planning.
    ActionConfirmedPending {
        action: String,
        input: Map<String, Value>,
    },

    /// Terminal: observation attached after execution or reconciliation.
    Completed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        action: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input: Option<Map<String, Value>>,
        observation: String,
    },
}

/// One planning/execution round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStep {
    /// 1-based, monotonic within a run.
    pub step_number: u32,

    /// The planner's reasoning for this round.
    pub thought: String,

    #[serde(flatten)]
    pub phase: StepPhase,

    pub timestamp: DateTime<Utc>,
}

impl AgentStep {
    /// A step with no action attached.
    pub fn planned(step_number: u32, thought: impl Into<String>) -> Self {
        Self {
            step_number,
            thought: thought.into(),
            phase: StepPhase::Planned,
            timestamp: Utc::now(),
        }
    }

    /// A step whose action awaits execution (or confirmation).
    pub fn proposed(
        step_number: u32,
        thought: impl Into<String>,
        action: impl Into<String>,
        input: Map<String, Value>,
    ) -> Self {
        Self {
            step_number,
            thought: thought.into(),
            phase: StepPhase::ActionProposed {
                action: action.into(),
                input,
            },
            timestamp: Utc::now(),
        }
    }

    /// The tool name, in any phase that carries one.
    pub fn action(&self) -> Option<&str> {
        match &self.phase {
            StepPhase::Planned => None,
            StepPhase::ActionProposed { action, .. }
            | StepPhase::ActionConfirmedPending { action, .. } => Some(action),
            StepPhase::Completed { action, .. } => action.as_deref(),
        }
    }

    /// The action input, in any phase that carries one.
    pub fn action_input(&self) -> Option<&Map<String, Value>> {
        match &self.phase {
            StepPhase::Planned => None,
            StepPhase::ActionProposed { input, .. }
            | StepPhase::ActionConfirmedPending { input, .. } => Some(input),
            StepPhase::Completed { input, .. } => input.as_ref(),
        }
    }

    pub fn observation(&self) -> Option<&str> {
        match &self.phase {
            StepPhase::Completed { observation, .. } => Some(observation),
            _ => None,
        }
    }

    /// An action is attached but no observation yet.
    pub fn is_unresolved(&self) -> bool {
        matches!(
            self.phase,
            StepPhase::ActionProposed { .. } | StepPhase::ActionConfirmedPending { .. }
        )
    }

    pub fn is_pending_confirmed(&self) -> bool {
        matches!(self.phase, StepPhase::ActionConfirmedPending { .. })
    }

    /// Mark the step's action as user-confirmed and awaiting execution.
    /// Replaces any previously proposed action with the confirmed one.
    pub fn confirm(&mut self, action: impl Into<String>, input: Map<String, Value>) {
        self.phase = StepPhase::ActionConfirmedPending {
            action: action.into(),
            input,
        };
    }

    /// Attach the observation, completing the step. A completed step is
    /// never re-completed; the first observation wins.
    pub fn complete(&mut self, observation: impl Into<String>) {
        let phase = std::mem::replace(&mut self.phase, StepPhase::Planned);
        self.phase = match phase {
            StepPhase::Planned => StepPhase::Completed {
                action: None,
                input: None,
                observation: observation.into(),
            },
            StepPhase::ActionProposed { action, input }
            | StepPhase::ActionConfirmedPending { action, input } => StepPhase::Completed {
                action: Some(action),
                input: Some(input),
                observation: observation.into(),
            },
            done @ StepPhase::Completed { .. } => done,
        };
    }
}

/// Outcome of one tool invocation. Exactly one of result/error by
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Succeeded { result: Value },
    Failed { error: String },
}

/// Audit record of one tool invocation, decoupled from steps: a step maps
/// to zero or one of these, and rejected actions never produce one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_name: String,
    pub parameters: Map<String, Value>,
    #[serde(flatten)]
    pub outcome: ToolOutcome,
    pub timestamp: DateTime<Utc>,
}

impl ToolCall {
    pub fn succeeded(
        tool_name: impl Into<String>,
        parameters: Map<String, Value>,
        result: Value,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters,
            outcome: ToolOutcome::Succeeded { result },
            timestamp: Utc::now(),
        }
    }

    pub fn failed(
        tool_name: impl Into<String>,
        parameters: Map<String, Value>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters,
            outcome: ToolOutcome::Failed {
                error: error.into(),
            },
            timestamp: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Succeeded { .. })
    }
}

/// Projection of a step handed to the planner and evaluator as execution
/// history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub thought: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_input: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
}

/// The full durable state of one agent session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    // --- Identity ---
    pub session_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    // --- Input ---
    pub user_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_intent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,

    // --- Control ---
    pub status: AgentStatus,
    /// Planning rounds consumed. Counts planning, not array length: a
    /// resumed confirmed action executes without advancing this.
    pub current_step: u32,
    pub max_steps: u32,

    // --- History ---
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<AgentStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    // --- Conversational context ---
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<ChatMessage>,

    // --- Pause protocol ---
    #[serde(default)]
    pub waiting_for_user_input: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_input_request: Option<UserInputRequest>,

    // --- Output ---
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    // --- Audit ---
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentState {
    pub fn new(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        user_message: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let user_message = user_message.into();
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            conversation_id: None,
            user_message: user_message.clone(),
            user_intent: None,
            attachments: Vec::new(),
            status: AgentStatus::Idle,
            current_step: 0,
            max_steps: 10,
            steps: Vec::new(),
            tool_calls: Vec::new(),
            messages: vec![ChatMessage::user(user_message)],
            waiting_for_user_input: false,
            user_input_request: None,
            final_response: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.touch();
    }

    pub fn push_step(&mut self, step: AgentStep) {
        self.steps.push(step);
        self.touch();
    }

    pub fn record_tool_call(&mut self, call: ToolCall) {
        self.tool_calls.push(call);
        self.touch();
    }

    pub fn last_step(&self) -> Option<&AgentStep> {
        self.steps.last()
    }

    pub fn last_step_mut(&mut self) -> Option<&mut AgentStep> {
        self.steps.last_mut()
    }

    /// The trailing confirmed-but-unexecuted action, if any. This is what
    /// a resumed loop iteration executes without calling the planner.
    pub fn pending_confirmed_action(&self) -> Option<(String, Map<String, Value>)> {
        match self.steps.last().map(|s| &s.phase) {
            Some(StepPhase::ActionConfirmedPending { action, input }) => {
                Some((action.clone(), input.clone()))
            }
            _ => None,
        }
    }

    /// Number of steps with an action attached but no observation. The
    /// loop keeps this at most 1, always at the tail.
    pub fn unresolved_step_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_unresolved()).count()
    }

    /// Enter the suspended state. The status flag, boolean, and request
    /// move together; this and [`clear_waiting`](Self::clear_waiting) are
    /// the only mutation points for the trio.
    pub fn set_waiting(&mut self, request: UserInputRequest) {
        self.status = AgentStatus::WaitingForUser;
        self.waiting_for_user_input = true;
        self.user_input_request = Some(request);
        self.touch();
    }

    /// Leave the suspended state (resume or cancel).
    pub fn clear_waiting(&mut self) {
        self.status = AgentStatus::Thinking;
        self.waiting_for_user_input = false;
        self.user_input_request = None;
        self.touch();
    }

    /// Terminal success.
    pub fn complete_with(&mut self, final_response: impl Into<String>) {
        self.status = AgentStatus::Completed;
        self.final_response = Some(final_response.into());
        self.touch();
    }

    /// Terminal failure.
    pub fn fail_with(&mut self, error_message: impl Into<String>) {
        self.status = AgentStatus::Error;
        self.error_message = Some(error_message.into());
        self.touch();
    }

    /// Step history as the planner/evaluator see it.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.steps
            .iter()
            .map(|s| HistoryEntry {
                thought: s.thought.clone(),
                action: s.action().map(str::to_string),
                action_input: s.action_input().cloned(),
                observation: s.observation().map(str::to_string),
            })
            .collect()
    }

    /// Serialize for the store. Full-state overwrite, never partial.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
