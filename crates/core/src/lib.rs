//! # AdPilot Core
//!
//! Domain types, traits, and error definitions for the AdPilot agent
//! orchestrator. This crate has **zero framework dependencies** — it defines
//! the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the agent loop is defined as a trait here
//! (planner, evaluator, human-in-the-loop handler, tools, state store).
//! Implementations live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with scripted/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod evaluator;
pub mod hitl;
pub mod locale;
pub mod message;
pub mod planner;
pub mod state;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{
    Error, EvaluatorError, PlannerError, Result, SessionError, StoreError, ToolError,
};
pub use evaluator::{Evaluation, Evaluator, SuggestedAction};
pub use hitl::{HumanInLoopHandler, RequestKind, RequestMetadata, UserInputRequest, UserReply};
pub use locale::Locale;
pub use message::{Attachment, ChatMessage, Role};
pub use planner::{PlanChunk, PlanRequest, Planner, PlannerDecision};
pub use state::{
    AgentState, AgentStatus, AgentStep, HistoryEntry, StepPhase, ToolCall, ToolOutcome,
};
pub use store::{history_key, state_key, StateStore};
pub use tool::{Tool, ToolContext, ToolDescriptor, ToolRegistry};
