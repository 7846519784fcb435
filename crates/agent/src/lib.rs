//! The agent orchestrator — the heart of AdPilot.
//!
//! A session follows a **Reason → Evaluate → Act** cycle:
//!
//! 1. **Plan**: the planner reads the message, the transcript and the
//!    tool catalog and decides the next action (or a final answer)
//! 2. **Evaluate**: the evaluator judges the proposed action; risky or
//!    under-specified actions suspend the run for human input
//! 3. **Act**: the tool executes and its observation feeds the next
//!    planning round
//!
//! The cycle repeats until the planner finishes, the step budget runs
//! out, or the run pauses. A paused session persists in the state store
//! and resumes from any process: the user's next message (or a
//! [`AgentOrchestrator::continue_with_user_input`] call) is reconciled
//! into the recorded proposal and the loop picks up where it stopped.

pub mod handler;
pub mod orchestrator;
pub mod policy;
pub mod response;
pub mod stream_event;

mod react;
mod reconcile;
mod session;
#[cfg(test)]
pub(crate) mod test_helpers;

pub use handler::DefaultHitlHandler;
pub use orchestrator::{AgentOrchestrator, MessageRequest};
pub use policy::PolicyEvaluator;
pub use response::AgentResponse;
pub use stream_event::AgentEvent;
