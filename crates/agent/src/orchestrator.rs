//! The orchestrator: the embedding application's entry point.
//!
//! [`AgentOrchestrator`] owns the collaborators (planner, evaluator, HITL
//! handler, tool registry, state store) and exposes the session surface:
//! atomic and streaming message processing, the dedicated resume call,
//! and state inspection. It serializes access per session id so two
//! requests cannot interleave writes to the same session.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::warn;

use adpilot_config::AppConfig;
use adpilot_core::{
    history_key, state_key, AgentState, Attachment, Error, Evaluator, HumanInLoopHandler, Locale,
    Planner, Result, SessionError, StateStore, ToolRegistry,
};

use crate::react::{Opened, ReactLoop};
use crate::response::AgentResponse;
use crate::session::SessionLocks;
use crate::stream_event::AgentEvent;

/// One inbound message, addressed to a session.
///
/// The same request type drives new runs and resumes: when the addressed
/// session is waiting for input, `user_message` is treated as the reply.
#[derive(Clone)]
pub struct MessageRequest {
    pub user_message: String,
    pub user_id: String,
    pub session_id: String,
    pub conversation_id: Option<String>,
    pub user_intent: Option<String>,
    pub attachments: Vec<Attachment>,
    /// Per-request tool registry, replacing the orchestrator's default for
    /// this run only (e.g. account-scoped tools).
    pub tools: Option<Arc<ToolRegistry>>,
}

impl MessageRequest {
    pub fn new(
        user_message: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            user_message: user_message.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
            conversation_id: None,
            user_intent: None,
            attachments: Vec::new(),
            tools: None,
        }
    }

    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_user_intent(mut self, user_intent: impl Into<String>) -> Self {
        self.user_intent = Some(user_intent.into());
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }
}

impl fmt::Debug for MessageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageRequest")
            .field("user_message", &self.user_message)
            .field("user_id", &self.user_id)
            .field("session_id", &self.session_id)
            .field("conversation_id", &self.conversation_id)
            .field("user_intent", &self.user_intent)
            .field("attachments", &self.attachments.len())
            .field("tools", &self.tools.as_ref().map(|t| t.len()))
            .finish()
    }
}

pub struct AgentOrchestrator {
    planner: Arc<dyn Planner>,
    evaluator: Arc<dyn Evaluator>,
    hitl: Arc<dyn HumanInLoopHandler>,
    tools: Arc<ToolRegistry>,
    store: Arc<dyn StateStore>,
    locks: SessionLocks,
    max_steps: u32,
    state_ttl: Duration,
    locale: Locale,
}

impl AgentOrchestrator {
    pub fn new(
        planner: Arc<dyn Planner>,
        evaluator: Arc<dyn Evaluator>,
        hitl: Arc<dyn HumanInLoopHandler>,
        tools: Arc<ToolRegistry>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            planner,
            evaluator,
            hitl,
            tools,
            store,
            locks: SessionLocks::new(),
            max_steps: 10,
            state_ttl: Duration::from_secs(3600),
            locale: Locale::En,
        }
    }

    /// Step bound for sessions created from now on. Already-stored
    /// sessions keep the bound they were created with.
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_state_ttl(mut self, state_ttl: Duration) -> Self {
        self.state_ttl = state_ttl;
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Apply the `[agent]` section of the application config.
    pub fn with_settings(mut self, config: &AppConfig) -> Self {
        self.max_steps = config.agent.max_steps;
        self.state_ttl = Duration::from_secs(config.agent.state_ttl_secs);
        self.locale = config.locale();
        self
    }

    fn run_ctx(&self, tools_override: Option<Arc<ToolRegistry>>) -> ReactLoop {
        ReactLoop {
            planner: self.planner.clone(),
            evaluator: self.evaluator.clone(),
            hitl: self.hitl.clone(),
            tools: tools_override.unwrap_or_else(|| self.tools.clone()),
            store: self.store.clone(),
            max_steps: self.max_steps,
            state_ttl: self.state_ttl,
            locale: self.locale,
        }
    }

    // ── Message surface ────────────────────────────────────────────────

    /// Process one message and return when the session suspends.
    ///
    /// Never returns `Err`: every failure is projected into an
    /// [`AgentResponse`] so callers get one shape to render.
    pub async fn process_message(&self, request: MessageRequest) -> AgentResponse {
        let _guard = match self.locks.acquire(&request.session_id) {
            Ok(guard) => guard,
            Err(error) => return AgentResponse::session_error(&error),
        };
        let ctx = self.run_ctx(request.tools.clone());
        match ctx.open_session(&request).await {
            Ok(Opened::Terminal(state)) => AgentResponse::from_state(&state, self.locale),
            Ok(Opened::Runnable(mut state)) => ctx.run(&mut state).await,
            Err(error) => AgentResponse::failure(error.to_string(), self.locale),
        }
    }

    /// Process one message, narrating the run as it happens.
    ///
    /// The channel closes when the run suspends. Failures, including a
    /// busy session, arrive as [`AgentEvent::Error`]; the receiver never
    /// sees a panic or an unclosed stream.
    pub async fn process_message_stream(
        &self,
        request: MessageRequest,
    ) -> mpsc::Receiver<AgentEvent> {
        let (tx, rx) = mpsc::channel(128);
        let ctx = self.run_ctx(request.tools.clone());
        let locks = self.locks.clone();
        tokio::spawn(async move {
            let _guard = match locks.acquire(&request.session_id) {
                Ok(guard) => guard,
                Err(error) => {
                    let _ = tx
                        .send(AgentEvent::Error {
                            message: error.to_string(),
                        })
                        .await;
                    return;
                }
            };
            match ctx.open_session(&request).await {
                Ok(Opened::Terminal(state)) => {
                    let _ = tx
                        .send(AgentEvent::Text {
                            content: state.final_response.clone().unwrap_or_default(),
                        })
                        .await;
                }
                Ok(Opened::Runnable(mut state)) => ctx.run_streaming(&mut state, &tx).await,
                Err(error) => {
                    let _ = tx
                        .send(AgentEvent::Error {
                            message: error.to_string(),
                        })
                        .await;
                }
            }
        });
        rx
    }

    /// Deliver a reply to a session that is waiting for user input.
    ///
    /// Unlike [`process_message`](Self::process_message), this rejects
    /// sessions that are not actually waiting, so callers can distinguish
    /// "resumed" from "started over".
    pub async fn continue_with_user_input(
        &self,
        session_id: &str,
        user_input: &str,
    ) -> AgentResponse {
        let _guard = match self.locks.acquire(session_id) {
            Ok(guard) => guard,
            Err(error) => return AgentResponse::session_error(&error),
        };
        let stored = match self.store.get(&state_key(session_id)).await {
            Ok(stored) => stored,
            Err(error) => return AgentResponse::failure(error.to_string(), self.locale),
        };
        let Some(bytes) = stored else {
            return AgentResponse::session_error(&SessionError::NotFound(session_id.to_string()));
        };
        let state = match AgentState::from_bytes(&bytes) {
            Ok(state) => state,
            Err(error) => return AgentResponse::failure(error.to_string(), self.locale),
        };
        if !state.waiting_for_user_input {
            return AgentResponse::session_error(&SessionError::NoPendingRequest(
                session_id.to_string(),
            ));
        }
        let Some(pending) = state.user_input_request.clone() else {
            return AgentResponse::session_error(&SessionError::NoPendingRequest(
                session_id.to_string(),
            ));
        };

        let ctx = self.run_ctx(None);
        match ctx.resume_with_reply(state, &pending, user_input).await {
            Ok(Opened::Terminal(state)) => AgentResponse::from_state(&state, self.locale),
            Ok(Opened::Runnable(mut state)) => ctx.run(&mut state).await,
            Err(error) => AgentResponse::failure(error.to_string(), self.locale),
        }
    }

    // ── State surface ──────────────────────────────────────────────────

    /// Load a session's state, `None` when the id is unknown or expired.
    pub async fn get_state(&self, session_id: &str) -> Result<Option<AgentState>> {
        let Some(bytes) = self
            .store
            .get(&state_key(session_id))
            .await
            .map_err(Error::Store)?
        else {
            return Ok(None);
        };
        Ok(Some(AgentState::from_bytes(&bytes)?))
    }

    /// Delete a session's state and conversation history. Returns whether
    /// the state existed.
    pub async fn clear_state(&self, session_id: &str) -> Result<bool> {
        let removed = self
            .store
            .delete(&state_key(session_id))
            .await
            .map_err(Error::Store)?;
        if let Err(error) = self.store.delete(&history_key(session_id)).await {
            warn!(session_id, error = %error, "conversation history delete failed");
        }
        Ok(removed)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
