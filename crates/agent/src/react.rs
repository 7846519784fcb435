//! The ReAct execution loop.
//!
//! One loop drives a session from its current state to the next suspension
//! point: a final answer, a pause for human input, the step bound, or an
//! aborting error. The loop never touches transport concerns; it mutates
//! the passed-in [`AgentState`] and persists it at every suspension point,
//! which is what makes a session resumable from another process.
//!
//! The atomic ([`ReactLoop::run`]) and streaming
//! ([`ReactLoop::run_streaming`]) variants share one state machine; the
//! streaming variant additionally narrates it over an event channel.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use adpilot_core::locale::max_steps_message;
use adpilot_core::{
    history_key, state_key, AgentState, AgentStatus, AgentStep, ChatMessage, Error, Evaluator,
    HumanInLoopHandler, Locale, PlanChunk, PlanRequest, Planner, PlannerDecision, PlannerError,
    StateStore, ToolCall, ToolContext, ToolRegistry, UserInputRequest,
};

use crate::orchestrator::MessageRequest;
use crate::reconcile::{reconcile_user_reply, ReplyOutcome};
use crate::response::AgentResponse;
use crate::stream_event::AgentEvent;

/// How a session opened: ready to run, or already settled by the reply.
pub(crate) enum Opened {
    Runnable(AgentState),
    /// Reconciliation ended the session (cancellation); respond without
    /// entering the loop.
    Terminal(AgentState),
}

/// One invocation's view of the collaborators. Cheap to clone; the
/// orchestrator builds one per call so a streaming run can move its copy
/// into the driver task.
#[derive(Clone)]
pub(crate) struct ReactLoop {
    pub(crate) planner: Arc<dyn Planner>,
    pub(crate) evaluator: Arc<dyn Evaluator>,
    pub(crate) hitl: Arc<dyn HumanInLoopHandler>,
    pub(crate) tools: Arc<ToolRegistry>,
    pub(crate) store: Arc<dyn StateStore>,
    pub(crate) max_steps: u32,
    pub(crate) state_ttl: Duration,
    pub(crate) locale: Locale,
}

impl ReactLoop {
    // ── Session opening ────────────────────────────────────────────────

    /// Load the session for an inbound message: resume it when it is
    /// waiting for input, otherwise start a fresh run (a terminal or
    /// unknown session id starts over).
    pub(crate) async fn open_session(&self, request: &MessageRequest) -> Result<Opened, Error> {
        let stored = self
            .store
            .get(&state_key(&request.session_id))
            .await
            .map_err(Error::Store)?;

        if let Some(bytes) = stored {
            let state = AgentState::from_bytes(&bytes)?;
            if state.waiting_for_user_input {
                if let Some(pending) = state.user_input_request.clone() {
                    return self
                        .resume_with_reply(state, &pending, &request.user_message)
                        .await;
                }
            }
            debug!(
                session_id = %request.session_id,
                status = ?state.status,
                "stored session is not waiting; starting a fresh run"
            );
        }

        Ok(Opened::Runnable(self.fresh_state(request)))
    }

    /// Interpret and reconcile a reply into a waiting session. Shared by
    /// both resume surfaces so they cannot diverge.
    pub(crate) async fn resume_with_reply(
        &self,
        mut state: AgentState,
        pending: &UserInputRequest,
        raw_reply: &str,
    ) -> Result<Opened, Error> {
        state.push_message(ChatMessage::user(raw_reply));
        let reply = self.hitl.interpret_response(pending, raw_reply);
        let outcome = reconcile_user_reply(&mut state, pending, &reply, self.locale);
        info!(
            session_id = %state.session_id,
            outcome = ?outcome,
            "reconciled user reply into waiting session"
        );

        if state.status.is_terminal() {
            self.persist(&mut state).await?;
            return Ok(Opened::Terminal(state));
        }
        Ok(Opened::Runnable(state))
    }

    fn fresh_state(&self, request: &MessageRequest) -> AgentState {
        let mut state = AgentState::new(
            &request.session_id,
            &request.user_id,
            &request.user_message,
        );
        state.conversation_id = request.conversation_id.clone();
        state.user_intent = request.user_intent.clone();
        state.attachments = request.attachments.clone();
        state.max_steps = self.max_steps;
        state
    }

    // ── Atomic variant ─────────────────────────────────────────────────

    /// Drive the loop until it suspends, and project the response.
    pub(crate) async fn run(&self, state: &mut AgentState) -> AgentResponse {
        // ── Resume a confirmed action without re-planning ──
        // The step was counted when it was planned; executing it now does
        // not consume another planning round.
        if let Some((action, input)) = state.pending_confirmed_action() {
            info!(
                session_id = %state.session_id,
                tool = %action,
                "executing user-confirmed action"
            );
            let observation = self.execute_action(state, &action, input).await;
            if let Some(step) = state.last_step_mut() {
                step.complete(observation);
            }
        }

        loop {
            // ── Step bound ──
            if state.current_step >= state.max_steps {
                info!(
                    session_id = %state.session_id,
                    max_steps = state.max_steps,
                    "step budget exhausted"
                );
                let message = max_steps_message(self.locale, state.max_steps);
                return self.settle_completion(state, message).await;
            }
            state.current_step += 1;
            state.status = AgentStatus::Thinking;

            // ── Plan ──
            let decision = match self.planner.plan(self.plan_request(state)).await {
                Ok(decision) => decision,
                Err(error) => return self.settle_error(state, Error::Planner(error)).await,
            };
            debug!(
                session_id = %state.session_id,
                step = state.current_step,
                action = ?decision.action,
                complete = decision.is_complete,
                "planner decided"
            );
            self.record_round(state, &decision);

            // ── Completion check ──
            if decision.is_terminal() {
                let response = decision.response_text().to_string();
                return self.settle_completion(state, response).await;
            }
            let action = decision.action.clone().unwrap_or_default();
            let input = decision.action_input.clone().unwrap_or_default();

            // ── Evaluate ──
            let evaluation = match self
                .evaluator
                .evaluate(&decision, &state.user_message, &state.history(), &state.user_id)
                .await
            {
                Ok(evaluation) => evaluation,
                Err(error) => return self.settle_error(state, Error::Evaluator(error)).await,
            };
            if evaluation.needs_human_input {
                let request = self.hitl.build_request(&evaluation);
                info!(
                    session_id = %state.session_id,
                    step = state.current_step,
                    kind = ?request.kind,
                    "suspending for user input"
                );
                state.push_message(ChatMessage::assistant(&request.question));
                state.set_waiting(request);
                return match self.persist(state).await {
                    Ok(()) => AgentResponse::from_state(state, self.locale),
                    Err(error) => AgentResponse::failure(error.to_string(), self.locale),
                };
            }

            // ── Act ──
            let observation = self.execute_action(state, &action, input).await;
            if let Some(step) = state.last_step_mut() {
                step.complete(observation);
            }
        }
    }

    // ── Streaming variant ──────────────────────────────────────────────

    /// Same state machine as [`run`](Self::run), narrated over `tx`. Send
    /// failures (caller dropped the receiver) are ignored; the run still
    /// reaches its exit and persists.
    pub(crate) async fn run_streaming(
        &self,
        state: &mut AgentState,
        tx: &mpsc::Sender<AgentEvent>,
    ) {
        // ── Resume a confirmed action without re-planning ──
        if let Some((action, input)) = state.pending_confirmed_action() {
            info!(
                session_id = %state.session_id,
                tool = %action,
                "executing user-confirmed action"
            );
            let _ = tx
                .send(AgentEvent::Action {
                    tool: action.clone(),
                    input: input.clone(),
                })
                .await;
            let observation = self.execute_action(state, &action, input).await;
            let _ = tx
                .send(AgentEvent::Observation {
                    content: observation.clone(),
                })
                .await;
            if let Some(step) = state.last_step_mut() {
                step.complete(observation);
            }
        }

        loop {
            // ── Step bound ──
            if state.current_step >= state.max_steps {
                let message = max_steps_message(self.locale, state.max_steps);
                self.finish_streaming(state, message, tx).await;
                return;
            }
            state.current_step += 1;
            state.status = AgentStatus::Thinking;

            // ── Plan (re-yielding thought chunks) ──
            let decision = match self.plan_streaming(state, tx).await {
                Ok(decision) => decision,
                Err(error) => {
                    self.abort_streaming(state, Error::Planner(error), tx).await;
                    return;
                }
            };
            self.record_round(state, &decision);

            // ── Completion check ──
            if decision.is_terminal() {
                let response = decision.response_text().to_string();
                self.finish_streaming(state, response, tx).await;
                return;
            }
            let action = decision.action.clone().unwrap_or_default();
            let input = decision.action_input.clone().unwrap_or_default();

            // ── Evaluate ──
            let evaluation = match self
                .evaluator
                .evaluate(&decision, &state.user_message, &state.history(), &state.user_id)
                .await
            {
                Ok(evaluation) => evaluation,
                Err(error) => {
                    self.abort_streaming(state, Error::Evaluator(error), tx).await;
                    return;
                }
            };
            if evaluation.needs_human_input {
                let request = self.hitl.build_request(&evaluation);
                state.push_message(ChatMessage::assistant(&request.question));
                state.set_waiting(request.clone());
                // The pause event goes out only after the waiting state is
                // durable, so a client acting on it can always resume.
                match self.persist(state).await {
                    Ok(()) => {
                        let _ = tx.send(AgentEvent::UserInputRequest { request }).await;
                    }
                    Err(error) => {
                        let _ = tx
                            .send(AgentEvent::Error {
                                message: error.to_string(),
                            })
                            .await;
                    }
                }
                return;
            }

            // ── Act ──
            let _ = tx
                .send(AgentEvent::Action {
                    tool: action.clone(),
                    input: input.clone(),
                })
                .await;
            let observation = self.execute_action(state, &action, input).await;
            let _ = tx
                .send(AgentEvent::Observation {
                    content: observation.clone(),
                })
                .await;
            if let Some(step) = state.last_step_mut() {
                step.complete(observation);
            }
        }
    }

    /// Consume the plan stream: re-yield thoughts, return the decision.
    async fn plan_streaming(
        &self,
        state: &AgentState,
        tx: &mpsc::Sender<AgentEvent>,
    ) -> Result<PlannerDecision, PlannerError> {
        let mut chunks = self.planner.plan_stream(self.plan_request(state)).await?;
        while let Some(chunk) = chunks.recv().await {
            match chunk? {
                PlanChunk::Thought { content } => {
                    let _ = tx.send(AgentEvent::Thought { content }).await;
                }
                PlanChunk::Plan { data } => return Ok(data),
            }
        }
        Err(PlannerError::StreamInterrupted(
            "plan stream closed before yielding a decision".into(),
        ))
    }

    // ── Shared internals ───────────────────────────────────────────────

    fn plan_request(&self, state: &AgentState) -> PlanRequest {
        PlanRequest::new(&state.user_message, &state.user_id)
            .with_tools(self.tools.descriptors())
            .with_history(state.history())
    }

    /// Append the step for one planning round. The phase mirrors the
    /// decision: an action makes it a proposal, otherwise it is a plain
    /// planned step.
    fn record_round(&self, state: &mut AgentState, decision: &PlannerDecision) {
        let step = match &decision.action {
            Some(action) => AgentStep::proposed(
                state.current_step,
                &decision.thought,
                action,
                decision.action_input.clone().unwrap_or_default(),
            ),
            None => AgentStep::planned(state.current_step, &decision.thought),
        };
        state.push_step(step);
    }

    /// Execute one tool call and return the observation text. Tool-level
    /// failures (including an unknown tool name) become failure
    /// observations; they never abort the run.
    pub(crate) async fn execute_action(
        &self,
        state: &mut AgentState,
        action: &str,
        input: Map<String, Value>,
    ) -> String {
        state.status = AgentStatus::Acting;
        let context = ToolContext::new(&state.user_id, state.messages.clone());
        match self.tools.execute(action, input.clone(), &context).await {
            Ok(result) => {
                debug!(session_id = %state.session_id, tool = action, "tool succeeded");
                state.record_tool_call(ToolCall::succeeded(action, input, result.clone()));
                match result {
                    Value::String(text) => text,
                    other => other.to_string(),
                }
            }
            Err(error) => {
                warn!(
                    session_id = %state.session_id,
                    tool = action,
                    code = error.error_code(),
                    error = %error,
                    "tool failed"
                );
                state.record_tool_call(ToolCall::failed(action, input, error.to_string()));
                format!("Tool '{action}' failed: {error}")
            }
        }
    }

    async fn settle_completion(
        &self,
        state: &mut AgentState,
        response: String,
    ) -> AgentResponse {
        state.push_message(ChatMessage::assistant(&response));
        state.complete_with(response);
        match self.persist(state).await {
            Ok(()) => AgentResponse::from_state(state, self.locale),
            Err(error) => AgentResponse::failure(error.to_string(), self.locale),
        }
    }

    async fn settle_error(&self, state: &mut AgentState, error: Error) -> AgentResponse {
        warn!(session_id = %state.session_id, error = %error, "run aborted");
        state.fail_with(error.to_string());
        if let Err(save_error) = self.persist(state).await {
            warn!(
                session_id = %state.session_id,
                error = %save_error,
                "could not persist aborted state"
            );
        }
        AgentResponse::from_state(state, self.locale)
    }

    async fn finish_streaming(
        &self,
        state: &mut AgentState,
        response: String,
        tx: &mpsc::Sender<AgentEvent>,
    ) {
        state.push_message(ChatMessage::assistant(&response));
        state.complete_with(response.clone());
        match self.persist(state).await {
            Ok(()) => {
                let _ = tx.send(AgentEvent::Text { content: response }).await;
            }
            Err(error) => {
                let _ = tx
                    .send(AgentEvent::Error {
                        message: error.to_string(),
                    })
                    .await;
            }
        }
    }

    async fn abort_streaming(
        &self,
        state: &mut AgentState,
        error: Error,
        tx: &mpsc::Sender<AgentEvent>,
    ) {
        warn!(session_id = %state.session_id, error = %error, "run aborted");
        state.fail_with(error.to_string());
        if let Err(save_error) = self.persist(state).await {
            warn!(
                session_id = %state.session_id,
                error = %save_error,
                "could not persist aborted state"
            );
        }
        let _ = tx
            .send(AgentEvent::Error {
                message: error.to_string(),
            })
            .await;
    }

    /// Persist the session. The primary state write must succeed; the
    /// conversation-history side-write (terminal states only) is
    /// best-effort.
    pub(crate) async fn persist(&self, state: &mut AgentState) -> Result<(), Error> {
        state.touch();
        let bytes = state.to_bytes()?;
        self.store
            .put(&state_key(&state.session_id), &bytes, self.state_ttl)
            .await
            .map_err(Error::Store)?;

        if state.status.is_terminal() {
            match serde_json::to_vec(&state.messages) {
                Ok(history) => {
                    if let Err(error) = self
                        .store
                        .put(&history_key(&state.session_id), &history, self.state_ttl)
                        .await
                    {
                        warn!(
                            session_id = %state.session_id,
                            error = %error,
                            "conversation history side-write failed"
                        );
                    }
                }
                Err(error) => {
                    warn!(
                        session_id = %state.session_id,
                        error = %error,
                        "conversation history did not serialize"
                    );
                }
            }
        }
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
