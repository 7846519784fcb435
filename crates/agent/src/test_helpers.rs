//! Shared scripted collaborators for loop and orchestrator tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use adpilot_core::{
    Evaluation, Evaluator, EvaluatorError, HistoryEntry, Locale, PlanRequest, Planner,
    PlannerDecision, PlannerError, StateStore, SuggestedAction, Tool, ToolContext, ToolError,
    ToolRegistry,
};
use adpilot_store::MemoryStore;

use crate::handler::DefaultHitlHandler;
use crate::react::ReactLoop;

/// A planner that returns a sequence of scripted decisions.
///
/// Each call to `plan` returns the next decision in the queue. Panics if
/// more calls are made than decisions provided.
pub struct ScriptedPlanner {
    decisions: Mutex<Vec<PlannerDecision>>,
    call_count: Mutex<usize>,
}

impl ScriptedPlanner {
    pub fn new(decisions: Vec<PlannerDecision>) -> Self {
        Self {
            decisions: Mutex::new(decisions),
            call_count: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn plan(&self, _request: PlanRequest) -> Result<PlannerDecision, PlannerError> {
        let mut count = self.call_count.lock().unwrap();
        let decisions = self.decisions.lock().unwrap();

        if *count >= decisions.len() {
            panic!(
                "ScriptedPlanner: no more decisions (call #{}, have {})",
                *count,
                decisions.len()
            );
        }

        let decision = decisions[*count].clone();
        *count += 1;
        Ok(decision)
    }
}

pub fn scripted(decisions: Vec<PlannerDecision>) -> Arc<ScriptedPlanner> {
    Arc::new(ScriptedPlanner::new(decisions))
}

/// A planner that fails every call with a fixed error.
pub struct FailingPlanner(PlannerError);

#[async_trait]
impl Planner for FailingPlanner {
    fn name(&self) -> &str {
        "failing"
    }

    async fn plan(&self, _request: PlanRequest) -> Result<PlannerDecision, PlannerError> {
        Err(self.0.clone())
    }
}

pub fn failing_planner(error: PlannerError) -> Arc<dyn Planner> {
    Arc::new(FailingPlanner(error))
}

/// An evaluator that returns scripted evaluations in order and lets the
/// run proceed once the script is exhausted. Records the history length
/// it saw on each call.
pub struct ScriptedEvaluator {
    evaluations: Mutex<Vec<Evaluation>>,
    call_count: Mutex<usize>,
    seen_history_lens: Mutex<Vec<usize>>,
}

impl ScriptedEvaluator {
    pub fn new(evaluations: Vec<Evaluation>) -> Self {
        Self {
            evaluations: Mutex::new(evaluations),
            call_count: Mutex::new(0),
            seen_history_lens: Mutex::new(Vec::new()),
        }
    }

    pub fn seen_history_lens(&self) -> Vec<usize> {
        self.seen_history_lens.lock().unwrap().clone()
    }
}

#[async_trait]
impl Evaluator for ScriptedEvaluator {
    async fn evaluate(
        &self,
        _decision: &PlannerDecision,
        _user_message: &str,
        history: &[HistoryEntry],
        _user_id: &str,
    ) -> Result<Evaluation, EvaluatorError> {
        self.seen_history_lens.lock().unwrap().push(history.len());
        let mut count = self.call_count.lock().unwrap();
        let evaluations = self.evaluations.lock().unwrap();
        let evaluation = evaluations.get(*count).cloned().unwrap_or_else(Evaluation::proceed);
        *count += 1;
        Ok(evaluation)
    }
}

pub fn scripted_evaluations(evaluations: Vec<Evaluation>) -> Arc<ScriptedEvaluator> {
    Arc::new(ScriptedEvaluator::new(evaluations))
}

pub fn permissive() -> Arc<dyn Evaluator> {
    Arc::new(ScriptedEvaluator::new(Vec::new()))
}

/// An evaluator that asks for confirmation of every proposed action,
/// echoing the decision's action as the suggestion.
pub struct ConfirmingEvaluator {
    question: String,
}

#[async_trait]
impl Evaluator for ConfirmingEvaluator {
    async fn evaluate(
        &self,
        decision: &PlannerDecision,
        _user_message: &str,
        _history: &[HistoryEntry],
        _user_id: &str,
    ) -> Result<Evaluation, EvaluatorError> {
        Ok(Evaluation::confirmation(
            &self.question,
            SuggestedAction {
                action: decision.action.clone().unwrap_or_default(),
                parameters: decision.action_input.clone().unwrap_or_default(),
            },
        ))
    }
}

pub fn confirm_all(question: &str) -> Arc<dyn Evaluator> {
    Arc::new(ConfirmingEvaluator {
        question: question.into(),
    })
}

/// An evaluator that fails every call.
pub struct FailingEvaluator {
    message: String,
}

#[async_trait]
impl Evaluator for FailingEvaluator {
    async fn evaluate(
        &self,
        _decision: &PlannerDecision,
        _user_message: &str,
        _history: &[HistoryEntry],
        _user_id: &str,
    ) -> Result<Evaluation, EvaluatorError> {
        Err(EvaluatorError::Failed(self.message.clone()))
    }
}

pub fn failing_evaluator(message: &str) -> Arc<dyn Evaluator> {
    Arc::new(FailingEvaluator {
        message: message.into(),
    })
}

/// A tool that records every execution and returns a fixed result.
/// Clones share the log, so tests keep one copy and register another.
#[derive(Clone)]
pub struct RecordingTool {
    name: String,
    result: Value,
    executions: Arc<Mutex<Vec<Map<String, Value>>>>,
    users: Arc<Mutex<Vec<String>>>,
}

impl RecordingTool {
    pub fn new(name: &str, result: Value) -> Self {
        Self {
            name: name.into(),
            result,
            executions: Arc::new(Mutex::new(Vec::new())),
            users: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn execution_count(&self) -> usize {
        self.executions.lock().unwrap().len()
    }

    pub fn last_parameters(&self) -> Option<Map<String, Value>> {
        self.executions.lock().unwrap().last().cloned()
    }

    pub fn seen_users(&self) -> Vec<String> {
        self.users.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for RecordingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "records calls and returns a fixed result"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object"})
    }

    async fn execute(
        &self,
        parameters: Map<String, Value>,
        context: &ToolContext,
    ) -> Result<Value, ToolError> {
        self.executions.lock().unwrap().push(parameters);
        self.users.lock().unwrap().push(context.user_id.clone());
        Ok(self.result.clone())
    }
}

/// A tool that fails every execution.
pub struct FailingTool {
    name: String,
}

impl FailingTool {
    pub fn new(name: &str) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "fails every call"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object"})
    }

    async fn execute(
        &self,
        _parameters: Map<String, Value>,
        _context: &ToolContext,
    ) -> Result<Value, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: self.name.clone(),
            reason: "upstream API returned 500".into(),
        })
    }
}

/// A tool that blocks until released, for concurrency tests. Clones
/// share the gate; releasing before the call starts also unblocks it.
#[derive(Clone)]
pub struct BlockingTool {
    gate: Arc<tokio::sync::Notify>,
}

impl BlockingTool {
    pub fn new() -> Self {
        Self {
            gate: Arc::new(tokio::sync::Notify::new()),
        }
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl Tool for BlockingTool {
    fn name(&self) -> &str {
        "slow_tool"
    }

    fn description(&self) -> &str {
        "blocks until released"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object"})
    }

    async fn execute(
        &self,
        _parameters: Map<String, Value>,
        _context: &ToolContext,
    ) -> Result<Value, ToolError> {
        self.gate.notified().await;
        Ok(json!("released"))
    }
}

// ── Assembly helpers ───────────────────────────────────────────────────

pub fn params(entries: &[(&str, Value)]) -> Map<String, Value> {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

pub fn empty_registry() -> Arc<ToolRegistry> {
    Arc::new(ToolRegistry::new())
}

pub fn registry_of(tools: Vec<&RecordingTool>) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(Box::new(tool.clone()));
    }
    Arc::new(registry)
}

pub fn registry_of_boxed(tools: Vec<Box<dyn Tool>>) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool);
    }
    Arc::new(registry)
}

pub fn react_loop(
    planner: Arc<dyn Planner>,
    evaluator: Arc<dyn Evaluator>,
    tools: Arc<ToolRegistry>,
) -> ReactLoop {
    react_loop_with_store(planner, evaluator, tools, Arc::new(MemoryStore::new()))
}

pub fn react_loop_with_store(
    planner: Arc<dyn Planner>,
    evaluator: Arc<dyn Evaluator>,
    tools: Arc<ToolRegistry>,
    store: Arc<dyn StateStore>,
) -> ReactLoop {
    ReactLoop {
        planner,
        evaluator,
        hitl: Arc::new(DefaultHitlHandler::new(Locale::En)),
        tools,
        store,
        max_steps: 10,
        state_ttl: Duration::from_secs(3600),
        locale: Locale::En,
    }
}
