//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are what let the agent act on the ad platform: generate
//! creatives, search products, create/pause/delete campaigns, etc. The
//! orchestrator addresses them by name through a [`ToolRegistry`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ToolError;
use crate::message::ChatMessage;

/// Per-invocation context handed to every tool.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// The user on whose behalf the tool acts.
    pub user_id: String,

    /// The session transcript so far, for tools that need conversational
    /// grounding (e.g. creative generation referencing earlier turns).
    pub conversation_history: Vec<ChatMessage>,
}

impl ToolContext {
    pub fn new(user_id: impl Into<String>, conversation_history: Vec<ChatMessage>) -> Self {
        Self {
            user_id: user_id.into(),
            conversation_history,
        }
    }
}

/// What the planner is told about a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's parameters.
    pub parameters: serde_json::Value,
}

/// The core Tool trait.
///
/// Each capability (image generation, product search, campaign management,
/// ...) implements this trait and is registered in the [`ToolRegistry`]
/// the agent loop executes against.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "generate_image").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the planner).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute with the given parameters and invocation context.
    async fn execute(
        &self,
        parameters: serde_json::Map<String, serde_json::Value>,
        context: &ToolContext,
    ) -> std::result::Result<serde_json::Value, ToolError>;

    /// Convert this tool into a descriptor for the planner.
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// The agent loop uses this to:
/// 1. Get tool descriptors to send to the planner
/// 2. Look up and execute tools when the planner requests them
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool descriptors (for sending to the planner).
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.values().map(|t| t.descriptor()).collect()
    }

    /// Resolve and execute a tool by name.
    pub async fn execute(
        &self,
        name: &str,
        parameters: serde_json::Map<String, serde_json::Value>,
        context: &ToolContext,
    ) -> std::result::Result<serde_json::Value, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.execute(parameters, context).await
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(
            &self,
            parameters: serde_json::Map<String, serde_json::Value>,
            context: &ToolContext,
        ) -> std::result::Result<serde_json::Value, ToolError> {
            let text = parameters
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            Ok(json!({ "echo": text, "user": context.user_id }))
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registry_descriptors() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let descriptors = registry.descriptors();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].name, "echo");
    }

    #[tokio::test]
    async fn registry_execute_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let mut params = serde_json::Map::new();
        params.insert("text".into(), json!("hello world"));
        let ctx = ToolContext::new("user-1", Vec::new());
        let result = registry.execute("echo", params, &ctx).await.unwrap();
        assert_eq!(result["echo"], "hello world");
        assert_eq!(result["user"], "user-1");
    }

    #[tokio::test]
    async fn registry_execute_missing_tool() {
        let registry = ToolRegistry::new();
        let ctx = ToolContext::default();
        let err = registry
            .execute("nonexistent", serde_json::Map::new(), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
        assert_eq!(err.error_code(), "TOOL_NOT_FOUND");
    }
}
