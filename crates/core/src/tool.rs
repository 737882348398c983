//! Tool trait: the abstraction over agent capabilities.
//!
//! The model asks for a tool by emitting a JSON object such as
//! `{"tool_name": "response", "tool_args": {"text": "done"}}` somewhere in
//! its reply. Each request gets a fresh tool object from the registry and
//! runs through a three-phase lifecycle (`before_execution`, `execute`,
//! `after_execution`) with intervention checkpoints between phases.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use crate::error::ToolError;
use crate::memory::MemoryBackend;
use crate::message::{Message, Role};
use crate::prompt::PromptTemplate;

/// Tool arguments as sent by the model.
pub type ToolArgs = serde_json::Map<String, Value>;

/// A parsed tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    /// Name of the tool to execute
    pub tool_name: String,

    /// Arguments as a JSON object
    #[serde(default)]
    pub tool_args: ToolArgs,
}

/// The result of a tool execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Text reported back to the model (or returned to the user on break)
    pub message: String,

    /// End the current turn and return `message` as its final output
    pub break_loop: bool,
}

impl ToolResult {
    /// A result that keeps the loop running.
    pub fn reply(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            break_loop: false,
        }
    }

    /// A result that ends the turn.
    pub fn finish(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            break_loop: true,
        }
    }
}

/// What a tool can see and touch while it runs.
///
/// Messages queued with [`ToolContext::append`] are written to the agent's
/// history (with compaction) once the current lifecycle phase returns.
pub struct ToolContext<'a> {
    agent_name: &'a str,
    data: &'a mut serde_json::Map<String, Value>,
    memory: Option<Arc<dyn MemoryBackend>>,
    tool_response: &'a PromptTemplate,
    max_response_len: usize,
    outbox: Vec<Message>,
}

impl<'a> ToolContext<'a> {
    pub fn new(
        agent_name: &'a str,
        data: &'a mut serde_json::Map<String, Value>,
        tool_response: &'a PromptTemplate,
    ) -> Self {
        Self {
            agent_name,
            data,
            memory: None,
            tool_response,
            max_response_len: 3000,
            outbox: Vec::new(),
        }
    }

    pub fn with_memory(mut self, memory: Option<Arc<dyn MemoryBackend>>) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_max_response_len(mut self, max: usize) -> Self {
        self.max_response_len = max;
        self
    }

    pub fn agent_name(&self) -> &str {
        self.agent_name
    }

    /// Read a value from the agent's scratch data.
    pub fn get_data(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Store a value in the agent's scratch data.
    pub fn set_data(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    /// The memory backend, if the agent has one.
    pub fn memory(&self) -> Option<&Arc<dyn MemoryBackend>> {
        self.memory.as_ref()
    }

    /// Queue a message for the agent's history.
    pub fn append(&mut self, role: Role, text: impl Into<String>) {
        self.outbox.push(Message {
            role,
            content: text.into(),
        });
    }

    /// Queue the standard "tool responded" message, truncated to the
    /// configured maximum length.
    pub fn append_tool_response(&mut self, tool_name: &str, text: &str) {
        let text = truncate_text(text.trim(), self.max_response_len);
        let msg = self
            .tool_response
            .render(&[("tool_name", tool_name), ("tool_response", &text)]);
        self.append(Role::Human, msg);
    }

    /// Take every queued message, leaving the outbox empty.
    pub fn take_outbox(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.outbox)
    }
}

/// Shorten `text` to at most `max` characters by cutting out its middle.
pub fn truncate_text(text: &str, max: usize) -> String {
    let total = text.chars().count();
    if max == 0 || total <= max {
        return text.to_string();
    }
    let keep = max / 2;
    let head: String = text.chars().take(keep).collect();
    let tail: String = text.chars().skip(total - keep).collect();
    format!("{head}\n\n... ({} characters omitted) ...\n\n{tail}", total - 2 * keep)
}

/// The core Tool trait.
///
/// A fresh tool object is built for every request, so implementations can
/// hold per-invocation state.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The name this tool was invoked under.
    fn name(&self) -> &str;

    /// Runs before `execute`. Default: log the call.
    async fn before_execution(
        &self,
        ctx: &mut ToolContext<'_>,
        args: &ToolArgs,
    ) -> std::result::Result<(), ToolError> {
        let args = Value::Object(args.clone());
        info!(agent = %ctx.agent_name(), tool = %self.name(), args = %args, "Using tool");
        Ok(())
    }

    /// Do the work.
    async fn execute(
        &self,
        ctx: &mut ToolContext<'_>,
        args: &ToolArgs,
    ) -> std::result::Result<ToolResult, ToolError>;

    /// Runs after `execute`. Default: report the result back to the model.
    async fn after_execution(
        &self,
        ctx: &mut ToolContext<'_>,
        result: &ToolResult,
    ) -> std::result::Result<(), ToolError> {
        ctx.append_tool_response(self.name(), &result.message);
        Ok(())
    }
}

/// Builds a tool object for one request.
pub type ToolFactory = Arc<dyn Fn(&ToolRequest) -> Arc<dyn Tool> + Send + Sync>;

struct RegisteredTool {
    description: String,
    factory: ToolFactory,
}

/// A registry of available tools, keyed by name.
///
/// Names that are not registered resolve to [`UnknownTool`], which reports
/// the mistake back to the model instead of failing the loop.
pub struct ToolRegistry {
    tools: BTreeMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a factory. Replaces any existing tool with the same name.
    pub fn register_factory<F>(&mut self, name: impl Into<String>, description: impl Into<String>, factory: F)
    where
        F: Fn(&ToolRequest) -> Arc<dyn Tool> + Send + Sync + 'static,
    {
        self.tools.insert(
            name.into(),
            RegisteredTool {
                description: description.into(),
                factory: Arc::new(factory),
            },
        );
    }

    /// Register a stateless tool that is shared across requests.
    pub fn register(&mut self, tool: Arc<dyn Tool>, description: impl Into<String>) {
        let name = tool.name().to_string();
        self.register_factory(name, description, move |_| tool.clone());
    }

    /// Build the tool for a request, falling back to [`UnknownTool`].
    pub fn resolve(&self, request: &ToolRequest) -> Arc<dyn Tool> {
        match self.tools.get(&request.tool_name) {
            Some(entry) => (entry.factory)(request),
            None => Arc::new(UnknownTool::new(&request.tool_name, self.catalog())),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// One `- name: description` line per tool, sorted by name.
    pub fn catalog(&self) -> String {
        self.tools
            .iter()
            .map(|(name, entry)| format!("- {name}: {}", entry.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Fallback for tool names nobody registered.
pub struct UnknownTool {
    name: String,
    catalog: String,
}

impl UnknownTool {
    pub fn new(name: impl Into<String>, catalog: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            catalog: catalog.into(),
        }
    }
}

#[async_trait]
impl Tool for UnknownTool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(
        &self,
        ctx: &mut ToolContext<'_>,
        _args: &ToolArgs,
    ) -> std::result::Result<ToolResult, ToolError> {
        tracing::warn!(agent = %ctx.agent_name(), tool = %self.name, "Model requested an unknown tool");
        Ok(ToolResult::reply(format!(
            "Tool \"{}\" not found. Available tools:\n{}",
            self.name, self.catalog
        )))
    }
}
