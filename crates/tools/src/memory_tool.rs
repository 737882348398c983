//! Memory tool: lets the agent search, store and remove long-term memories.
//!
//! Exactly one action argument is expected:
//! - `query`: search (optional `limit`, default 5)
//! - `memorize`: store the given text
//! - `forget`: delete every memory matching the given query
//! - `delete`: delete memories by comma-separated ids
//!
//! Without a memory backend the tool reports that memory is disabled instead
//! of failing the loop.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use zeroloop_core::error::ToolError;
use zeroloop_core::memory::{format_memories, MemoryEntry, MemoryQuery};
use zeroloop_core::tool::{Tool, ToolArgs, ToolContext, ToolResult};

pub const NAME: &str = "memory_tool";

pub const DESCRIPTION: &str = "Long-term memory. Args: {\"query\": text, \"limit\": n} to search, \
    {\"memorize\": text} to store, {\"forget\": text} to delete matching memories, \
    {\"delete\": \"id1,id2\"} to delete by id.";

/// Upper bound on memories removed by a single `forget`.
const FORGET_LIMIT: usize = 20;

#[derive(Debug, Default)]
pub struct MemoryTool;

fn text_arg<'a>(args: &'a ToolArgs, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str).map(str::trim)
}

#[async_trait]
impl Tool for MemoryTool {
    fn name(&self) -> &str {
        NAME
    }

    async fn execute(&self, ctx: &mut ToolContext<'_>, args: &ToolArgs) -> Result<ToolResult, ToolError> {
        let Some(backend) = ctx.memory().cloned() else {
            return Ok(ToolResult::reply("Memory is not enabled for this agent."));
        };

        if let Some(query) = text_arg(args, "query") {
            let limit = args
                .get("limit")
                .and_then(Value::as_u64)
                .unwrap_or(5)
                .clamp(1, 50) as usize;
            let entries = backend.search(MemoryQuery::new(query, limit)).await?;
            debug!(agent = %ctx.agent_name(), hits = entries.len(), "Memory query");
            let message = if entries.is_empty() {
                format!("No memories found matching '{query}'.")
            } else {
                format_memories(&entries)
            };
            return Ok(ToolResult::reply(message));
        }

        if let Some(text) = text_arg(args, "memorize") {
            if text.is_empty() {
                return Err(ToolError::InvalidArguments("'memorize' must not be empty".into()));
            }
            let id = backend.store(MemoryEntry::new(text)).await?;
            return Ok(ToolResult::reply(format!("Memory saved with id {id}.")));
        }

        if let Some(query) = text_arg(args, "forget") {
            let entries = backend.search(MemoryQuery::new(query, FORGET_LIMIT)).await?;
            let mut removed = 0;
            for entry in &entries {
                if backend.delete(&entry.id).await? {
                    removed += 1;
                }
            }
            return Ok(ToolResult::reply(format!("{removed} memories deleted.")));
        }

        if let Some(ids) = text_arg(args, "delete") {
            let mut removed = 0;
            for id in ids.split(',').map(str::trim).filter(|id| !id.is_empty()) {
                if backend.delete(id).await? {
                    removed += 1;
                }
            }
            return Ok(ToolResult::reply(format!("{removed} memories deleted.")));
        }

        Err(ToolError::InvalidArguments(
            "expected one of 'query', 'memorize', 'forget' or 'delete'".into(),
        ))
    }
}
