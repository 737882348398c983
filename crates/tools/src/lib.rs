//! Built-in tools for zeroloop.
//!
//! - `response`: hands the final answer back to the user and ends the turn
//! - `memory_tool`: searches and edits the agent's long-term memory
//!
//! Names nobody registered fall back to the core `UnknownTool`, which tells
//! the model which tools exist.

pub mod memory_tool;
pub mod response;

use std::sync::Arc;
use zeroloop_core::tool::ToolRegistry;

pub use memory_tool::MemoryTool;
pub use response::ResponseTool;

/// Create a registry with all built-in tools.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ResponseTool), response::DESCRIPTION);
    registry.register(Arc::new(MemoryTool), memory_tool::DESCRIPTION);
    registry
}
