//! # zeroloop core
//!
//! Domain types, traits, and error definitions for the zeroloop agent loop.
//!
//! Every collaborator of the loop (model provider, tools, memory, prompt
//! templates, output sink) is defined as a trait or plain type here.
//! Implementations live in their respective crates.

pub mod error;
pub mod message;
pub mod history;
pub mod provider;
pub mod tool;
pub mod memory;
pub mod prompt;
pub mod agent;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{Message, Role};
pub use history::{Appended, CompactionPlan, History};
pub use provider::{ChatModel, ChunkStream, Provider, ProviderRequest, ProviderResponse, StreamChunk};
pub use tool::{Tool, ToolArgs, ToolContext, ToolRegistry, ToolRequest, ToolResult};
pub use memory::{MemoryBackend, MemoryEntry, MemoryQuery};
pub use prompt::{PromptLoader, PromptTemplate};
pub use agent::{AgentConfig, RateLimitConfig};
pub use event::{AgentEvent, EventBus};
