//! The zeroloop agent loop.
//!
//! An [`Agent`] drives one chat session:
//!
//! 1. **Append** the user's message to the history
//! 2. **Stream** the chat model (rate limited, with recalled memories in the
//!    system prompt), checking for human interventions on every chunk
//! 3. **Detect stalls** (an exact repeat of the previous reply)
//! 4. **Dispatch** the tool request found in the reply
//! 5. **Repeat** until a tool ends the turn
//!
//! History is kept bounded by summarizing its middle through the utility
//! model whenever it grows past `msgs_keep_max`.

pub mod adhoc;
pub mod agent;
pub mod control;
pub mod dispatch;
pub mod extract;
pub mod intervention;
pub mod prompts;
pub mod rate_limiter;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use agent::Agent;
pub use control::{AgentControl, AgentHandle};
pub use extract::parse_tool_request;
pub use intervention::InterventionGate;
pub use prompts::{FilePromptLoader, Prompts};
pub use rate_limiter::RateLimiter;
