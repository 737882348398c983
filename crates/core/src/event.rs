//! Agent events: the output sink of the agent loop.
//!
//! The loop publishes progress here (streamed chunks, tool calls,
//! interventions, warnings). What a subscriber does with them (print to a
//! terminal, append to a UI buffer) does not affect the loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Events emitted while an agent works through a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A streaming attempt started against the chat model.
    StreamStarted { agent: String },

    /// Partial text from the chat model.
    Chunk { agent: String, content: String },

    /// Output of an ad-hoc utility call (summaries, memory cleanup).
    Adhoc {
        agent: String,
        label: String,
        content: String,
    },

    /// A tool lifecycle is starting.
    ToolCall {
        agent: String,
        tool: String,
        args: serde_json::Value,
    },

    /// A tool finished its lifecycle.
    ToolResult {
        agent: String,
        tool: String,
        message: String,
        break_loop: bool,
    },

    /// A human intervention was woven into the history.
    Intervention { agent: String, message: String },

    /// A corrective message was injected (malformed request, repetition).
    Warning { agent: String, message: String },

    /// A streaming attempt failed and the error was fed back to the model.
    Error { agent: String, message: String },

    /// The rate limiter is holding the next call back.
    RateLimited { agent: String, wait_ms: u64 },

    /// The middle of the history was replaced by a summary.
    Compacted {
        agent: String,
        summarized: usize,
        remaining: usize,
    },

    /// The turn ended with a final response.
    TurnComplete {
        agent: String,
        response: String,
        timestamp: DateTime<Utc>,
    },
}

impl AgentEvent {
    /// Short event name, handy for log lines and SSE event types.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::StreamStarted { .. } => "stream_started",
            Self::Chunk { .. } => "chunk",
            Self::Adhoc { .. } => "adhoc",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Intervention { .. } => "intervention",
            Self::Warning { .. } => "warning",
            Self::Error { .. } => "error",
            Self::RateLimited { .. } => "rate_limited",
            Self::Compacted { .. } => "compacted",
            Self::TurnComplete { .. } => "turn_complete",
        }
    }
}

/// A broadcast-based event bus for agent events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<AgentEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: AgentEvent) {
        // Ignore send errors (no subscribers = that's fine)
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<AgentEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(AgentEvent::ToolResult {
            agent: "Agent 0".into(),
            tool: "response".into(),
            message: "done".into(),
            break_loop: true,
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            AgentEvent::ToolResult { tool, break_loop, .. } => {
                assert_eq!(tool, "response");
                assert!(break_loop);
            }
            _ => panic!("Expected ToolResult event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(AgentEvent::Error {
            agent: "Agent 0".into(),
            message: "no subscribers".into(),
        });
    }

    #[test]
    fn event_serialization_chunk() {
        let event = AgentEvent::Chunk {
            agent: "Agent 0".into(),
            content: "Hello".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"chunk""#));
        assert_eq!(event.event_type(), "chunk");
    }
}
