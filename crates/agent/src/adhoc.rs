//! Ad-hoc calls to the utility model: history summaries and memory cleanup.
//!
//! These run outside the main loop. They are rate limited like any other
//! call and honour the pause flag, but they only *observe* interventions:
//! a pending message stops the stream early and is left for the next
//! checkpoint of the main loop to handle.

use serde_json::json;
use tracing::{debug, info, warn};
use zeroloop_core::error::Result;
use zeroloop_core::event::AgentEvent;
use zeroloop_core::memory::{format_memories, MemoryQuery};
use zeroloop_core::message::{concat_messages, Message};
use crate::agent::Agent;

impl Agent {
    /// One-shot call: `system` plus a single human message, streamed and
    /// collected.
    pub async fn send_adhoc_message(&mut self, system: &str, message: &str, label: &str) -> Result<String> {
        let request = self.utility.request(system, vec![Message::human(message)]);
        self.throttle(request.estimated_tokens()).await;

        debug!(agent = %self.name, label, model = %self.utility.model, "Ad-hoc call");
        let mut stream = self.utility.provider.stream(request).await?;
        let mut response = String::new();
        while let Some(chunk) = stream.recv().await {
            self.gate.wait_while_paused().await;
            if self.gate.has_pending() {
                info!(agent = %self.name, label, "Ad-hoc call cut short by intervention");
                break;
            }
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    self.rate_limiter.record_output_tokens(response.len() / 4);
                    return Err(e.into());
                }
            };
            if let Some(text) = chunk.content {
                response.push_str(&text);
            }
            if chunk.done {
                break;
            }
        }
        drop(stream);
        self.rate_limiter.record_output_tokens(response.len() / 4);

        self.emit(AgentEvent::Adhoc {
            agent: self.name.clone(),
            label: label.to_string(),
            content: response.clone(),
        });
        Ok(response)
    }

    /// Summarize a history segment into text that replaces it.
    pub async fn summarize(&mut self, segment: &[Message]) -> Result<String> {
        let system = self.prompts.msg_cleanup.text().to_string();
        self.send_adhoc_message(&system, &concat_messages(segment), "Summary")
            .await
    }

    /// Memories relevant to the conversation, cleaned by the utility model.
    ///
    /// Runs a fresh search every `auto_memory_skip + 1` attempts and reuses
    /// the previous text in between.
    pub(crate) async fn fetch_memories(&mut self) -> Result<String> {
        if self.config.auto_memory_count == 0 {
            return Ok(String::new());
        }
        let Some(memory) = self.memory.clone() else {
            return Ok(String::new());
        };

        if self.memory_skip_counter > 0 {
            self.memory_skip_counter -= 1;
            return Ok(self.cached_memories.clone());
        }
        self.memory_skip_counter = self.config.auto_memory_skip;

        let conversation = concat_messages(self.history.messages());
        let query = MemoryQuery::new(conversation.as_str(), self.config.auto_memory_count);
        let raw = match memory.search(query).await {
            Ok(entries) => format_memories(&entries),
            Err(e) => {
                warn!(agent = %self.name, "Memory recall failed: {e}");
                String::new()
            }
        };
        if raw.is_empty() {
            self.cached_memories.clear();
            return Ok(String::new());
        }

        let input = json!({
            "conversation_history": conversation,
            "raw_memories": raw,
        });
        let system = self.prompts.memory_cleanup.text().to_string();
        let cleaned = self
            .send_adhoc_message(&system, &input.to_string(), "Memory injection")
            .await?;
        self.cached_memories = cleaned.clone();
        Ok(cleaned)
    }
}
