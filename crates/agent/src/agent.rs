//! The agent message loop.
//!
//! One call to [`Agent::message_loop`] is one turn: the user's text is
//! appended to the history, then the loop streams the chat model, weaves in
//! interventions, detects stalls, and dispatches tool requests until a tool
//! ends the turn. Failures inside a streaming attempt are fed back to the
//! model as a corrective message and the attempt is retried.

use std::sync::Arc;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};
use zeroloop_core::agent::AgentConfig;
use zeroloop_core::error::{format_error, Result};
use zeroloop_core::event::{AgentEvent, EventBus};
use zeroloop_core::history::{Appended, History};
use zeroloop_core::memory::MemoryBackend;
use zeroloop_core::message::Role;
use zeroloop_core::provider::ChatModel;
use zeroloop_core::tool::ToolRegistry;
use crate::control::{AgentControl, AgentHandle, StreamingGuard};
use crate::intervention::InterventionGate;
use crate::prompts::Prompts;
use crate::rate_limiter::RateLimiter;

/// A conversational agent driving one chat session.
pub struct Agent {
    pub(crate) number: usize,
    pub(crate) name: String,
    pub(crate) config: AgentConfig,
    pub(crate) chat: ChatModel,
    pub(crate) utility: ChatModel,
    pub(crate) tools: Arc<ToolRegistry>,
    pub(crate) prompts: Prompts,
    pub(crate) memory: Option<Arc<dyn MemoryBackend>>,
    pub(crate) event_bus: Arc<EventBus>,
    pub(crate) gate: InterventionGate,
    pub(crate) history: History,
    pub(crate) rate_limiter: RateLimiter,
    pub(crate) data: serde_json::Map<String, Value>,
    pub(crate) last_ai_response: Option<String>,
    pub(crate) memory_skip_counter: u32,
    pub(crate) cached_memories: String,
}

impl Agent {
    /// Create agent number `number`, named `"Agent {number}"`.
    ///
    /// `chat` drives the conversation; `utility` serves the ad-hoc calls
    /// (summaries, memory cleanup).
    pub fn new(
        number: usize,
        chat: ChatModel,
        utility: ChatModel,
        prompts: Prompts,
        control: Arc<AgentControl>,
    ) -> Self {
        let name = format!("Agent {number}");
        let config = AgentConfig::default();
        let handle = AgentHandle::new(name.as_str());
        Self {
            number,
            rate_limiter: RateLimiter::new(config.rate_limit.clone()),
            gate: InterventionGate::new(control, handle),
            name,
            config,
            chat,
            utility,
            tools: Arc::new(ToolRegistry::new()),
            prompts,
            memory: None,
            event_bus: Arc::new(EventBus::default()),
            history: History::new(),
            data: serde_json::Map::new(),
            last_ai_response: None,
            memory_skip_counter: 0,
            cached_memories: String::new(),
        }
    }

    /// Replace the runtime settings (resets the rate limiter window).
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.rate_limiter = RateLimiter::new(config.rate_limit.clone());
        self.config = config;
        self
    }

    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    /// Attach a memory backend for auto-recall and the memory tool.
    pub fn with_memory(mut self, memory: Arc<dyn MemoryBackend>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Handle for sending this agent interventions from another task.
    pub fn handle(&self) -> AgentHandle {
        self.gate.handle().clone()
    }

    pub fn control(&self) -> &Arc<AgentControl> {
        self.gate.control()
    }

    pub fn get_data(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set_data(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    pub(crate) fn emit(&self, event: AgentEvent) {
        self.event_bus.publish(event);
    }

    /// Run one turn and return the final response.
    pub async fn message_loop(&mut self, user_text: &str) -> Result<String> {
        info!(agent = %self.name, "Processing user message");
        let message = self.prompts.user_message.render(&[("message", user_text)]);
        self.append_message(&message, Role::Human).await;
        self.memory_skip_counter = 0;

        let control = self.control().clone();
        let _streaming = StreamingGuard::new(control.clone(), self.handle());

        loop {
            control.set_streaming(self.handle());
            self.gate.reset();

            match self.stream_attempt().await {
                Ok(Some(response)) => {
                    info!(agent = %self.name, "Turn complete");
                    self.emit(AgentEvent::TurnComplete {
                        agent: self.name.clone(),
                        response: response.clone(),
                        timestamp: Utc::now(),
                    });
                    return Ok(response);
                }
                Ok(None) => continue,
                Err(e) => {
                    let text = format_error(&e);
                    warn!(agent = %self.name, error = %text, "Streaming attempt failed");
                    self.emit(AgentEvent::Error {
                        agent: self.name.clone(),
                        message: text.clone(),
                    });
                    let message = self.prompts.error.render(&[("error", &text)]);
                    self.append_message(&message, Role::Human).await;
                }
            }
        }
    }

    /// One streaming attempt. `Some` ends the turn.
    async fn stream_attempt(&mut self) -> Result<Option<String>> {
        let memories = self.fetch_memories().await?;
        let system = self.system_prompt(&memories);
        let request = self.chat.request(system, self.history.messages().to_vec());
        self.throttle(request.estimated_tokens()).await;

        debug!(agent = %self.name, messages = self.history.len(), "Streaming chat model");
        self.emit(AgentEvent::StreamStarted {
            agent: self.name.clone(),
        });
        let mut stream = self.chat.provider.stream(request).await?;

        let mut response = String::new();
        while let Some(chunk) = stream.recv().await {
            if self.check_intervention(&response).await {
                break;
            }
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    self.rate_limiter.record_output_tokens(response.len() / 4);
                    return Err(e.into());
                }
            };
            if let Some(text) = chunk.content.filter(|t| !t.is_empty()) {
                response.push_str(&text);
                self.emit(AgentEvent::Chunk {
                    agent: self.name.clone(),
                    content: text,
                });
            }
            if chunk.done {
                break;
            }
        }
        drop(stream);
        self.rate_limiter.record_output_tokens(response.len() / 4);

        if self.check_intervention(&response).await {
            return Ok(None);
        }

        if self.last_ai_response.as_deref() == Some(response.as_str()) {
            warn!(agent = %self.name, "Model repeated its previous response");
            self.append_message(&response, Role::Ai).await;
            let warning = self.prompts.msg_repeat.text().to_string();
            self.append_message(&warning, Role::Human).await;
            self.emit(AgentEvent::Warning {
                agent: self.name.clone(),
                message: warning,
            });
            return Ok(None);
        }

        self.append_message(&response, Role::Ai).await;
        self.process_tools(&response).await
    }

    fn system_prompt(&self, memories: &str) -> String {
        let mut system = self.prompts.system.render(&[("agent_name", &self.name)]);
        system.push_str("\n\n");
        system.push_str(&self.prompts.tools.render(&[("tools", &self.tools.catalog())]));
        if !memories.trim().is_empty() {
            system.push_str("\n\n");
            system.push_str(memories);
        }
        system
    }

    /// Wait for rate-limit capacity, reporting any hold-up.
    pub(crate) async fn throttle(&mut self, tokens: usize) {
        let waited = self.rate_limiter.acquire(tokens).await;
        if !waited.is_zero() {
            self.emit(AgentEvent::RateLimited {
                agent: self.name.clone(),
                wait_ms: waited.as_millis() as u64,
            });
        }
    }

    /// Append to the history, merging same-role messages and compacting
    /// when a new message pushes the history past its bound.
    pub async fn append_message(&mut self, text: &str, role: Role) {
        if self.history.append(role, text) == Appended::Created {
            self.compact_history().await;
        }
        if role == Role::Ai {
            self.last_ai_response = Some(text.to_string());
        }
    }

    /// Summarize the middle of the history once it exceeds its bound.
    ///
    /// A failed summary leaves the history as it was; the next created
    /// message tries again.
    async fn compact_history(&mut self) {
        let Some(plan) = self.history.plan_compaction(
            self.config.msgs_keep_max,
            self.config.msgs_keep_start,
            self.config.msgs_keep_end,
        ) else {
            return;
        };

        let segment = self.history.segment(&plan).to_vec();
        let summary = match self.summarize(&segment).await {
            Ok(summary) => summary,
            Err(e) => {
                let text = format_error(&e);
                warn!(agent = %self.name, error = %text, "History compaction failed");
                self.emit(AgentEvent::Error {
                    agent: self.name.clone(),
                    message: text,
                });
                return;
            }
        };
        if self.history.apply_compaction(&plan, summary) {
            info!(
                agent = %self.name,
                summarized = segment.len(),
                remaining = self.history.len(),
                "Compacted history"
            );
            self.emit(AgentEvent::Compacted {
                agent: self.name.clone(),
                summarized: segment.len(),
                remaining: self.history.len(),
            });
        }
    }

    /// Checkpoint: wait out a pause and weave in a pending intervention.
    ///
    /// Returns `true` if an intervention was handled during this attempt.
    pub(crate) async fn check_intervention(&mut self, progress: &str) -> bool {
        if let Some(message) = self.gate.poll().await {
            info!(agent = %self.name, "Handling intervention");
            if !progress.trim().is_empty() {
                self.append_message(progress, Role::Ai).await;
            }
            let text = self
                .prompts
                .intervention
                .render(&[("user_message", &message)]);
            self.append_message(&text, Role::Human).await;
            self.emit(AgentEvent::Intervention {
                agent: self.name.clone(),
                message,
            });
        }
        self.gate.is_processed()
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("chat", &self.chat)
            .field("utility", &self.utility)
            .field("history_len", &self.history.len())
            .finish()
    }
}
