//! Shared test helpers for agent loop tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use zeroloop_core::agent::{AgentConfig, RateLimitConfig};
use zeroloop_core::error::ProviderError;
use zeroloop_core::provider::{ChatModel, ChunkStream, Provider, ProviderRequest, StreamChunk};
use crate::agent::Agent;
use crate::control::{AgentControl, AgentHandle};
use crate::prompts::Prompts;

/// One scripted reaction to a `stream` call.
pub enum Step {
    /// Stream these chunks, then end.
    Reply(Vec<String>),
    /// Fail the call.
    Fail(ProviderError),
    /// Stream these chunks, then fail mid-stream.
    ReplyThenFail(Vec<String>, ProviderError),
}

struct Interrupt {
    after_chunks: usize,
    handle: AgentHandle,
    text: String,
}

/// A provider that plays back scripted streams in order.
///
/// Panics if more calls are made than steps provided.
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<ProviderRequest>>,
    interrupt: Mutex<Option<Interrupt>>,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
            interrupt: Mutex::new(None),
        }
    }

    /// Each reply streamed as a single chunk.
    pub fn replies(replies: &[&str]) -> Self {
        Self::new(
            replies
                .iter()
                .map(|r| Step::Reply(vec![r.to_string()]))
                .collect(),
        )
    }

    /// On the next multi-chunk reply, send `text` to `handle` once the
    /// consumer has received `after_chunks` chunks.
    pub fn interrupt_after(&self, after_chunks: usize, handle: AgentHandle, text: &str) {
        *self.interrupt.lock().unwrap() = Some(Interrupt {
            after_chunks,
            handle,
            text: text.to_string(),
        });
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkStream, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let step = self.steps.lock().unwrap().pop_front();
        let (chunks, trailing_error) = match step {
            Some(Step::Reply(chunks)) => (chunks, None),
            Some(Step::ReplyThenFail(chunks, err)) => (chunks, Some(err)),
            Some(Step::Fail(err)) => return Err(err),
            None => panic!(
                "ScriptedProvider: no more steps (call #{})",
                self.call_count()
            ),
        };

        let interrupt = self.interrupt.lock().unwrap().take();
        match interrupt {
            None => {
                let (tx, rx) = mpsc::channel(chunks.len() + 1);
                for chunk in chunks {
                    tx.try_send(Ok(StreamChunk::text(chunk))).unwrap();
                }
                if let Some(err) = trailing_error {
                    tx.try_send(Err(err)).unwrap();
                }
                Ok(rx)
            }
            Some(interrupt) => {
                // Capacity 1: a send completes only after the previous chunk
                // was received.
                let (tx, rx) = mpsc::channel(1);
                tokio::spawn(async move {
                    for (i, chunk) in chunks.into_iter().enumerate() {
                        if tx.send(Ok(StreamChunk::text(chunk))).await.is_err() {
                            return;
                        }
                        if i == interrupt.after_chunks {
                            interrupt.handle.intervene(interrupt.text.clone());
                        }
                    }
                    if let Some(err) = trailing_error {
                        let _ = tx.send(Err(err)).await;
                    }
                });
                Ok(rx)
            }
        }
    }
}

pub fn model(provider: &Arc<ScriptedProvider>) -> ChatModel {
    ChatModel::new(provider.clone(), "scripted-model")
}

/// Settings with no rate limits and no auto-recall.
pub fn test_config() -> AgentConfig {
    AgentConfig {
        auto_memory_count: 0,
        rate_limit: RateLimitConfig::unlimited(),
        ..AgentConfig::default()
    }
}

/// An agent with built-in prompts and the default tool set.
pub fn test_agent(chat: &Arc<ScriptedProvider>, utility: &Arc<ScriptedProvider>) -> Agent {
    Agent::new(
        0,
        model(chat),
        model(utility),
        Prompts::builtin(),
        Arc::new(AgentControl::new()),
    )
    .with_config(test_config())
    .with_tools(Arc::new(zeroloop_tools::default_registry()))
}

/// A `response` tool request ending the turn with `text`.
pub fn response_json(text: &str) -> String {
    serde_json::json!({"tool_name": "response", "tool_args": {"text": text}}).to_string()
}
