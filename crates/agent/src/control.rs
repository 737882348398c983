//! Shared control surface for running agents.
//!
//! One [`AgentControl`] is shared by every agent in a process (and by the
//! UI driving them). It carries the pause flag and a pointer to whichever
//! agent is currently streaming, so that a human message typed mid-run can
//! be routed to it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Cloneable handle to one agent's intervention slot.
#[derive(Debug, Clone)]
pub struct AgentHandle {
    name: Arc<str>,
    pending: Arc<Mutex<Option<String>>>,
}

impl AgentHandle {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            pending: Arc::new(Mutex::new(None)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Leave a message for the agent. A message that has not been picked up
    /// yet is replaced.
    pub fn intervene(&self, text: impl Into<String>) {
        let text = text.into();
        debug!(agent = %self.name, "Intervention queued");
        *self.pending.lock().unwrap_or_else(|e| e.into_inner()) = Some(text);
    }

    /// Whether a message is waiting to be picked up.
    pub fn has_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    pub(crate) fn take_pending(&self) -> Option<String> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    /// Whether both handles point at the same agent.
    pub fn same_agent(&self, other: &AgentHandle) -> bool {
        Arc::ptr_eq(&self.pending, &other.pending)
    }
}

/// Process-wide pause flag and streaming-agent pointer.
#[derive(Debug, Default)]
pub struct AgentControl {
    paused: AtomicBool,
    streaming: Mutex<Option<AgentHandle>>,
}

impl AgentControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Point at the agent that is streaming now.
    pub fn set_streaming(&self, handle: AgentHandle) {
        *self.streaming.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// Clear the pointer, but only if it still points at `handle`.
    pub fn clear_streaming(&self, handle: &AgentHandle) {
        let mut current = self.streaming.lock().unwrap_or_else(|e| e.into_inner());
        if current.as_ref().is_some_and(|h| h.same_agent(handle)) {
            *current = None;
        }
    }

    /// The agent currently streaming, if any.
    pub fn streaming_agent(&self) -> Option<AgentHandle> {
        self.streaming
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Route a message to the streaming agent. Returns `false` when no agent
    /// is running.
    pub fn intervene(&self, text: impl Into<String>) -> bool {
        match self.streaming_agent() {
            Some(handle) => {
                handle.intervene(text);
                true
            }
            None => false,
        }
    }
}

/// Clears the streaming pointer when a turn ends, however it ends.
pub(crate) struct StreamingGuard {
    control: Arc<AgentControl>,
    handle: AgentHandle,
}

impl StreamingGuard {
    pub(crate) fn new(control: Arc<AgentControl>, handle: AgentHandle) -> Self {
        Self { control, handle }
    }
}

impl Drop for StreamingGuard {
    fn drop(&mut self) {
        self.control.clear_streaming(&self.handle);
    }
}
