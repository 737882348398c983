//! Intervention gate.
//!
//! The gate is consulted at every checkpoint of the loop (each streamed
//! chunk, each tool phase). It blocks while the shared pause flag is set
//! and hands out a pending human message at most once per streaming
//! attempt. Weaving that message into the history is the agent's job.

use std::sync::Arc;
use std::time::Duration;
use crate::control::{AgentControl, AgentHandle};

/// Interval between pause-flag checks.
pub const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct InterventionGate {
    control: Arc<AgentControl>,
    handle: AgentHandle,
    processed: bool,
}

impl InterventionGate {
    pub fn new(control: Arc<AgentControl>, handle: AgentHandle) -> Self {
        Self {
            control,
            handle,
            processed: false,
        }
    }

    pub fn handle(&self) -> &AgentHandle {
        &self.handle
    }

    pub fn control(&self) -> &Arc<AgentControl> {
        &self.control
    }

    /// Whether an intervention was handled during the current attempt.
    pub fn is_processed(&self) -> bool {
        self.processed
    }

    /// Start of a new streaming attempt.
    pub fn reset(&mut self) {
        self.processed = false;
    }

    /// Sleep in bounded steps until the pause flag is cleared.
    pub async fn wait_while_paused(&self) {
        while self.control.is_paused() {
            tokio::time::sleep(PAUSE_POLL_INTERVAL).await;
        }
    }

    /// Whether a message is waiting. Does not consume it.
    pub fn has_pending(&self) -> bool {
        self.handle.has_pending()
    }

    /// Wait out any pause, then take the pending message if this attempt has
    /// not handled one yet.
    pub async fn poll(&mut self) -> Option<String> {
        self.wait_while_paused().await;
        if self.processed {
            return None;
        }
        let message = self.handle.take_pending()?;
        self.processed = true;
        Some(message)
    }
}
