//! Sliding-window rate limiter for model calls.
//!
//! Tracks call count, estimated input tokens and output tokens over a
//! trailing window. A ceiling of 0 disables that dimension.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};
use zeroloop_core::agent::RateLimitConfig;

#[derive(Debug, Clone)]
struct CallRecord {
    at: Instant,
    input_tokens: usize,
    output_tokens: usize,
}

/// Throttles model calls to stay within the configured ceilings.
#[derive(Debug)]
pub struct RateLimiter {
    limits: RateLimitConfig,
    records: VecDeque<CallRecord>,
}

impl RateLimiter {
    pub fn new(limits: RateLimitConfig) -> Self {
        Self {
            limits,
            records: VecDeque::new(),
        }
    }

    pub fn limits(&self) -> &RateLimitConfig {
        &self.limits
    }

    /// Calls currently inside the window.
    pub fn calls_in_window(&mut self) -> usize {
        self.evict(Instant::now());
        self.records.len()
    }

    /// Wait until a call with `input_tokens` fits, then record it.
    ///
    /// Returns how long the caller was held back.
    pub async fn acquire(&mut self, input_tokens: usize) -> Duration {
        let started = Instant::now();
        while let Some(wait) = self.wait_time(input_tokens) {
            info!(
                wait_ms = wait.as_millis() as u64,
                calls = self.records.len(),
                "Rate limit reached, waiting"
            );
            tokio::time::sleep(wait).await;
        }
        self.records.push_back(CallRecord {
            at: Instant::now(),
            input_tokens,
            output_tokens: 0,
        });
        debug!(tokens = input_tokens, "Model call admitted");
        started.elapsed()
    }

    /// Attach the output size to the most recent call.
    pub fn record_output_tokens(&mut self, tokens: usize) {
        if let Some(last) = self.records.back_mut() {
            last.output_tokens += tokens;
        }
    }

    /// Time until the oldest record ages out, if any ceiling is currently hit.
    fn wait_time(&mut self, input_tokens: usize) -> Option<Duration> {
        let window = self.limits.window();
        if window.is_zero() {
            return None;
        }
        let now = Instant::now();
        self.evict(now);

        let oldest = self.records.front()?;
        let calls_hit = self.limits.requests > 0 && self.records.len() >= self.limits.requests;
        let input_hit = self.limits.input_tokens > 0
            && self.records.iter().map(|r| r.input_tokens).sum::<usize>() + input_tokens
                > self.limits.input_tokens;
        let output_hit = self.limits.output_tokens > 0
            && self.records.iter().map(|r| r.output_tokens).sum::<usize>()
                >= self.limits.output_tokens;

        if calls_hit || input_hit || output_hit {
            Some((oldest.at + window).saturating_duration_since(now))
        } else {
            None
        }
    }

    fn evict(&mut self, now: Instant) {
        let window = self.limits.window();
        while let Some(front) = self.records.front() {
            if now.duration_since(front.at) >= window {
                self.records.pop_front();
            } else {
                break;
            }
        }
    }
}
