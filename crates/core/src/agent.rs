//! Agent runtime settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings that shape one agent's loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Number of memories recalled automatically (0 disables auto-recall)
    #[serde(default = "default_auto_memory_count")]
    pub auto_memory_count: usize,

    /// Streaming attempts to skip between memory refreshes
    #[serde(default = "default_auto_memory_skip")]
    pub auto_memory_skip: u32,

    /// History length that triggers compaction
    #[serde(default = "default_msgs_keep_max")]
    pub msgs_keep_max: usize,

    /// Leading messages kept verbatim by compaction
    #[serde(default = "default_msgs_keep_start")]
    pub msgs_keep_start: usize,

    /// Trailing messages kept verbatim by compaction
    #[serde(default = "default_msgs_keep_end")]
    pub msgs_keep_end: usize,

    /// Tool output longer than this is cut in the middle
    #[serde(default = "default_max_tool_response_length")]
    pub max_tool_response_length: usize,

    /// Call and token ceilings
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

fn default_auto_memory_count() -> usize {
    3
}
fn default_auto_memory_skip() -> u32 {
    2
}
fn default_msgs_keep_max() -> usize {
    25
}
fn default_msgs_keep_start() -> usize {
    5
}
fn default_msgs_keep_end() -> usize {
    10
}
fn default_max_tool_response_length() -> usize {
    3000
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            auto_memory_count: default_auto_memory_count(),
            auto_memory_skip: default_auto_memory_skip(),
            msgs_keep_max: default_msgs_keep_max(),
            msgs_keep_start: default_msgs_keep_start(),
            msgs_keep_end: default_msgs_keep_end(),
            max_tool_response_length: default_max_tool_response_length(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Sliding-window ceilings. A ceiling of 0 disables that check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Window length in seconds
    #[serde(default = "default_rate_limit_seconds")]
    pub seconds: u64,

    /// Maximum calls per window
    #[serde(default = "default_rate_limit_requests")]
    pub requests: usize,

    /// Maximum estimated input tokens per window
    #[serde(default = "default_rate_limit_input_tokens")]
    pub input_tokens: usize,

    /// Maximum output tokens per window
    #[serde(default)]
    pub output_tokens: usize,
}

fn default_rate_limit_seconds() -> u64 {
    60
}
fn default_rate_limit_requests() -> usize {
    15
}
fn default_rate_limit_input_tokens() -> usize {
    1_000_000
}

impl RateLimitConfig {
    /// No ceilings at all.
    pub fn unlimited() -> Self {
        Self {
            seconds: 0,
            requests: 0,
            input_tokens: 0,
            output_tokens: 0,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.seconds)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            seconds: default_rate_limit_seconds(),
            requests: default_rate_limit_requests(),
            input_tokens: default_rate_limit_input_tokens(),
            output_tokens: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AgentConfig::default();
        assert_eq!(config.msgs_keep_max, 25);
        assert_eq!(config.msgs_keep_start, 5);
        assert_eq!(config.msgs_keep_end, 10);
        assert_eq!(config.rate_limit.requests, 15);
        assert_eq!(config.rate_limit.output_tokens, 0);
    }

    #[test]
    fn unlimited_has_no_window() {
        let limits = RateLimitConfig::unlimited();
        assert_eq!(limits.window(), Duration::ZERO);
        assert_eq!(limits.requests, 0);
    }
}
