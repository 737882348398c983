//! Bounded conversation history.
//!
//! `History` keeps the alternation invariant (no two adjacent messages share
//! a role) by merging same-role appends. Compaction is split in two steps so
//! the caller can run the asynchronous summarization in between:
//!
//! 1. [`History::plan_compaction`] picks the middle segment to replace.
//! 2. [`History::apply_compaction`] swaps it for a single human-role summary.

use crate::message::{Message, Role};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Separator used when merging consecutive same-role messages.
pub const MERGE_SEPARATOR: &str = "\n\n";

/// What an append did to the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    /// Text was concatenated onto the last message.
    Merged,
    /// A new message was pushed.
    Created,
}

/// The head/middle/tail split chosen for a compaction.
///
/// The middle always starts with a human message and has an odd length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionPlan {
    middle: Range<usize>,
    len: usize,
}

impl CompactionPlan {
    /// Number of leading messages kept verbatim.
    pub fn head_len(&self) -> usize {
        self.middle.start
    }

    /// Number of trailing messages kept verbatim.
    pub fn tail_len(&self) -> usize {
        self.len - self.middle.end
    }

    /// Range of the segment that gets summarized.
    pub fn middle(&self) -> Range<usize> {
        self.middle.clone()
    }

    /// History length after the plan is applied.
    pub fn compacted_len(&self) -> usize {
        self.head_len() + 1 + self.tail_len()
    }
}

/// Ordered, role-tagged message list owned by one agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Append text under `role`, merging into the last message when it has
    /// the same role.
    pub fn append(&mut self, role: Role, text: &str) -> Appended {
        match self.messages.last_mut() {
            Some(last) if last.role == role => {
                last.content.push_str(MERGE_SEPARATOR);
                last.content.push_str(text);
                Appended::Merged
            }
            _ => {
                self.messages.push(Message {
                    role,
                    content: text.to_string(),
                });
                Appended::Created
            }
        }
    }

    /// Decide which middle segment to summarize, or `None` if the history
    /// is within `max` (or has nothing summarizable between head and tail).
    ///
    /// The middle is adjusted so it begins with a human message: the last
    /// head message is borrowed into it, or, with an empty head, the leading
    /// AI message is handed to the head. An even-length middle gives its last
    /// message back to the tail.
    pub fn plan_compaction(
        &self,
        max: usize,
        keep_start: usize,
        keep_end: usize,
    ) -> Option<CompactionPlan> {
        let len = self.messages.len();
        if len <= max {
            return None;
        }

        let mut start = keep_start.min(len);
        let mut end = len.saturating_sub(keep_end).max(start);
        if start >= end {
            return None;
        }

        if self.messages[start].role != Role::Human {
            if start > 0 {
                start -= 1;
            } else {
                start += 1;
            }
        }

        if end > start && (end - start) % 2 == 0 {
            end -= 1;
        }
        if start >= end {
            return None;
        }

        Some(CompactionPlan {
            middle: start..end,
            len,
        })
    }

    /// The messages a plan would summarize.
    pub fn segment(&self, plan: &CompactionPlan) -> &[Message] {
        &self.messages[plan.middle()]
    }

    /// Replace the planned middle with a single human-role summary.
    ///
    /// Returns `false` without touching anything if the history changed
    /// length since the plan was made.
    pub fn apply_compaction(&mut self, plan: &CompactionPlan, summary: String) -> bool {
        if plan.len != self.messages.len() {
            return false;
        }
        self.messages
            .splice(plan.middle(), std::iter::once(Message::human(summary)));
        true
    }
}
