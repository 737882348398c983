//! Lenient extraction of tool requests from free-form model output.
//!
//! Models wrap the JSON in prose, code fences, or leave trailing commas.
//! Candidates are tried in order: the whole text, fenced code blocks, the
//! first-`{`-to-last-`}` span, then every balanced `{...}` object. Each
//! candidate is retried once with trailing commas removed.

use serde_json::Value;
use zeroloop_core::tool::{ToolArgs, ToolRequest};

/// Find a `{"tool_name": ..., "tool_args": {...}}` object in `text`.
pub fn parse_tool_request(text: &str) -> Option<ToolRequest> {
    candidates(text)
        .into_iter()
        .find_map(parse_candidate)
}

fn candidates(text: &str) -> Vec<&str> {
    let trimmed = text.trim();
    let mut out = vec![trimmed];
    out.extend(fenced_blocks(trimmed));
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            out.push(&trimmed[start..=end]);
        }
    }
    out.extend(balanced_objects(trimmed));
    out
}

fn parse_candidate(candidate: &str) -> Option<ToolRequest> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        if let Some(request) = to_request(value) {
            return Some(request);
        }
    }
    let cleaned = strip_trailing_commas(candidate);
    if cleaned.len() == candidate.len() {
        return None;
    }
    serde_json::from_str::<Value>(&cleaned)
        .ok()
        .and_then(to_request)
}

fn to_request(value: Value) -> Option<ToolRequest> {
    let Value::Object(mut map) = value else {
        return None;
    };
    let tool_name = map.get("tool_name")?.as_str()?.trim().to_string();
    if tool_name.is_empty() {
        return None;
    }
    let tool_args = match map.remove("tool_args") {
        Some(Value::Object(args)) => args,
        _ => ToolArgs::new(),
    };
    Some(ToolRequest {
        tool_name,
        tool_args,
    })
}

/// Bodies of ``` fenced blocks, with an optional language tag dropped.
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find("```") {
        let after = &rest[open + 3..];
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        let Some(close) = body.find("```") else {
            break;
        };
        blocks.push(&body[..close]);
        rest = &body[close + 3..];
    }
    blocks
}

/// Every top-level balanced `{...}` span, skipping braces inside strings.
fn balanced_objects(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' if depth > 0 => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    spans
}

/// Remove commas that directly precede `}` or `]`, outside of strings.
fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            out.push(c);
            continue;
        }
        if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}
