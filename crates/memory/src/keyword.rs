//! Keyword relevance shared by the in-process backends.
//!
//! A memory's score is the fraction of distinct query words (three or more
//! characters, case-insensitive) that appear among its own words. Entries
//! scoring 0 never match.

use std::collections::HashSet;
use zeroloop_core::memory::{MemoryEntry, MemoryQuery};

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
        .collect()
}

/// Score `entries` against `query`, best first, capped at `query.limit`.
pub fn rank<'a>(entries: impl IntoIterator<Item = &'a MemoryEntry>, query: &MemoryQuery) -> Vec<MemoryEntry> {
    let wanted = words(&query.text);
    if wanted.is_empty() {
        return Vec::new();
    }

    let mut results: Vec<MemoryEntry> = entries
        .into_iter()
        .filter_map(|e| {
            let have = words(&e.content);
            let hits = wanted.iter().filter(|w| have.contains(*w)).count();
            if hits == 0 {
                return None;
            }
            let mut entry = e.clone();
            entry.score = hits as f32 / wanted.len() as f32;
            Some(entry)
        })
        .filter(|e| e.score >= query.min_score)
        .collect();

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(query.limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_by_overlap() {
        let entries = vec![
            MemoryEntry::new("Rust is great for systems programming"),
            MemoryEntry::new("Python is great for scripting"),
            MemoryEntry::new("JavaScript runs in the browser"),
        ];
        let results = rank(&entries, &MemoryQuery::new("rust systems", 10));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 1.0);

        let results = rank(&entries, &MemoryQuery::new("great RUST", 10));
        assert_eq!(results.len(), 2);
        assert!(results[0].content.starts_with("Rust"));
    }

    #[test]
    fn short_words_and_empty_queries_match_nothing() {
        let entries = vec![MemoryEntry::new("it is a go")];
        assert!(rank(&entries, &MemoryQuery::new("is a", 5)).is_empty());
        assert!(rank(&entries, &MemoryQuery::new("", 5)).is_empty());
    }

    #[test]
    fn respects_limit_and_min_score() {
        let entries: Vec<_> = (0..10).map(|i| MemoryEntry::new(format!("note number {i}"))).collect();
        assert_eq!(rank(&entries, &MemoryQuery::new("note", 3)).len(), 3);

        let mut query = MemoryQuery::new("note missing", 10);
        query.min_score = 0.75;
        assert!(rank(&entries, &query).is_empty());
    }
}
