//! In-memory backend: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;
use zeroloop_core::error::MemoryError;
use zeroloop_core::memory::{MemoryBackend, MemoryEntry, MemoryQuery};
use crate::keyword;

/// An in-memory backend that stores memories in a Vec.
/// Useful for testing and sessions where persistence isn't needed.
pub struct InMemoryBackend {
    entries: Arc<RwLock<Vec<MemoryEntry>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryBackend for InMemoryBackend {
    fn name(&self) -> &str { "in_memory" }

    async fn store(&self, mut entry: MemoryEntry) -> Result<String, MemoryError> {
        if entry.id.is_empty() {
            entry.id = Uuid::new_v4().to_string();
        }
        let id = entry.id.clone();
        self.entries.write().await.push(entry);
        Ok(id)
    }

    async fn search(&self, query: MemoryQuery) -> Result<Vec<MemoryEntry>, MemoryError> {
        let entries = self.entries.read().await;
        Ok(keyword::rank(entries.iter(), &query))
    }

    async fn delete(&self, id: &str) -> Result<bool, MemoryError> {
        let mut entries = self.entries.write().await;
        let len_before = entries.len();
        entries.retain(|e| e.id != id);
        Ok(entries.len() < len_before)
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        Ok(self.entries.read().await.len())
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        self.entries.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_assigns_ids() {
        let mem = InMemoryBackend::new();
        let id = mem.store(MemoryEntry::new("Rust is a systems language")).await.unwrap();
        assert!(!id.is_empty());

        let mut named = MemoryEntry::new("Named entry");
        named.id = "fixed".into();
        assert_eq!(mem.store(named).await.unwrap(), "fixed");
        assert_eq!(mem.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn search_by_keyword() {
        let mem = InMemoryBackend::new();
        mem.store(MemoryEntry::new("Rust is great for systems programming")).await.unwrap();
        mem.store(MemoryEntry::new("Python is great for scripting")).await.unwrap();
        mem.store(MemoryEntry::new("JavaScript runs in the browser")).await.unwrap();

        let results = mem.search(MemoryQuery::new("Rust", 10)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].content.contains("Rust"));
    }

    #[tokio::test]
    async fn delete_entry() {
        let mem = InMemoryBackend::new();
        let id = mem.store(MemoryEntry::new("To be deleted")).await.unwrap();
        assert_eq!(mem.count().await.unwrap(), 1);

        assert!(mem.delete(&id).await.unwrap());
        assert!(!mem.delete(&id).await.unwrap());
        assert_eq!(mem.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn clear_all() {
        let mem = InMemoryBackend::new();
        mem.store(MemoryEntry::new("Entry 1")).await.unwrap();
        mem.store(MemoryEntry::new("Entry 2")).await.unwrap();
        assert_eq!(mem.count().await.unwrap(), 2);

        mem.clear().await.unwrap();
        assert_eq!(mem.count().await.unwrap(), 0);
    }
}
