//! Memory backends for zeroloop.
//!
//! Both backends rank by keyword overlap; the file backend additionally
//! persists every entry as one JSON line.

mod keyword;

pub mod in_memory;
pub mod file_backend;

pub use in_memory::InMemoryBackend;
pub use file_backend::FileBackend;
