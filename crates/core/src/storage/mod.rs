//! Storage module
//!
//! Key-value backends and the adapter that keeps the task list in them.

mod backend;
mod file;
mod memory;
mod persistence;

pub use backend::KeyValueStorage;
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use persistence::{decode, encode, TaskPersistence, CURRENT_VERSION, DEFAULT_KEY, LEGACY_KEYS};
