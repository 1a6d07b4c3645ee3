//! promptgrade-store — aggregate persistence.
//!
//! Owner aggregates (a user and all of their functions) are read and
//! written as whole values. Every `save` carries the revision observed at
//! load time; a mismatch fails with `ConcurrentModification` instead of
//! silently overwriting a concurrent update.

pub mod file;
pub mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
