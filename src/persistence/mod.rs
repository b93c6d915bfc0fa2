//! Process-record persistence: store port, backends, retention purge.

pub mod memory;
pub mod retention;
pub mod sqlite;
mod store;

pub use memory::MemoryProcessStore;
pub use sqlite::SqliteProcessStore;
pub use store::ProcessStore;
