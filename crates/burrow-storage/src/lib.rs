//! Storage backends for the Burrow URL shortener.
//!
//! Three interchangeable implementations of [`Storage`]:
//!
//! - [`InMemoryStorage`]: a concurrent map, optionally journaled to disk.
//! - [`FileStorage`]: the in-memory map with a mandatory JSON journal.
//! - [`PostgresStorage`]: a pooled Postgres connection with uniqueness
//!   enforced on the original URL.

pub mod file;
pub mod journal;
pub mod memory;
pub mod postgres;

pub use burrow_core::error::Result;
pub use burrow_core::{ReadStorage, Storage, StorageError};
pub use file::FileStorage;
pub use journal::{Journal, JournalMode};
pub use memory::InMemoryStorage;
pub use postgres::PostgresStorage;
