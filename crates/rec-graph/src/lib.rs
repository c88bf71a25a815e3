//! Graph store backends for the book recommender.

mod memory;

#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::InMemoryBookGraph;
pub use rec_types::{Book, BookLink, GraphStore, GraphStoreError, LinkKind, NodeId};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBookGraph;
