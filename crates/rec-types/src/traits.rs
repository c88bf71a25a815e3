//! Traits for graph store backends and the recommendation procedure.

use crate::{Book, BookLink, NodeId, Recommendation};
use async_trait::async_trait;
use std::collections::HashMap;

/// Narrow graph store abstraction the recommender runs against.
///
/// Read side is exactly what the procedure needs: resolve a user by external
/// id, list their reviewed books, and list a book's outgoing weighted links.
/// The ingest side exists for the hosting layer that loads the graph.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Create (or return the existing) user node for an external id.
    async fn add_user(&self, external_id: &str) -> Result<NodeId, GraphStoreError>;

    /// Create a book node with free-form properties.
    async fn add_book(
        &self,
        properties: &HashMap<String, serde_json::Value>,
    ) -> Result<NodeId, GraphStoreError>;

    /// Record that a user reviewed (bought) a book. Idempotent per pair.
    async fn add_review(&self, user: NodeId, book: NodeId) -> Result<(), GraphStoreError>;

    /// Add outgoing aggregation links from a book. Both endpoints must exist.
    async fn add_links(&self, from: NodeId, links: &[BookLink]) -> Result<(), GraphStoreError>;

    /// Resolve a user node by external id. Unknown id is `Ok(None)`.
    async fn find_user(&self, external_id: &str) -> Result<Option<NodeId>, GraphStoreError>;

    /// Distinct books the user has reviewed.
    async fn reviewed_books(&self, user: NodeId) -> Result<Vec<NodeId>, GraphStoreError>;

    /// Outgoing aggregation links of a book (all kinds except `reviewed`).
    async fn outgoing_links(&self, book: NodeId) -> Result<Vec<BookLink>, GraphStoreError>;

    /// Fetch one book by id. Unknown id is `Ok(None)`.
    async fn get_book(&self, id: NodeId) -> Result<Option<Book>, GraphStoreError>;

    /// Fetch several books by id; unknown ids are silently skipped.
    async fn get_books(&self, ids: &[NodeId]) -> Result<Vec<Book>, GraphStoreError>;
}

/// The callable recommendation procedure, as exposed to the hosting layer.
#[async_trait]
pub trait RecommendProcedure: Send + Sync {
    /// Rank books for a user. Unknown users and users with no reviews yield
    /// an empty list, not an error; only store failures propagate.
    async fn recommend(&self, user_id: &str) -> Result<Vec<Recommendation>, RecommendError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GraphStoreError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("graph store error: {0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    #[error("graph: {0}")]
    Graph(#[from] GraphStoreError),
}
