//! In-memory graph store backing the recommender in tests and single-node use.

use rec_types::{Book, BookLink, GraphStore, GraphStoreError, NodeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// In-memory implementation of `GraphStore`.
///
/// Users and books share one id space allocated from `next_id`. The review
/// map doubles as the user-existence check: `add_user` seeds an empty entry,
/// so a `NodeId` is a user iff it has a review slot.
pub struct InMemoryBookGraph {
    next_id: AtomicU64,
    /// external user id -> node id.
    users: RwLock<HashMap<String, NodeId>>,
    /// book node id -> book.
    books: RwLock<HashMap<NodeId, Book>>,
    /// user node id -> distinct reviewed books, insertion order.
    reviews: RwLock<HashMap<NodeId, Vec<NodeId>>>,
    /// book node id -> outgoing aggregation links, insertion order.
    links: RwLock<HashMap<NodeId, Vec<BookLink>>>,
}

impl InMemoryBookGraph {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            users: RwLock::new(HashMap::new()),
            books: RwLock::new(HashMap::new()),
            reviews: RwLock::new(HashMap::new()),
            links: RwLock::new(HashMap::new()),
        }
    }

    fn alloc_id(&self) -> NodeId {
        NodeId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for InMemoryBookGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl GraphStore for InMemoryBookGraph {
    async fn add_user(&self, external_id: &str) -> Result<NodeId, GraphStoreError> {
        let mut users = self.users.write().await;
        if let Some(&id) = users.get(external_id) {
            return Ok(id);
        }
        let id = self.alloc_id();
        users.insert(external_id.to_string(), id);
        self.reviews.write().await.insert(id, Vec::new());
        Ok(id)
    }

    async fn add_book(
        &self,
        properties: &HashMap<String, serde_json::Value>,
    ) -> Result<NodeId, GraphStoreError> {
        let id = self.alloc_id();
        self.books.write().await.insert(
            id,
            Book {
                id,
                properties: properties.clone(),
            },
        );
        Ok(id)
    }

    async fn add_review(&self, user: NodeId, book: NodeId) -> Result<(), GraphStoreError> {
        if !self.books.read().await.contains_key(&book) {
            return Err(GraphStoreError::NodeNotFound(book));
        }
        let mut reviews = self.reviews.write().await;
        let list = reviews
            .get_mut(&user)
            .ok_or(GraphStoreError::NodeNotFound(user))?;
        if !list.contains(&book) {
            list.push(book);
        }
        Ok(())
    }

    async fn add_links(&self, from: NodeId, links: &[BookLink]) -> Result<(), GraphStoreError> {
        {
            let books = self.books.read().await;
            if !books.contains_key(&from) {
                return Err(GraphStoreError::NodeNotFound(from));
            }
            for link in links {
                if !books.contains_key(&link.target) {
                    return Err(GraphStoreError::NodeNotFound(link.target));
                }
            }
        }
        let mut guard = self.links.write().await;
        guard.entry(from).or_default().extend(links.iter().cloned());
        Ok(())
    }

    async fn find_user(&self, external_id: &str) -> Result<Option<NodeId>, GraphStoreError> {
        Ok(self.users.read().await.get(external_id).copied())
    }

    async fn reviewed_books(&self, user: NodeId) -> Result<Vec<NodeId>, GraphStoreError> {
        let reviews = self.reviews.read().await;
        reviews
            .get(&user)
            .cloned()
            .ok_or(GraphStoreError::NodeNotFound(user))
    }

    async fn outgoing_links(&self, book: NodeId) -> Result<Vec<BookLink>, GraphStoreError> {
        if !self.books.read().await.contains_key(&book) {
            return Err(GraphStoreError::NodeNotFound(book));
        }
        Ok(self
            .links
            .read()
            .await
            .get(&book)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_book(&self, id: NodeId) -> Result<Option<Book>, GraphStoreError> {
        Ok(self.books.read().await.get(&id).cloned())
    }

    async fn get_books(&self, ids: &[NodeId]) -> Result<Vec<Book>, GraphStoreError> {
        let books = self.books.read().await;
        let mut result = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(book) = books.get(id) {
                result.push(book.clone());
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rec_types::LinkKind;

    fn link(target: NodeId, weight: f64) -> BookLink {
        BookLink {
            target,
            kind: LinkKind::AlsoBought,
            weight: Some(weight),
        }
    }

    #[tokio::test]
    async fn add_user_is_idempotent_per_external_id() {
        let store = InMemoryBookGraph::new();
        let a = store.add_user("u1").await.unwrap();
        let b = store.add_user("u1").await.unwrap();
        let c = store.add_user("u2").await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(store.find_user("u1").await.unwrap(), Some(a));
        assert_eq!(store.find_user("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn reviews_are_distinct_and_validated() {
        let store = InMemoryBookGraph::new();
        let user = store.add_user("u1").await.unwrap();
        let book = store.add_book(&HashMap::new()).await.unwrap();

        store.add_review(user, book).await.unwrap();
        store.add_review(user, book).await.unwrap();
        assert_eq!(store.reviewed_books(user).await.unwrap(), vec![book]);

        let err = store.add_review(user, NodeId(999)).await.unwrap_err();
        assert!(matches!(err, GraphStoreError::NodeNotFound(NodeId(999))));
        // A book id is not a user id.
        let err = store.add_review(book, book).await.unwrap_err();
        assert!(matches!(err, GraphStoreError::NodeNotFound(id) if id == book));
    }

    #[tokio::test]
    async fn links_require_both_endpoints() {
        let store = InMemoryBookGraph::new();
        let a = store.add_book(&HashMap::new()).await.unwrap();
        let b = store.add_book(&HashMap::new()).await.unwrap();

        store.add_links(a, &[link(b, 5.0)]).await.unwrap();
        let out = store.outgoing_links(a).await.unwrap();
        assert_eq!(out, vec![link(b, 5.0)]);
        assert!(store.outgoing_links(b).await.unwrap().is_empty());

        let err = store.add_links(a, &[link(NodeId(999), 1.0)]).await.unwrap_err();
        assert!(matches!(err, GraphStoreError::NodeNotFound(NodeId(999))));
        // Failed batch inserts nothing new.
        assert_eq!(store.outgoing_links(a).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_books_skips_unknown_ids() {
        let store = InMemoryBookGraph::new();
        let mut props = HashMap::new();
        props.insert("title".to_string(), serde_json::json!("Dune"));
        let a = store.add_book(&props).await.unwrap();

        let found = store.get_books(&[a, NodeId(42)]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, a);
        assert_eq!(found[0].properties["title"], "Dune");
        assert!(store.get_book(NodeId(42)).await.unwrap().is_none());
    }
}
