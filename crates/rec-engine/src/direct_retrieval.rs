//! Direct retrieval: rank books linked from a user's purchases.

use async_trait::async_trait;
use rec_types::{GraphStore, NodeId, RecommendError, RecommendProcedure, Recommendation};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Maximum number of recommendations returned per call.
pub const RESULT_LIMIT: usize = 50;

/// "Customers who bought this also bought" retrieval.
///
/// Two passes over the graph: collect the user's purchased set, then expand
/// each purchased book's outgoing links by exactly one hop. Contributions to
/// already-purchased books are dropped, the rest are summed per candidate,
/// and the top 50 come back ordered by weight descending. Equal weights are
/// broken by ascending node id so results are deterministic.
pub struct DirectRetrieval<G> {
    graph: Arc<G>,
}

impl<G> DirectRetrieval<G> {
    pub fn new(graph: Arc<G>) -> Self {
        Self { graph }
    }
}

#[async_trait]
impl<G> RecommendProcedure for DirectRetrieval<G>
where
    G: GraphStore + Send + Sync,
{
    async fn recommend(&self, user_id: &str) -> Result<Vec<Recommendation>, RecommendError> {
        let Some(user) = self.graph.find_user(user_id).await? else {
            // Unknown user means "no recommendations", not a failure.
            return Ok(Vec::new());
        };

        let purchased_list = self.graph.reviewed_books(user).await?;
        if purchased_list.is_empty() {
            return Ok(Vec::new());
        }
        let purchased: HashSet<NodeId> = purchased_list.iter().copied().collect();

        let mut weights: HashMap<NodeId, f64> = HashMap::new();
        for &book in &purchased_list {
            for link in self.graph.outgoing_links(book).await? {
                if purchased.contains(&link.target) {
                    continue;
                }
                *weights.entry(link.target).or_insert(0.0) += link.effective_weight();
            }
        }

        let mut ranked: Vec<Recommendation> = weights
            .into_iter()
            .map(|(book, weight)| Recommendation { book, weight })
            .collect();
        ranked.sort_by(|a, b| {
            b.weight
                .total_cmp(&a.weight)
                .then_with(|| a.book.cmp(&b.book))
        });
        ranked.truncate(RESULT_LIMIT);

        tracing::debug!(
            user_id,
            purchased = purchased.len(),
            returned = ranked.len(),
            "direct retrieval complete"
        );
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rec_graph::InMemoryBookGraph;
    use rec_types::{BookLink, LinkKind};

    async fn user_with_books(
        store: &InMemoryBookGraph,
        user_id: &str,
        reviewed: usize,
    ) -> (NodeId, Vec<NodeId>) {
        let user = store.add_user(user_id).await.unwrap();
        let mut books = Vec::new();
        for _ in 0..reviewed {
            let book = store.add_book(&HashMap::new()).await.unwrap();
            store.add_review(user, book).await.unwrap();
            books.push(book);
        }
        (user, books)
    }

    async fn add_link(
        store: &InMemoryBookGraph,
        from: NodeId,
        to: NodeId,
        kind: LinkKind,
        weight: Option<f64>,
    ) {
        store
            .add_links(
                from,
                &[BookLink {
                    target: to,
                    kind,
                    weight,
                }],
            )
            .await
            .unwrap();
    }

    fn engine(store: &Arc<InMemoryBookGraph>) -> DirectRetrieval<InMemoryBookGraph> {
        DirectRetrieval::new(Arc::clone(store))
    }

    #[tokio::test]
    async fn unknown_user_yields_empty() {
        let store = Arc::new(InMemoryBookGraph::new());
        let out = engine(&store).recommend("ghost").await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn user_without_reviews_yields_empty() {
        let store = Arc::new(InMemoryBookGraph::new());
        user_with_books(&store, "u1", 0).await;
        let out = engine(&store).recommend("u1").await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn reviewed_book_without_links_yields_empty() {
        let store = Arc::new(InMemoryBookGraph::new());
        user_with_books(&store, "u1", 1).await;
        // An unrelated book in the graph changes nothing.
        store.add_book(&HashMap::new()).await.unwrap();
        let out = engine(&store).recommend("u1").await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn each_link_kind_recommends_directly_linked_book() {
        for kind in LinkKind::ALL {
            let store = Arc::new(InMemoryBookGraph::new());
            let (_, books) = user_with_books(&store, "u1", 1).await;
            let target = store.add_book(&HashMap::new()).await.unwrap();
            add_link(&store, books[0], target, kind, Some(5.0)).await;

            let out = engine(&store).recommend("u1").await.unwrap();
            assert_eq!(out.len(), 1, "kind {}", kind);
            assert_eq!(out[0].book, target);
            assert_eq!(out[0].weight, 5.0);
        }
    }

    #[tokio::test]
    async fn already_reviewed_books_are_excluded() {
        let store = Arc::new(InMemoryBookGraph::new());
        let (_, books) = user_with_books(&store, "u1", 2).await;
        add_link(&store, books[0], books[1], LinkKind::AlsoBought, Some(9.0)).await;

        let out = engine(&store).recommend("u1").await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn indirectly_reachable_books_are_not_recommended() {
        let store = Arc::new(InMemoryBookGraph::new());
        let (_, books) = user_with_books(&store, "u1", 1).await;
        let middle = store.add_book(&HashMap::new()).await.unwrap();
        let far = store.add_book(&HashMap::new()).await.unwrap();
        add_link(&store, books[0], middle, LinkKind::BuyAfterViewing, Some(2.0)).await;
        add_link(&store, middle, far, LinkKind::AlsoBought, Some(8.0)).await;

        let out = engine(&store).recommend("u1").await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].book, middle);
    }

    #[tokio::test]
    async fn weights_sum_across_sources_and_kinds() {
        let store = Arc::new(InMemoryBookGraph::new());
        let (_, books) = user_with_books(&store, "u1", 2).await;
        let target = store.add_book(&HashMap::new()).await.unwrap();
        add_link(&store, books[0], target, LinkKind::AlsoBought, Some(5.0)).await;
        add_link(&store, books[0], target, LinkKind::AlsoViewed, Some(3.0)).await;
        add_link(&store, books[1], target, LinkKind::BuyAfterViewing, Some(2.0)).await;

        let out = engine(&store).recommend("u1").await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].book, target);
        assert_eq!(out[0].weight, 10.0);
    }

    #[tokio::test]
    async fn missing_weight_counts_as_zero_but_still_recommends() {
        let store = Arc::new(InMemoryBookGraph::new());
        let (_, books) = user_with_books(&store, "u1", 1).await;
        let target = store.add_book(&HashMap::new()).await.unwrap();
        add_link(&store, books[0], target, LinkKind::AlsoViewed, None).await;

        let out = engine(&store).recommend("u1").await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].book, target);
        assert_eq!(out[0].weight, 0.0);
    }

    #[tokio::test]
    async fn results_are_sorted_descending_and_capped_at_limit() {
        let store = Arc::new(InMemoryBookGraph::new());
        let (_, books) = user_with_books(&store, "u1", 1).await;
        for i in 0..60 {
            let target = store.add_book(&HashMap::new()).await.unwrap();
            add_link(
                &store,
                books[0],
                target,
                LinkKind::AlsoBought,
                Some(f64::from(i)),
            )
            .await;
        }

        let out = engine(&store).recommend("u1").await.unwrap();
        assert_eq!(out.len(), RESULT_LIMIT);
        assert_eq!(out[0].weight, 59.0);
        for pair in out.windows(2) {
            assert!(pair[0].weight >= pair[1].weight);
        }
        // The ten lightest candidates fell off the end.
        assert_eq!(out.last().unwrap().weight, 10.0);
    }

    #[tokio::test]
    async fn equal_weights_tie_break_by_ascending_node_id() {
        let store = Arc::new(InMemoryBookGraph::new());
        let (_, books) = user_with_books(&store, "u1", 1).await;
        let mut targets = Vec::new();
        for _ in 0..4 {
            let target = store.add_book(&HashMap::new()).await.unwrap();
            add_link(&store, books[0], target, LinkKind::AlsoViewed, Some(1.0)).await;
            targets.push(target);
        }

        let out = engine(&store).recommend("u1").await.unwrap();
        let order: Vec<NodeId> = out.iter().map(|r| r.book).collect();
        let mut expected = targets.clone();
        expected.sort();
        assert_eq!(order, expected);
    }

    /// Store whose traversal fails mid-query.
    struct BrokenStore;

    #[async_trait]
    impl GraphStore for BrokenStore {
        async fn add_user(&self, _: &str) -> Result<NodeId, rec_types::GraphStoreError> {
            unimplemented!()
        }
        async fn add_book(
            &self,
            _: &HashMap<String, serde_json::Value>,
        ) -> Result<NodeId, rec_types::GraphStoreError> {
            unimplemented!()
        }
        async fn add_review(&self, _: NodeId, _: NodeId) -> Result<(), rec_types::GraphStoreError> {
            unimplemented!()
        }
        async fn add_links(
            &self,
            _: NodeId,
            _: &[BookLink],
        ) -> Result<(), rec_types::GraphStoreError> {
            unimplemented!()
        }
        async fn find_user(&self, _: &str) -> Result<Option<NodeId>, rec_types::GraphStoreError> {
            Ok(Some(NodeId(1)))
        }
        async fn reviewed_books(
            &self,
            _: NodeId,
        ) -> Result<Vec<NodeId>, rec_types::GraphStoreError> {
            Ok(vec![NodeId(2)])
        }
        async fn outgoing_links(
            &self,
            _: NodeId,
        ) -> Result<Vec<BookLink>, rec_types::GraphStoreError> {
            Err(rec_types::GraphStoreError::Other("backend down".to_string()))
        }
        async fn get_book(
            &self,
            _: NodeId,
        ) -> Result<Option<rec_types::Book>, rec_types::GraphStoreError> {
            unimplemented!()
        }
        async fn get_books(
            &self,
            _: &[NodeId],
        ) -> Result<Vec<rec_types::Book>, rec_types::GraphStoreError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn store_failure_propagates_instead_of_being_swallowed() {
        let procedure = DirectRetrieval::new(Arc::new(BrokenStore));
        let err = procedure.recommend("u1").await.unwrap_err();
        assert!(matches!(err, RecommendError::Graph(_)));
    }
}
