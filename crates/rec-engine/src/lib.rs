//! Recommendation engine: direct retrieval over a book graph.

mod direct_retrieval;

pub use direct_retrieval::{DirectRetrieval, RESULT_LIMIT};
pub use rec_types::{RecommendError, RecommendProcedure, Recommendation};
