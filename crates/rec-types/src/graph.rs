//! Graph domain types: node handles, books, typed weighted links.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque node handle assigned by the graph store. Users and books share one
/// id space; callers never mint these themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Book-to-book relationship types that carry recommendation signal.
/// `reviewed` (user -> book) is deliberately not a variant: it marks a
/// purchase and never contributes weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    AlsoBought,
    AlsoViewed,
    BuyAfterViewing,
}

impl LinkKind {
    pub const ALL: [LinkKind; 3] = [
        LinkKind::AlsoBought,
        LinkKind::AlsoViewed,
        LinkKind::BuyAfterViewing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LinkKind::AlsoBought => "also_bought",
            LinkKind::AlsoViewed => "also_viewed",
            LinkKind::BuyAfterViewing => "buy_after_viewing",
        }
    }

    pub fn parse(s: &str) -> Option<LinkKind> {
        match s {
            "also_bought" => Some(LinkKind::AlsoBought),
            "also_viewed" => Some(LinkKind::AlsoViewed),
            "buy_after_viewing" => Some(LinkKind::BuyAfterViewing),
            _ => None,
        }
    }
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outgoing aggregation edge from one book to another.
/// A missing weight contributes 0.0 when summed, never an error.
#[derive(Debug, Clone, PartialEq)]
pub struct BookLink {
    pub target: NodeId,
    pub kind: LinkKind,
    pub weight: Option<f64>,
}

impl BookLink {
    /// Weight this link contributes to its target's aggregate.
    pub fn effective_weight(&self) -> f64 {
        self.weight.unwrap_or(0.0)
    }
}

/// Book node: store-assigned id plus free-form properties (title, ASIN, ...).
/// The recommender never inspects the properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub id: NodeId,
    pub properties: HashMap<String, serde_json::Value>,
}

/// One ranked recommendation produced by the procedure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub book: NodeId,
    pub weight: f64,
}
