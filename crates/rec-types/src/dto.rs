//! Request and response DTOs for the HTTP surface.

use crate::{LinkKind, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Base response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseResponse<T> {
    #[serde(default = "default_code")]
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<T>,
}

fn default_code() -> i32 {
    200
}

impl<T> BaseResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: 200,
            message: "Success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// `POST /recommend` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendRequest {
    pub user_id: String,
}

/// One entry of a `/recommend` response: ranked book with its aggregated
/// weight and the book's stored properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub book: NodeId,
    pub weight: f64,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

pub type RecommendResponse = BaseResponse<Vec<RecommendationItem>>;

/// `POST /graph/users` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddUserRequest {
    pub user_id: String,
}

/// `POST /graph/books` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddBookRequest {
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

/// `POST /graph/reviews` request: user by external id, book by node id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddReviewRequest {
    pub user_id: String,
    pub book: NodeId,
}

/// `POST /graph/links` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddLinkRequest {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: LinkKind,
    #[serde(default)]
    pub weight: Option<f64>,
}

/// Response carrying a freshly created node id.
pub type NodeResponse = BaseResponse<NodeId>;

/// Response with no payload (review/link ingestion).
pub type AckResponse = BaseResponse<()>;
