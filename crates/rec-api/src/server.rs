//! Axum server and routes.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use rec_types::{
    AckResponse, AddBookRequest, AddLinkRequest, AddReviewRequest, AddUserRequest, BaseResponse,
    BookLink, GraphStore, GraphStoreError, NodeId, NodeResponse, RecommendProcedure,
    RecommendRequest, RecommendResponse, RecommendationItem,
};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

pub struct AppState {
    pub graph: Arc<dyn GraphStore + Send + Sync>,
    pub procedure: Arc<dyn RecommendProcedure + Send + Sync>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/recommend", post(handle_recommend))
        .route("/graph/users", post(handle_add_user))
        .route("/graph/books", post(handle_add_book))
        .route("/graph/reviews", post(handle_add_review))
        .route("/graph/links", post(handle_add_link))
        .route("/health", get(handle_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn store_error_code(err: &GraphStoreError) -> i32 {
    match err {
        GraphStoreError::NodeNotFound(_) => 404,
        GraphStoreError::Other(_) => 500,
    }
}

async fn handle_recommend(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecommendRequest>,
) -> Json<RecommendResponse> {
    let request_id = Uuid::new_v4();
    match state.procedure.recommend(&req.user_id).await {
        Ok(ranked) => {
            let ids: Vec<NodeId> = ranked.iter().map(|r| r.book).collect();
            let books = match state.graph.get_books(&ids).await {
                Ok(books) => books,
                Err(e) => {
                    tracing::warn!(%request_id, user_id = %req.user_id, error = %e, "book lookup failed");
                    return Json(RecommendResponse::error(500, e.to_string()));
                }
            };
            let mut properties: HashMap<NodeId, _> = books
                .into_iter()
                .map(|b| (b.id, b.properties))
                .collect();
            let items: Vec<RecommendationItem> = ranked
                .into_iter()
                .map(|r| RecommendationItem {
                    book: r.book,
                    weight: r.weight,
                    properties: properties.remove(&r.book).unwrap_or_default(),
                })
                .collect();
            tracing::info!(
                %request_id,
                user_id = %req.user_id,
                returned = items.len(),
                "recommend"
            );
            Json(BaseResponse::ok(items))
        }
        Err(e) => {
            tracing::warn!(%request_id, user_id = %req.user_id, error = %e, "recommend failed");
            Json(RecommendResponse::error(500, e.to_string()))
        }
    }
}

async fn handle_add_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddUserRequest>,
) -> Json<NodeResponse> {
    match state.graph.add_user(&req.user_id).await {
        Ok(id) => Json(BaseResponse::ok(id)),
        Err(e) => Json(NodeResponse::error(store_error_code(&e), e.to_string())),
    }
}

async fn handle_add_book(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddBookRequest>,
) -> Json<NodeResponse> {
    match state.graph.add_book(&req.properties).await {
        Ok(id) => Json(BaseResponse::ok(id)),
        Err(e) => Json(NodeResponse::error(store_error_code(&e), e.to_string())),
    }
}

async fn handle_add_review(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddReviewRequest>,
) -> Json<AckResponse> {
    let user = match state.graph.find_user(&req.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return Json(AckResponse::error(
                404,
                format!("user not found: {}", req.user_id),
            ))
        }
        Err(e) => return Json(AckResponse::error(store_error_code(&e), e.to_string())),
    };
    match state.graph.add_review(user, req.book).await {
        Ok(()) => Json(BaseResponse::ok(())),
        Err(e) => Json(AckResponse::error(store_error_code(&e), e.to_string())),
    }
}

async fn handle_add_link(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddLinkRequest>,
) -> Json<AckResponse> {
    let link = BookLink {
        target: req.to,
        kind: req.kind,
        weight: req.weight,
    };
    match state.graph.add_links(req.from, &[link]).await {
        Ok(()) => Json(BaseResponse::ok(())),
        Err(e) => Json(AckResponse::error(store_error_code(&e), e.to_string())),
    }
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
