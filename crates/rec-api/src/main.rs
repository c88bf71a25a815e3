//! Book recommender API server: /recommend plus graph ingest.

use rec_api::server::{self, AppState};
use rec_engine::DirectRetrieval;
use rec_graph::InMemoryBookGraph;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = build_state()?;
    let app = server::router(state);
    let addr: SocketAddr = std::env::var("REC_LISTEN")
        .unwrap_or_else(|_| "0.0.0.0:8002".to_string())
        .parse()?;
    tracing::info!("recommender API listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service(),
    )
    .await?;
    Ok(())
}

fn build_state() -> Result<Arc<AppState>, BoxError> {
    #[cfg(feature = "sqlite")]
    if let Ok(path) = std::env::var("REC_DB") {
        let store = Arc::new(rec_graph::SqliteBookGraph::open(&path)?);
        tracing::info!(path = %path, "using sqlite graph store");
        return Ok(Arc::new(AppState {
            graph: store.clone(),
            procedure: Arc::new(DirectRetrieval::new(store)),
        }));
    }

    let store = Arc::new(InMemoryBookGraph::new());
    Ok(Arc::new(AppState {
        graph: store.clone(),
        procedure: Arc::new(DirectRetrieval::new(store)),
    }))
}
