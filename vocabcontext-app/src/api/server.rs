use axum::{
    routing::{delete, get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::routes::{
    delete_forgotten, get_intensity, get_queue, get_stats, post_answer, post_forgotten, AppState,
};
use vocabcontext_core::{Clock, ProgressStore};

pub fn router(store: Arc<dyn ProgressStore>, clock: Arc<dyn Clock>) -> Router {
    let state = Arc::new(AppState { store, clock });

    Router::new()
        .route("/queue", get(get_queue))
        .route("/answer", post(post_answer))
        .route("/intensity", get(get_intensity))
        .route("/stats", get(get_stats))
        .route("/forgotten", post(post_forgotten))
        .route("/forgotten/:item_id", delete(delete_forgotten))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run(
    store: Arc<dyn ProgressStore>,
    clock: Arc<dyn Clock>,
    addr: SocketAddr,
) -> anyhow::Result<()> {
    let app = router(store, clock);
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "api listening");
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
