use axum::Router;
use axum::routing::get;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

use crate::handles::*;
use crate::services::PipelineEvent;

pub fn create_app(events: mpsc::Sender<PipelineEvent>) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .with_state(SubscriberState { events })
        .layer(TraceLayer::new_for_http())
}
