use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    delete_handler, encode_handler, health_handler, info_handler, not_found_handler,
    redirect_handler,
};
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/encode", post(encode_handler))
            .route("/info/{code}", get(info_handler))
            .route("/{code}", get(redirect_handler).delete(delete_handler))
            .fallback(not_found_handler)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
