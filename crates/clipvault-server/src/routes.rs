use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    trace::TraceLayer,
};

use crate::handlers;
use crate::state::AppState;

/// Multipart framing and the title field on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 1 << 20;

pub fn router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.max_file_size.saturating_add(MULTIPART_OVERHEAD))
        .unwrap_or(usize::MAX);
    let media_dir = state.ingest.config().media_dir();

    let api = Router::new()
        .route("/api/publish", post(handlers::publish))
        .route("/api/delete/{id}", delete(handlers::delete))
        .route("/api/videos", get(handlers::list_videos))
        .route("/api/status/{id}", get(handlers::status))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state);

    api.nest_service("/files", ServeDir::new(media_dir))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
