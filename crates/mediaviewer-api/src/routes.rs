use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::shortcuts;
use crate::state::AppState;

/// Build the full application router. Serve it with
/// `into_make_service_with_connect_info::<SocketAddr>()`; handlers log the
/// client address.
pub fn router(state: AppState) -> Router {
    let frontend = ServeDir::new(&state.frontend_dir);

    Router::new()
        .route(
            "/create",
            post(shortcuts::create_shortcut).fallback_service(frontend.clone()),
        )
        .route("/health", get(shortcuts::health))
        .route("/{file_id}/metadata.json", get(shortcuts::get_shortcut_metadata))
        .route("/{file_id}", get(shortcuts::serve_viewer))
        .fallback_service(frontend)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
