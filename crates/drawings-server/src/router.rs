use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with every drawings endpoint.
///
/// Handlers read the caller's address from `ConnectInfo<SocketAddr>`, so the
/// router must be served with `into_make_service_with_connect_info`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handler::front_page))
        .route("/draw", get(handler::draw))
        .route("/share", post(handler::share))
        .route("/galleries", get(handler::search_gallery))
        .route("/galleries/:name", get(handler::gallery))
        .route("/:id", get(handler::drawing).post(handler::bump))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
