use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::middleware::{auth_middleware, metrics_middleware};
use super::{discovery, handlers, titles};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Authenticated API routes
    let protected = Router::new()
        .route("/config", get(handlers::get_config))
        // Titles
        .route("/titles/search", get(titles::search_titles))
        .route("/titles/{id}", get(titles::get_title))
        .route("/titles/{id}/{field}", get(titles::get_title_field))
        .route(
            "/titles/{id}/follow",
            put(titles::follow_title).delete(titles::unfollow_title),
        )
        .route(
            "/titles/{id}/episodes/{episode}/vote",
            put(titles::vote_episode),
        )
        // Discovery
        .route("/discovery/run", post(discovery::run_discovery))
        .route("/discovery/status", get(discovery::get_status))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ));

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
