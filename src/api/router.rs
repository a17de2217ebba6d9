//! HTTP router - health probes, the action adapter and the WebSocket upgrade

use axum::{
    http::{header, HeaderValue, Method},
    routing::{any, get},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::health;
use super::http;
use super::state::Server;
use super::ws;

/// Full router: health probes, the `/api` action adapter and the `/ws` socket
pub fn create_router(server: Server) -> Router {
    let cors = cors_layer(&server.config.server.cors_origins);

    let router = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/api/{*path}", any(http::handle_action))
        .route("/ws", get(ws::ws_handler))
        .with_state(server);

    match cors {
        Some(cors) => router.layer(cors).layer(TraceLayer::new_for_http()),
        None => router.layer(TraceLayer::new_for_http()),
    }
}

/// Credentialed CORS for the configured origins only
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin: {}", e);
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::PUT, Method::POST, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE]),
    )
}
