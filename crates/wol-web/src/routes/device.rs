//! Device control-plane routes.
//!
//! # Endpoints
//!
//! ### `GET /wake?token=T`
//! Broadcasts a magic packet for the configured target.
//!
//! ### `GET /sleep?token=T`, `GET /shutdown?token=T`, `GET /restart?token=T`
//! Relays the command to the companion agent.
//!
//! ### `GET /status`
//! Device address, hardware address and target descriptor.
//!
//! ### `GET /logs?json=true&count=K`
//! Newest-first diagnostic log; without `json=true`, a page polling it.
//!
//! Routes answer any method the same way. Anything else is a plain-text 404.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use wol_core::{lock_device, CommandRequest, Reply, SharedDevice};

/// Axum response wrapper for a core [`Reply`].
pub struct WebReply(pub Reply);

impl IntoResponse for WebReply {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (
            status,
            [(header::CONTENT_TYPE, self.0.content_type.as_str())],
            self.0.body,
        )
            .into_response()
    }
}

/// Create the device router.
pub fn create_device_router(device: SharedDevice) -> Router {
    Router::new()
        .route("/wake", any(dispatch))
        .route("/sleep", any(dispatch))
        .route("/shutdown", any(dispatch))
        .route("/restart", any(dispatch))
        .route("/status", any(dispatch))
        .route("/logs", any(dispatch))
        .fallback(not_found)
        .with_state(device)
}

/// Hand the request to the core dispatcher on the blocking pool.
///
/// The relay call inside may block for its full timeout; other requests
/// queue on the device mutex behind it.
async fn dispatch(
    State(device): State<SharedDevice>,
    uri: Uri,
    Query(params): Query<Vec<(String, String)>>,
) -> WebReply {
    let request = CommandRequest::new(uri.path(), params);
    let result = tokio::task::spawn_blocking(move || lock_device(&device).dispatch(&request)).await;

    match result {
        Ok(reply) => WebReply(reply),
        Err(e) => {
            tracing::error!("Request handler failed: {}", e);
            WebReply(Reply::error(500, "Internal error"))
        }
    }
}

async fn not_found(uri: Uri) -> WebReply {
    tracing::debug!(path = %uri.path(), "no route");
    WebReply(Reply::not_found())
}
