//! HTTP request handlers for the mock server.

pub mod collections;
pub mod documents;
pub mod files;

pub use collections::*;
pub use documents::*;
pub use files::*;

use std::sync::Arc;

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tokio::sync::RwLock;

use crate::client::{KEY_HEADER, TOKEN_HEADER};
use crate::mock_server::state::MockState;

pub type SharedState = Arc<RwLock<MockState>>;

/// `Err` with a 401 response when the request lacks the required headers.
pub(crate) fn authorize(state: &MockState, headers: &HeaderMap) -> Result<(), Response> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    if state.is_authorized(header(TOKEN_HEADER), header(KEY_HEADER)) {
        Ok(())
    } else {
        Err(error_response(
            StatusCode::UNAUTHORIZED,
            "Invalid API credentials",
        ))
    }
}

/// A JSON:API error document.
pub(crate) fn error_response(status: StatusCode, detail: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "errors": [{"status": status.as_u16().to_string(), "detail": detail}]
        })),
    )
        .into_response()
}
