//! File download handler.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use super::{authorize, error_response, SharedState};

/// GET /files/{id}
pub async fn download_file(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let delay = {
        let mut guard = state.write().await;
        if let Err(response) = authorize(&guard, &headers) {
            return response;
        }
        guard.file_requests += 1;
        guard.files_in_flight += 1;
        guard.max_files_in_flight = guard.max_files_in_flight.max(guard.files_in_flight);
        guard.file_delay
    };

    // Lock released while waiting so concurrent downloads overlap.
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut state = state.write().await;
    state.files_in_flight -= 1;

    match state.file(&id) {
        Some(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/pdf")],
            bytes.clone(),
        )
            .into_response(),
        None => error_response(StatusCode::NOT_FOUND, &format!("No file for document {id}")),
    }
}
