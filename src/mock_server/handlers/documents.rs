//! Document listing handlers.

use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};

use super::collections::paginate;
use super::{authorize, error_response, SharedState};
use crate::models::DocumentParent;
use crate::upload::{DOCUMENT_TYPE_FIELD, UPLOAD_PART};

/// GET /<parent collection>/{id}/documents/
pub async fn list_documents(
    State(state): State<SharedState>,
    headers: HeaderMap,
    uri: Uri,
    Path(parent_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    parent: DocumentParent,
) -> Response {
    let state = state.read().await;
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }

    let page = query
        .get("page[number]")
        .and_then(|p| p.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1);
    let documents = state.documents_of(parent, &parent_id);

    match paginate(&documents, &state.base_url, uri.path(), &query, page, state.page_size) {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

/// POST /<parent collection>/{id}/documents/
///
/// Accepts a `document_type` field and an `upload` file part, checks the
/// type against the parent's allow-list and stores the file as a new
/// document.
pub async fn upload_document(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(parent_id): Path<String>,
    parent: DocumentParent,
    mut multipart: Multipart,
) -> Response {
    if let Err(response) = authorize(&*state.read().await, &headers) {
        return response;
    }

    let mut document_type = None;
    let mut upload = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
        };
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(DOCUMENT_TYPE_FIELD) => match field.text().await {
                Ok(text) => document_type = Some(text),
                Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
            },
            Some(UPLOAD_PART) => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => upload = Some((file_name, bytes.to_vec())),
                    Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
                }
            }
            _ => {}
        }
    }

    let Some(document_type) = document_type else {
        return error_response(StatusCode::BAD_REQUEST, "document_type is required");
    };
    if !parent.document_types().contains(&document_type.as_str()) {
        return error_response(
            StatusCode::BAD_REQUEST,
            &format!("'{document_type}' is not a valid choice"),
        );
    }
    let Some((file_name, content)) = upload else {
        return error_response(StatusCode::BAD_REQUEST, "upload is required");
    };

    let mut state = state.write().await;
    let document = state.add_upload(parent, &parent_id, &document_type, &file_name, content);
    (
        StatusCode::CREATED,
        Json(serde_json::json!({"data": document})),
    )
        .into_response()
}
