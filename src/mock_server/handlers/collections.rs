//! Paginated collection endpoint handlers.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use url::Url;

use super::{authorize, error_response, SharedState};
use crate::mock_server::state::QueryFilter;
use crate::models::EntityType;

const PAGE_NUMBER: &str = "page[number]";
const PAGE_SIZE: &str = "page[size]";

/// GET /<collection>/
pub async fn list_collection(
    State(state): State<SharedState>,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    entity: EntityType,
) -> Response {
    let state = state.read().await;
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }

    let filters: Vec<QueryFilter> = query
        .iter()
        .filter_map(|(k, v)| QueryFilter::parse(k, v))
        .collect();
    let records = state.list(entity, &filters);

    let page = query
        .get(PAGE_NUMBER)
        .and_then(|p| p.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1);
    let size = query
        .get(PAGE_SIZE)
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(state.page_size)
        .max(1);

    match paginate(&records, &state.base_url, uri.path(), &query, page, size) {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

/// Build a JSON:API page with an absolute `links.next` when more pages follow.
pub(crate) fn paginate(
    records: &[&Value],
    base_url: &str,
    path: &str,
    query: &HashMap<String, String>,
    page: usize,
    size: usize,
) -> Result<Value, url::ParseError> {
    let start = (page - 1).saturating_mul(size).min(records.len());
    let end = start.saturating_add(size).min(records.len());
    let data: Vec<&Value> = records[start..end].to_vec();

    let next = if end < records.len() {
        let mut url = Url::parse(base_url)?.join(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            let mut keys: Vec<&String> = query.keys().filter(|k| *k != PAGE_NUMBER).collect();
            keys.sort();
            for key in keys {
                pairs.append_pair(key, &query[key]);
            }
            pairs.append_pair(PAGE_NUMBER, &(page + 1).to_string());
        }
        Some(url.to_string())
    } else {
        None
    };

    Ok(json!({
        "data": data,
        "links": {"next": next},
        "meta": {"count": records.len()},
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: usize) -> Vec<Value> {
        (0..n).map(|i| json!({"id": i.to_string()})).collect()
    }

    #[test]
    fn test_paginate_links_next_page() {
        let all = records(5);
        let refs: Vec<&Value> = all.iter().collect();
        let mut query = HashMap::new();
        query.insert("filter[property.in]".to_string(), "p1".to_string());

        let body = paginate(&refs, "http://localhost:1", "/projects/", &query, 1, 2).unwrap();
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let next = Url::parse(body["links"]["next"].as_str().unwrap()).unwrap();
        assert_eq!(next.path(), "/projects/");
        let pairs: HashMap<_, _> = next.query_pairs().into_owned().collect();
        assert_eq!(pairs["page[number]"], "2");
        assert_eq!(pairs["filter[property.in]"], "p1");
    }

    #[test]
    fn test_paginate_last_page_has_no_next() {
        let all = records(5);
        let refs: Vec<&Value> = all.iter().collect();

        let body = paginate(&refs, "http://localhost:1", "/x/", &HashMap::new(), 3, 2).unwrap();
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert!(body["links"]["next"].is_null());
    }

    #[test]
    fn test_paginate_past_end_is_empty() {
        let all = records(1);
        let refs: Vec<&Value> = all.iter().collect();

        let body = paginate(&refs, "http://localhost:1", "/x/", &HashMap::new(), 9, 2).unwrap();
        assert!(body["data"].as_array().unwrap().is_empty());
        assert!(body["links"]["next"].is_null());
    }
}
