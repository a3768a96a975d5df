use std::time::Instant;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use storefront_core::{
    CatalogStore, CollectionSummary, Page, PageRequest, Product, QueryError, DEFAULT_PAGE_SIZE,
};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("{0}")]
    BadParams(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Query(QueryError::UnknownCollection(_)) => StatusCode::NOT_FOUND,
            ApiError::Query(_) | ApiError::BadParams(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

pub fn routes(store: CatalogStore) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/collections", get(list_collections))
        .route("/api/collections/:key/products", get(product_page))
        .layer(middleware::from_fn(log_request))
        .with_state(store)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_collections(State(store): State<CatalogStore>) -> Json<Vec<CollectionSummary>> {
    Json(store.collections())
}

async fn product_page(
    State(store): State<CatalogStore>,
    Path(key): Path<String>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Page<Product>>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadParams(e.body_text()))?;
    let request = PageRequest::new(
        key,
        params.page.unwrap_or(1),
        params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    );
    Ok(Json(store.page(&request)?))
}

async fn log_request<B>(request: Request<B>, next: Next<B>) -> Response {
    let request_id = Uuid::new_v4();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let mut response = next.run(request).await;

    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if status.is_server_error() {
        warn!(%request_id, %method, %uri, status = status.as_u16(), elapsed_ms, "Request failed");
    } else {
        info!(%request_id, %method, %uri, status = status.as_u16(), elapsed_ms, "Request handled");
    }

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}
