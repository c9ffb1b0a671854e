//! 页面与健康检查路由。

use std::sync::Arc;

use axum::{Json, Router, response::Html, routing::get};
use filesync_api_types::HealthCheckResponse;

use super::state::AppState;

const INDEX_HTML: &str = include_str!("../../static/index.html");

pub fn create_pages_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse::ok())
}
