//! API 路由模块。
//!
//! 提供浏览器页面与文件传输所需的全部 HTTP 路由。

pub mod files;
pub mod pages;
pub mod state;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use files::{ApiError, create_files_router};
pub use pages::create_pages_router;
pub use state::AppState;

/// 组装完整的应用路由。
///
/// 所有路由都允许任意来源的跨域请求。
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(create_pages_router())
        .merge(create_files_router(state.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
