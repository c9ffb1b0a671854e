//! 统一的应用状态。

use file_store::FileStore;

/// 统一的应用状态，包含所有路由共享的数据。
#[derive(Clone)]
pub struct AppState {
    /// 共享目录存储。
    pub store: FileStore,
    /// 上传请求体大小上限，`None` 表示不限制。
    pub max_upload_bytes: Option<usize>,
}

impl AppState {
    /// 创建新的应用状态。
    pub fn new(store: FileStore) -> Self {
        Self {
            store,
            max_upload_bytes: None,
        }
    }

    /// 设置上传大小上限。
    #[must_use]
    pub fn with_max_upload_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_upload_bytes = limit;
        self
    }
}
