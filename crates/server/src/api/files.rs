//! 文件传输 API 路由。
//!
//! 上传、列出、下载、删除共享目录中的文件。

use std::fmt::Write as _;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{
        DefaultBodyLimit, Multipart, Path, State,
        multipart::{Field, MultipartError, MultipartRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use file_store::{FileStore, FileStoreError};
use filesync_api_types::{FileEntry, StatusResponse, UploadResponse};
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, warn};

use super::state::AppState;

/// 上传表单中承载文件的字段名。
pub const FILES_FIELD: &str = "files";

/// 创建文件传输 API 路由。
pub fn create_files_router(max_upload_bytes: Option<usize>) -> Router<Arc<AppState>> {
    let upload_limit = match max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        // 上传一个或多个文件
        .route("/upload", post(upload_files).layer(upload_limit))
        // 列出所有文件
        .route("/files", get(list_files))
        // 以附件形式下载文件
        .route("/download/{filename}", get(download_file))
        // 删除文件
        .route("/delete/{filename}", delete(delete_file))
}

/// 上传文件。
///
/// 文件名为空的部分被跳过；同名文件直接覆盖。
async fn upload_files(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        debug!(error = %rejection, "upload is not a multipart request");
        ApiError::no_files_part()
    })?;

    let mut files_part_present = false;
    let mut uploaded = Vec::new();

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        // 没有 filename 参数的同名字段是普通表单值，不算文件
        let Some(name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        files_part_present = true;

        if name.is_empty() {
            debug!("skipping upload part with empty file name");
            continue;
        }

        let size = store_field(&state.store, &name, &mut field).await?;
        info!(name = %name, size, "file uploaded");
        uploaded.push(name);
    }

    if !files_part_present {
        return Err(ApiError::no_files_part());
    }

    Ok(Json(UploadResponse::success(uploaded)))
}

/// 将一个上传字段按块写入存储目录。
///
/// 字段完整读取后才替换同名文件；请求体中途出错时暂存文件被丢弃。
async fn store_field(
    store: &FileStore,
    name: &str,
    field: &mut Field<'_>,
) -> Result<u64, ApiError> {
    let mut staged = store.stage(name).await?;

    while let Some(chunk) = field.chunk().await? {
        staged.write_chunk(&chunk).await?;
    }

    Ok(staged.commit().await?)
}

/// 列出共享目录中的文件。
async fn list_files(State(state): State<Arc<AppState>>) -> Result<Json<Vec<FileEntry>>, ApiError> {
    let files = state
        .store
        .list()
        .await?
        .into_iter()
        .map(|file| FileEntry {
            name: file.name,
            size: file.size,
        })
        .collect();
    Ok(Json(files))
}

/// 以附件形式流式下载文件。
async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let opened = state.store.open_read(&filename).await?;
    let content_type = mime_guess::from_path(&filename).first_or_octet_stream();

    info!(name = %filename, size = opened.size, "serving download");

    let headers = [
        (header::CONTENT_TYPE, content_type.to_string()),
        (header::CONTENT_LENGTH, opened.size.to_string()),
        (header::CONTENT_DISPOSITION, attachment_disposition(&filename)),
    ];
    let body = Body::from_stream(ReaderStream::new(opened.file));

    Ok((headers, body).into_response())
}

/// 删除文件。
async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.store.remove(&filename).await?;
    Ok(Json(StatusResponse::success("File deleted")))
}

/// 构造 `Content-Disposition: attachment` 头的值。
///
/// `filename` 参数只保留可打印 ASCII，完整名称放在 RFC 5987 编码的 `filename*` 中。
fn attachment_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c == ' ' || c.is_ascii_graphic() => c,
            _ => '_',
        })
        .collect();

    let mut encoded = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            let _ = write!(encoded, "%{byte:02X}");
        }
    }

    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

/// API 错误类型。
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: StatusResponse,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: StatusResponse::fail(message),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: StatusResponse::fail(message),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: StatusResponse::error(message),
        }
    }

    fn no_files_part() -> Self {
        Self::bad_request("No files part in request")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<FileStoreError> for ApiError {
    fn from(err: FileStoreError) -> Self {
        match err {
            FileStoreError::NotFound(name) => {
                debug!(name = %name, "file not found");
                ApiError::not_found("File not found")
            }
            FileStoreError::InvalidName(name) => {
                warn!(name = %name, "rejected unsafe file name");
                ApiError::bad_request(format!("Invalid file name: {name}"))
            }
            FileStoreError::Io(e) => {
                error!(error = %e, "storage operation failed");
                ApiError::internal(e.to_string())
            }
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        let status = err.status();
        warn!(error = %err, status = %status, "malformed upload body");
        Self {
            status,
            body: StatusResponse::fail(err.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
