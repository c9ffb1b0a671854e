//! FileSync 服务端：在局域网内通过浏览器上传、列出、下载、删除共享目录中的文件。

pub mod api;
pub mod banner;
pub mod browser;
pub mod config;

pub use api::{AppState, create_router};
pub use config::{Cli, ServerConfig};
