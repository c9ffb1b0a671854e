//! File Store - 共享目录存储能力。
//!
//! 该 crate 封装对单一扁平存储目录的全部文件系统操作，
//! 供 server 集成为上传、列表、下载、删除路由。

pub mod store;

pub use store::{FileStore, FileStoreError, OpenedFile, Result, StagedFile, StoredFile};
