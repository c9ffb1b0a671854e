//! 存储目录能力模块。
//!
//! 所有文件都是存储根目录的直接子项，文件名即客户端提交的名称。

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// 存储错误类型。
#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FileStoreError>;

/// 存储目录中的一个文件。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoredFile {
    /// 文件名。
    pub name: String,
    /// 文件大小（字节），列表时从文件系统读取。
    pub size: u64,
}

/// 已打开、待读取的文件。
#[derive(Debug)]
pub struct OpenedFile {
    pub file: File,
    pub size: u64,
}

/// 上传中的暂存文件前缀，列表时忽略。
const STAGING_PREFIX: &str = ".filesync-";
const STAGING_SUFFIX: &str = ".part";

/// 写入中的文件。
///
/// 内容先写入存储目录内的隐藏临时文件，`commit` 时才重命名为目标文件；
/// 未提交就被丢弃时临时文件自动删除，目标文件保持原状。
#[derive(Debug)]
pub struct StagedFile {
    name: String,
    file: File,
    temp: TempPath,
    target: PathBuf,
    written: u64,
}

impl StagedFile {
    /// 追加一块内容。
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        self.file.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// 已写入的字节数。
    pub fn written(&self) -> u64 {
        self.written
    }

    /// 落盘并替换同名文件，返回文件大小。
    pub async fn commit(self) -> Result<u64> {
        let StagedFile {
            name,
            mut file,
            temp,
            target,
            written,
        } = self;

        file.flush().await?;
        drop(file);

        // 失败时 PathPersistError 携带的 TempPath 被丢弃，临时文件随之删除
        temp.persist(&target).map_err(|err| FileStoreError::Io(err.error))?;

        info!(name = %name, size = written, "file stored");
        Ok(written)
    }
}

fn is_staging_name(name: &str) -> bool {
    name.starts_with(STAGING_PREFIX) && name.ends_with(STAGING_SUFFIX)
}

/// 单目录文件存储。
///
/// 存储根目录在构造时注入，之后所有操作都相对于它进行。
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// 创建存储实例，根目录不存在时自动创建。
    pub async fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        info!(root = %root.display(), "storage directory ready");
        Ok(Self { root })
    }

    /// 存储根目录。
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 将文件名解析为根目录下的路径。
    ///
    /// 名称必须是单个普通路径组件，不能逃出根目录。
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0']);

        if invalid {
            return Err(FileStoreError::InvalidName(name.to_string()));
        }

        Ok(self.root.join(name))
    }

    /// 列出根目录下的所有普通文件。
    ///
    /// 顺序即目录遍历顺序，不做排序。
    pub async fn list(&self) -> Result<Vec<StoredFile>> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            // 跟随符号链接；元数据读取失败的条目视为非文件
            let metadata = match fs::metadata(entry.path()).await {
                Ok(metadata) => metadata,
                Err(err) => {
                    debug!(path = %entry.path().display(), error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            if metadata.is_file() && !is_staging_name(&name) {
                files.push(StoredFile {
                    name,
                    size: metadata.len(),
                });
            }
        }

        debug!(count = files.len(), "listed stored files");
        Ok(files)
    }

    /// 开始写入一个文件，提交前不影响已存在的同名文件。
    pub async fn stage(&self, name: &str) -> Result<StagedFile> {
        let target = self.resolve(name)?;
        let root = self.root.clone();

        let temp = tokio::task::spawn_blocking(move || {
            let mut builder = tempfile::Builder::new();
            builder.prefix(STAGING_PREFIX).suffix(STAGING_SUFFIX);
            // 临时文件默认 0600，提交后应与普通写入的文件权限一致
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                builder.permissions(std::fs::Permissions::from_mode(0o644));
            }
            builder.tempfile_in(root)
        })
        .await
        .map_err(std::io::Error::other)??;
        let (file, temp) = temp.into_parts();

        debug!(name = %name, temp = %temp.display(), "staging upload");
        Ok(StagedFile {
            name: name.to_string(),
            file: File::from_std(file),
            temp,
            target,
            written: 0,
        })
    }

    /// 一次性写入完整内容，覆盖同名文件。
    pub async fn write(&self, name: &str, contents: &[u8]) -> Result<u64> {
        let mut staged = self.stage(name).await?;
        staged.write_chunk(contents).await?;
        staged.commit().await
    }

    /// 打开文件用于读取。
    pub async fn open_read(&self, name: &str) -> Result<OpenedFile> {
        let path = self.resolve(name)?;

        let metadata = fs::metadata(&path)
            .await
            .map_err(|err| not_found_or_io(err, name))?;
        if !metadata.is_file() {
            return Err(FileStoreError::NotFound(name.to_string()));
        }

        let file = File::open(&path)
            .await
            .map_err(|err| not_found_or_io(err, name))?;

        Ok(OpenedFile {
            file,
            size: metadata.len(),
        })
    }

    /// 删除文件。
    pub async fn remove(&self, name: &str) -> Result<()> {
        let path = self.resolve(name)?;

        if !fs::try_exists(&path).await? {
            return Err(FileStoreError::NotFound(name.to_string()));
        }

        fs::remove_file(&path)
            .await
            .map_err(|err| not_found_or_io(err, name))?;

        info!(name = %name, "file deleted");
        Ok(())
    }
}

fn not_found_or_io(err: std::io::Error, name: &str) -> FileStoreError {
    if err.kind() == ErrorKind::NotFound {
        FileStoreError::NotFound(name.to_string())
    } else {
        FileStoreError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use tokio::io::AsyncReadExt;

    use super::*;

    async fn scratch_store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = FileStore::init(dir.path().join("uploads"))
            .await
            .expect("init store");
        (dir, store)
    }

    async fn read_all(store: &FileStore, name: &str) -> Vec<u8> {
        let mut opened = store.open_read(name).await.expect("open stored file");
        let mut buf = Vec::new();
        opened.file.read_to_end(&mut buf).await.expect("read file");
        buf
    }

    #[tokio::test]
    async fn test_init_creates_root() {
        let (_dir, store) = scratch_store().await;
        assert!(store.root().is_dir());

        // 再次初始化已存在的目录不报错
        FileStore::init(store.root()).await.expect("re-init store");
    }

    #[tokio::test]
    async fn test_write_then_list() {
        let (_dir, store) = scratch_store().await;
        store.write("a.txt", b"hello").await.expect("write file");

        let files = store.list().await.expect("list files");
        assert_eq!(
            files,
            vec![StoredFile {
                name: "a.txt".to_string(),
                size: 5
            }]
        );
    }

    #[tokio::test]
    async fn test_list_skips_directories() {
        let (_dir, store) = scratch_store().await;
        store.write("keep.bin", &[0u8; 3]).await.expect("write file");
        std::fs::create_dir(store.root().join("nested")).expect("create subdir");

        let files = store.list().await.expect("list files");
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["keep.bin"]);
    }

    #[tokio::test]
    async fn test_list_is_stable_without_mutation() {
        let (_dir, store) = scratch_store().await;
        for name in ["one", "two", "three"] {
            store.write(name, name.as_bytes()).await.expect("write file");
        }

        let first: HashSet<_> = store.list().await.expect("list").into_iter().collect();
        let second: HashSet<_> = store.list().await.expect("list").into_iter().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_content() {
        let (_dir, store) = scratch_store().await;
        store.write("a.txt", b"first version").await.expect("write");
        store.write("a.txt", b"v2").await.expect("overwrite");

        assert_eq!(read_all(&store, "a.txt").await, b"v2");
        let opened = store.open_read("a.txt").await.expect("open");
        assert_eq!(opened.size, 2);
    }

    fn root_entry_count(store: &FileStore) -> usize {
        std::fs::read_dir(store.root()).expect("read root").count()
    }

    #[tokio::test]
    async fn test_abandoned_stage_keeps_existing_file() {
        let (_dir, store) = scratch_store().await;
        store.write("keep.txt", b"original content").await.expect("write");

        let mut staged = store.stage("keep.txt").await.expect("stage");
        staged.write_chunk(b"part").await.expect("write chunk");
        assert_eq!(staged.written(), 4);

        // 写入过程中暂存文件不出现在列表里
        let files = store.list().await.expect("list");
        assert_eq!(
            files,
            vec![StoredFile {
                name: "keep.txt".to_string(),
                size: 16
            }]
        );

        drop(staged);
        assert_eq!(read_all(&store, "keep.txt").await, b"original content");
        assert_eq!(root_entry_count(&store), 1);
    }

    #[tokio::test]
    async fn test_abandoned_stage_of_new_name_leaves_nothing() {
        let (_dir, store) = scratch_store().await;

        let mut staged = store.stage("fresh.bin").await.expect("stage");
        staged.write_chunk(&[1, 2, 3]).await.expect("write chunk");
        drop(staged);

        assert!(store.list().await.expect("list").is_empty());
        assert_eq!(root_entry_count(&store), 0);
    }

    #[tokio::test]
    async fn test_commit_onto_directory_fails_and_cleans_up() {
        let (_dir, store) = scratch_store().await;
        std::fs::create_dir(store.root().join("folder")).expect("create subdir");

        let mut staged = store.stage("folder").await.expect("stage");
        staged.write_chunk(b"data").await.expect("write chunk");
        let err = staged.commit().await.unwrap_err();

        assert!(matches!(err, FileStoreError::Io(_)));
        assert!(store.root().join("folder").is_dir());
        assert_eq!(root_entry_count(&store), 1);
    }

    #[tokio::test]
    async fn test_open_missing_is_not_found() {
        let (_dir, store) = scratch_store().await;
        let err = store.open_read("missing.txt").await.unwrap_err();
        assert!(matches!(err, FileStoreError::NotFound(name) if name == "missing.txt"));
    }

    #[tokio::test]
    async fn test_open_directory_is_not_found() {
        let (_dir, store) = scratch_store().await;
        std::fs::create_dir(store.root().join("folder")).expect("create subdir");

        let err = store.open_read("folder").await.unwrap_err();
        assert!(matches!(err, FileStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove() {
        let (_dir, store) = scratch_store().await;
        store.write("gone.txt", b"bye").await.expect("write");

        store.remove("gone.txt").await.expect("remove");
        assert!(store.list().await.expect("list").is_empty());

        let err = store.remove("gone.txt").await.unwrap_err();
        assert!(matches!(err, FileStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_directory_is_io_error() {
        let (_dir, store) = scratch_store().await;
        std::fs::create_dir(store.root().join("folder")).expect("create subdir");

        let err = store.remove("folder").await.unwrap_err();
        assert!(matches!(err, FileStoreError::Io(_)));
    }

    #[tokio::test]
    async fn test_rejects_traversal_names() {
        let (dir, store) = scratch_store().await;
        std::fs::write(dir.path().join("secret.txt"), b"outside").expect("write outside file");

        for name in ["", ".", "..", "../secret.txt", "a/b.txt", "..\\secret.txt", "nul\0.txt"] {
            assert!(
                matches!(store.resolve(name), Err(FileStoreError::InvalidName(_))),
                "name {name:?} should be rejected"
            );
        }

        assert!(matches!(
            store.write("../escape.txt", b"x").await,
            Err(FileStoreError::InvalidName(_))
        ));
        assert!(!dir.path().join("escape.txt").exists());

        assert!(matches!(
            store.open_read("../secret.txt").await,
            Err(FileStoreError::InvalidName(_))
        ));
        assert!(matches!(
            store.remove("../secret.txt").await,
            Err(FileStoreError::InvalidName(_))
        ));
        assert!(dir.path().join("secret.txt").exists());
    }

    #[tokio::test]
    async fn test_accepts_unusual_but_flat_names() {
        let (_dir, store) = scratch_store().await;
        for name in ["..hidden", "report v2 (final).pdf", "照片.jpg", ".env"] {
            store.write(name, b"ok").await.expect("write flat name");
        }
        assert_eq!(store.list().await.expect("list").len(), 4);
    }
}
