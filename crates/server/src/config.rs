//! 服务配置。
//!
//! 优先级从低到高：内置默认值、TOML 配置文件、命令行参数与环境变量。

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
type Result<T> = anyhow::Result<T>;

/// 未显式指定 `--config` 时在工作目录下查找的配置文件。
pub const DEFAULT_CONFIG_FILE: &str = "filesync.toml";

pub const ENV_CONFIG: &str = "FILESYNC_CONFIG";
pub const ENV_HOST: &str = "FILESYNC_HOST";
pub const ENV_PORT: &str = "FILESYNC_PORT";
pub const ENV_STORAGE_DIR: &str = "FILESYNC_STORAGE_DIR";
pub const ENV_OPEN_BROWSER: &str = "FILESYNC_OPEN_BROWSER";
pub const ENV_BROWSER_URL: &str = "FILESYNC_BROWSER_URL";
pub const ENV_MAX_UPLOAD_BYTES: &str = "FILESYNC_MAX_UPLOAD_BYTES";

#[derive(Parser, Debug, Default)]
#[command(name = "filesync")]
#[command(version, about = "Share files with devices on your local network", long_about = None)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(long, short = 'c', env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, short = 'H', env = ENV_HOST)]
    pub host: Option<String>,

    /// Port to bind
    #[arg(long, short = 'p', env = ENV_PORT)]
    pub port: Option<u16>,

    /// Directory holding shared files
    #[arg(long, short = 'd', env = ENV_STORAGE_DIR)]
    pub storage_dir: Option<PathBuf>,

    /// Open a browser once the server is listening
    #[arg(long, env = ENV_OPEN_BROWSER, num_args = 0..=1, default_missing_value = "true")]
    pub open_browser: Option<bool>,

    /// URL to open instead of the detected LAN address
    #[arg(long, env = ENV_BROWSER_URL)]
    pub browser_url: Option<String>,

    /// Reject uploads with a larger request body
    #[arg(long, env = ENV_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    #[serde(default)]
    pub open_browser: bool,
    #[serde(default)]
    pub browser_url: Option<String>,
    /// `None` 表示不限制上传大小。
    #[serde(default)]
    pub max_upload_bytes: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            storage_dir: default_storage_dir(),
            open_browser: false,
            browser_url: None,
            max_upload_bytes: None,
        }
    }
}

impl ServerConfig {
    /// 按优先级合并配置文件与命令行参数。
    pub fn load(cli: &Cli) -> Result<Self> {
        let base = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => Self::default(),
        };

        Ok(base.with_overrides(cli))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("failed to deserialize server config")
    }

    /// 用命令行参数覆盖已设置的字段。
    #[must_use]
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(host) = &cli.host {
            self.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(storage_dir) = &cli.storage_dir {
            self.storage_dir = storage_dir.clone();
        }
        if let Some(open_browser) = cli.open_browser {
            self.open_browser = open_browser;
        }
        if let Some(url) = &cli.browser_url {
            self.browser_url = Some(url.clone());
        }
        if let Some(limit) = cli.max_upload_bytes {
            self.max_upload_bytes = Some(limit);
        }
        self
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("uploads")
}
