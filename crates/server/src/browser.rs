//! 启动后可选的浏览器打开钩子。

use std::process::Stdio;

use tokio::process::Command;
use tracing::{info, warn};

use crate::banner::{is_all_interfaces, lan_ipv4_addresses};

/// 未配置 `browser_url` 时推导打开地址。
///
/// 绑定所有接口时优先使用第一个局域网地址，便于直接复制给手机。
pub fn default_browser_url(host: &str, port: u16) -> String {
    let host = if is_all_interfaces(host) {
        lan_ipv4_addresses()
            .first()
            .map(ToString::to_string)
            .unwrap_or_else(|| "127.0.0.1".to_string())
    } else {
        host.to_string()
    };
    format!("http://{host}:{port}")
}

/// 当前平台打开 URL 的命令。
pub fn opener_command(url: &str) -> Command {
    let mut command = if cfg!(target_os = "windows") {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    } else if cfg!(target_os = "macos") {
        Command::new("open")
    } else {
        Command::new("xdg-open")
    };

    command
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    command
}

/// 在后台打开浏览器，失败只记录日志。
pub fn spawn_browser(url: String) {
    tokio::spawn(async move {
        info!(url = %url, "opening browser");
        match opener_command(&url).status().await {
            Ok(status) if status.success() => {}
            Ok(status) => warn!(url = %url, %status, "browser opener exited with failure"),
            Err(err) => warn!(url = %url, error = %err, "failed to launch browser"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_url_for_specific_host() {
        assert_eq!(
            default_browser_url("192.168.0.105", 5000),
            "http://192.168.0.105:5000"
        );
    }

    #[test]
    fn test_default_url_for_all_interfaces() {
        let url = default_browser_url("0.0.0.0", 8080);
        assert!(url.starts_with("http://"));
        assert!(url.ends_with(":8080"));
        assert!(!url.contains("0.0.0.0"));
    }

    #[test]
    fn test_opener_passes_url_last() {
        let command = opener_command("http://10.0.0.2:5000");
        let args: Vec<_> = command.as_std().get_args().collect();
        assert_eq!(
            args.last().and_then(|arg| arg.to_str()),
            Some("http://10.0.0.2:5000")
        );
    }
}
