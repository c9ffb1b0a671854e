//! 启动信息：列出局域网中其它设备可访问的地址。

use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use tracing::info;

/// 是否绑定到所有网络接口。
pub fn is_all_interfaces(host: &str) -> bool {
    matches!(host, "0.0.0.0" | "::" | "[::]")
}

/// 本机所有非回环 IPv4 地址。
pub fn lan_ipv4_addresses() -> Vec<IpAddr> {
    match local_ip_address::list_afinet_netifas() {
        Ok(interfaces) => interfaces
            .into_iter()
            .map(|(_, ip)| ip)
            .filter(|ip| ip.is_ipv4() && !ip.is_loopback())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// 其它设备应使用的访问地址。
pub fn network_urls(host: &str, port: u16) -> Vec<String> {
    if host == "127.0.0.1" || host == "localhost" {
        Vec::new()
    } else if is_all_interfaces(host) {
        lan_ipv4_addresses()
            .into_iter()
            .map(|ip| format!("http://{ip}:{port}"))
            .collect()
    } else {
        vec![format!("http://{host}:{port}")]
    }
}

/// 输出监听地址、局域网地址与存储目录。
pub fn log_listening(host: &str, local_addr: SocketAddr, storage_dir: &Path) {
    let port = local_addr.port();
    info!(address = %local_addr, "server listening");
    info!(url = %format!("http://localhost:{port}"), "local access");

    let urls = network_urls(host, port);
    if urls.is_empty() && !is_all_interfaces(host) {
        info!("bound to loopback only, use --host 0.0.0.0 to share on the network");
    }
    for url in urls {
        info!(url = %url, "network access");
    }

    info!(path = %storage_dir.display(), "serving files from storage directory");
}
