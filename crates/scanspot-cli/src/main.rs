//! Scanspot CLI
//!
//! 把本机变成临时 Wi-Fi 接入点，并在 websocket 控制通道上
//! 响应扫描设备的查询，超时后自动退出。

mod logging;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use scanspot_core::wifi::WifiDirectCapability;
use scanspot_core::wifi::mock::MockRadio;
use scanspot_core::wifi::nm::NmHotspot;
use scanspot_core::{Session, SessionConfig};

#[derive(Parser)]
#[command(name = "scanspot", version, about = "临时 Wi-Fi AP 与 websocket 遥控通道")]
struct Cli {
    /// Wifi AP SSID
    #[arg(long)]
    ssid: Option<String>,

    /// Wifi AP passphrase
    #[arg(long)]
    passphrase: Option<String>,

    /// Websocket IP address hosted by the Wifi AP (0.0.0.0 will make it available for other machines)
    #[arg(long)]
    websocket_url: Option<String>,

    /// Websocket port hosted by the Wifi AP
    #[arg(long)]
    websocket_port: Option<u16>,

    /// Time in seconds after which the Wifi AP exits
    #[arg(long)]
    timeout: Option<u64>,

    /// WiFi 接口名称
    #[arg(long, default_value = "wlan0")]
    interface: String,

    /// 使用模拟无线后端 (无硬件时调试控制协议用)
    #[arg(long)]
    mock: bool,
}

/// 命令行参数覆盖设置文件
fn merge_config(mut config: SessionConfig, cli: &Cli) -> SessionConfig {
    if let Some(ssid) = &cli.ssid {
        config.ssid = ssid.clone();
    }
    if let Some(passphrase) = &cli.passphrase {
        config.passphrase = passphrase.clone();
    }
    if let Some(address) = &cli.websocket_url {
        config.bind_address = address.clone();
    }
    if let Some(port) = cli.websocket_port {
        config.bind_port = port;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init()?;

    tracing::info!("================ Starting the scanspot program ================");

    let config = merge_config(SessionConfig::load(), &cli);

    let radio: Arc<dyn WifiDirectCapability> = if cli.mock {
        tracing::warn!("Running on the mock radio backend, no AP will be broadcast");
        Arc::new(MockRadio::new())
    } else {
        Arc::new(NmHotspot::new(&cli.interface).await?)
    };

    Session::new(config, radio).run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_pass_through() {
        let cli = Cli::parse_from(["scanspot"]);
        let config = merge_config(SessionConfig::default(), &cli);

        assert_eq!(config.ssid, "DIRECT-SCANNER1");
        assert_eq!(config.passphrase, "test1234");
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.bind_port, 8080);
        assert_eq!(config.timeout_secs, 600);
        assert_eq!(cli.interface, "wlan0");
        assert!(!cli.mock);
    }

    #[test]
    fn test_cli_overrides_settings() {
        let cli = Cli::parse_from([
            "scanspot",
            "--ssid",
            "DIRECT-LAB",
            "--websocket-port",
            "9090",
            "--timeout",
            "30",
            "--mock",
        ]);
        let config = merge_config(SessionConfig::default(), &cli);

        assert_eq!(config.ssid, "DIRECT-LAB");
        assert_eq!(config.passphrase, "test1234");
        assert_eq!(config.bind_port, 9090);
        assert_eq!(config.timeout_secs, 30);
        assert!(cli.mock);
    }
}
