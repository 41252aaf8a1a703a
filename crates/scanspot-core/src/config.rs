//! 会话配置与设置文件
//!
//! 配置在进程启动时创建一次 (设置文件叠加命令行覆盖)，此后
//! 只读。

use std::fs;
use std::path::PathBuf;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::wifi::{AdvertisementConfig, discoverability};

/// 整个进程的配置作用域
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Wifi AP SSID
    pub ssid: String,
    /// Wifi AP 口令
    pub passphrase: String,
    /// 控制服务器监听地址 (0.0.0.0 允许其他机器访问)
    pub bind_address: String,
    /// 控制服务器端口
    pub bind_port: u16,
    /// AP 存活秒数，到期后优雅退出
    pub timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ssid: "DIRECT-SCANNER1".to_string(),
            passphrase: "test1234".to_string(),
            bind_address: "0.0.0.0".to_string(),
            bind_port: 8080,
            timeout_secs: 600,
        }
    }
}

impl SessionConfig {
    /// 获取设置文件路径
    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scanspot")
            .join("settings.toml")
    }

    /// 加载设置 (文件缺失或损坏时使用默认值)
    pub fn load() -> Self {
        let path = Self::config_path();
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => {
                        debug!("Loaded settings from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        log::warn!("Failed to parse settings: {}, using defaults", e);
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read settings file: {}, using defaults", e);
                }
            }
        }
        Self::default()
    }

    /// 保存设置
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        debug!("Saved settings to {:?}", path);
        Ok(())
    }

    /// 导出广播配置
    ///
    /// 旧式客户端接入要求自主 GO，监听态用 INTENSIVE 可发现性。
    pub fn advertisement(&self) -> AdvertisementConfig {
        AdvertisementConfig {
            ssid: self.ssid.clone(),
            passphrase: self.passphrase.clone(),
            discoverability: discoverability::INTENSIVE,
            autonomous_group_owner: true,
        }
    }
}
