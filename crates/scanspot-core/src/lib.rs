//! Scanspot Core Library
//!
//! 把主机变成临时 Wi-Fi 接入点，并通过 websocket 控制通道
//! 响应扫描设备的查询。核心是在单一进程生命周期内桥接两个
//! 异步域：无线电子系统的带外回调 (发布器状态、对端连接请求)
//! 和有界生命周期的控制服务器。
//!
//! # 模块
//!
//! - **wifi**: 无线电能力接口、广播控制器、连接监听器、事件标签翻译
//! - **control**: msgpack 命令/响应协议与 websocket 服务器
//! - **session**: 带全局超时的会话监督器
//! - **config**: 会话配置与设置文件
//!
//! # 使用示例
//!
//! ```ignore
//! use std::sync::Arc;
//! use scanspot_core::{Session, SessionConfig};
//! use scanspot_core::wifi::nm::NmHotspot;
//!
//! let radio = Arc::new(NmHotspot::new("wlan0").await?);
//! let session = Session::new(SessionConfig::load(), radio);
//! session.run().await?;
//! ```

pub mod config;
pub mod control;
pub mod session;
pub mod wifi;

// Config re-exports
pub use config::SessionConfig;

// Control re-exports
pub use control::{ControlServer, Response, commands};

// Session re-exports
pub use session::Session;

// WiFi re-exports
pub use wifi::{
    AdvertisementConfig, ApAdvertiser, CallbackToken, ConnectionEvent, ConnectionWatcher,
    HotspotError, StatusChangedEvent, WifiDirectCapability,
};
