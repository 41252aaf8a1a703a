//! WiFi Direct 广播硬件层
//!
//! 定义无线电能力接口、广播配置和硬件事件的数据模型。
//! 硬件枚举以原始码 (u32) 在事件里传递，标签翻译只做查表，
//! 未知值返回 "UNKNOWN" 哨兵而不是 panic，硬件 API 将来新增
//! 枚举值时日志路径不受影响。

pub mod advertiser;
pub mod capability;
pub mod listener;
pub mod mock;
pub mod nm;

#[cfg(test)]
mod tests;

pub use advertiser::ApAdvertiser;
pub use capability::{CallbackToken, HotspotError, WifiDirectCapability};
pub use listener::ConnectionWatcher;

/// 发布器状态原始码
pub mod publisher_status {
    pub const CREATED: u32 = 0;
    pub const STARTED: u32 = 1;
    pub const STOPPED: u32 = 2;
    pub const ABORTED: u32 = 3;

    pub fn name(status: u32) -> &'static str {
        match status {
            CREATED => "CREATED",
            STARTED => "STARTED",
            STOPPED => "STOPPED",
            ABORTED => "ABORTED",
            _ => "UNKNOWN",
        }
    }
}

/// 无线电错误原始码，每个状态事件都带一个，SUCCESS 表示无错误
pub mod wifi_error {
    pub const SUCCESS: u32 = 0;
    pub const RADIO_NOT_AVAILABLE: u32 = 1;
    pub const RESOURCE_IN_USE: u32 = 2;

    pub fn name(error: u32) -> &'static str {
        match error {
            SUCCESS => "SUCCESS",
            RADIO_NOT_AVAILABLE => "RADIO_NOT_AVAILABLE",
            RESOURCE_IN_USE => "RESOURCE_IN_USE",
            _ => "UNKNOWN",
        }
    }
}

/// 监听态可发现性原始码
pub mod discoverability {
    pub const NONE: u32 = 0;
    pub const NORMAL: u32 = 1;
    pub const INTENSIVE: u32 = 2;

    pub fn name(discoverability: u32) -> &'static str {
        match discoverability {
            NONE => "NONE",
            NORMAL => "NORMAL",
            INTENSIVE => "INTENSIVE",
            _ => "UNKNOWN",
        }
    }
}

/// 对端设备类型原始码
pub mod device_kind {
    pub const UNKNOWN: u32 = 0;
    pub const DEVICE_INTERFACE: u32 = 1;
    pub const DEVICE_CONTAINER: u32 = 2;
    pub const DEVICE: u32 = 3;
    pub const DEVICE_INTERFACE_CLASS: u32 = 4;
    pub const ASSOCIATION_ENDPOINT: u32 = 5;
    pub const ASSOCIATION_ENDPOINT_CONTAINER: u32 = 6;
    pub const ASSOCIATION_ENDPOINT_SERVICE: u32 = 7;

    pub fn name(kind: u32) -> &'static str {
        match kind {
            UNKNOWN => "UNKNOWN",
            DEVICE_INTERFACE => "DEVICE_INTERFACE",
            DEVICE_CONTAINER => "DEVICE_CONTAINER",
            DEVICE => "DEVICE",
            DEVICE_INTERFACE_CLASS => "DEVICE_INTERFACE_CLASS",
            ASSOCIATION_ENDPOINT => "ASSOCIATION_ENDPOINT",
            ASSOCIATION_ENDPOINT_CONTAINER => "ASSOCIATION_ENDPOINT_CONTAINER",
            ASSOCIATION_ENDPOINT_SERVICE => "ASSOCIATION_ENDPOINT_SERVICE",
            _ => "UNKNOWN",
        }
    }
}

/// AP 广播配置
///
/// 发布器 start 之前设置一次，之后不可变。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisementConfig {
    /// 旧式 (legacy) 接入点 SSID
    pub ssid: String,
    /// WPA2 口令
    pub passphrase: String,
    /// 可发现性原始码，取值见 [`discoverability`]
    pub discoverability: u32,
    /// 自主 GO 模式。旧式客户端通过 GO 充当的接入点接入，必须开启。
    pub autonomous_group_owner: bool,
}

impl Default for AdvertisementConfig {
    fn default() -> Self {
        Self {
            ssid: "DIRECT-SCANNER1".to_string(),
            passphrase: "test1234".to_string(),
            discoverability: discoverability::INTENSIVE,
            autonomous_group_owner: true,
        }
    }
}

/// 发布器状态变更事件，每次生命周期迁移一条
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChangedEvent {
    pub status: u32,
    pub error: u32,
}

/// 对端连接请求事件，记录日志后即丢弃
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEvent {
    pub device_name: String,
    pub device_id: String,
    pub device_kind: u32,
}
