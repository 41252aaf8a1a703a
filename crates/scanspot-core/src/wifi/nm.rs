//! NetworkManager D-Bus 热点后端
//!
//! 通过 D-Bus 直接驱动 NetworkManager 把主机接口切到 AP 模式，
//! 是原生旧式 GO 广播在 Linux 上的对应物。
//!
//! # 注意事项
//!
//! - 依赖 PolicyKit 授权，无需 root
//! - 激活失败不从 start 返回值抛出，而是映射成 ABORTED 状态事件
//! - NetworkManager 不暴露 AP 模式下对端接入请求，本后端不会
//!   触发连接请求回调 (见 DESIGN.md)

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::sync::Mutex;
use zbus::Connection;
use zbus::proxy;
use zbus::zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};

use crate::wifi::capability::{
    CallbackRegistry, CallbackToken, ConnectionCallback, HotspotError, StatusCallback,
    WifiDirectCapability,
};
use crate::wifi::{
    AdvertisementConfig, ConnectionEvent, StatusChangedEvent, discoverability, publisher_status,
    wifi_error,
};

/// NetworkManager 主接口代理
#[proxy(
    interface = "org.freedesktop.NetworkManager",
    default_service = "org.freedesktop.NetworkManager",
    default_path = "/org/freedesktop/NetworkManager"
)]
trait NetworkManager {
    /// 获取所有网络设备
    fn get_devices(&self) -> zbus::Result<Vec<OwnedObjectPath>>;

    /// 激活连接
    fn activate_connection(
        &self,
        connection: &ObjectPath<'_>,
        device: &ObjectPath<'_>,
        specific_object: &ObjectPath<'_>,
    ) -> zbus::Result<OwnedObjectPath>;

    /// 停用连接
    fn deactivate_connection(&self, active_connection: &ObjectPath<'_>) -> zbus::Result<()>;

    /// NetworkManager 版本
    #[zbus(property)]
    fn version(&self) -> zbus::Result<String>;
}

/// NetworkManager.Settings 接口代理
#[proxy(
    interface = "org.freedesktop.NetworkManager.Settings",
    default_service = "org.freedesktop.NetworkManager",
    default_path = "/org/freedesktop/NetworkManager/Settings"
)]
trait NmSettings {
    /// 添加新连接
    fn add_connection(
        &self,
        connection: HashMap<&str, HashMap<&str, Value<'_>>>,
    ) -> zbus::Result<OwnedObjectPath>;

    /// 列出所有连接
    fn list_connections(&self) -> zbus::Result<Vec<OwnedObjectPath>>;
}

/// NetworkManager.Settings.Connection 接口代理
#[proxy(
    interface = "org.freedesktop.NetworkManager.Settings.Connection",
    default_service = "org.freedesktop.NetworkManager"
)]
trait NmConnection {
    /// 获取连接设置
    fn get_settings(&self) -> zbus::Result<HashMap<String, HashMap<String, OwnedValue>>>;

    /// 删除连接
    fn delete(&self) -> zbus::Result<()>;
}

/// NetworkManager.Device 接口代理
#[proxy(
    interface = "org.freedesktop.NetworkManager.Device",
    default_service = "org.freedesktop.NetworkManager"
)]
trait NmDevice {
    /// 设备接口名 (如 wlan0)
    #[zbus(property)]
    fn interface(&self) -> zbus::Result<String>;

    /// 设备类型 (2=WiFi)
    #[zbus(property)]
    fn device_type(&self) -> zbus::Result<u32>;
}

/// NetworkManager.Connection.Active 接口代理
#[proxy(
    interface = "org.freedesktop.NetworkManager.Connection.Active",
    default_service = "org.freedesktop.NetworkManager"
)]
trait NmActiveConnection {
    /// 连接状态
    #[zbus(property)]
    fn state(&self) -> zbus::Result<u32>;
}

/// 设备类型常量
mod device_type {
    pub const WIFI: u32 = 2;
}

/// 活动连接状态常量
mod active_connection_state {
    pub const ACTIVATING: u32 = 1;
    pub const ACTIVATED: u32 = 2;
    pub const DEACTIVATING: u32 = 3;
    pub const DEACTIVATED: u32 = 4;

    pub fn name(state: u32) -> &'static str {
        match state {
            ACTIVATING => "ACTIVATING",
            ACTIVATED => "ACTIVATED",
            DEACTIVATING => "DEACTIVATING",
            DEACTIVATED => "DEACTIVATED",
            _ => "UNKNOWN",
        }
    }
}

/// 激活完成的等待上限
const ACTIVATION_TIMEOUT: Duration = Duration::from_secs(15);

/// 活动热点信息，留给 stop 清理
#[derive(Default)]
struct ActiveHotspot {
    connection_name: Option<String>,
    settings_path: Option<OwnedObjectPath>,
    active_path: Option<OwnedObjectPath>,
}

/// NetworkManager 热点后端
pub struct NmHotspot {
    connection: Connection,
    interface: String,
    config: Mutex<Option<AdvertisementConfig>>,
    active: Mutex<ActiveHotspot>,
    status: AtomicU32,
    status_callbacks: StdMutex<CallbackRegistry<StatusChangedEvent>>,
    connection_callbacks: StdMutex<CallbackRegistry<ConnectionEvent>>,
}

impl NmHotspot {
    /// 连接系统 D-Bus 并验证 NetworkManager 可用
    pub async fn new(interface: &str) -> Result<Self> {
        let connection = Connection::system()
            .await
            .context("Failed to connect to system D-Bus")?;

        let nm = NetworkManagerProxy::new(&connection).await?;
        let version = nm.version().await?;
        info!("Connected to NetworkManager {}", version);

        Ok(Self {
            connection,
            interface: interface.to_string(),
            config: Mutex::new(None),
            active: Mutex::new(ActiveHotspot::default()),
            status: AtomicU32::new(publisher_status::CREATED),
            status_callbacks: StdMutex::new(CallbackRegistry::new()),
            connection_callbacks: StdMutex::new(CallbackRegistry::new()),
        })
    }

    fn set_status(&self, status: u32, error: u32) {
        self.status.store(status, Ordering::SeqCst);
        let event = StatusChangedEvent { status, error };
        self.status_callbacks.lock().unwrap().dispatch(&event);
    }

    /// 查找目标 WiFi 设备
    async fn find_wifi_device(&self) -> Result<Option<OwnedObjectPath>> {
        let nm = NetworkManagerProxy::new(&self.connection).await?;
        let device_paths = nm.get_devices().await?;

        for path in device_paths {
            let device = NmDeviceProxy::builder(&self.connection)
                .path(&path)?
                .build()
                .await?;

            if device.device_type().await.unwrap_or(0) != device_type::WIFI {
                continue;
            }
            if device.interface().await.unwrap_or_default() == self.interface {
                return Ok(Some(path));
            }
        }

        Ok(None)
    }

    /// 构建 AP 模式连接设置
    fn build_ap_settings<'a>(
        &'a self,
        config: &'a AdvertisementConfig,
        connection_name: &'a str,
    ) -> HashMap<&'a str, HashMap<&'a str, Value<'a>>> {
        let mut settings: HashMap<&str, HashMap<&str, Value>> = HashMap::new();

        // connection 部分
        let mut connection: HashMap<&str, Value> = HashMap::new();
        connection.insert("id", Value::Str(connection_name.into()));
        connection.insert("type", Value::Str("802-11-wireless".into()));
        connection.insert("autoconnect", Value::Bool(false));
        connection.insert("interface-name", Value::Str(self.interface.as_str().into()));
        settings.insert("connection", connection);

        // 802-11-wireless 部分
        let mut wireless: HashMap<&str, Value> = HashMap::new();
        wireless.insert("ssid", Value::Array(config.ssid.as_bytes().into()));
        wireless.insert("mode", Value::Str("ap".into()));
        settings.insert("802-11-wireless", wireless);

        // 802-11-wireless-security 部分
        let mut wireless_security: HashMap<&str, Value> = HashMap::new();
        wireless_security.insert("key-mgmt", Value::Str("wpa-psk".into()));
        wireless_security.insert("psk", Value::Str(config.passphrase.as_str().into()));
        settings.insert("802-11-wireless-security", wireless_security);

        // ipv4 部分 (共享模式 - 自动 DHCP)
        let mut ipv4: HashMap<&str, Value> = HashMap::new();
        ipv4.insert("method", Value::Str("shared".into()));
        settings.insert("ipv4", ipv4);

        // ipv6 部分
        let mut ipv6: HashMap<&str, Value> = HashMap::new();
        ipv6.insert("method", Value::Str("ignore".into()));
        settings.insert("ipv6", ipv6);

        settings
    }

    /// 添加并激活 AP 连接
    async fn activate_hotspot(
        &self,
        config: &AdvertisementConfig,
        device: &OwnedObjectPath,
    ) -> Result<()> {
        let connection_name = format!(
            "scanspot-ap-{}",
            &config.ssid[..std::cmp::min(8, config.ssid.len())]
        );

        // 先删除可能存在的旧连接
        let _ = self.delete_connection_by_name(&connection_name).await;

        let settings = NmSettingsProxy::new(&self.connection).await?;
        let settings_path = settings
            .add_connection(self.build_ap_settings(config, &connection_name))
            .await
            .context("Failed to create AP connection")?;
        info!("Created AP connection: {:?}", settings_path);

        let nm = NetworkManagerProxy::new(&self.connection).await?;
        let active_path = nm
            .activate_connection(
                &settings_path.as_ref(),
                &device.as_ref(),
                &ObjectPath::from_static_str_unchecked("/"),
            )
            .await
            .context("Failed to activate AP connection")?;

        if let Err(e) = self.wait_for_activation(&active_path.as_ref()).await {
            // 激活失败时不留半成品连接
            let _ = self.delete_connection_by_name(&connection_name).await;
            return Err(e);
        }

        let mut active = self.active.lock().await;
        *active = ActiveHotspot {
            connection_name: Some(connection_name),
            settings_path: Some(settings_path),
            active_path: Some(active_path),
        };

        Ok(())
    }

    /// 等待连接激活 (热点模式不等待 IP 配置)
    async fn wait_for_activation(&self, active_connection: &ObjectPath<'_>) -> Result<()> {
        let start = std::time::Instant::now();
        let mut last_state = 0u32;

        loop {
            if start.elapsed() > ACTIVATION_TIMEOUT {
                anyhow::bail!(
                    "Timeout waiting for AP activation (last state: {})",
                    active_connection_state::name(last_state)
                );
            }

            let active = NmActiveConnectionProxy::builder(&self.connection)
                .path(active_connection)?
                .build()
                .await?;

            let state = active.state().await.unwrap_or(0);
            if state != last_state {
                debug!(
                    "AP connection state changed: {} -> {}",
                    active_connection_state::name(last_state),
                    active_connection_state::name(state)
                );
                last_state = state;
            }

            match state {
                active_connection_state::ACTIVATED => {
                    info!("AP connection activated");
                    return Ok(());
                }
                active_connection_state::DEACTIVATING | active_connection_state::DEACTIVATED => {
                    anyhow::bail!(
                        "AP connection failed to activate (state: {})",
                        active_connection_state::name(state)
                    );
                }
                _ => {}
            }

            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }

    /// 删除连接（通过名称）
    async fn delete_connection_by_name(&self, name: &str) -> Result<bool> {
        let settings = NmSettingsProxy::new(&self.connection).await?;
        let connections = settings.list_connections().await?;

        for conn_path in connections {
            let conn = NmConnectionProxy::builder(&self.connection)
                .path(&conn_path)?
                .build()
                .await?;

            if let Ok(conn_settings) = conn.get_settings().await
                && let Some(connection_section) = conn_settings.get("connection")
                && let Some(id_value) = connection_section.get("id")
                && let Value::Str(id_str) = id_value.deref()
                && id_str.as_str() == name
            {
                conn.delete().await?;
                debug!("Deleted connection by name: {}", name);
                return Ok(true);
            }
        }

        Ok(false)
    }
}

#[async_trait]
impl WifiDirectCapability for NmHotspot {
    async fn configure(&self, config: &AdvertisementConfig) -> Result<()> {
        // NM 的 AP 模式无条件广播，可发现性与 GO 标志只参与日志
        debug!(
            "Listen state discoverability requested: {}",
            discoverability::name(config.discoverability)
        );
        *self.config.lock().await = Some(config.clone());
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        let Some(config) = self.config.lock().await.clone() else {
            return Err(HotspotError::NotConfigured.into());
        };

        let device = match self.find_wifi_device().await {
            Ok(Some(device)) => device,
            Ok(None) => {
                warn!("WiFi device {} not found", self.interface);
                self.set_status(publisher_status::ABORTED, wifi_error::RADIO_NOT_AVAILABLE);
                return Ok(());
            }
            Err(e) => {
                warn!("NetworkManager unreachable: {:#}", e);
                self.set_status(publisher_status::ABORTED, wifi_error::RADIO_NOT_AVAILABLE);
                return Ok(());
            }
        };

        match self.activate_hotspot(&config, &device).await {
            Ok(()) => self.set_status(publisher_status::STARTED, wifi_error::SUCCESS),
            Err(e) => {
                warn!("Hotspot activation failed: {:#}", e);
                self.set_status(publisher_status::ABORTED, wifi_error::RESOURCE_IN_USE);
            }
        }

        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let hotspot = std::mem::take(&mut *self.active.lock().await);

        if let Some(path) = hotspot.active_path {
            let nm = NetworkManagerProxy::new(&self.connection).await?;
            if let Err(e) = nm.deactivate_connection(&path.as_ref()).await {
                warn!("Failed to deactivate AP connection: {}", e);
            }
        }

        if let Some(path) = hotspot.settings_path {
            let conn = NmConnectionProxy::builder(&self.connection)
                .path(&path)?
                .build()
                .await?;
            if let Err(e) = conn.delete().await {
                warn!("Failed to delete AP connection: {}", e);
            }
        } else if let Some(name) = hotspot.connection_name {
            let _ = self.delete_connection_by_name(&name).await;
        }

        if self.status.load(Ordering::SeqCst) == publisher_status::STARTED {
            self.set_status(publisher_status::STOPPED, wifi_error::SUCCESS);
        }

        Ok(())
    }

    fn add_status_changed(&self, callback: StatusCallback) -> CallbackToken {
        self.status_callbacks.lock().unwrap().register(callback)
    }

    fn remove_status_changed(&self, token: CallbackToken) -> Result<(), HotspotError> {
        self.status_callbacks.lock().unwrap().remove(token)
    }

    fn add_connection_requested(&self, callback: ConnectionCallback) -> CallbackToken {
        self.connection_callbacks.lock().unwrap().register(callback)
    }

    fn remove_connection_requested(&self, token: CallbackToken) -> Result<(), HotspotError> {
        self.connection_callbacks.lock().unwrap().remove(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 注意: 这些测试需要系统 D-Bus 和 NetworkManager 运行
    // 在 CI 环境中应该被跳过

    #[tokio::test]
    #[ignore = "requires system D-Bus and NetworkManager"]
    async fn test_nm_hotspot_new() {
        let hotspot = NmHotspot::new("wlan0").await.unwrap();
        assert_eq!(hotspot.status.load(Ordering::SeqCst), publisher_status::CREATED);
    }

    #[tokio::test]
    #[ignore = "requires system D-Bus and NetworkManager"]
    async fn test_find_wifi_device() {
        let hotspot = NmHotspot::new("wlan0").await.unwrap();
        let device = hotspot.find_wifi_device().await.unwrap();
        println!("wlan0 device path: {:?}", device);
    }
}
