//! 广播控制器
//!
//! 持有 AP 广播配置与发布器的 start/stop 生命周期。状态回调
//! 经有界通道转送到会话主循环：硬件线程上的回调只做 try_send，
//! 永不阻塞，也不直接改共享状态。

use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::mpsc;

use crate::wifi::capability::{CallbackToken, HotspotError, StatusCallback, WifiDirectCapability};
use crate::wifi::{AdvertisementConfig, StatusChangedEvent, discoverability};

pub struct ApAdvertiser {
    radio: Arc<dyn WifiDirectCapability>,
    configured: bool,
    started: bool,
}

impl ApAdvertiser {
    pub fn new(radio: Arc<dyn WifiDirectCapability>) -> Self {
        Self {
            radio,
            configured: false,
            started: false,
        }
    }

    /// 写入广播配置。start 之后广播配置不可变，再调用是用法错误。
    pub async fn configure(&mut self, config: &AdvertisementConfig) -> anyhow::Result<()> {
        if self.started {
            return Err(HotspotError::ConfigureAfterStart.into());
        }
        self.radio.configure(config).await?;
        self.configured = true;
        debug!(
            "Advertisement configured (ssid={}, discoverability={}, autonomous_go={})",
            config.ssid,
            discoverability::name(config.discoverability),
            config.autonomous_group_owner
        );
        Ok(())
    }

    /// 注册状态变更回调，返回注销凭据
    pub fn on_status_changed(&self, callback: StatusCallback) -> CallbackToken {
        self.radio.add_status_changed(callback)
    }

    /// 注册一个经有界通道转送状态事件的回调
    ///
    /// 通道占满时丢弃事件并告警，硬件侧永不阻塞。
    pub fn subscribe_status(
        &self,
        capacity: usize,
    ) -> (CallbackToken, mpsc::Receiver<StatusChangedEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        let token = self.on_status_changed(Box::new(move |event| {
            if tx.try_send(event).is_err() {
                warn!("Status event channel is full, dropping event");
            }
        }));
        (token, rx)
    }

    /// 注销状态变更回调，同一凭据最多注销一次
    pub fn remove_status_changed(&self, token: CallbackToken) -> Result<(), HotspotError> {
        self.radio.remove_status_changed(token)
    }

    /// 开始广播
    ///
    /// 配置缺失或重复启动是用法错误，同步返回 Err；硬件级失败
    /// 以 ABORTED 状态事件送达回调。
    pub async fn start(&mut self) -> anyhow::Result<()> {
        if self.started {
            return Err(HotspotError::AlreadyStarted.into());
        }
        if !self.configured {
            return Err(HotspotError::NotConfigured.into());
        }
        self.radio.start().await?;
        self.started = true;
        Ok(())
    }

    /// 停止广播。start 从未成功过时为空操作。
    pub async fn stop(&mut self) -> anyhow::Result<()> {
        if !self.started {
            debug!("Publisher never started, nothing to stop");
            return Ok(());
        }
        self.started = false;
        self.radio.stop().await
    }
}
