//! 无线电模拟后端
//!
//! 在测试和没有无线硬件的环境里替代真实无线子系统：
//! 可脚本化 start 失败、注入对端连接事件、统计调用次数。

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::wifi::capability::{
    CallbackRegistry, CallbackToken, ConnectionCallback, HotspotError, StatusCallback,
    WifiDirectCapability,
};
use crate::wifi::{
    AdvertisementConfig, ConnectionEvent, StatusChangedEvent, publisher_status, wifi_error,
};

pub struct MockRadio {
    config: Mutex<Option<AdvertisementConfig>>,
    status: AtomicU32,
    fail_start_with: Mutex<Option<u32>>,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    status_callbacks: Mutex<CallbackRegistry<StatusChangedEvent>>,
    connection_callbacks: Mutex<CallbackRegistry<ConnectionEvent>>,
}

impl Default for MockRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRadio {
    pub fn new() -> Self {
        Self {
            config: Mutex::new(None),
            status: AtomicU32::new(publisher_status::CREATED),
            fail_start_with: Mutex::new(None),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            status_callbacks: Mutex::new(CallbackRegistry::new()),
            connection_callbacks: Mutex::new(CallbackRegistry::new()),
        }
    }

    /// 让下一次 start 以给定错误码进入 ABORTED
    pub fn fail_start_with(self, error: u32) -> Self {
        *self.fail_start_with.lock().unwrap() = Some(error);
        self
    }

    /// 当前发布器状态原始码
    pub fn status(&self) -> u32 {
        self.status.load(Ordering::SeqCst)
    }

    /// 最近写入的广播配置
    pub fn config(&self) -> Option<AdvertisementConfig> {
        self.config.lock().unwrap().clone()
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    /// 是否还有未注销的回调
    pub fn has_callbacks(&self) -> bool {
        !self.status_callbacks.lock().unwrap().is_empty()
            || !self.connection_callbacks.lock().unwrap().is_empty()
    }

    /// 模拟硬件送入一个对端连接请求
    pub fn push_connection(&self, event: ConnectionEvent) {
        self.connection_callbacks.lock().unwrap().dispatch(&event);
    }

    fn set_status(&self, status: u32, error: u32) {
        self.status.store(status, Ordering::SeqCst);
        let event = StatusChangedEvent { status, error };
        self.status_callbacks.lock().unwrap().dispatch(&event);
    }
}

#[async_trait]
impl WifiDirectCapability for MockRadio {
    async fn configure(&self, config: &AdvertisementConfig) -> anyhow::Result<()> {
        *self.config.lock().unwrap() = Some(config.clone());
        Ok(())
    }

    async fn start(&self) -> anyhow::Result<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_start_with.lock().unwrap().take() {
            Some(error) => self.set_status(publisher_status::ABORTED, error),
            None => self.set_status(publisher_status::STARTED, wifi_error::SUCCESS),
        }
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        // 只有正在广播的发布器才迁移到 STOPPED，ABORTED 是终态
        if self.status() == publisher_status::STARTED {
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
