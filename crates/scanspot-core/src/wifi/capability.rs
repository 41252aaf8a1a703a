//! 无线电能力接口
//!
//! 核心只依赖这里定义的操作面：configure/start/stop 与状态、
//! 连接两类回调的注册/注销。真实硬件 (nm) 与模拟 (mock) 后端
//! 实现同一 trait，会话层可以整体替换。

use std::collections::HashMap;

use async_trait::async_trait;

use crate::wifi::{AdvertisementConfig, ConnectionEvent, StatusChangedEvent};

/// 回调注册凭据，注销时交回
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackToken(u64);

/// 热点生命周期错误
#[derive(Debug, thiserror::Error)]
pub enum HotspotError {
    #[error("publisher already started")]
    AlreadyStarted,

    #[error("advertisement is immutable after start")]
    ConfigureAfterStart,

    #[error("publisher was never configured")]
    NotConfigured,

    #[error("callback token {0} is not registered")]
    UnknownToken(u64),
}

pub type StatusCallback = Box<dyn Fn(StatusChangedEvent) + Send + Sync>;
pub type ConnectionCallback = Box<dyn Fn(ConnectionEvent) + Send + Sync>;

/// 无线电能力操作面
///
/// 回调在硬件事件源的线程上执行，必须保持短小且不阻塞。
/// start 的硬件级失败不从返回值抛出，而是以 ABORTED 状态事件
/// 送达已注册的回调，这是原生广播 API 的行为。
#[async_trait]
pub trait WifiDirectCapability: Send + Sync {
    /// 写入广播配置，必须在 start 之前调用
    async fn configure(&self, config: &AdvertisementConfig) -> anyhow::Result<()>;

    /// 开始广播
    async fn start(&self) -> anyhow::Result<()>;

    /// 停止广播，未在广播时为空操作
    async fn stop(&self) -> anyhow::Result<()>;

    /// 注册状态变更回调
    fn add_status_changed(&self, callback: StatusCallback) -> CallbackToken;

    /// 注销状态变更回调，同一凭据最多注销一次
    fn remove_status_changed(&self, token: CallbackToken) -> Result<(), HotspotError>;

    /// 注册对端连接请求回调
    fn add_connection_requested(&self, callback: ConnectionCallback) -> CallbackToken;

    /// 注销对端连接请求回调，同一凭据最多注销一次
    fn remove_connection_requested(&self, token: CallbackToken) -> Result<(), HotspotError>;
}

/// 回调注册表，后端内部复用
///
/// remove 对同一凭据最多成功一次，重复注销返回 UnknownToken
/// 而不是静默成功。
pub(crate) struct CallbackRegistry<E> {
    next_token: u64,
    callbacks: HashMap<u64, Box<dyn Fn(E) + Send + Sync>>,
}

impl<E: Clone> CallbackRegistry<E> {
    pub fn new() -> Self {
        Self {
            next_token: 0,
            callbacks: HashMap::new(),
        }
    }

    pub fn register(&mut self, callback: Box<dyn Fn(E) + Send + Sync>) -> CallbackToken {
        let token = self.next_token;
        self.next_token += 1;
        self.callbacks.insert(token, callback);
        CallbackToken(token)
    }

    pub fn remove(&mut self, token: CallbackToken) -> Result<(), HotspotError> {
        self.callbacks
            .remove(&token.0)
            .map(|_| ())
            .ok_or(HotspotError::UnknownToken(token.0))
    }

    pub fn dispatch(&self, event: &E) {
        for callback in self.callbacks.values() {
            callback(event.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}
