//! 连接监听器
//!
//! 被动记录对端的连接请求，不做接受/拒绝决策，接入策略
//! 完全在硬件层。

use std::sync::Arc;

use log::warn;
use tokio::sync::mpsc;

use crate::wifi::ConnectionEvent;
use crate::wifi::capability::{
    CallbackToken, ConnectionCallback, HotspotError, WifiDirectCapability,
};

pub struct ConnectionWatcher {
    radio: Arc<dyn WifiDirectCapability>,
}

impl ConnectionWatcher {
    pub fn new(radio: Arc<dyn WifiDirectCapability>) -> Self {
        Self { radio }
    }

    /// 注册连接请求回调，返回注销凭据
    pub fn on_connection_requested(&self, callback: ConnectionCallback) -> CallbackToken {
        self.radio.add_connection_requested(callback)
    }

    /// 注册一个经有界通道转送连接事件的回调
    pub fn subscribe(&self, capacity: usize) -> (CallbackToken, mpsc::Receiver<ConnectionEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        let token = self.on_connection_requested(Box::new(move |event| {
            if tx.try_send(event).is_err() {
                warn!("Connection event channel is full, dropping event");
            }
        }));
        (token, rx)
    }

    /// 注销连接请求回调，同一凭据最多注销一次
    pub fn remove(&self, token: CallbackToken) -> Result<(), HotspotError> {
        self.radio.remove_connection_requested(token)
    }
}
