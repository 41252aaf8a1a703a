//! 会话监督器
//!
//! 按固定顺序拉起广播控制器、连接监听器与控制服务器，在全局
//! 超时内运行，并保证每条退出路径 (正常结束、超时、绑定失败、
//! ABORTED) 都执行同一套资源释放序列。

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::config::SessionConfig;
use crate::control::ControlServer;
use crate::wifi::{
    ApAdvertiser, ConnectionWatcher, WifiDirectCapability, device_kind, publisher_status,
    wifi_error,
};

/// 状态/连接事件通道容量
const EVENT_CHANNEL_CAPACITY: usize = 16;

pub struct Session {
    config: SessionConfig,
    radio: Arc<dyn WifiDirectCapability>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
}

impl Session {
    pub fn new(config: SessionConfig, radio: Arc<dyn WifiDirectCapability>) -> Self {
        Self {
            config,
            radio,
            ready_tx: None,
        }
    }

    /// 注册一次性通知，控制服务器绑定完成后送出实际地址
    /// (bind_port 为 0 时由内核分配端口)
    pub fn notify_ready(&mut self, ready: oneshot::Sender<SocketAddr>) {
        self.ready_tx = Some(ready);
    }

    /// 运行整个会话直到超时、ABORTED 或服务器失败
    pub async fn run(mut self) -> anyhow::Result<()> {
        let shutdown = CancellationToken::new();

        let mut advertiser = ApAdvertiser::new(self.radio.clone());

        // 回调必须在无线电启动之前就位
        let (status_token, mut status_rx) = advertiser.subscribe_status(EVENT_CHANNEL_CAPACITY);
        let status_task = tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                while let Some(event) = status_rx.recv().await {
                    info!(
                        "Publisher status changed to: {} / {}",
                        publisher_status::name(event.status),
                        wifi_error::name(event.error)
                    );
                    if event.status == publisher_status::ABORTED {
                        // 硬件失败等同关停信号，绝不重试
                        shutdown.cancel();
                    }
                }
            }
        });

        let watcher = ConnectionWatcher::new(self.radio.clone());
        let (connection_token, mut connection_rx) = watcher.subscribe(EVENT_CHANNEL_CAPACITY);
        let connection_task = tokio::spawn(async move {
            while let Some(event) = connection_rx.recv().await {
                info!(
                    "New connected device (name={}, id={}, kind={})",
                    event.device_name,
                    event.device_id,
                    device_kind::name(event.device_kind)
                );
            }
        });

        let result = self.serve(&shutdown, &mut advertiser).await;

        // 释放序列在每条退出路径上都执行：先停发布器，再注销回调
        if let Err(e) = advertiser.stop().await {
            error!("Failed to stop publisher: {:#}", e);
        }
        if let Err(e) = watcher.remove(connection_token) {
            error!("Failed to remove connection callback: {}", e);
        }
        if let Err(e) = advertiser.remove_status_changed(status_token) {
            error!("Failed to remove status callback: {}", e);
        }
        // 注销后事件发送端全部释放，日志任务排空通道即退出
        let _ = status_task.await;
        let _ = connection_task.await;

        result
    }

    async fn serve(
        &mut self,
        shutdown: &CancellationToken,
        advertiser: &mut ApAdvertiser,
    ) -> anyhow::Result<()> {
        advertiser.configure(&self.config.advertisement()).await?;
        advertiser.start().await?;

        let server = ControlServer::bind(&self.config.bind_address, self.config.bind_port).await?;
        if let Some(ready) = self.ready_tx.take() {
            let _ = ready.send(server.local_addr()?);
        }

        debug!(
            "Running control server for {} seconds",
            self.config.timeout_secs
        );
        let mut server_task = tokio::spawn(server.run(shutdown.clone()));

        tokio::select! {
            finished = &mut server_task => finished?,
            _ = tokio::time::sleep(Duration::from_secs(self.config.timeout_secs)) => {
                warn!("Control server is turning off because of the timeout.");
                shutdown.cancel();
                server_task.await?
            }
        }
    }
}
