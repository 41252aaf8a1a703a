//! 控制通道 websocket 服务器
//!
//! 接受循环为每个客户端 spawn 一个连接任务，任务内严格按请求
//! 顺序应答。取消信号 (全局超时或 ABORTED) 触发后不再接受新
//! 连接，在途交换在宽限期内完成后连接才关闭。

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::control::protocol;

/// 取消后允许在途连接收尾的宽限期
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub struct ControlServer {
    listener: TcpListener,
}

impl ControlServer {
    /// 绑定控制通道地址
    pub async fn bind(address: &str, port: u16) -> anyhow::Result<Self> {
        let listener = TcpListener::bind((address, port))
            .await
            .with_context(|| format!("failed to bind control server to {address}:{port}"))?;
        Ok(Self { listener })
    }

    /// 实际绑定到的地址 (bind_port 为 0 时由内核分配)
    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// 运行接受循环直到取消信号
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        info!("Control server listening on {}", self.local_addr()?);

        let mut connections = JoinSet::new();
        let mut accept_error = None;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let shutdown = shutdown.clone();
                        connections.spawn(async move {
                            if let Err(e) = handle_connection(stream, peer, shutdown).await {
                                error!("Connection {} failed: {:#}", peer, e);
                            }
                        });
                    }
                    Err(e) => {
                        accept_error =
                            Some(anyhow::Error::new(e).context("control server accept failed"));
                        break;
                    }
                },
            }
        }

        // 不再接受新连接，在途连接限期收尾
        drop(self.listener);
        let drain = async {
            while connections.join_next().await.is_some() {}
        };
        if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
            warn!("Grace period elapsed, aborting remaining connections");
            connections.shutdown().await;
        }

        match accept_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// 单连接的接收-分发-应答循环
///
/// 协议错误 (缺 command、不可解码的帧) 只关闭本连接，
/// 不影响服务器上的其他会话。
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream)
        .await
        .context("websocket handshake failed")?;
    let (mut write, mut read) = ws_stream.split();
    debug!("Client {} connected", peer);

    loop {
        let message = tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                break;
            }
            message = read.next() => message,
        };

        let payload = match message {
            Some(Ok(Message::Binary(payload))) => payload,
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
            Some(Ok(Message::Text(_))) => {
                warn!("Client {} sent a text frame, expected binary msgpack", peer);
                break;
            }
            Some(Err(e)) => {
                warn!("Client {} read error: {}", peer, e);
                break;
            }
        };

        let command = match protocol::unpack_command(&payload) {
            Ok(Some(command)) => command,
            Ok(None) => {
                warn!("Not a properly formatted command. Missing the 'command' field.");
                break;
            }
            Err(e) => {
                warn!("Client {} sent an undecodable frame: {}", peer, e);
                break;
            }
        };

        debug!("--> Received request: {}", command);
        let response = protocol::dispatch(&command);
        let packed = protocol::pack_response(&response)?;
        debug!("<-- Sending response");
        write.send(Message::Binary(packed)).await?;
    }

    debug!("Client {} disconnected", peer);
    Ok(())
}
