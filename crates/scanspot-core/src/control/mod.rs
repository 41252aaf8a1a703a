//! 控制通道
//!
//! websocket 上的命令/响应协议：二进制帧内是 msgpack 字符串键
//! 映射，严格一问一答，无批量、无服务端主动推送。

pub mod protocol;
pub mod server;

pub use protocol::{Response, commands};
pub use server::ControlServer;
