//! `rust_websocket_utils` 提供 WebSocket 通信的实用功能。
//!
//! 主要模块包括：
//! - `message`: 文本帧 JSON 编解码 (`encode_frame` / `decode_frame`)。
//! - `error`: 库的统一错误类型 `WsError`。
//! - `client`: 客户端传输层 (连接、发送、接收)。
//! - `server`: 服务端传输层 (监听、握手、按连接回调)。

pub mod client;
pub mod error;
pub mod message;
pub mod server;

pub use error::WsError;
