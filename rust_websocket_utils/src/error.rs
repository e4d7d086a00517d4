// rust_websocket_utils/src/error.rs

//! 定义 WebSocket 工具库相关的错误类型。

use thiserror::Error;

/// WebSocket 工具库的统一错误类型。
#[derive(Error, Debug)]
pub enum WsError {
    /// 当 serde 序列化失败时返回。
    #[error("序列化错误: {0}")]
    SerializationError(String),

    /// 当 serde 反序列化失败时返回。包含具体的错误信息和原始文本。
    #[error("反序列化错误: {0}")]
    DeserializationError(String),

    /// WebSocket 协议相关的错误，例如握手失败、连接被重置等。
    #[error("WebSocket协议错误: {0}")]
    WebSocketProtocolError(#[from] tokio_tungstenite::tungstenite::Error),

    /// 底层 I/O 错误，例如 TCP 监听器绑定失败。
    #[error("I/O错误: {0}")]
    IoError(#[from] std::io::Error),

    /// 当尝试向一个已关闭的连接发送消息时发生。
    #[error("发送错误: 连接已关闭")]
    SendErrorClosed,

    /// 无效的 URL 格式或不支持的协议。
    #[error("无效的URL: {0}")]
    InvalidUrl(String),

    /// 收到了不符合约定的帧 (例如二进制帧)。此类错误不会终止连接。
    #[error("消息错误: {0}")]
    Message(String),
}

impl WsError {
    /// 判断该错误是否意味着底层连接已不可用。
    ///
    /// 序列化、反序列化和非预期帧错误只影响单条消息；
    /// 协议、I/O 和发送错误意味着连接需要重建。
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WsError::WebSocketProtocolError(_) | WsError::IoError(_) | WsError::SendErrorClosed
        )
    }
}
