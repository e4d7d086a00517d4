// portal_client/src/error.rs

//! 客户端会话层的错误类型。
//!
//! 所有可检测的失败都只终止当前这一次请求 (不重试)，并以一条会自动隐藏的
//! 状态消息呈现给用户。只有传输丢失会影响整个会话，而它会被自动恢复。

use rust_websocket_utils::error::WsError;
use thiserror::Error;

/// 客户端会话层的统一错误类型。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// 连接不处于 OPEN 状态时尝试发送请求。请求不会被排队或重试。
    #[error("未连接到服务器")]
    NotConnected,

    /// 请求发出后、响应到达前传输层断开。
    #[error("连接已断开: {0}")]
    TransportLost(String),

    /// 响应不是合法 JSON、不符合响应信封结构，或 `data` 与动作预期的形状不符。
    #[error("响应格式错误: {0}")]
    MalformedResponse(String),

    /// 后端返回 `success: false`，内容为后端给出的原始消息。
    #[error("{0}")]
    ApplicationFailure(String),

    /// 需要学生会话的操作在未登录时被调用。
    #[error("请先登录")]
    NoActiveSession,

    /// 请求载荷无法构建 (例如包含嵌套值)。
    #[error("无效的请求载荷: {0}")]
    InvalidPayload(String),

    /// 已有一次重连尝试被安排，不允许再手动发起。
    #[error("已安排重连，请稍候")]
    ReconnectAlreadyScheduled,

    /// 连接正在建立或已打开，无需重连。
    #[error("连接正在建立或已打开")]
    AlreadyConnected,

    /// 客户端后台任务已经停止。
    #[error("客户端服务已停止")]
    ServiceStopped,

    /// 配置无效或无法加载。
    #[error("配置错误: {0}")]
    Config(String),
}

impl From<common_models::PayloadError> for ClientError {
    fn from(err: common_models::PayloadError) -> Self {
        ClientError::InvalidPayload(err.to_string())
    }
}

impl From<WsError> for ClientError {
    fn from(err: WsError) -> Self {
        match err {
            WsError::DeserializationError(details) => ClientError::MalformedResponse(details),
            WsError::SerializationError(details) => ClientError::InvalidPayload(details),
            other => ClientError::TransportLost(other.to_string()),
        }
    }
}
