// portal_client/src/event.rs

//! 客户端事件定义模块。
//!
//! 表现层通过 `PortalClientHandle::subscribe` 订阅这些事件 (tokio `broadcast` 通道)。
//! 事件只是给观察者的信号，携带的数据都是快照。

use crate::cache::{CacheSection, Session};
use crate::status::StatusMessage;
use crate::ws_client::connection::ConnectionState;
use serde::Serialize;

/// 连接状态变化事件名。
pub const CONNECTION_STATE_EVENT: &str = "connection_state_v1";
/// 连接就绪 (可以发送请求) 事件名。
pub const CONNECTION_READY_EVENT: &str = "connection_ready_v1";
/// 连接丢失事件名。
pub const CONNECTION_LOST_EVENT: &str = "connection_lost_v1";
/// 状态消息事件名。
pub const STATUS_EVENT: &str = "status_message_v1";
/// 会话建立事件名。
pub const SESSION_ESTABLISHED_EVENT: &str = "session_established_v1";
/// 会话清除事件名。
pub const SESSION_CLEARED_EVENT: &str = "session_cleared_v1";
/// 本地缓存某一部分更新的事件名。
pub const CACHE_UPDATED_EVENT: &str = "cache_updated_v1";

/// 客户端向观察者发出的事件。
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum ClientEvent {
    ConnectionStateChanged { state: ConnectionState },
    /// 连接已打开，可以开始发送请求。
    ConnectionReady,
    /// 连接丢失。`reconnect_in_ms` 为本次安排的重连延迟，未安排新的重连时为 `None`。
    ConnectionLost { reason: String, reconnect_in_ms: Option<u64> },
    Status(StatusMessage),
    SessionEstablished { session: Session },
    SessionCleared,
    CacheUpdated { section: CacheSection },
}

impl ClientEvent {
    /// 事件的版本化名称。
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::ConnectionStateChanged { .. } => CONNECTION_STATE_EVENT,
            ClientEvent::ConnectionReady => CONNECTION_READY_EVENT,
            ClientEvent::ConnectionLost { .. } => CONNECTION_LOST_EVENT,
            ClientEvent::Status(_) => STATUS_EVENT,
            ClientEvent::SessionEstablished { .. } => SESSION_ESTABLISHED_EVENT,
            ClientEvent::SessionCleared => SESSION_CLEARED_EVENT,
            ClientEvent::CacheUpdated { .. } => CACHE_UPDATED_EVENT,
        }
    }
}
