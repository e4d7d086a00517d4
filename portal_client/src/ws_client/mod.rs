// portal_client/src/ws_client/mod.rs

//! WebSocket 客户端会话层。
//!
//! - `connection`: 连接生命周期状态机 (DISCONNECTED → CONNECTING → OPEN)。
//! - `dispatcher`: 动作分发与按 requestId / 发送顺序关联的待处理请求表。
//! - `router`: 按请求动作处理响应数据并更新本地缓存。
//! - `service`: 独占上述状态的后台任务及供外部使用的 `PortalClientHandle`。

pub mod connection;
pub mod dispatcher;
pub mod router;
pub mod service;

pub use connection::{ConnectionManager, ConnectionState};
pub use dispatcher::{ActionDispatcher, DispatchResult};
pub use router::ResponseRouter;
pub use service::{ClientCommand, PortalClientHandle};
