//! `portal_client`: 模块注册门户的客户端会话层。
//!
//! 把一条持久的 WebSocket 连接变成可自动重连的 "动作请求 / 响应" 通道，
//! 并维护一份与该通道保持一致的本地状态缓存 (会话、学生、模块、注册集合)。
//!
//! 学生门户 (`roles::StudentPortal`) 和管理控制台 (`roles::AdminConsole`)
//! 都是同一个核心 (`ws_client`) 之上的薄封装。

pub mod cache;
pub mod config;
pub mod error;
pub mod event;
pub mod roles;
pub mod status;
pub mod ws_client;

pub use cache::{LocalStateCache, Session};
pub use config::ClientConfig;
pub use error::ClientError;
pub use event::ClientEvent;
pub use roles::{AdminConsole, StudentPortal};
pub use ws_client::{ConnectionState, PortalClientHandle};
