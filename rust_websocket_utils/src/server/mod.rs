// rust_websocket_utils/src/server/mod.rs

//! WebSocket 服务端模块。
//!
//! 提供监听、握手和按连接派发回调的传输层 (`transport`)。在本工作区中它主要
//! 被用作测试里的进程内模拟后端。

pub mod transport;
