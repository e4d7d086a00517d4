// rust_websocket_utils/src/client/mod.rs

//! WebSocket 客户端模块。
//!
//! `transport` 子模块负责连接远程服务器、收发 JSON 文本帧以及把底层控制帧
//! 归并为 "文本 / 错误 / 已关闭" 三种结果。重连和会话语义由上层应用负责。

pub mod transport;
