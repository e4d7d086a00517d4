//! `common_models` 公共模型库 crate。
//!
//! 本 crate 集中定义了模块注册门户中客户端会话层与后端之间共享的数据结构：
//! - **消息信封 (`envelope`)**: 请求信封 `RequestEnvelope`、响应信封 `ResponseEnvelope` 以及载荷映射 `Payload`。
//! - **实体 (`entities`)**: 后端拥有的 `Student` 与 `Module`，客户端只持有其只读副本。
//! - **请求载荷 (`ws_payloads`)**: 每个动作对应的强类型载荷结构体。
//! - **通用枚举 (`enums`)**: 动作名称 `ActionName`、会话角色、状态严重级别。
//!
//! 所有模型都派生 `serde::Serialize` / `serde::Deserialize` 以及 `Debug` / `Clone`，
//! 字段在线上统一使用 camelCase 命名。

pub mod entities;
pub mod enums;
pub mod envelope;
pub mod ws_payloads;

pub use entities::{Module, ModuleCode, Student};
pub use enums::{ActionName, SessionRole, StatusSeverity};
pub use envelope::{Payload, PayloadError, RequestEnvelope, ResponseEnvelope, payload_from};
