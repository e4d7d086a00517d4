// portal_client/src/roles/mod.rs

//! 两种客户端角色的门面。两者共享同一个 `PortalClientHandle`，只在动作和前置检查上不同。

pub mod admin;
pub mod student;

pub use admin::AdminConsole;
pub use student::StudentPortal;
