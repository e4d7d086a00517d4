//! 通用枚举模块。
//!
//! 本模块定义了客户端与后端之间共享的枚举类型：动作名称 (`ActionName`)、
//! 会话角色 (`SessionRole`) 以及状态提示的严重级别 (`StatusSeverity`)。
//!
//! 所有枚举都派生 `Serialize`, `Deserialize`, `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`，
//! 以支持数据交换、调试、比较和集合操作。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 请求信封中 `action` 字段允许的全部动作名称。
///
/// 线上格式为大小写敏感的 `SCREAMING_SNAKE_CASE` 字符串，例如 `"STUDENT_LOGIN"`。
/// 集合是固定的，后端不认识的动作会以 `success: false` 应答。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionName {
    /// 管理端：新增学生。
    AddStudent,
    /// 管理端：修改学生信息 (仅修改非空字段)。
    EditStudent,
    /// 管理端：查看单个学生详情。
    ViewStudent,
    /// 管理端：列出全部学生。
    ListStudents,
    /// 管理端：新增课程模块。
    AddModule,
    /// 管理端：修改课程模块 (仅修改非空字段)。
    EditModule,
    /// 管理端：查看单个课程模块详情。
    ViewModule,
    /// 管理端：列出全部课程模块。
    ListModules,
    /// 学生端：登录。
    StudentLogin,
    /// 学生端：查看可选课程模块目录。
    ViewModules,
    /// 学生端：查看当前学生已注册的课程模块。
    ViewRegisteredModules,
    /// 学生端：注册一个课程模块。
    RegisterModule,
}

impl ActionName {
    /// 按线上定义顺序列出的全部动作。
    pub const ALL: [ActionName; 12] = [
        ActionName::AddStudent,
        ActionName::EditStudent,
        ActionName::ViewStudent,
        ActionName::ListStudents,
        ActionName::AddModule,
        ActionName::EditModule,
        ActionName::ViewModule,
        ActionName::ListModules,
        ActionName::StudentLogin,
        ActionName::ViewModules,
        ActionName::ViewRegisteredModules,
        ActionName::RegisterModule,
    ];

    /// 返回线上使用的动作字符串。
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionName::AddStudent => "ADD_STUDENT",
            ActionName::EditStudent => "EDIT_STUDENT",
            ActionName::ViewStudent => "VIEW_STUDENT",
            ActionName::ListStudents => "LIST_STUDENTS",
            ActionName::AddModule => "ADD_MODULE",
            ActionName::EditModule => "EDIT_MODULE",
            ActionName::ViewModule => "VIEW_MODULE",
            ActionName::ListModules => "LIST_MODULES",
            ActionName::StudentLogin => "STUDENT_LOGIN",
            ActionName::ViewModules => "VIEW_MODULES",
            ActionName::ViewRegisteredModules => "VIEW_REGISTERED_MODULES",
            ActionName::RegisterModule => "REGISTER_MODULE",
        }
    }

    /// 该动作是否属于学生端 (其余属于管理端)。
    pub fn is_student_action(&self) -> bool {
        matches!(
            self,
            ActionName::StudentLogin
                | ActionName::ViewModules
                | ActionName::ViewRegisteredModules
                | ActionName::RegisterModule
        )
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 解析未知动作字符串时返回的错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("未知的动作名称: '{0}'")]
pub struct UnknownActionError(pub String);

impl FromStr for ActionName {
    type Err = UnknownActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionName::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| UnknownActionError(s.to_string()))
    }
}

/// 当前会话中已认证参与者的角色。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SessionRole {
    /// 管理员 (管理端控制台)。
    Admin,
    /// 学生 (学生门户，需通过 `STUDENT_LOGIN` 建立)。
    Student,
}

impl fmt::Display for SessionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// 状态提示的严重级别，对应展示层状态横幅的样式。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StatusSeverity {
    /// 一般提示，例如 "正在发送请求..."。
    Info,
    /// 成功提示，通常直接显示后端返回的 message。
    Success,
    /// 错误提示，例如未连接、后端失败、解析失败。
    Error,
}
