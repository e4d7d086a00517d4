// common_models/src/ws_payloads.rs

//! 各动作请求载荷的强类型定义。
//!
//! 这些结构体通过 `envelope::payload_from` 转换为扁平的 `Payload` 映射后放入请求信封。
//! 修改类载荷 (`StudentUpdate`, `ModuleUpdate`) 中为 `None` 的字段不会被序列化，
//! 后端只修改出现的非空字段。

use serde::{Deserialize, Serialize};

/// `STUDENT_LOGIN` 的载荷。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentLoginPayload {
    pub student_id: String,
    pub password: String,
}

/// `ADD_STUDENT` 的载荷。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentForm {
    pub student_id: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

/// `EDIT_STUDENT` 的载荷。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StudentUpdate {
    pub student_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// `ADD_MODULE` 的载荷。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleForm {
    pub module_code: String,
    pub module_name: String,
    pub description: String,
    pub credits: u32,
}

/// `EDIT_MODULE` 的载荷。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ModuleUpdate {
    pub module_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<u32>,
}

/// 以学号定位学生的载荷 (`VIEW_STUDENT`, `VIEW_REGISTERED_MODULES`)。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentKey {
    pub student_id: String,
}

/// 以模块代码定位课程模块的载荷 (`VIEW_MODULE`)。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleKey {
    pub module_code: String,
}

/// `REGISTER_MODULE` 的载荷。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPayload {
    pub student_id: String,
    pub module_code: String,
}
