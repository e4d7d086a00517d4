// common_models/src/envelope.rs

//! 定义客户端与后端之间交换的消息信封 (请求与响应)。
//!
//! 每个 WebSocket 文本帧恰好承载一个 JSON 信封：
//! - 请求: `{ "action": ActionName, "data": { 字段: 基本类型值 }, "requestId"?: string }`
//! - 响应: `{ "success": bool, "message": string, "data"?: any, "requestId"?: string }`
//!
//! 响应的 `data` 没有按动作打标签，其形状由产生它的请求决定。
//! `requestId` 是附加字段：后端若回显它，客户端按 ID 关联；否则按发送顺序关联。

use crate::enums::ActionName;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// 请求载荷：字段名到基本类型值 (字符串、数字、布尔、null) 的映射。
pub type Payload = Map<String, Value>;

/// 构建请求载荷时可能出现的错误。
#[derive(Error, Debug)]
pub enum PayloadError {
    /// 载荷结构体无法序列化为 JSON。
    #[error("载荷序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 载荷序列化后不是 JSON 对象。
    #[error("载荷必须是 JSON 对象")]
    NotAnObject,

    /// 载荷字段包含嵌套的对象或数组。
    #[error("载荷字段 '{0}' 不是基本类型值")]
    NestedValue(String),
}

/// 将任意可序列化的载荷结构体转换为 `Payload`。
///
/// 只接受序列化为扁平 JSON 对象的值，任何嵌套对象或数组字段都会被拒绝。
pub fn payload_from<T: Serialize>(value: &T) -> Result<Payload, PayloadError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => {
            if let Some((key, _)) = map.iter().find(|(_, v)| v.is_object() || v.is_array()) {
                return Err(PayloadError::NestedValue(key.clone()));
            }
            Ok(map)
        }
        _ => Err(PayloadError::NotAnObject),
    }
}

/// 请求信封。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    /// 要在后端执行的动作。
    pub action: ActionName,
    /// 动作相关的载荷，空载荷序列化为 `{}`。
    #[serde(default)]
    pub data: Payload,
    /// 客户端生成的请求标识符。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl RequestEnvelope {
    pub fn new(action: ActionName, data: Payload) -> Self {
        Self { action, data, request_id: None }
    }

    /// 附加请求标识符。
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// 响应信封。
///
/// `success` 与 `message` 为必填字段，缺失任一字段的 JSON 不是合法响应。
/// `data` 缺失或为 `null` 时均解析为 `None`。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ResponseEnvelope {
    /// 构造一个成功响应。
    pub fn ok(message: impl Into<String>, data: Option<Value>) -> Self {
        Self { success: true, message: message.into(), data, request_id: None }
    }

    /// 构造一个失败响应 (不携带数据)。
    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), data: None, request_id: None }
    }

    /// 附加 (回显) 请求标识符。
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// 将 `data` 解释为类型 `T`。`data` 缺失时按 JSON `null` 解释。
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match &self.data {
            Some(value) => T::deserialize(value),
            None => T::deserialize(&Value::Null),
        }
    }
}
