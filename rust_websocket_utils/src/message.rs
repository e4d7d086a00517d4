// rust_websocket_utils/src/message.rs

//! 文本帧 JSON 编解码。
//!
//! 约定每个 WebSocket 文本帧恰好承载一个 JSON 文档。本模块只负责
//! "值 <-> 文本" 的转换，具体的信封结构由调用方 (例如 `common_models`) 决定。

use crate::error::WsError;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// 错误信息中原始文本的最大展示长度 (字符数)。
const MAX_ECHOED_TEXT_CHARS: usize = 200;

/// 将一个可序列化的值编码为单个文本帧的内容。
pub fn encode_frame<T: Serialize>(value: &T) -> Result<String, WsError> {
    serde_json::to_string(value)
        .map_err(|e| WsError::SerializationError(format!("编码文本帧失败: {}", e)))
}

/// 将单个文本帧的内容解码为目标类型 `T`。
///
/// 非法 JSON 或结构与 `T` 不匹配时返回 `WsError::DeserializationError`，
/// 错误信息中附带 (截断后的) 原始文本，便于排查。
pub fn decode_frame<T: DeserializeOwned>(text: &str) -> Result<T, WsError> {
    serde_json::from_str(text).map_err(|e| {
        WsError::DeserializationError(format!(
            "文本帧解码失败: {}, 原始文本: '{}'",
            e,
            truncate_for_log(text)
        ))
    })
}

/// 截断过长的文本，避免日志和错误信息被超大帧淹没。
pub fn truncate_for_log(text: &str) -> String {
    if text.chars().count() <= MAX_ECHOED_TEXT_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX_ECHOED_TEXT_CHARS).collect();
        format!("{}...", head)
    }
}
