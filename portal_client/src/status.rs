// portal_client/src/status.rs

//! 状态消息板。
//!
//! 表现层通过 `(文本, 严重级别)` 接收状态消息。每条消息在固定时间后自动隐藏；
//! 自动隐藏只影响显示，不影响任何协议状态。

use chrono::{DateTime, Utc};
use common_models::StatusSeverity;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// 一条状态消息。
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    pub text: String,
    pub severity: StatusSeverity,
    pub issued_at: DateTime<Utc>,
    pub auto_hide_after_ms: u64,
}

/// 保存当前显示的状态消息。新消息替换旧消息。
#[derive(Debug)]
pub struct StatusBoard {
    auto_hide: Duration,
    current: Option<(StatusMessage, Instant)>,
}

impl StatusBoard {
    pub fn new(auto_hide: Duration) -> Self {
        Self { auto_hide, current: None }
    }

    /// 显示一条新消息并返回它。
    pub fn show(&mut self, text: impl Into<String>, severity: StatusSeverity, now: Instant) -> StatusMessage {
        let message = StatusMessage {
            text: text.into(),
            severity,
            issued_at: Utc::now(),
            auto_hide_after_ms: self.auto_hide.as_millis() as u64,
        };
        self.current = Some((message.clone(), now));
        message
    }

    /// 返回 `now` 时刻仍可见的消息。
    pub fn visible_at(&self, now: Instant) -> Option<&StatusMessage> {
        match &self.current {
            Some((message, shown_at)) if now.saturating_duration_since(*shown_at) < self.auto_hide => Some(message),
            _ => None,
        }
    }

    pub fn visible(&self) -> Option<&StatusMessage> {
        self.visible_at(Instant::now())
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}
