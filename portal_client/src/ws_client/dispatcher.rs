// portal_client/src/ws_client/dispatcher.rs

//! 动作分发器与待处理请求表。
//!
//! 每个请求都带有一个 UUID `requestId`，并按发送顺序记录在待处理表中。
//! 响应到达时：
//! - 响应回显了 `requestId` 时按 ID 匹配；
//! - 否则按位置匹配最早的待处理请求 (后端按发送顺序逐一应答)。
//!
//! 因此允许同时存在多个未完成的请求，响应不会被错配给其他动作。
//!
//! 无法解码的帧没有可用的 ID。后端不回显 ID 时，它只能是最早请求的响应，
//! 于是该请求以 `MalformedResponse` 结束，后续响应继续按位置正确匹配。

use crate::error::ClientError;
use crate::ws_client::connection::ConnectionState;
use chrono::{DateTime, Utc};
use common_models::{ActionName, Payload, RequestEnvelope, ResponseEnvelope};
use log::{debug, warn};
use rust_websocket_utils::message::encode_frame;
use std::collections::VecDeque;
use tokio::sync::oneshot;
use uuid::Uuid;

/// 一次分发的结果：成功时为后端的响应信封。
pub type DispatchResult = Result<ResponseEnvelope, ClientError>;

/// 等待结果的调用方。
pub type ReplySender = oneshot::Sender<DispatchResult>;

/// 已编码、等待发送的请求。
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub request_id: Uuid,
    pub envelope: RequestEnvelope,
    pub frame: String,
}

/// 已发送、等待响应的请求。
#[derive(Debug)]
pub struct PendingRequest {
    pub request_id: Uuid,
    pub action: ActionName,
    /// 请求载荷，路由器在处理响应时需要它 (例如查询的是哪个学生)。
    pub data: Payload,
    pub sent_at: DateTime<Utc>,
    reply: Option<ReplySender>,
}

impl PendingRequest {
    /// 从发送到现在经过的毫秒数。
    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.sent_at).num_milliseconds()
    }

    /// 把结果交给等待者。等待者已放弃时只记录日志。
    pub fn complete(self, result: DispatchResult) {
        if let Some(reply) = self.reply {
            if reply.send(result).is_err() {
                debug!("[ActionDispatcher] 请求 {} ({}) 的等待者已放弃。", self.request_id, self.action);
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ActionDispatcher {
    pending: VecDeque<PendingRequest>,
    /// 最近一条可解码的响应是否回显了 `requestId`。
    echoes_request_id: bool,
}

impl ActionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 构建请求信封并编码为文本帧。连接不处于 OPEN 时立即失败，不做任何记录。
    pub fn prepare(&self, state: ConnectionState, action: ActionName, data: Payload) -> Result<PreparedRequest, ClientError> {
        if state != ConnectionState::Open {
            return Err(ClientError::NotConnected);
        }
        let request_id = Uuid::new_v4();
        let envelope = RequestEnvelope::new(action, data).with_request_id(request_id.to_string());
        let frame = encode_frame(&envelope)?;
        Ok(PreparedRequest { request_id, envelope, frame })
    }

    /// 请求帧发送成功后记录待处理条目。
    pub fn record(&mut self, prepared: PreparedRequest, reply: Option<ReplySender>) {
        debug!(
            "[ActionDispatcher] 记录待处理请求 {} ({})，当前待处理数: {}",
            prepared.request_id,
            prepared.envelope.action,
            self.pending.len() + 1
        );
        self.pending.push_back(PendingRequest {
            request_id: prepared.request_id,
            action: prepared.envelope.action,
            data: prepared.envelope.data,
            sent_at: Utc::now(),
            reply,
        });
    }

    /// 为一条响应找到对应的待处理请求并将其移出表。
    ///
    /// 带 ID 的响应只按 ID 匹配，找不到时返回 `None`；不带 ID 的响应匹配最早的请求。
    pub fn resolve(&mut self, response_request_id: Option<&str>) -> Option<PendingRequest> {
        self.echoes_request_id = response_request_id.is_some();
        match response_request_id {
            Some(id) => {
                let position = self.pending.iter().position(|p| p.request_id.to_string() == id);
                if position.is_none() {
                    warn!("[ActionDispatcher] 响应携带的 requestId '{}' 没有对应的待处理请求。", id);
                }
                position.and_then(|index| self.pending.remove(index))
            }
            None => self.pending.pop_front(),
        }
    }

    /// 为一个无法解码的帧找到它所属的待处理请求。
    ///
    /// 后端回显 ID 时无法归属，返回 `None` 且表保持不变；否则取出最早的请求。
    pub fn resolve_undecodable(&mut self) -> Option<PendingRequest> {
        if self.echoes_request_id {
            return None;
        }
        self.pending.pop_front()
    }

    pub fn echoes_request_id(&self) -> bool {
        self.echoes_request_id
    }

    /// 下一条按位置匹配的响应预期对应的动作。
    pub fn expected_action(&self) -> Option<ActionName> {
        self.pending.front().map(|p| p.action)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// 使所有待处理请求以给定错误失败，返回失败的数量。
    pub fn fail_all(&mut self, error: ClientError) -> usize {
        let count = self.pending.len();
        for pending in self.pending.drain(..) {
            pending.complete(Err(error.clone()));
        }
        if count > 0 {
            warn!("[ActionDispatcher] {} 个待处理请求以错误结束: {}", count, error);
        }
        count
    }
}
