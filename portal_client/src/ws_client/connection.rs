// portal_client/src/ws_client/connection.rs

//! 连接生命周期状态机。
//!
//! 状态转换表 (没有终止状态，永远循环)：
//!
//! | 当前状态 | 事件 | 新状态 | 副作用 |
//! |---|---|---|---|
//! | DISCONNECTED | 开始连接 | CONNECTING | 清除已安排的重连 |
//! | CONNECTING | 握手成功 | OPEN | 发出 "就绪" 信号 |
//! | CONNECTING / OPEN | 关闭或错误 | DISCONNECTED | 发出 "丢失" 信号，安排一次重连 |
//!
//! 管理器不做任何 I/O，也不持有业务数据，只记录状态和下一次重连的截止时间。

use crate::error::ClientError;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// 连接状态。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
}

#[derive(Debug)]
pub struct ConnectionManager {
    state: ConnectionState,
    reconnect_delay: Duration,
    reconnect_at: Option<Instant>,
    connect_attempts: u64,
}

impl ConnectionManager {
    pub fn new(reconnect_delay: Duration) -> Self {
        Self { state: ConnectionState::Disconnected, reconnect_delay, reconnect_at: None, connect_attempts: 0 }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    /// 已安排的重连截止时间。
    pub fn reconnect_deadline(&self) -> Option<Instant> {
        self.reconnect_at
    }

    /// 已开始的连接尝试次数 (包括首次连接)。
    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts
    }

    /// DISCONNECTED → CONNECTING。
    pub fn begin_connect(&mut self) -> Result<(), ClientError> {
        if self.state != ConnectionState::Disconnected {
            return Err(ClientError::AlreadyConnected);
        }
        self.reconnect_at = None;
        self.connect_attempts += 1;
        self.state = ConnectionState::Connecting;
        info!("[ConnectionManager] DISCONNECTED -> CONNECTING (第 {} 次尝试)", self.connect_attempts);
        Ok(())
    }

    /// CONNECTING → OPEN。
    pub fn mark_open(&mut self) {
        info!("[ConnectionManager] {:?} -> OPEN", self.state);
        self.state = ConnectionState::Open;
    }

    /// 传输层关闭或出错：→ DISCONNECTED，并在没有已安排的重连时安排恰好一次。
    ///
    /// 返回新安排的重连截止时间；已有安排时返回 `None`，不会叠加。
    pub fn mark_lost(&mut self, now: Instant) -> Option<Instant> {
        if self.state != ConnectionState::Disconnected {
            info!("[ConnectionManager] {:?} -> DISCONNECTED", self.state);
        }
        self.state = ConnectionState::Disconnected;
        if self.reconnect_at.is_some() {
            debug!("[ConnectionManager] 已有重连被安排，本次丢失不再安排新的重连。");
            return None;
        }
        let deadline = now + self.reconnect_delay;
        self.reconnect_at = Some(deadline);
        debug!("[ConnectionManager] 已安排在 {:?} 后重连。", self.reconnect_delay);
        Some(deadline)
    }

    /// 手动重连请求被拒绝的原因。
    ///
    /// 每次丢失都会安排重连，DISCONNECTED 期间总有一次尝试在等待或即将开始，
    /// 所以手动重连从不被接受。
    pub fn manual_reconnect_rejection(&self) -> ClientError {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Open => ClientError::AlreadyConnected,
            ConnectionState::Disconnected => ClientError::ReconnectAlreadyScheduled,
        }
    }
}
