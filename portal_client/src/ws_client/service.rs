// portal_client/src/ws_client/service.rs

//! 门户客户端的 WebSocket 服务。
//!
//! 所有协议状态 (连接状态机、待处理请求表、缓存写入) 都由一个后台 tokio 任务独占。
//! 调用方通过 `PortalClientHandle` 与它交互：
//! - 命令经 `mpsc` 通道送达，每次分发附带一个 `oneshot` 回复通道；
//! - 连接状态经 `watch` 通道发布；
//! - 事件经 `broadcast` 通道发布；
//! - 缓存和状态板通过 `Arc<RwLock<_>>` 供读取。
//!
//! 主循环分三个阶段：连接、会话 (收发消息)、等待重连。除了固定的重连延迟外没有任何超时。

use crate::cache::{CacheSection, LocalStateCache, Session};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::event::ClientEvent;
use crate::status::{StatusBoard, StatusMessage};
use crate::ws_client::connection::{ConnectionManager, ConnectionState};
use crate::ws_client::dispatcher::{ActionDispatcher, DispatchResult, ReplySender};
use crate::ws_client::router::{decode_response, ResponseRouter, PARSE_ERROR_STATUS};
use common_models::{payload_from, ActionName, Payload, SessionRole, StatusSeverity};
use log::{debug, error, info, warn};
use rust_websocket_utils::client::transport::{self, ClientConnection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex as TokioMutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub const STATUS_SENDING: &str = "正在发送请求...";
pub const STATUS_CONNECTED: &str = "已连接到服务器";
pub const STATUS_RECONNECTING: &str = "与服务器的连接已断开，正在重连...";
pub const STATUS_CONNECTION_ERROR: &str = "连接服务器失败，稍后重试";
pub const STATUS_NOT_CONNECTED: &str = "未连接到服务器";
pub const STATUS_LOGGED_OUT: &str = "已成功退出登录";

/// 发送给后台任务的命令。
#[derive(Debug)]
pub enum ClientCommand {
    Dispatch { action: ActionName, data: Payload, reply: ReplySender },
    Reconnect { reply: oneshot::Sender<Result<(), ClientError>> },
    Logout { reply: oneshot::Sender<Result<(), ClientError>> },
    AssumeAdmin { reply: oneshot::Sender<Result<(), ClientError>> },
    Shutdown,
}

// 会话阶段结束的原因。
enum SessionEnd {
    Lost(String),
    Shutdown,
}

// 等待重连阶段结束的原因。
enum WaitEnd {
    Reconnect,
    Shutdown,
}

/// 客户端句柄，可廉价克隆并在多个任务间共享。
#[derive(Clone)]
pub struct PortalClientHandle {
    command_tx: mpsc::Sender<ClientCommand>,
    state_rx: watch::Receiver<ConnectionState>,
    event_tx: broadcast::Sender<ClientEvent>,
    cache: Arc<RwLock<LocalStateCache>>,
    status: Arc<RwLock<StatusBoard>>,
    task_handle: Arc<TokioMutex<Option<JoinHandle<()>>>>,
}

impl PortalClientHandle {
    /// 校验配置并启动后台任务。必须在 tokio 运行时中调用。
    pub fn spawn(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        info!("[PortalClient] 正在启动客户端服务，目标地址: {}", config.server_url);

        let (command_tx, command_rx) = mpsc::channel(config.command_channel_capacity);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity);
        let cache = Arc::new(RwLock::new(LocalStateCache::new()));
        let status = Arc::new(RwLock::new(StatusBoard::new(config.status_auto_hide())));

        let service = PortalClientService {
            connection: ConnectionManager::new(config.reconnect_delay()),
            dispatcher: ActionDispatcher::new(),
            config,
            command_rx,
            state_tx,
            event_tx: event_tx.clone(),
            cache: cache.clone(),
            status: status.clone(),
        };
        let task = tokio::spawn(service.run());

        Ok(Self { command_tx, state_rx, event_tx, cache, status, task_handle: Arc::new(TokioMutex::new(Some(task))) })
    }

    /// 分发一个动作并等待它自己的响应。
    ///
    /// 未连接时立即返回 `NotConnected`；后端返回失败时为 `ApplicationFailure`。
    pub async fn dispatch(&self, action: ActionName, data: Payload) -> DispatchResult {
        let (reply, reply_rx) = oneshot::channel();
        self.command_tx
            .send(ClientCommand::Dispatch { action, data, reply })
            .await
            .map_err(|_| ClientError::ServiceStopped)?;
        reply_rx.await.map_err(|_| ClientError::ServiceStopped)?
    }

    /// 以强类型载荷分发一个动作。
    pub async fn dispatch_with<P: Serialize>(&self, action: ActionName, payload: &P) -> DispatchResult {
        let data = payload_from(payload)?;
        self.dispatch(action, data).await
    }

    /// 分发动作并把响应的 `data` 解码为 `T`。
    pub async fn dispatch_typed<P: Serialize, T: DeserializeOwned>(&self, action: ActionName, payload: &P) -> Result<T, ClientError> {
        let response = self.dispatch_with(action, payload).await?;
        response.data_as::<T>().map_err(|e| ClientError::MalformedResponse(e.to_string()))
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// 等待连接进入 OPEN。后台任务停止时返回 `ServiceStopped`。
    pub async fn wait_until_open(&self) -> Result<(), ClientError> {
        let mut state_rx = self.state_rx.clone();
        state_rx.wait_for(|state| *state == ConnectionState::Open).await.map_err(|_| ClientError::ServiceStopped)?;
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.event_tx.subscribe()
    }

    pub async fn cache_snapshot(&self) -> LocalStateCache {
        self.cache.read().await.clone()
    }

    pub async fn session(&self) -> Option<Session> {
        self.cache.read().await.session().cloned()
    }

    /// 当前仍可见的状态消息 (已自动隐藏的消息不会返回)。
    pub async fn current_status(&self) -> Option<StatusMessage> {
        self.status.read().await.visible().cloned()
    }

    /// 在本地显示一条状态消息 (例如表现层的前置检查失败)。
    pub async fn notify(&self, text: impl Into<String>, severity: StatusSeverity) {
        show_status(&self.status, &self.event_tx, text, severity).await;
    }

    /// 请求立即重连。
    ///
    /// 连接丢失后总会自动安排重连，因此该请求总是被拒绝：已安排重连时为
    /// `ReconnectAlreadyScheduled`，连接中或已连接时为 `AlreadyConnected`。
    pub async fn reconnect_now(&self) -> Result<(), ClientError> {
        self.request(|reply| ClientCommand::Reconnect { reply }).await
    }

    /// 清除当前会话。没有会话时返回 `NoActiveSession`。
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.request(|reply| ClientCommand::Logout { reply }).await
    }

    /// 在本地建立管理员会话。
    pub async fn assume_admin(&self) -> Result<(), ClientError> {
        self.request(|reply| ClientCommand::AssumeAdmin { reply }).await
    }

    /// 停止后台任务并等待其结束。所有未完成的请求以 `ServiceStopped` 结束。
    pub async fn shutdown(&self) {
        if self.command_tx.send(ClientCommand::Shutdown).await.is_err() {
            debug!("[PortalClient] 后台任务已经停止。");
        }
        let mut task_guard = self.task_handle.lock().await;
        if let Some(handle) = task_guard.take() {
            match handle.await {
                Ok(()) => info!("[PortalClient] 后台任务已结束。"),
                Err(e) => warn!("[PortalClient] 等待后台任务结束时发生错误: {:?}", e),
            }
        }
    }

    async fn request<F>(&self, build: F) -> Result<(), ClientError>
    where
        F: FnOnce(oneshot::Sender<Result<(), ClientError>>) -> ClientCommand,
    {
        let (reply, reply_rx) = oneshot::channel();
        self.command_tx.send(build(reply)).await.map_err(|_| ClientError::ServiceStopped)?;
        reply_rx.await.map_err(|_| ClientError::ServiceStopped)?
    }
}

async fn show_status(
    status: &RwLock<StatusBoard>,
    event_tx: &broadcast::Sender<ClientEvent>,
    text: impl Into<String>,
    severity: StatusSeverity,
) {
    let message = status.write().await.show(text, severity, Instant::now());
    // 没有订阅者时发送失败是正常情况。
    let _ = event_tx.send(ClientEvent::Status(message));
}

/// 后台任务本体。
struct PortalClientService {
    config: ClientConfig,
    connection: ConnectionManager,
    dispatcher: ActionDispatcher,
    command_rx: mpsc::Receiver<ClientCommand>,
    state_tx: watch::Sender<ConnectionState>,
    event_tx: broadcast::Sender<ClientEvent>,
    cache: Arc<RwLock<LocalStateCache>>,
    status: Arc<RwLock<StatusBoard>>,
}

impl PortalClientService {
    async fn run(mut self) {
        info!("[PortalClient] 主循环已启动。");
        loop {
            // --- 连接阶段 ---
            if let Err(e) = self.connection.begin_connect() {
                error!("[PortalClient] 状态机拒绝开始连接: {}", e);
                break;
            }
            self.publish_state();

            let server_url = self.config.server_url.clone();
            let connect_result = {
                let connect_fut = transport::connect_client(&server_url);
                tokio::pin!(connect_fut);
                loop {
                    tokio::select! {
                        result = &mut connect_fut => break Some(result),
                        command = self.command_rx.recv() => {
                            match command {
                                None | Some(ClientCommand::Shutdown) => break None,
                                Some(command) => self.handle_offline_command(command).await,
                            }
                        }
                    }
                }
            };

            let end = match connect_result {
                None => SessionEnd::Shutdown,
                Some(Ok(connection)) => {
                    self.on_open().await;
                    self.run_session(connection).await
                }
                Some(Err(e)) => {
                    warn!("[PortalClient] 连接到 {} 失败: {}", server_url, e);
                    self.on_lost(e.to_string(), STATUS_CONNECTION_ERROR).await;
                    match self.wait_for_reconnect().await {
                        WaitEnd::Reconnect => continue,
                        WaitEnd::Shutdown => break,
                    }
                }
            };

            match end {
                SessionEnd::Shutdown => break,
                SessionEnd::Lost(reason) => {
                    self.on_lost(reason, STATUS_RECONNECTING).await;
                    if let WaitEnd::Shutdown = self.wait_for_reconnect().await {
                        break;
                    }
                }
            }
        }

        self.dispatcher.fail_all(ClientError::ServiceStopped);
        self.connection.mark_lost(Instant::now());
        self.publish_state();
        info!("[PortalClient] 主循环已退出。");
    }

    // --- 会话阶段 ---
    async fn run_session(&mut self, mut connection: ClientConnection) -> SessionEnd {
        if self.config.refresh_on_reconnect {
            let refresh = self.session_refresh_requests().await;
            for (action, data) in refresh {
                if let Err(reason) = self.send_request(&mut connection, action, data, None).await {
                    return SessionEnd::Lost(reason);
                }
            }
        }

        loop {
            tokio::select! {
                command = self.command_rx.recv() => {
                    match command {
                        None | Some(ClientCommand::Shutdown) => {
                            if let Err(e) = connection.close().await {
                                debug!("[PortalClient] 关闭连接时出错: {}", e);
                            }
                            return SessionEnd::Shutdown;
                        }
                        Some(ClientCommand::Dispatch { action, data, reply }) => {
                            if let Err(reason) = self.send_request(&mut connection, action, data, Some(reply)).await {
                                return SessionEnd::Lost(reason);
                            }
                        }
                        Some(ClientCommand::Reconnect { reply }) => {
                            let _ = reply.send(Err(self.connection.manual_reconnect_rejection()));
                        }
                        Some(command) => self.handle_session_command(command).await,
                    }
                }
                incoming = transport::receive_text(&mut connection.ws_receiver) => {
                    match incoming {
                        Some(Ok(text)) => {
                            let follow_ups = self.handle_frame(&text).await;
                            for (action, data) in follow_ups {
                                if let Err(reason) = self.send_request(&mut connection, action, data, None).await {
                                    return SessionEnd::Lost(reason);
                                }
                            }
                        }
                        Some(Err(e)) if !e.is_fatal() => {
                            warn!("[PortalClient] 收到无法处理的帧: {}", e);
                            self.handle_undecodable(ClientError::MalformedResponse(e.to_string())).await;
                        }
                        Some(Err(e)) => {
                            error!("[PortalClient] 接收消息时发生传输错误: {}", e);
                            return SessionEnd::Lost(e.to_string());
                        }
                        None => {
                            info!("[PortalClient] 服务器关闭了连接。");
                            return SessionEnd::Lost("服务器关闭了连接".to_string());
                        }
                    }
                }
            }
        }
    }

    // --- 等待重连阶段 ---
    async fn wait_for_reconnect(&mut self) -> WaitEnd {
        let deadline = match self.connection.reconnect_deadline() {
            Some(deadline) => deadline,
            None => return WaitEnd::Reconnect,
        };
        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => {
                    debug!("[PortalClient] 重连延迟已到，开始重连。");
                    return WaitEnd::Reconnect;
                }
                command = self.command_rx.recv() => {
                    match command {
                        None | Some(ClientCommand::Shutdown) => return WaitEnd::Shutdown,
                        Some(command) => self.handle_offline_command(command).await,
                    }
                }
            }
        }
    }

    /// 发送一个请求。只有传输层失败时返回 `Err(原因)`，此时会话应结束。
    async fn send_request(
        &mut self,
        connection: &mut ClientConnection,
        action: ActionName,
        data: Payload,
        reply: Option<ReplySender>,
    ) -> Result<(), String> {
        let prepared = match self.dispatcher.prepare(self.connection.state(), action, data) {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!("[PortalClient] 无法构建 {} 请求: {}", action, e);
                self.show_status(e.to_string(), StatusSeverity::Error).await;
                if let Some(reply) = reply {
                    let _ = reply.send(Err(e));
                }
                return Ok(());
            }
        };

        // 客户端自动发起的后续请求不覆盖上一条状态消息。
        if reply.is_some() {
            self.show_status(STATUS_SENDING, StatusSeverity::Info).await;
        }
        debug!("[PortalClient] 发送 {} (requestId: {})", action, prepared.request_id);
        match connection.send_text(prepared.frame.clone()).await {
            Ok(()) => {
                self.dispatcher.record(prepared, reply);
                Ok(())
            }
            Err(e) => {
                error!("[PortalClient] 发送 {} 失败: {}", action, e);
                if let Some(reply) = reply {
                    let _ = reply.send(Err(ClientError::TransportLost(e.to_string())));
                }
                Err(e.to_string())
            }
        }
    }

    /// 处理一个入站文本帧，返回需要发起的后续请求。
    async fn handle_frame(&mut self, text: &str) -> Vec<(ActionName, Payload)> {
        let response = match decode_response(text) {
            Ok(response) => response,
            Err(e) => {
                warn!("[PortalClient] {}", e);
                self.handle_undecodable(e).await;
                return Vec::new();
            }
        };

        let pending = match self.dispatcher.resolve(response.request_id.as_deref()) {
            Some(pending) => pending,
            None => {
                warn!("[PortalClient] 收到没有对应请求的消息，已丢弃: '{}'", response.message);
                return Vec::new();
            }
        };

        debug!("[PortalClient] {} (requestId: {}) 的响应在 {} ms 后到达。", pending.action, pending.request_id, pending.elapsed_ms());
        let outcome = {
            let mut cache = self.cache.write().await;
            ResponseRouter::route(pending.action, &pending.data, response, &mut cache)
        };

        let (text, severity) = outcome.status;
        self.show_status(text, severity).await;
        for section in &outcome.updated {
            if *section == CacheSection::Session {
                if let Some(session) = self.cache.read().await.session().cloned() {
                    self.emit(ClientEvent::SessionEstablished { session });
                }
            }
            self.emit(ClientEvent::CacheUpdated { section: *section });
        }
        pending.complete(outcome.result);
        outcome.follow_ups
    }

    // 缓存保持不变。位置匹配模式下该帧属于最早的请求，令其以错误结束。
    async fn handle_undecodable(&mut self, error: ClientError) {
        self.show_status(PARSE_ERROR_STATUS, StatusSeverity::Error).await;
        match self.dispatcher.resolve_undecodable() {
            Some(pending) => {
                warn!("[PortalClient] 无法解码的帧归属于 {} (requestId: {})，该请求失败。", pending.action, pending.request_id);
                pending.complete(Err(error));
            }
            None => debug!("[PortalClient] 无法解码的帧不归属任何待处理请求。"),
        }
    }

    async fn handle_offline_command(&mut self, command: ClientCommand) {
        match command {
            ClientCommand::Dispatch { action, reply, .. } => {
                info!("[PortalClient] 未连接，拒绝发送 {}", action);
                self.show_status(STATUS_NOT_CONNECTED, StatusSeverity::Error).await;
                let _ = reply.send(Err(ClientError::NotConnected));
            }
            ClientCommand::Reconnect { reply } => {
                let _ = reply.send(Err(self.connection.manual_reconnect_rejection()));
            }
            ClientCommand::Shutdown => {}
            other => self.handle_session_command(other).await,
        }
    }

    // 会话生命周期命令不需要连接。
    async fn handle_session_command(&mut self, command: ClientCommand) {
        match command {
            ClientCommand::Logout { reply } => {
                let cleared = self.cache.write().await.clear_session();
                if cleared {
                    info!("[PortalClient] 会话已清除。");
                    self.emit(ClientEvent::SessionCleared);
                    self.show_status(STATUS_LOGGED_OUT, StatusSeverity::Success).await;
                    let _ = reply.send(Ok(()));
                } else {
                    let _ = reply.send(Err(ClientError::NoActiveSession));
                }
            }
            ClientCommand::AssumeAdmin { reply } => {
                let session = Session::admin();
                self.cache.write().await.establish_session(session.clone());
                info!("[PortalClient] 已建立管理员会话。");
                self.emit(ClientEvent::SessionEstablished { session });
                self.emit(ClientEvent::CacheUpdated { section: CacheSection::Session });
                let _ = reply.send(Ok(()));
            }
            other => debug!("[PortalClient] 忽略命令: {:?}", other),
        }
    }

    async fn on_open(&mut self) {
        self.connection.mark_open();
        self.publish_state();
        self.emit(ClientEvent::ConnectionReady);
        self.show_status(STATUS_CONNECTED, StatusSeverity::Success).await;
    }

    async fn on_lost(&mut self, reason: String, status_text: &str) {
        let failed = self.dispatcher.fail_all(ClientError::TransportLost(reason.clone()));
        if failed > 0 {
            debug!("[PortalClient] 连接丢失时有 {} 个请求未完成。", failed);
        }
        self.cache.write().await.mark_stale();
        let scheduled = self.connection.mark_lost(Instant::now());
        self.publish_state();
        let reconnect_in_ms = scheduled.map(|_| self.connection.reconnect_delay().as_millis() as u64);
        self.emit(ClientEvent::ConnectionLost { reason, reconnect_in_ms });
        self.show_status(status_text, StatusSeverity::Error).await;
    }

    // 重连后按会话角色重新获取数据。
    async fn session_refresh_requests(&self) -> Vec<(ActionName, Payload)> {
        let cache = self.cache.read().await;
        match cache.session() {
            Some(session) if session.role == SessionRole::Student => {
                let mut requests = vec![(ActionName::ViewModules, Payload::new())];
                if let Some(student_id) = cache.student_id() {
                    let mut key = Payload::new();
                    key.insert("studentId".to_string(), serde_json::Value::String(student_id.to_string()));
                    requests.push((ActionName::ViewRegisteredModules, key));
                }
                requests
            }
            Some(_) => vec![(ActionName::ListStudents, Payload::new()), (ActionName::ListModules, Payload::new())],
            None => Vec::new(),
        }
    }

    fn publish_state(&self) {
        let state = self.connection.state();
        self.state_tx.send_replace(state);
        self.emit(ClientEvent::ConnectionStateChanged { state });
    }

    fn emit(&self, event: ClientEvent) {
        debug!("[PortalClient] 事件: {}", event.name());
        let _ = self.event_tx.send(event);
    }

    async fn show_status(&self, text: impl Into<String>, severity: StatusSeverity) {
        show_status(&self.status, &self.event_tx, text, severity).await;
    }
}
