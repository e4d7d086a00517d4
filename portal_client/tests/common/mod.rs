// portal_client/tests/common/mod.rs

//! 集成测试共用的进程内模拟后端。
//!
//! 基于 `rust_websocket_utils::server::transport` 实现，内置与原有后端一致的种子数据：
//! 学生 S001 (John Doe / password123)，模块 CS101、CS201、CS301。

#![allow(dead_code)]

use common_models::ws_payloads::{ModuleForm, ModuleUpdate, RegistrationPayload, StudentForm, StudentKey, StudentLoginPayload, ModuleKey, StudentUpdate};
use common_models::{ActionName, Module, RequestEnvelope, ResponseEnvelope, Student};
use log::{debug, info};
use rust_websocket_utils::message::decode_frame;
use rust_websocket_utils::server::transport::{self as server_transport, ServerTransport, WsStream};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};

pub fn init_test_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 模拟后端的行为选项。
#[derive(Debug, Clone, Copy, Default)]
pub struct BackendOptions {
    /// 在响应中回显请求的 `requestId`。
    pub echo_request_id: bool,
    /// 每个连接上该动作的第一条响应推迟到下一条响应之后发送。
    pub hold_first_response_to: Option<ActionName>,
    /// 每个连接上的第 N 条响应 (从 1 开始) 替换为无法解析的文本。
    pub garble_response: Option<usize>,
}

#[derive(Debug, Clone)]
enum Control {
    DropAll,
    Raw(String),
}

struct StoredStudent {
    student: Student,
    password: String,
}

#[derive(Default)]
struct BackendState {
    students: BTreeMap<String, StoredStudent>,
    modules: BTreeMap<String, Module>,
    received: Vec<RequestEnvelope>,
    connections: usize,
}

pub struct MockBackend {
    pub addr: SocketAddr,
    control_tx: broadcast::Sender<Control>,
    state: Arc<Mutex<BackendState>>,
}

impl MockBackend {
    pub async fn start(options: BackendOptions) -> Self {
        let state = Arc::new(Mutex::new(BackendState::seeded()));
        let (control_tx, _) = broadcast::channel(16);
        let listener = ServerTransport::bind("127.0.0.1:0").await.expect("绑定模拟后端端口失败");
        let addr = listener.local_addr().expect("获取模拟后端地址失败");

        let handler_state = state.clone();
        let handler_control = control_tx.clone();
        tokio::spawn(ServerTransport::serve(listener, move |ws_stream: WsStream, peer: SocketAddr| {
            let state = handler_state.clone();
            let control_rx = handler_control.subscribe();
            async move {
                info!("[MockBackend] 新连接: {}", peer);
                state.lock().await.connections += 1;
                handle_connection(ws_stream, state, control_rx, options).await;
            }
        }));

        Self { addr, control_tx, state }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// 关闭所有当前连接 (发送 Close 帧)。
    pub fn drop_connections(&self) {
        let _ = self.control_tx.send(Control::DropAll);
    }

    /// 向所有当前连接推送一条原始文本帧。
    pub fn push_raw(&self, text: &str) {
        let _ = self.control_tx.send(Control::Raw(text.to_string()));
    }

    pub async fn connection_count(&self) -> usize {
        self.state.lock().await.connections
    }

    pub async fn received_actions(&self) -> Vec<ActionName> {
        self.state.lock().await.received.iter().map(|r| r.action).collect()
    }

    pub async fn received_requests(&self) -> Vec<RequestEnvelope> {
        self.state.lock().await.received.clone()
    }

    /// 轮询直到已接受的连接数达到 `count`。
    pub async fn wait_for_connections(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while self.connection_count().await < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("等待模拟后端连接超时");
    }

    /// 轮询直到收到的请求数达到 `count`。
    pub async fn wait_for_requests(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while self.state.lock().await.received.len() < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("等待模拟后端收到请求超时");
    }
}

// 连接的订阅在计数递增之前完成，所以 `wait_for_connections` 返回后控制消息一定能送达。
async fn handle_connection(
    mut ws_stream: WsStream,
    state: Arc<Mutex<BackendState>>,
    mut control_rx: broadcast::Receiver<Control>,
    options: BackendOptions,
) {
    let mut held: Option<ResponseEnvelope> = None;
    let mut hold_pending = options.hold_first_response_to;
    let mut answered = 0usize;
    loop {
        tokio::select! {
            control = control_rx.recv() => {
                match control {
                    Ok(Control::Raw(text)) => {
                        if server_transport::send_text(&mut ws_stream, text).await.is_err() {
                            break;
                        }
                    }
                    Ok(Control::DropAll) | Err(_) => {
                        debug!("[MockBackend] 正在关闭连接。");
                        let _ = ws_stream.close(None).await;
                        break;
                    }
                }
            }
            incoming = server_transport::receive_text(&mut ws_stream) => {
                let text = match incoming {
                    Some(Ok(text)) => text,
                    _ => break,
                };
                let request: RequestEnvelope = match decode_frame(&text) {
                    Ok(request) => request,
                    Err(_) => continue,
                };
                let mut response = state.lock().await.handle(&request);
                if options.echo_request_id {
                    response.request_id = request.request_id.clone();
                }
                answered += 1;
                if options.garble_response == Some(answered) {
                    debug!("[MockBackend] 第 {} 条响应 ({}) 被替换为无法解析的文本。", answered, request.action);
                    if server_transport::send_text(&mut ws_stream, "{\"success\": tru".to_string()).await.is_err() {
                        break;
                    }
                    continue;
                }
                if hold_pending == Some(request.action) {
                    hold_pending = None;
                    held = Some(response);
                    continue;
                }
                if server_transport::send_frame(&mut ws_stream, &response).await.is_err() {
                    break;
                }
                if let Some(first) = held.take() {
                    if server_transport::send_frame(&mut ws_stream, &first).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}

fn module(code: &str, name: &str, description: &str, credits: u32) -> Module {
    Module { module_code: code.to_string(), module_name: name.to_string(), description: description.to_string(), credits }
}

fn to_value<T: Serialize>(value: &T) -> Option<Value> {
    serde_json::to_value(value).ok()
}

fn parse<T: DeserializeOwned>(request: &RequestEnvelope) -> Option<T> {
    serde_json::from_value(Value::Object(request.data.clone())).ok()
}

impl BackendState {
    fn seeded() -> Self {
        let mut state = BackendState::default();
        for m in [
            module("CS101", "Introduction to Programming", "Learn basic programming concepts", 3),
            module("CS201", "Data Structures", "Study fundamental data structures", 4),
            module("CS301", "Database Systems", "Relational databases and SQL", 3),
        ] {
            state.modules.insert(m.module_code.clone(), m);
        }
        state.students.insert(
            "S001".to_string(),
            StoredStudent {
                student: Student {
                    student_id: "S001".to_string(),
                    name: "John Doe".to_string(),
                    email: "john@example.com".to_string(),
                    registered_modules: Default::default(),
                },
                password: "password123".to_string(),
            },
        );
        state
    }

    fn handle(&mut self, request: &RequestEnvelope) -> ResponseEnvelope {
        self.received.push(request.clone());
        match request.action {
            ActionName::StudentLogin => match parse::<StudentLoginPayload>(request) {
                Some(login) => match self.students.get(&login.student_id) {
                    Some(stored) if stored.password == login.password => {
                        ResponseEnvelope::ok("Login successful", to_value(&stored.student))
                    }
                    _ => ResponseEnvelope::failure("Invalid credentials"),
                },
                None => ResponseEnvelope::failure("Invalid credentials"),
            },
            ActionName::ViewModules | ActionName::ListModules => {
                let modules: Vec<&Module> = self.modules.values().collect();
                ResponseEnvelope::ok("Modules retrieved", to_value(&modules))
            }
            ActionName::RegisterModule => {
                let Some(payload) = parse::<RegistrationPayload>(request) else {
                    return ResponseEnvelope::failure("Student not found");
                };
                if !self.modules.contains_key(&payload.module_code) {
                    if !self.students.contains_key(&payload.student_id) {
                        return ResponseEnvelope::failure("Student not found");
                    }
                    return ResponseEnvelope::failure("Module not found");
                }
                match self.students.get_mut(&payload.student_id) {
                    Some(stored) => {
                        stored.student.registered_modules.insert(payload.module_code);
                        ResponseEnvelope::ok("Module registered successfully", None)
                    }
                    None => ResponseEnvelope::failure("Student not found"),
                }
            }
            ActionName::ViewRegisteredModules => match parse::<StudentKey>(request).and_then(|k| self.students.get(&k.student_id)) {
                Some(stored) => {
                    let registered: Vec<&Module> =
                        stored.student.registered_modules.iter().filter_map(|code| self.modules.get(code)).collect();
                    ResponseEnvelope::ok("Registered modules retrieved", to_value(&registered))
                }
                None => ResponseEnvelope::failure("Student not found"),
            },
            ActionName::AddStudent => match parse::<StudentForm>(request) {
                Some(form) if self.students.contains_key(&form.student_id) => ResponseEnvelope::failure("Student ID already exists"),
                Some(form) => {
                    let student = Student {
                        student_id: form.student_id.clone(),
                        name: form.name,
                        email: form.email,
                        registered_modules: Default::default(),
                    };
                    self.students.insert(form.student_id, StoredStudent { student, password: form.password });
                    ResponseEnvelope::ok("Student added successfully", None)
                }
                None => ResponseEnvelope::failure("Student not found"),
            },
            ActionName::EditStudent => match parse::<StudentUpdate>(request) {
                Some(update) => match self.students.get_mut(&update.student_id) {
                    Some(stored) => {
                        if let Some(name) = update.name {
                            stored.student.name = name;
                        }
                        if let Some(email) = update.email {
                            stored.student.email = email;
                        }
                        if let Some(password) = update.password {
                            stored.password = password;
                        }
                        ResponseEnvelope::ok("Student updated successfully", to_value(&stored.student))
                    }
                    None => ResponseEnvelope::failure("Student not found"),
                },
                None => ResponseEnvelope::failure("Student not found"),
            },
            ActionName::ViewStudent => match parse::<StudentKey>(request).and_then(|k| self.students.get(&k.student_id)) {
                Some(stored) => ResponseEnvelope::ok("Student retrieved", to_value(&stored.student)),
                None => ResponseEnvelope::failure("Student not found"),
            },
            ActionName::ListStudents => {
                let students: Vec<&Student> = self.students.values().map(|s| &s.student).collect();
                ResponseEnvelope::ok("Students retrieved", to_value(&students))
            }
            ActionName::AddModule => match parse::<ModuleForm>(request) {
                Some(form) if self.modules.contains_key(&form.module_code) => ResponseEnvelope::failure("Module code already exists"),
                Some(form) => {
                    let m = module(&form.module_code, &form.module_name, &form.description, form.credits);
                    self.modules.insert(form.module_code, m);
                    ResponseEnvelope::ok("Module added successfully", None)
                }
                None => ResponseEnvelope::failure("Module not found"),
            },
            ActionName::EditModule => match parse::<ModuleUpdate>(request) {
                Some(update) => match self.modules.get_mut(&update.module_code) {
                    Some(m) => {
                        if let Some(name) = update.module_name {
                            m.module_name = name;
                        }
                        if let Some(description) = update.description {
                            m.description = description;
                        }
                        if let Some(credits) = update.credits {
                            m.credits = credits;
                        }
                        ResponseEnvelope::ok("Module updated successfully", to_value(m))
                    }
                    None => ResponseEnvelope::failure("Module not found"),
                },
                None => ResponseEnvelope::failure("Module not found"),
            },
            ActionName::ViewModule => match parse::<ModuleKey>(request).and_then(|k| self.modules.get(&k.module_code)) {
                Some(m) => ResponseEnvelope::ok("Module retrieved", to_value(m)),
                None => ResponseEnvelope::failure("Module not found"),
            },
        }
    }
}
