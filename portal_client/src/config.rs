// portal_client/src/config.rs

//! 门户客户端配置管理模块。
//!
//! 配置保存在 JSON 文件 (`portal_client_settings.json`) 中：
//! - 文件不存在时使用默认配置并写出新文件；
//! - 文件损坏 (无法解析) 时记录警告，使用默认配置并覆盖写回；
//! - 环境变量 `PORTAL_SERVER_URL` 可覆盖文件中的服务器地址。

use crate::error::ClientError;
use log::{info, warn};
use rust_websocket_utils::client::transport::parse_ws_url;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 配置文件名。
pub const CONFIG_FILE_NAME: &str = "portal_client_settings.json";
/// 覆盖服务器地址的环境变量名。
pub const SERVER_URL_ENV: &str = "PORTAL_SERVER_URL";
/// 默认的后端 WebSocket 地址。
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8080";

/// 客户端配置。缺失的字段使用默认值。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// 后端 WebSocket 服务地址，必须是 `ws://` 或 `wss://`。
    pub server_url: String,
    /// 连接丢失后到下一次重连尝试的固定延迟 (毫秒)。
    pub reconnect_delay_ms: u64,
    /// 状态消息自动隐藏的时间 (毫秒)。
    pub status_auto_hide_ms: u64,
    /// 重连成功后是否自动刷新当前会话的数据。
    pub refresh_on_reconnect: bool,
    /// 命令通道容量。
    pub command_channel_capacity: usize,
    /// 事件广播通道容量。
    pub event_channel_capacity: usize,
    /// 日志级别 (`trace`, `debug`, `info`, `warn`, `error`)。
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            reconnect_delay_ms: 3000,
            status_auto_hide_ms: 5000,
            refresh_on_reconnect: false,
            command_channel_capacity: 32,
            event_channel_capacity: 64,
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// 以默认值为基础、替换服务器地址构造配置。
    pub fn with_server_url(server_url: impl Into<String>) -> Self {
        Self { server_url: server_url.into(), ..Self::default() }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn status_auto_hide(&self) -> Duration {
        Duration::from_millis(self.status_auto_hide_ms)
    }

    /// 校验配置。
    pub fn validate(&self) -> Result<(), ClientError> {
        parse_ws_url(&self.server_url).map_err(|e| ClientError::Config(e.to_string()))?;
        if self.reconnect_delay_ms == 0 {
            return Err(ClientError::Config("reconnect_delay_ms 必须大于 0".to_string()));
        }
        if self.status_auto_hide_ms == 0 {
            return Err(ClientError::Config("status_auto_hide_ms 必须大于 0".to_string()));
        }
        if self.command_channel_capacity == 0 || self.event_channel_capacity == 0 {
            return Err(ClientError::Config("通道容量必须大于 0".to_string()));
        }
        Ok(())
    }

    /// 应用外部覆盖值 (通常来自环境变量)。
    pub fn apply_overrides(&mut self, server_url: Option<String>) {
        if let Some(url) = server_url.filter(|u| !u.trim().is_empty()) {
            info!("[配置模块] 服务器地址被覆盖为: {}", url);
            self.server_url = url.trim().to_string();
        }
    }
}

/// 默认配置文件路径 (当前工作目录下)。
pub fn default_config_path() -> PathBuf {
    let current_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    current_dir.join(CONFIG_FILE_NAME)
}

/// 加载或创建配置文件，然后应用环境变量覆盖并校验。
pub fn load_or_create_config(path: &Path) -> Result<ClientConfig, ClientError> {
    let mut config = load_or_create_file(path);
    config.apply_overrides(env::var(SERVER_URL_ENV).ok());
    config.validate()?;
    Ok(config)
}

/// 只处理文件层面的加载逻辑，不读取环境变量，也不校验。
pub fn load_or_create_file(path: &Path) -> ClientConfig {
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<ClientConfig>(&content) {
            Ok(config) => {
                info!("[配置模块] 已成功从配置文件 {:?} 加载客户端配置。", path);
                config
            }
            Err(e) => {
                warn!(
                    "[配置模块] 警告：从 {:?} 反序列化配置失败: {}. 文件可能已损坏。将使用默认配置并尝试覆盖。",
                    path, e
                );
                let default_config = ClientConfig::default();
                save_config(&default_config, path);
                default_config
            }
        },
        Err(e) => {
            info!(
                "[配置模块] 未在 {:?} 找到配置文件或读取时发生错误 (错误: {}). 将使用默认配置并尝试创建新文件。",
                path, e
            );
            let default_config = ClientConfig::default();
            save_config(&default_config, path);
            default_config
        }
    }
}

/// 保存配置到文件。失败只记录警告，不影响客户端运行。
pub fn save_config(config: &ClientConfig, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("[配置模块] 错误：创建配置目录 {:?} 失败: {}", parent, e);
                return;
            }
        }
    }

    match serde_json::to_string_pretty(config) {
        Ok(content) => {
            if let Err(e) = fs::write(path, content) {
                warn!("[配置模块] 错误：将配置写入文件 {:?} 时失败: {}", path, e);
            } else {
                info!("[配置模块] 已将当前配置保存到 {:?}.", path);
            }
        }
        Err(e) => {
            warn!("[配置模块] 错误：序列化配置信息以便保存时失败: {}", e);
        }
    }
}
