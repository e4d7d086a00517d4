// portal_client/src/main.rs

//! 门户客户端命令行入口。
//!
//! 从标准输入逐行读取命令：
//! - `ACTION {json}`: 分发一个动作，例如 `STUDENT_LOGIN {"studentId":"S001","password":"password123"}`；
//! - `:admin` / `:logout` / `:reconnect` / `:cache` / `:status` / `:quit`。

use anyhow::{Context, Result};
use common_models::{ActionName, Payload};
use log::{error, info, LevelFilter};
use portal_client::config::{default_config_path, load_or_create_config};
use portal_client::{ClientEvent, PortalClientHandle};
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = default_config_path();
    let config = load_or_create_config(&config_path).context("加载客户端配置失败")?;

    let level = LevelFilter::from_str(&config.log_level).unwrap_or(LevelFilter::Info);
    env_logger::Builder::new().filter_level(level).format_timestamp_millis().init();
    info!("[主程序] 日志系统已初始化，级别: {}", level);

    let client = PortalClientHandle::spawn(config).context("启动客户端服务失败")?;

    let mut events = client.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let ClientEvent::Status(message) = &event {
                println!("[{:?}] {}", message.severity, message.text);
            } else {
                info!("[主程序] 事件 {}", event.name());
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("读取标准输入失败")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line {
            ":quit" => break,
            ":admin" => report(client.assume_admin().await.map(|_| "管理员会话已建立".to_string())),
            ":logout" => report(client.logout().await.map(|_| "已退出登录".to_string())),
            ":reconnect" => {
                if let Err(e) = client.reconnect_now().await {
                    println!("无法手动重连: {}", e);
                }
            }
            ":cache" => println!("{}", serde_json::to_string_pretty(&client.cache_snapshot().await)?),
            ":status" => println!("连接状态: {:?}", client.connection_state()),
            command => {
                let (action_text, data_text) = command.split_once(' ').unwrap_or((command, "{}"));
                let action = match ActionName::from_str(action_text) {
                    Ok(action) => action,
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                };
                let data: Payload = match serde_json::from_str(data_text) {
                    Ok(data) => data,
                    Err(e) => {
                        println!("载荷必须是 JSON 对象: {}", e);
                        continue;
                    }
                };
                match client.dispatch(action, data).await {
                    Ok(response) => println!("{}", serde_json::to_string_pretty(&response)?),
                    Err(e) => println!("请求失败: {}", e),
                }
            }
        }
    }

    client.shutdown().await;
    info!("[主程序] 已退出。");
    Ok(())
}

fn report(result: Result<String, portal_client::ClientError>) {
    match result {
        Ok(text) => println!("{}", text),
        Err(e) => error!("[主程序] {}", e),
    }
}
