// rust_websocket_utils/src/client/transport.rs

//! 客户端 WebSocket 传输层核心逻辑。
//!
//! 本模块提供建立与服务器的连接、发送和接收 JSON 文本帧的功能，
//! 以及对底层控制帧 (Ping/Pong/Close) 的统一处理。上层会话逻辑只看到
//! "一条文本"、"一个错误" 或 "连接已结束" 三种结果。

use crate::error::WsError;
use crate::message::{encode_frame, truncate_for_log};
use futures_util::{
    SinkExt,
    Stream,
    StreamExt,
    stream::{SplitSink, SplitStream},
};
use log::{debug, error, info};
use serde::Serialize;
use tokio_tungstenite::{
    WebSocketStream,
    connect_async,
    tungstenite::Error as TungsteniteError,
    tungstenite::protocol::Message,
};
use url::Url;

/// 一个可能经过 TLS 加密的 TCP WebSocket 流。
pub type ClientWsStream = WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// 客户端连接的发送端。
pub type ClientSink = SplitSink<ClientWsStream, Message>;

/// 客户端连接的接收端。
pub type ClientStream = SplitStream<ClientWsStream>;

/// 一个活动的客户端 WebSocket 连接，由发送端和接收端组成。
pub struct ClientConnection {
    /// 用于向服务器异步发送帧的发送端。
    pub ws_sender: ClientSink,
    /// 用于从服务器异步接收帧的接收端。
    pub ws_receiver: ClientStream,
}

impl ClientConnection {
    /// 发送一个文本帧。
    pub async fn send_text(&mut self, text: String) -> Result<(), WsError> {
        debug!("客户端：准备发送文本帧: {}", truncate_for_log(&text));
        self.ws_sender.send(Message::Text(text)).await.map_err(|e| match e {
            TungsteniteError::ConnectionClosed | TungsteniteError::AlreadyClosed => WsError::SendErrorClosed,
            other => WsError::WebSocketProtocolError(other),
        })
    }

    /// 将值编码为 JSON 后作为文本帧发送。
    pub async fn send_frame<T: Serialize>(&mut self, value: &T) -> Result<(), WsError> {
        let text = encode_frame(value)?;
        self.send_text(text).await
    }

    /// 尝试优雅关闭连接的发送端。
    pub async fn close(&mut self) -> Result<(), WsError> {
        info!("客户端：正在关闭 WebSocket 连接。");
        self.ws_sender.close().await.map_err(WsError::from)
    }
}

/// 解析并校验 WebSocket URL，只接受 `ws://` 与 `wss://`。
pub fn parse_ws_url(url_str: &str) -> Result<Url, WsError> {
    let parsed_url = Url::parse(url_str)
        .map_err(|e| WsError::InvalidUrl(format!("无效的 WebSocket URL '{}': {}", url_str, e)))?;
    match parsed_url.scheme() {
        "ws" | "wss" => Ok(parsed_url),
        other => Err(WsError::InvalidUrl(format!(
            "不支持的协议 '{}' (URL: '{}')，仅支持 ws:// 或 wss://",
            other, url_str
        ))),
    }
}

/// 异步连接到指定的 WebSocket 服务器。
///
/// 连接和握手成功后，流会被拆分为发送端和接收端并封装在 `ClientConnection` 中返回。
pub async fn connect_client(url_str: &str) -> Result<ClientConnection, WsError> {
    info!("客户端：开始尝试连接到 WebSocket 服务器，URL: {}", url_str);
    let parsed_url = parse_ws_url(url_str)?;

    match connect_async(parsed_url.as_str()).await {
        Ok((ws_stream, response)) => {
            info!("客户端：已成功连接到 {} (HTTP 状态码: {})", url_str, response.status());
            let (ws_sender, ws_receiver) = ws_stream.split();
            Ok(ClientConnection { ws_sender, ws_receiver })
        }
        Err(e) => {
            error!("客户端：连接到 {} 失败，错误: {}", url_str, e);
            Err(WsError::WebSocketProtocolError(e))
        }
    }
}

/// 从接收端异步接收下一个文本帧。
///
/// - `Some(Ok(text))`：收到一个文本帧。
/// - `Some(Err(e))`：收到了非预期的帧 (二进制，`e.is_fatal()` 为 false) 或发生了底层错误。
/// - `None`：连接已关闭 (收到 Close 帧或流结束)。
///
/// Ping/Pong 等控制帧由底层库自动处理，这里直接跳过。
///
/// 该函数对任意 tungstenite 消息流通用，服务端传输层也复用它。
pub async fn receive_text<S>(ws_receiver: &mut S) -> Option<Result<String, WsError>>
where
    S: Stream<Item = Result<Message, TungsteniteError>> + Unpin,
{
    loop {
        match ws_receiver.next().await {
            Some(Ok(Message::Text(text))) => {
                debug!("传输层：收到文本帧: '{}'", truncate_for_log(&text));
                break Some(Ok(text));
            }
            Some(Ok(Message::Binary(bin))) => {
                debug!("传输层：收到二进制帧，长度: {} 字节", bin.len());
                break Some(Err(WsError::Message("收到了非预期的 WebSocket 二进制帧".to_string())));
            }
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {
                debug!("传输层：跳过控制帧。");
            }
            Some(Ok(Message::Close(close_frame))) => {
                debug!("传输层：收到 Close 控制帧，详细信息: {:?}", close_frame);
                break None;
            }
            Some(Err(TungsteniteError::ConnectionClosed)) | Some(Err(TungsteniteError::AlreadyClosed)) => {
                debug!("传输层：连接已关闭。");
                break None;
            }
            Some(Err(e)) => {
                error!("传输层：从 WebSocket 流接收消息时发生底层错误: {}", e);
                break Some(Err(WsError::WebSocketProtocolError(e)));
            }
            None => {
                debug!("传输层：WebSocket 接收流已结束。");
                break None;
            }
        }
    }
}
