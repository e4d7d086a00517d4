// rust_websocket_utils/src/server/transport.rs

//! 服务端 WebSocket 监听、接受连接和通信逻辑。
//!
//! 每个握手成功的连接都会在独立的 Tokio 任务中交给调用方提供的 `on_connect` 回调处理。

use crate::client::transport::receive_text as receive_stream_text;
use crate::error::WsError;
use crate::message::{encode_frame, truncate_for_log};
use futures_util::SinkExt;
use log::{debug, error, info};
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio_tungstenite::tungstenite::Error as TungsteniteError;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

/// 经过 WebSocket 握手后的 TCP 流。
pub type WsStream = WebSocketStream<TcpStream>;

/// 负责 WebSocket 服务端的监听和连接接受。
pub struct ServerTransport;

impl ServerTransport {
    /// 绑定 TCP 监听器。
    ///
    /// 与 `serve` 分开是为了让调用方 (例如测试) 可以绑定 `127.0.0.1:0`
    /// 并在开始接受连接之前取得实际端口。
    pub async fn bind<A: ToSocketAddrs>(addr: A) -> Result<TcpListener, WsError> {
        let listener = TcpListener::bind(addr).await?;
        info!("[WsServer] 服务器正在监听地址: {}", listener.local_addr()?);
        Ok(listener)
    }

    /// 在已绑定的监听器上无限期接受连接。
    ///
    /// 对每个握手成功的连接调用 `on_connect(ws_stream, peer_addr)`。
    /// 单个连接的握手失败或 accept 失败只会被记录，服务器继续运行。
    pub async fn serve<F, Fut>(listener: TcpListener, on_connect: F) -> Result<(), WsError>
    where
        F: Fn(WsStream, SocketAddr) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        loop {
            match listener.accept().await {
                Ok((tcp_stream, peer_addr)) => {
                    debug!("[WsServer] 从 {} 接受了新的 TCP 连接", peer_addr);
                    let on_connect_callback = on_connect.clone();
                    tokio::spawn(async move {
                        match accept_async(tcp_stream).await {
                            Ok(ws_stream) => {
                                info!("[WsServer] 与 {} 的 WebSocket 握手成功", peer_addr);
                                on_connect_callback(ws_stream, peer_addr).await;
                                debug!("[WsServer] 与 {} 的连接处理结束", peer_addr);
                            }
                            Err(e) => {
                                error!("[WsServer] 与 {} 的 WebSocket 握手失败: {}", peer_addr, e);
                            }
                        }
                    });
                }
                Err(e) => {
                    error!("[WsServer] 接受 TCP 连接失败: {}。服务器将继续运行。", e);
                }
            }
        }
    }
}

/// 从服务端连接接收下一个文本帧，语义与客户端的 `receive_text` 相同。
pub async fn receive_text(ws_stream: &mut WsStream) -> Option<Result<String, WsError>> {
    receive_stream_text(ws_stream).await
}

/// 向客户端发送一个文本帧。
pub async fn send_text(ws_stream: &mut WsStream, text: String) -> Result<(), WsError> {
    debug!("[WsServer] 发送文本帧: {}", truncate_for_log(&text));
    ws_stream.send(Message::Text(text)).await.map_err(|e| match e {
        TungsteniteError::ConnectionClosed | TungsteniteError::AlreadyClosed => WsError::SendErrorClosed,
        other => WsError::WebSocketProtocolError(other),
    })
}

/// 将值编码为 JSON 后发送给客户端。
pub async fn send_frame<T: Serialize>(ws_stream: &mut WsStream, value: &T) -> Result<(), WsError> {
    let text = encode_frame(value)?;
    send_text(ws_stream, text).await
}
