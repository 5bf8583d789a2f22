// WebSocket push transport speaking Socket.IO v4
use crate::application::push_channel::{PushConnection, PushConnector, PushEvent, TransportError};
use crate::infrastructure::engine_io::{self, Packet, SocketPacket, PONG_FRAME};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Engine.IO defaults when the open packet omits them
const DEFAULT_PING_INTERVAL_MS: u64 = 25_000;
const DEFAULT_PING_TIMEOUT_MS: u64 = 20_000;

/// How long the link may stay silent before it is considered dead: one
/// ping interval plus the ping timeout advertised in the open packet.
fn silence_limit(open: &Value) -> Duration {
    let field = |key: &str, default: u64| open.get(key).and_then(Value::as_u64).unwrap_or(default);
    Duration::from_millis(
        field("pingInterval", DEFAULT_PING_INTERVAL_MS) + field("pingTimeout", DEFAULT_PING_TIMEOUT_MS),
    )
}

#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
    connect_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(base_url: &str, connect_timeout: Duration) -> Self {
        Self {
            url: socket_url(base_url),
            connect_timeout,
        }
    }

    async fn handshake(&self, token: &str) -> Result<(Socket, Duration), TransportError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| TransportError::Handshake(e.to_string()))?;
        request.headers_mut().insert(header::AUTHORIZATION, bearer);

        let (mut socket, _) = connect_async(request)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        // Engine.IO open, then our namespace connect, then the server's verdict
        let silence = loop {
            match next_packet(&mut socket).await? {
                Packet::Open(open) => break silence_limit(&open),
                Packet::Ping => send(&mut socket, PONG_FRAME).await?,
                _ => {}
            }
        };

        send(&mut socket, &engine_io::connect_frame(token)).await?;

        loop {
            match next_packet(&mut socket).await? {
                Packet::Message(SocketPacket::Connect(_)) => return Ok((socket, silence)),
                Packet::Message(SocketPacket::ConnectError(message)) => {
                    return Err(TransportError::Refused(message));
                }
                Packet::Ping => send(&mut socket, PONG_FRAME).await?,
                Packet::Close => {
                    return Err(TransportError::Handshake("closed during handshake".to_string()));
                }
                _ => {}
            }
        }
    }
}

/// `https://host` → `wss://host/socket.io/?EIO=4&transport=websocket`
fn socket_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    format!("{}/socket.io/?EIO=4&transport=websocket", base)
}

async fn send(socket: &mut Socket, frame: &str) -> Result<(), TransportError> {
    socket
        .send(Message::Text(frame.to_string()))
        .await
        .map_err(|e| TransportError::Handshake(e.to_string()))
}

async fn next_packet(socket: &mut Socket) -> Result<Packet, TransportError> {
    loop {
        match socket.next().await {
            Some(Ok(Message::Text(text))) => match engine_io::decode(&text) {
                Ok(packet) => return Ok(packet),
                Err(e) => tracing::debug!("Ignoring undecodable frame: {}", e),
            },
            Some(Ok(Message::Close(_))) | None => {
                return Err(TransportError::Handshake("connection closed".to_string()));
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(TransportError::Connect(e.to_string())),
        }
    }
}

#[async_trait]
impl PushConnector for WebSocketConnector {
    async fn open(&self, token: &str) -> Result<Box<dyn PushConnection>, TransportError> {
        let (socket, silence) = tokio::time::timeout(self.connect_timeout, self.handshake(token))
            .await
            .map_err(|_| TransportError::Timeout)??;

        tracing::debug!("Socket.IO handshake complete (silence limit {:?})", silence);
        Ok(Box::new(WebSocketConnection { socket, silence }))
    }
}

pub struct WebSocketConnection {
    socket: Socket,
    silence: Duration,
}

#[async_trait]
impl PushConnection for WebSocketConnection {
    async fn next_event(&mut self) -> Option<PushEvent> {
        loop {
            let packet = match tokio::time::timeout(self.silence, next_packet(&mut self.socket)).await {
                Ok(packet) => packet.ok()?,
                Err(_) => {
                    tracing::warn!("No frames for {:?}; treating push link as lost", self.silence);
                    return None;
                }
            };
            match packet {
                Packet::Ping => {
                    if send(&mut self.socket, PONG_FRAME).await.is_err() {
                        return None;
                    }
                }
                Packet::Message(SocketPacket::Event { topic, payload }) => {
                    return Some(PushEvent::new(topic, payload));
                }
                Packet::Close | Packet::Message(SocketPacket::Disconnect) => return None,
                _ => {}
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.socket.close(None).await;
    }
}
