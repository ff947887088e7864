//! Socket.IO over WebSocket, with bounded auto-reconnect.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::codec::{self, EnginePacket, SocketFrame, SocketPacket, DEFAULT_NAMESPACE};
use super::{
    Connector, DisconnectReason, ReconnectPolicy, Transport, TransportCommand, TransportEvent,
    TransportRemote,
};
use crate::protocol::{InboundEvent, OutboundEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Map a server URL to its Engine.IO WebSocket endpoint.
///
/// `http` becomes `ws` and `https` becomes `wss`; a bare host is treated as
/// plain `ws`.
pub fn socket_url(base: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if base.starts_with("ws://") || base.starts_with("wss://") {
        base.to_string()
    } else {
        format!("ws://{base}")
    };
    format!("{ws_base}/socket.io/?EIO=4&transport=websocket")
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// Opens Socket.IO transports against one server.
#[derive(Debug, Clone)]
pub struct SocketIoConnector {
    url: String,
    connect_timeout: Duration,
}

impl SocketIoConnector {
    pub fn new(server_url: &str) -> Self {
        Self {
            url: socket_url(server_url),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// The WebSocket endpoint this connector dials.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Connector for SocketIoConnector {
    /// Spawns the connection task. Must be called inside a tokio runtime.
    fn open(&mut self, policy: &ReconnectPolicy) -> Transport {
        let (transport, remote) = Transport::channel();
        tokio::spawn(connection_loop(
            self.url.clone(),
            self.connect_timeout,
            policy.clone(),
            remote,
        ));
        transport
    }
}

// ---------------------------------------------------------------------------
// Connection Loop
// ---------------------------------------------------------------------------

/// How one WebSocket session ended.
#[derive(Debug)]
enum SessionEnd {
    /// The local side closed the transport, or nobody is listening anymore.
    Closed,
    /// The server sent a Socket.IO disconnect.
    ServerDisconnect { was_connected: bool },
    /// The connection went away or never completed the handshake.
    Dropped {
        reason: DisconnectReason,
        was_connected: bool,
    },
}

/// Background task owning one logical connection across reconnects.
async fn connection_loop(
    url: String,
    connect_timeout: Duration,
    policy: ReconnectPolicy,
    remote: TransportRemote,
) {
    let TransportRemote {
        mut commands,
        events,
    } = remote;
    let mut retries: u32 = 0;

    loop {
        if events.is_closed() {
            return;
        }
        info!(url = %url, attempt = retries, "Connecting to chat server");

        match tokio::time::timeout(connect_timeout, tokio_tungstenite::connect_async(&url)).await
        {
            Ok(Ok((ws, _))) => {
                match run_session(ws, connect_timeout, &mut commands, &events).await {
                    SessionEnd::Closed => return,
                    SessionEnd::ServerDisconnect { was_connected } => {
                        info!("Server disconnected the socket; not reconnecting");
                        if was_connected {
                            let _ = events.send(TransportEvent::Disconnected {
                                reason: DisconnectReason::ServerDisconnect,
                            });
                        }
                        return;
                    }
                    SessionEnd::Dropped {
                        reason,
                        was_connected,
                    } => {
                        if was_connected {
                            retries = 0;
                            let _ = events.send(TransportEvent::Disconnected { reason });
                        }
                    }
                }
            }
            Ok(Err(e)) => {
                error!(error = %e, "Failed to connect to chat server");
                let _ = events.send(TransportEvent::Error(format!("Connection failed: {e}")));
            }
            Err(_elapsed) => {
                error!(timeout = ?connect_timeout, "WebSocket connection timed out");
                let _ = events.send(TransportEvent::Error(format!(
                    "Connection timed out after {}s",
                    connect_timeout.as_secs()
                )));
            }
        }

        if retries >= policy.max_attempts {
            warn!(attempts = retries, "Giving up on reconnection");
            let _ = events.send(TransportEvent::ReconnectFailed { attempts: retries });
            return;
        }
        retries += 1;
        let delay = policy.delay_for(retries);
        info!(attempt = retries, delay = ?delay, "Reconnecting");

        if !backoff(delay, &mut commands, &events).await {
            return;
        }
    }
}

/// Sleep between attempts. Returns `false` if the transport was closed
/// meanwhile.
async fn backoff(
    delay: Duration,
    commands: &mut mpsc::UnboundedReceiver<TransportCommand>,
    events: &mpsc::UnboundedSender<TransportEvent>,
) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            _ = events.closed() => return false,
            cmd = commands.recv() => match cmd {
                Some(TransportCommand::Emit(event)) => {
                    debug!(event = event.name(), "Dropping emit while reconnecting");
                }
                Some(TransportCommand::Close) | None => return false,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

async fn run_session(
    ws: WsStream,
    handshake_timeout: Duration,
    commands: &mut mpsc::UnboundedReceiver<TransportCommand>,
    events: &mpsc::UnboundedSender<TransportEvent>,
) -> SessionEnd {
    let (mut write, mut read) = ws.split();

    // Engine.IO open, then the Socket.IO connect request.
    let handshake = match tokio::time::timeout(handshake_timeout, read.next()).await {
        Ok(Some(Ok(WsMessage::Text(text)))) => match EnginePacket::decode(text.as_str()) {
            Ok(EnginePacket::Open(handshake)) => handshake,
            Ok(other) => {
                let _ = events.send(TransportEvent::Error(format!(
                    "expected open packet, got {other:?}"
                )));
                return dropped(false, DisconnectReason::TransportError);
            }
            Err(e) => {
                let _ = events.send(TransportEvent::Error(e.to_string()));
                return dropped(false, DisconnectReason::TransportError);
            }
        },
        Ok(Some(Ok(_))) | Ok(None) => {
            let _ = events.send(TransportEvent::Error(
                "connection closed during handshake".into(),
            ));
            return dropped(false, DisconnectReason::TransportClosed);
        }
        Ok(Some(Err(e))) => {
            let _ = events.send(TransportEvent::Error(format!("WebSocket error: {e}")));
            return dropped(false, DisconnectReason::TransportError);
        }
        Err(_elapsed) => {
            let _ = events.send(TransportEvent::Error("handshake timed out".into()));
            return dropped(false, DisconnectReason::PingTimeout);
        }
    };
    debug!(sid = %handshake.sid, ping_interval = handshake.ping_interval, "Engine.IO open");

    let connect = codec::message_frame(&SocketPacket::Connect(None));
    let sent = match connect {
        Ok(frame) => send_frame(&mut write, frame).await,
        Err(e) => {
            let _ = events.send(TransportEvent::Error(e.to_string()));
            return dropped(false, DisconnectReason::TransportError);
        }
    };
    if let Err(e) = sent {
        warn!(error = %e, "Failed to send socket connect");
        return dropped(false, DisconnectReason::TransportError);
    }

    let window = handshake.liveness_window();
    let watchdog = tokio::time::sleep(window);
    tokio::pin!(watchdog);
    let mut connected = false;

    loop {
        tokio::select! {
            _ = &mut watchdog => {
                warn!(window = ?window, "No traffic from server within ping window");
                return dropped(connected, DisconnectReason::PingTimeout);
            }
            _ = events.closed() => {
                close_socket(&mut write, connected).await;
                return SessionEnd::Closed;
            }
            cmd = commands.recv() => match cmd {
                Some(TransportCommand::Emit(event)) => {
                    if !connected {
                        debug!(event = event.name(), "Dropping emit before socket connect");
                        continue;
                    }
                    let frame = match encode_event(&event) {
                        Ok(frame) => frame,
                        Err(e) => {
                            let _ = events.send(TransportEvent::Error(e));
                            continue;
                        }
                    };
                    if let Err(e) = send_frame(&mut write, frame).await {
                        warn!(error = %e, "WebSocket send failed");
                        return dropped(connected, DisconnectReason::TransportError);
                    }
                }
                Some(TransportCommand::Close) | None => {
                    close_socket(&mut write, connected).await;
                    return SessionEnd::Closed;
                }
            },
            frame = read.next() => {
                watchdog.as_mut().reset(Instant::now() + window);
                let text = match frame {
                    Some(Ok(WsMessage::Text(text))) => text,
                    Some(Ok(WsMessage::Close(_))) | None => {
                        info!("Chat server closed connection");
                        return dropped(connected, DisconnectReason::TransportClosed);
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        return dropped(connected, DisconnectReason::TransportError);
                    }
                };

                let packet = match EnginePacket::decode(text.as_str()) {
                    Ok(packet) => packet,
                    Err(e) => {
                        debug!(text = %text.as_str(), "Unrecognized frame from server");
                        let _ = events.send(TransportEvent::Error(e.to_string()));
                        continue;
                    }
                };

                match packet {
                    EnginePacket::Ping(data) => {
                        let pong = EnginePacket::Pong(data).encode();
                        let sent = match pong {
                            Ok(frame) => send_frame(&mut write, frame).await,
                            Err(e) => {
                                warn!(error = %e, "Failed to encode pong");
                                continue;
                            }
                        };
                        if let Err(e) = sent {
                            warn!(error = %e, "Failed to answer ping");
                            return dropped(connected, DisconnectReason::TransportError);
                        }
                    }
                    EnginePacket::Close => {
                        info!("Engine.IO close from server");
                        return dropped(connected, DisconnectReason::TransportClosed);
                    }
                    EnginePacket::Message(payload) => {
                        match handle_socket_packet(&payload, &mut connected, events) {
                            Flow::Continue => {}
                            Flow::ServerDisconnect => {
                                return SessionEnd::ServerDisconnect {
                                    was_connected: connected,
                                };
                            }
                            Flow::Failed => return dropped(connected, DisconnectReason::TransportError),
                            Flow::Listenerless => return SessionEnd::Closed,
                        }
                    }
                    EnginePacket::Open(_)
                    | EnginePacket::Pong(_)
                    | EnginePacket::Upgrade
                    | EnginePacket::Noop => {}
                }
            }
        }
    }
}

/// What the session loop does after a Socket.IO packet.
enum Flow {
    Continue,
    ServerDisconnect,
    Failed,
    /// The event receiver is gone.
    Listenerless,
}

fn handle_socket_packet(
    payload: &str,
    connected: &mut bool,
    events: &mpsc::UnboundedSender<TransportEvent>,
) -> Flow {
    let frame = match SocketFrame::decode(payload) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "Malformed socket packet");
            return deliver(events, TransportEvent::Error(e.to_string()));
        }
    };
    if frame.namespace != DEFAULT_NAMESPACE {
        debug!(namespace = %frame.namespace, "Ignoring packet for other namespace");
        return Flow::Continue;
    }

    match frame.packet {
        SocketPacket::Connect(_) => {
            if *connected {
                return Flow::Continue;
            }
            *connected = true;
            info!("Socket connected");
            deliver(events, TransportEvent::Connected)
        }
        SocketPacket::Disconnect => Flow::ServerDisconnect,
        SocketPacket::Event { name, args, .. } => match InboundEvent::decode(&name, &args) {
            Ok(event) => deliver(events, TransportEvent::Inbound(event)),
            Err(e) => {
                warn!(event = %name, error = %e, "Dropping undecodable event");
                deliver(events, TransportEvent::Error(e.to_string()))
            }
        },
        SocketPacket::Ack { ack_id, .. } => {
            debug!(ack_id, "Ignoring unexpected ack");
            Flow::Continue
        }
        SocketPacket::ConnectError(data) => {
            let reason = data
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| data.to_string());
            error!(reason = %reason, "Server refused socket connect");
            let _ = events.send(TransportEvent::Error(format!("Connect error: {reason}")));
            Flow::Failed
        }
    }
}

fn deliver(events: &mpsc::UnboundedSender<TransportEvent>, event: TransportEvent) -> Flow {
    if events.send(event).is_err() {
        Flow::Listenerless
    } else {
        Flow::Continue
    }
}

fn dropped(was_connected: bool, reason: DisconnectReason) -> SessionEnd {
    SessionEnd::Dropped {
        reason,
        was_connected,
    }
}

fn encode_event(event: &OutboundEvent) -> Result<String, String> {
    let payload = event.payload().map_err(|e| e.to_string())?;
    codec::event_frame(event.name(), payload).map_err(|e| e.to_string())
}

async fn send_frame<S>(write: &mut S, frame: String) -> Result<(), S::Error>
where
    S: futures_util::Sink<WsMessage> + Unpin,
{
    write.send(WsMessage::Text(frame.into())).await
}

async fn close_socket<S>(write: &mut S, connected: bool)
where
    S: futures_util::Sink<WsMessage> + Unpin,
{
    if connected {
        if let Ok(frame) = codec::message_frame(&SocketPacket::Disconnect) {
            let _ = send_frame(write, frame).await;
        }
    }
    let _ = write.send(WsMessage::Close(None)).await;
    info!("Closed chat connection");
}
