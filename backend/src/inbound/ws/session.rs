//! Per-connection WebSocket session loop.
//!
//! Keeps framing and heartbeats at the edge; room membership and delivery
//! go through the [`ConnectionRegistry`]. The loop multiplexes three
//! sources: the heartbeat interval, frames from the client, and pushes
//! queued for this user. The public contract pings every 5s and considers
//! the peer gone after 10s of silence.

use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_ws::{CloseCode, CloseReason, Closed, Message, MessageStream, ProtocolError, Session};
use tokio::time;
use tracing::warn;

use crate::inbound::ws::messages::{ClientFrame, RoomBroadcast};
use crate::outbound::realtime::{ConnectionHandle, ConnectionRegistry};

#[cfg(not(test))]
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
#[cfg(test)]
const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(50);

#[cfg(not(test))]
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);
#[cfg(test)]
const CLIENT_TIMEOUT: Duration = Duration::from_millis(100);

enum SessionEnd {
    ClientClosed(Option<CloseReason>),
    StreamClosed,
    HeartbeatTimeout,
    Protocol(ProtocolError),
    /// The registry handed this user's slot to a newer connection.
    Replaced,
    Network(Closed),
}

pub(super) async fn run_session(
    registry: Arc<ConnectionRegistry>,
    user_id: String,
    session: Session,
    stream: MessageStream,
    handle: ConnectionHandle,
) {
    let connection_id = handle.connection_id;
    let end = session_loop(&registry, &user_id, session, stream, handle).await;
    log_session_end(&user_id, &end);
    // Only this session's own registration is removed; a replacement stays.
    registry.disconnect(&user_id, connection_id);
}

async fn session_loop(
    registry: &ConnectionRegistry,
    user_id: &str,
    mut session: Session,
    mut stream: MessageStream,
    mut handle: ConnectionHandle,
) -> SessionEnd {
    let mut last_heartbeat = Instant::now();
    let mut heartbeat = time::interval(HEARTBEAT_INTERVAL);

    loop {
        let end = tokio::select! {
            _ = heartbeat.tick() => {
                if Instant::now().duration_since(last_heartbeat) > CLIENT_TIMEOUT {
                    Some(SessionEnd::HeartbeatTimeout)
                } else {
                    session.ping(b"").await.err().map(SessionEnd::Network)
                }
            }
            message = stream.recv() => match message {
                None => Some(SessionEnd::StreamClosed),
                Some(Err(err)) => Some(SessionEnd::Protocol(err)),
                Some(Ok(message)) => {
                    handle_client_message(
                        registry,
                        user_id,
                        &mut session,
                        &mut last_heartbeat,
                        message,
                    )
                    .await
                }
            },
            push = handle.receiver.recv() => match push {
                Some(frame) => session.text(frame).await.err().map(SessionEnd::Network),
                None => Some(SessionEnd::Replaced),
            },
        };

        if let Some(end) = end {
            close_session(session, &end).await;
            return end;
        }
    }
}

async fn handle_client_message(
    registry: &ConnectionRegistry,
    user_id: &str,
    session: &mut Session,
    last_heartbeat: &mut Instant,
    message: Message,
) -> Option<SessionEnd> {
    *last_heartbeat = Instant::now();
    match message {
        Message::Ping(payload) => session.pong(&payload).await.err().map(SessionEnd::Network),
        Message::Text(text) => {
            handle_text_frame(registry, user_id, text.as_ref());
            None
        }
        Message::Pong(_) | Message::Binary(_) | Message::Continuation(_) | Message::Nop => None,
        Message::Close(reason) => Some(SessionEnd::ClientClosed(reason)),
    }
}

fn handle_text_frame(registry: &ConnectionRegistry, user_id: &str, text: &str) {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(err) => {
            // Malformed frames are dropped without ending the session; the
            // channel also carries pushes the client still needs.
            warn!(user_id, error = %err, "ignoring malformed WebSocket frame");
            return;
        }
    };
    match frame {
        ClientFrame::JoinRoom { room } => registry.join_room(user_id, &room),
        ClientFrame::LeaveRoom { room } => registry.leave_room(user_id, &room),
        ClientFrame::RoomMessage { room, payload } => {
            let broadcast = RoomBroadcast::new(&room, user_id, &payload);
            match serde_json::to_string(&broadcast) {
                Ok(encoded) => registry.broadcast_to_room(&room, &encoded),
                Err(err) => warn!(user_id, error = %err, "room broadcast failed to serialize"),
            }
        }
    }
}

fn log_session_end(user_id: &str, end: &SessionEnd) {
    match end {
        SessionEnd::HeartbeatTimeout => {
            warn!(user_id, "WebSocket heartbeat timeout; closing connection");
        }
        SessionEnd::Protocol(err) => {
            warn!(user_id, error = %err, "WebSocket protocol error");
        }
        SessionEnd::Network(_) => {
            warn!(user_id, "WebSocket send failed; closing connection");
        }
        SessionEnd::ClientClosed(_) | SessionEnd::StreamClosed | SessionEnd::Replaced => {}
    }
}

async fn close_session(session: Session, end: &SessionEnd) {
    let reason = match end {
        SessionEnd::HeartbeatTimeout => Some(CloseReason {
            code: CloseCode::Normal,
            description: Some("heartbeat timeout".to_owned()),
        }),
        SessionEnd::Protocol(_) => Some(CloseReason {
            code: CloseCode::Protocol,
            description: Some("protocol error".to_owned()),
        }),
        SessionEnd::Replaced => Some(CloseReason {
            code: CloseCode::Policy,
            description: Some("connection replaced".to_owned()),
        }),
        SessionEnd::ClientClosed(reason) => reason.clone(),
        SessionEnd::StreamClosed | SessionEnd::Network(_) => return,
    };
    // A failed close means the peer is already gone.
    let _ = session.close(reason).await;
}
