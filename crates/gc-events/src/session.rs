//! Per-connection WebSocket session loop.
//!
//! Mirrors `claw-gateway-server::session::run_session`'s shape: a
//! `read_task` that owns the inbound half of the stream and a
//! `write_task` that owns the outbound half, run concurrently via
//! `tokio::select!` and joined by a response channel from the former to
//! the latter.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::ports::{InboundHandler, RoomAuthorizer};
use crate::registry::{ControlMessage, OutboundReceiver, SessionRegistry};
use crate::types::{InboundEnvelope, InboundType, OutboundEnvelope, OutboundType, RoomId, SessionId, UserId};

/// Maximum inbound frame size. `chat.send` bodies are separately capped
/// at `gc_chat::types::MAX_BODY_BYTES` (4 KiB); this is a coarser
/// transport-level ceiling covering the JSON envelope around any frame.
pub const MAX_INBOUND_BYTES: usize = 16 * 1024;

/// Ping cadence (`spec.md` §4.10: "Pings every ≤ 30 s").
pub const PING_INTERVAL: Duration = Duration::from_secs(25);

/// Idle timeout (`spec.md` §4.10: "sessions idle beyond 90 s are terminated").
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Get the byte size of a WebSocket message, for size-limit enforcement.
#[must_use]
pub fn ws_message_size(ws_msg: &WsMessage) -> usize {
    match ws_msg {
        WsMessage::Text(text) => text.len(),
        WsMessage::Binary(data) => data.len(),
        WsMessage::Ping(data) | WsMessage::Pong(data) => data.len(),
        WsMessage::Close(frame) => frame.as_ref().map_or(0, |f| f.reason.len() + 2),
        WsMessage::Frame(frame) => frame.len(),
    }
}

/// Parse the JSON body of a `WsMessage::Text` frame into an
/// [`InboundEnvelope`], enforcing [`MAX_INBOUND_BYTES`] first.
///
/// # Errors
///
/// Returns [`Error::InvalidRequest`] if the frame is oversized or not
/// valid JSON matching the envelope shape.
pub fn parse_inbound(text: &str) -> Result<InboundEnvelope> {
    if text.len() > MAX_INBOUND_BYTES {
        return Err(Error::InvalidRequest(format!("frame exceeds {MAX_INBOUND_BYTES} bytes")));
    }
    serde_json::from_str(text).map_err(|e| Error::InvalidRequest(e.to_string()))
}

/// Serialize an [`OutboundEnvelope`] to the wire `WsMessage::Text` frame.
/// Serialization of this crate's own types cannot fail in practice; a
/// failure degrades to a generic error frame rather than panicking.
#[must_use]
pub fn encode_outbound(envelope: &OutboundEnvelope) -> WsMessage {
    match serde_json::to_string(envelope) {
        Ok(text) => WsMessage::Text(text),
        Err(e) => {
            warn!(error = %e, "failed to encode outbound event, substituting error frame");
            WsMessage::Text(r#"{"type":"error","error":{"code":"InternalServer","message":"encode failure"}}"#.to_string())
        }
    }
}

/// Dependencies a connection task needs beyond the registry itself.
pub struct SessionDeps<A, H> {
    /// Authorizes `room.join` subscriptions.
    pub authorizer: Arc<A>,
    /// Handles `auth.refresh` and `chat.*` frames.
    pub handler: Arc<H>,
}

fn dispatch_room_join(
    registry: &SessionRegistry,
    authorizer: &dyn RoomAuthorizer,
    session_id: SessionId,
    user_id: UserId,
    envelope: &InboundEnvelope,
) -> OutboundEnvelope {
    let room_str = match envelope.data.get("room").and_then(serde_json::Value::as_str) {
        Some(s) => s,
        None => return OutboundEnvelope::error(Some(envelope.op_id.clone()), "InvalidRequest", "missing room"),
    };
    let room = match RoomId::parse(room_str) {
        Ok(room) => room,
        Err(e) => return OutboundEnvelope::error(Some(envelope.op_id.clone()), e.code(), e.to_string()),
    };
    if !authorizer.is_authorized(user_id, room) {
        return OutboundEnvelope::error(Some(envelope.op_id.clone()), "Forbidden", "not an approved member of this room");
    }
    registry.join_room(session_id, room);
    OutboundEnvelope::ack(envelope.op_id.clone())
}

fn dispatch_room_leave(registry: &SessionRegistry, session_id: SessionId, envelope: &InboundEnvelope) -> OutboundEnvelope {
    let room_str = match envelope.data.get("room").and_then(serde_json::Value::as_str) {
        Some(s) => s,
        None => return OutboundEnvelope::error(Some(envelope.op_id.clone()), "InvalidRequest", "missing room"),
    };
    match RoomId::parse(room_str) {
        Ok(room) => {
            registry.leave_room(session_id, room);
            OutboundEnvelope::ack(envelope.op_id.clone())
        }
        Err(e) => OutboundEnvelope::error(Some(envelope.op_id.clone()), e.code(), e.to_string()),
    }
}

fn dispatch_inbound<A: RoomAuthorizer, H: InboundHandler>(
    registry: &SessionRegistry,
    deps: &SessionDeps<A, H>,
    session_id: SessionId,
    user_id: UserId,
    envelope: InboundEnvelope,
) -> OutboundEnvelope {
    match envelope.kind {
        InboundType::RoomJoin => dispatch_room_join(registry, deps.authorizer.as_ref(), session_id, user_id, &envelope),
        InboundType::RoomLeave => dispatch_room_leave(registry, session_id, &envelope),
        InboundType::PresencePing => OutboundEnvelope {
            kind: OutboundType::PresencePong,
            op_id: Some(envelope.op_id.clone()),
            data: None,
            error: None,
        },
        InboundType::AuthRefresh
        | InboundType::ChatSend
        | InboundType::ChatEdit
        | InboundType::ChatDelete
        | InboundType::ChatRedact
        | InboundType::ChatTyping => deps.handler.handle(user_id, &envelope),
    }
}

/// Drive one connection end-to-end: read inbound frames, dispatch them,
/// forward outbound/room events, enforce the ping/idle-timeout contract,
/// and clean up the registry entry on exit.
///
/// # Errors
///
/// Never returns an error from a clean disconnect; only propagates if
/// the registry itself is in an unexpected state (which does not
/// currently happen — reserved so the signature can grow without
/// breaking callers).
#[allow(clippy::too_many_arguments)]
pub async fn run_session<S, A, H>(
    ws_stream: S,
    session_id: SessionId,
    user_id: UserId,
    registry: Arc<SessionRegistry>,
    deps: SessionDeps<A, H>,
    mut outbound_rx: OutboundReceiver,
    mut control_rx: crate::registry::ControlReceiver,
) -> Result<()>
where
    S: StreamExt<Item = std::result::Result<WsMessage, tokio_tungstenite::tungstenite::Error>>
        + futures::Sink<WsMessage>
        + Unpin
        + Send,
    <S as futures::Sink<WsMessage>>::Error: std::fmt::Display,
    A: RoomAuthorizer + 'static,
    H: InboundHandler + 'static,
{
    info!(%session_id, %user_id, "session started");
    let last_activity = Arc::new(Mutex::new(Instant::now()));

    let (mut ws_sink, mut ws_stream) = ws_stream.split();
    let (response_tx, mut response_rx) = tokio::sync::mpsc::channel::<OutboundEnvelope>(32);

    let read_activity = last_activity.clone();
    let read_registry = registry.clone();
    let read_deps = deps;
    let read_task = async move {
        while let Some(msg_result) = ws_stream.next().await {
            let ws_msg = match msg_result {
                Ok(msg) => msg,
                Err(e) => {
                    debug!(%session_id, error = %e, "websocket read error");
                    break;
                }
            };
            match ws_msg {
                WsMessage::Text(text) => {
                    *read_activity.lock() = Instant::now();
                    let reply = match parse_inbound(&text) {
                        Ok(envelope) => dispatch_inbound(&read_registry, &read_deps, session_id, user_id, envelope),
                        Err(e) => OutboundEnvelope::error(None, e.code(), e.to_string()),
                    };
                    if response_tx.send(reply).await.is_err() {
                        break;
                    }
                }
                WsMessage::Ping(_) | WsMessage::Pong(_) => {
                    *read_activity.lock() = Instant::now();
                }
                WsMessage::Close(_) => {
                    debug!(%session_id, "received close frame");
                    break;
                }
                WsMessage::Binary(_) | WsMessage::Frame(_) => {
                    // Binary frames are not part of this protocol; ignore rather
                    // than terminate, matching the teacher's tolerant handling
                    // of unknown frame kinds.
                }
            }
        }
    };

    let write_task = async {
        let mut ping_interval = tokio::time::interval(PING_INTERVAL);
        ping_interval.tick().await; // first tick fires immediately
        loop {
            tokio::select! {
                _ = ping_interval.tick() => {
                    if last_activity.lock().elapsed() > IDLE_TIMEOUT {
                        debug!(%session_id, "idle timeout");
                        break;
                    }
                    if ws_sink.send(WsMessage::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
                maybe_control = control_rx.recv() => {
                    match maybe_control {
                        Some(ControlMessage::Evict(reason)) => {
                            let frame = OutboundEnvelope::error(None, "Forbidden", reason.message());
                            let _ = ws_sink.send(encode_outbound(&frame)).await;
                            break;
                        }
                        None => break,
                    }
                }
                Some(envelope) = response_rx.recv() => {
                    if ws_sink.send(encode_outbound(&envelope)).await.is_err() {
                        break;
                    }
                }
                Some(envelope) = outbound_rx.recv() => {
                    if ws_sink.send(encode_outbound(&envelope)).await.is_err() {
                        break;
                    }
                }
                else => break,
            }
        }
    };

    tokio::select! {
        () = read_task => {}
        () = write_task => {}
    }

    registry.remove(session_id);
    info!(%session_id, "session ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{AllowAllAuthorizer, NoopInboundHandler};

    fn deps() -> SessionDeps<AllowAllAuthorizer, NoopInboundHandler> {
        SessionDeps { authorizer: Arc::new(AllowAllAuthorizer), handler: Arc::new(NoopInboundHandler) }
    }

    fn user() -> UserId {
        UserId::from_uuid(uuid::Uuid::new_v4())
    }

    #[test]
    fn parse_inbound_rejects_oversized_frame() {
        let huge = "x".repeat(MAX_INBOUND_BYTES + 1);
        assert!(matches!(parse_inbound(&huge), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn parse_inbound_rejects_malformed_json() {
        assert!(matches!(parse_inbound("not json"), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn parse_inbound_accepts_well_formed_envelope() {
        let text = r#"{"type":"presence.ping","op_id":"1","data":{}}"#;
        let envelope = parse_inbound(text).unwrap();
        assert_eq!(envelope.kind, InboundType::PresencePing);
        assert_eq!(envelope.op_id, "1");
    }

    #[test]
    fn encode_outbound_round_trips_through_json() {
        let envelope = OutboundEnvelope::ack("op-1");
        let WsMessage::Text(text) = encode_outbound(&envelope) else {
            panic!("expected text frame");
        };
        assert!(text.contains("\"type\":\"ack\""));
        assert!(text.contains("op-1"));
    }

    #[test]
    fn room_join_without_membership_is_forbidden() {
        struct DenyAll;
        impl RoomAuthorizer for DenyAll {
            fn is_authorized(&self, _user_id: UserId, _room: RoomId) -> bool {
                false
            }
        }

        let registry = SessionRegistry::new();
        let user_id = user();
        let (session_id, _outbound_rx, _control_rx) = registry.register(user_id);
        let deps = SessionDeps { authorizer: Arc::new(DenyAll), handler: Arc::new(NoopInboundHandler) };

        let envelope = InboundEnvelope {
            kind: InboundType::RoomJoin,
            op_id: "join-1".to_string(),
            data: serde_json::json!({"room": "host"}),
        };
        let reply = dispatch_inbound(&registry, &deps, session_id, user_id, envelope);
        assert_eq!(reply.kind, OutboundType::Error);
        assert_eq!(reply.error.unwrap().code, "Forbidden");
        assert_eq!(registry.room_size(RoomId::Host), 0);
    }

    #[test]
    fn room_join_with_membership_subscribes_and_acks() {
        let registry = SessionRegistry::new();
        let user_id = user();
        let (session_id, _outbound_rx, _control_rx) = registry.register(user_id);

        let envelope = InboundEnvelope {
            kind: InboundType::RoomJoin,
            op_id: "join-2".to_string(),
            data: serde_json::json!({"room": "host"}),
        };
        let reply = dispatch_inbound(&registry, &deps(), session_id, user_id, envelope);
        assert_eq!(reply.kind, OutboundType::Ack);
        assert_eq!(registry.room_size(RoomId::Host), 1);
    }

    #[test]
    fn room_leave_unsubscribes() {
        let registry = SessionRegistry::new();
        let user_id = user();
        let (session_id, _outbound_rx, _control_rx) = registry.register(user_id);
        registry.join_room(session_id, RoomId::Host);

        let envelope = InboundEnvelope {
            kind: InboundType::RoomLeave,
            op_id: "leave-1".to_string(),
            data: serde_json::json!({"room": "host"}),
        };
        let reply = dispatch_inbound(&registry, &deps(), session_id, user_id, envelope);
        assert_eq!(reply.kind, OutboundType::Ack);
        assert_eq!(registry.room_size(RoomId::Host), 0);
    }

    #[test]
    fn presence_ping_replies_pong_without_touching_rooms() {
        let registry = SessionRegistry::new();
        let user_id = user();
        let (session_id, _outbound_rx, _control_rx) = registry.register(user_id);

        let envelope = InboundEnvelope { kind: InboundType::PresencePing, op_id: "p1".to_string(), data: serde_json::json!({}) };
        let reply = dispatch_inbound(&registry, &deps(), session_id, user_id, envelope);
        assert_eq!(reply.kind, OutboundType::PresencePong);
        assert_eq!(reply.op_id, Some("p1".to_string()));
    }

    #[test]
    fn chat_frame_delegates_to_inbound_handler() {
        let registry = SessionRegistry::new();
        let user_id = user();
        let (session_id, _outbound_rx, _control_rx) = registry.register(user_id);

        let envelope =
            InboundEnvelope { kind: InboundType::ChatSend, op_id: "c1".to_string(), data: serde_json::json!({"body": "hi"}) };
        let reply = dispatch_inbound(&registry, &deps(), session_id, user_id, envelope);
        // NoopInboundHandler always replies with an error frame.
        assert_eq!(reply.kind, OutboundType::Error);
    }
}
