//! The WebSocket gateway's accept loop (`spec.md` §4.10, §6).
//!
//! Unlike the teacher's bare `accept_async` handshake, a connection here
//! must carry a valid bearer token in its `Authorization` header: the
//! token is extracted and validated during the handshake itself via
//! [`accept_hdr_async`], so an unauthenticated peer never reaches
//! [`gc_events::run_session`].

use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing::{debug, info, warn};

use gc_auth::Claims;
use gc_events::{run_session, SessionDeps, UserId};

use crate::error::{Result, ServerError};
use crate::state::AppState;

/// Bind and accept connections until the listener errors fatally.
///
/// # Errors
///
/// Returns [`ServerError::BindFailed`] if the address cannot be bound.
pub async fn serve(state: Arc<AppState>, bind_addr: SocketAddr, max_connections: usize) -> Result<()> {
    let listener = TcpListener::bind(bind_addr).await.map_err(|e| ServerError::BindFailed(bind_addr, e))?;
    info!(%bind_addr, "gateway listening");

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "failed to accept tcp connection");
                continue;
            }
        };

        let active = state.events.session_count();
        if active >= max_connections {
            warn!(%peer_addr, active, max_connections, "connection rejected: at capacity");
            continue;
        }

        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(&state, stream, peer_addr).await {
                debug!(%peer_addr, error = %e, "session ended with error");
            }
        });
    }
}

async fn handle_connection(state: &Arc<AppState>, stream: TcpStream, peer_addr: SocketAddr) -> Result<()> {
    let claims_cell: Arc<StdMutex<Option<Claims>>> = Arc::new(StdMutex::new(None));
    let captured = claims_cell.clone();
    let auth = state.auth.clone();

    let callback = move |request: &Request, response: Response| -> std::result::Result<Response, ErrorResponse> {
        let Some(token) = bearer_token(request) else {
            return Err(rejection("missing bearer token"));
        };
        match auth.validate_token(token) {
            Ok(claims) => {
                if let Ok(mut slot) = captured.lock() {
                    *slot = Some(claims);
                }
                Ok(response)
            }
            Err(_) => Err(rejection("invalid or expired bearer token")),
        }
    };

    let ws_stream = accept_hdr_async(stream, callback).await.map_err(|e| {
        warn!(%peer_addr, error = %e, "websocket handshake rejected");
        ServerError::Unauthorized
    })?;

    let claims = claims_cell.lock().ok().and_then(|mut slot| slot.take()).ok_or(ServerError::Unauthorized)?;
    let user_id = UserId::from_uuid(claims.sub.as_uuid());

    state.user_tenants.insert(claims.sub.as_uuid(), claims.tenant_id.as_uuid());
    state.known_tenants.write().insert(claims.tenant_id.as_uuid());

    let (session_id, outbound_rx, control_rx) = state.events.register(user_id);
    info!(%peer_addr, %user_id, %session_id, "session authenticated");

    let deps = SessionDeps { authorizer: state.room_authorizer.clone(), handler: state.inbound_handler.clone() };
    let result = run_session(ws_stream, session_id, user_id, state.events.clone(), deps, outbound_rx, control_rx).await;
    state.events.remove(session_id);
    result.map_err(Into::into)
}

fn bearer_token(request: &Request) -> Option<&str> {
    request.headers().get("authorization")?.to_str().ok()?.strip_prefix("Bearer ")
}

fn rejection(reason: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(reason.to_string()));
    *response.status_mut() = StatusCode::UNAUTHORIZED;
    response
}
