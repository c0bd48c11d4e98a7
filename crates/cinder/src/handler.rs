//! Per-connection handler: framing, keep-alives, locale and dispatch.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Wait for the first frame (handshake timeout)
//!   2. Loop: receive frame → decode → answer keep-alives / record locale
//!      / pass to the [`PacketHandler`] → encode and send its replies
//!
//! A separate task sends keep-alive probes while the connection lives.
//!
//! Every decode or encode failure is routed through
//! [`ProtocolError::disposition`]: framing corruption closes the
//! connection, bad content drops one message, and values the server
//! itself could not encode are logged as bugs.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use cinder_protocol::messages::{Disconnect, KeepAlive};
use cinder_protocol::{
    Clientbound, CodecContext, Disposition, MessageSet, ProtocolError, Serverbound, Text,
};
use cinder_transport::{Connection, ConnectionId, TcpConnection};
use tokio::task::JoinHandle;

use crate::server::ServerState;
use crate::CinderError;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// What the server knows about one connected client.
#[derive(Debug, Clone)]
pub struct Session {
    id: ConnectionId,
    peer: SocketAddr,
    locale: String,
}

impl Session {
    pub fn new(id: ConnectionId, peer: SocketAddr, locale: impl Into<String>) -> Self {
        Self {
            id,
            peer,
            locale: locale.into(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// The locale outbound text is rendered in. Starts as the server
    /// default and follows the client's `ClientSettings`.
    pub fn locale(&self) -> &str {
        &self.locale
    }
}

// ---------------------------------------------------------------------------
// PacketHandler
// ---------------------------------------------------------------------------

/// Application hook for inbound messages.
///
/// Keep-alives never reach the handler. `ClientSettings` does, after the
/// session's locale has been updated.
///
/// Replies are encoded with the session's locale and sent in order.
pub trait PacketHandler: Send + Sync + 'static {
    /// Messages to send as soon as the connection is accepted.
    fn on_connect(&self, _session: &Session) -> impl Future<Output = Vec<Clientbound>> + Send {
        async { Vec::new() }
    }

    /// Handles one decoded message.
    ///
    /// An `Err` is logged and the connection keeps going, unless it is a
    /// transport error.
    fn handle(
        &self,
        session: &Session,
        message: Serverbound,
    ) -> impl Future<Output = Result<Vec<Clientbound>, CinderError>> + Send;

    fn on_disconnect(&self, _session: &Session) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// A handler that ignores everything.
impl PacketHandler for () {
    async fn handle(
        &self,
        _session: &Session,
        _message: Serverbound,
    ) -> Result<Vec<Clientbound>, CinderError> {
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// Keep-alive
// ---------------------------------------------------------------------------

/// The probe the server is waiting to see echoed.
type PendingPing = Arc<Mutex<Option<(i64, Instant)>>>;

/// Aborts the keep-alive task when the handler exits, even on panic.
struct KeepAliveGuard(JoinHandle<()>);

impl Drop for KeepAliveGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn spawn_keep_alive<H: PacketHandler>(
    conn: Arc<TcpConnection>,
    state: Arc<ServerState<H>>,
    pending: PendingPing,
    interval: Duration,
) -> KeepAliveGuard {
    KeepAliveGuard(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let id = rand::random::<i64>();
            *pending.lock().unwrap_or_else(PoisonError::into_inner) = Some((id, Instant::now()));
            let message = Clientbound::KeepAlive(KeepAlive { id });
            let ctx = CodecContext::new(&state.registries, &state.config.default_locale);
            if let Err(e) = send_message(&conn, &state, &ctx, &message).await {
                tracing::debug!(id = %conn.id(), error = %e, "keep-alive send failed");
                break;
            }
        }
    }))
}

// ---------------------------------------------------------------------------
// Connection loop
// ---------------------------------------------------------------------------

/// What to do after a frame has been processed.
enum Flow {
    Continue,
    Close(String),
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<H: PacketHandler>(
    conn: TcpConnection,
    state: Arc<ServerState<H>>,
) -> Result<(), CinderError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    let mut session = Session::new(conn_id, conn.peer_addr(), state.config.default_locale.clone());
    tracing::debug!(%conn_id, peer = %session.peer, "handling new connection");

    let pending: PendingPing = Arc::new(Mutex::new(None));
    let _keep_alive = state
        .config
        .keep_alive_interval()
        .map(|interval| spawn_keep_alive(Arc::clone(&conn), Arc::clone(&state), Arc::clone(&pending), interval));

    let greeting = state.handler.on_connect(&session).await;
    send_replies(&conn, &state, &session, &greeting).await?;

    let result = message_loop(&conn, &state, &mut session, &pending).await;

    state.handler.on_disconnect(&session).await;
    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
    tracing::info!(%conn_id, "connection closed");
    result
}

async fn message_loop<H: PacketHandler>(
    conn: &TcpConnection,
    state: &ServerState<H>,
    session: &mut Session,
    pending: &PendingPing,
) -> Result<(), CinderError> {
    let conn_id = session.id;
    let mut timeout = state.config.handshake_timeout();

    loop {
        let frame = match tokio::time::timeout(timeout, conn.recv()).await {
            Ok(Ok(Some(frame))) => frame,
            Ok(Ok(None)) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                return Ok(());
            }
            Ok(Err(e)) if e.is_framing_corruption() => {
                tracing::warn!(%conn_id, error = %e, "unreadable frame, closing");
                return Err(e.into());
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                return Err(e.into());
            }
            Err(_) => {
                tracing::info!(%conn_id, after = ?timeout, "connection timed out");
                return Ok(());
            }
        };
        timeout = state.config.idle_timeout();

        match process_frame(conn, state, session, pending, &frame).await? {
            Flow::Continue => {}
            Flow::Close(reason) => {
                let disconnect = Clientbound::Disconnect(Disconnect {
                    reason: Text::literal(reason),
                });
                send_replies(conn, state, session, std::slice::from_ref(&disconnect)).await?;
                return Ok(());
            }
        }
    }
}

async fn process_frame<H: PacketHandler>(
    conn: &TcpConnection,
    state: &ServerState<H>,
    session: &mut Session,
    pending: &PendingPing,
    frame: &[u8],
) -> Result<Flow, CinderError> {
    let conn_id = session.id;
    let mut buf = state.pool.acquire();
    buf.write_bytes(frame)?;

    let decoded = {
        let ctx = CodecContext::new(&state.registries, &session.locale);
        state.table.decode(&ctx, &mut buf)
    };
    let message = match decoded {
        Ok(message) => message,
        Err(e) => return Ok(apply_disposition(conn_id, &e, "inbound")),
    };
    tracing::debug!(%conn_id, kind = ?message.kind(), len = frame.len(), "message received");

    match message {
        Serverbound::KeepAlive(KeepAlive { id }) => {
            // An answer to our own probe ends here; anything else is the
            // client probing us and gets echoed.
            let answered = {
                let mut slot = pending.lock().unwrap_or_else(PoisonError::into_inner);
                match *slot {
                    Some((expected, sent_at)) if expected == id => {
                        *slot = None;
                        Some(sent_at.elapsed())
                    }
                    _ => None,
                }
            };
            match answered {
                Some(rtt) => tracing::trace!(%conn_id, ?rtt, "keep-alive answered"),
                None => {
                    let echo = Clientbound::KeepAlive(KeepAlive { id });
                    send_replies(conn, state, session, std::slice::from_ref(&echo)).await?;
                }
            }
            return Ok(Flow::Continue);
        }
        Serverbound::ClientSettings(ref settings) => {
            let locale = settings.locale.to_lowercase();
            if locale != session.locale {
                tracing::debug!(%conn_id, from = %session.locale, to = %locale, "locale changed");
                session.locale = locale;
            }
        }
        _ => {}
    }

    match state.handler.handle(session, message).await {
        Ok(replies) => send_replies(conn, state, session, &replies).await?,
        Err(CinderError::Transport(e)) => return Err(e.into()),
        Err(CinderError::Protocol(e)) => return Ok(apply_disposition(conn_id, &e, "handler")),
        Err(e) => tracing::warn!(%conn_id, error = %e, "handler failed"),
    }
    Ok(Flow::Continue)
}

/// Logs `err` at the level its disposition calls for.
fn apply_disposition(conn_id: ConnectionId, err: &ProtocolError, stage: &'static str) -> Flow {
    match err.disposition() {
        Disposition::CloseConnection => {
            tracing::warn!(%conn_id, stage, error = %err, "corrupt stream, closing");
            Flow::Close(format!("Protocol error: {err}"))
        }
        Disposition::DropMessage => {
            tracing::warn!(%conn_id, stage, error = %err, "message dropped");
            Flow::Continue
        }
        Disposition::ServerBug => {
            tracing::error!(%conn_id, stage, error = %err, "server produced an unencodable value");
            Flow::Continue
        }
    }
}

// ---------------------------------------------------------------------------
// Sending
// ---------------------------------------------------------------------------

async fn send_replies<H: PacketHandler>(
    conn: &TcpConnection,
    state: &ServerState<H>,
    session: &Session,
    replies: &[Clientbound],
) -> Result<(), CinderError> {
    let ctx = CodecContext::new(&state.registries, &session.locale);
    for reply in replies {
        match send_message(conn, state, &ctx, reply).await {
            Ok(()) => {}
            Err(CinderError::Protocol(e)) => {
                apply_disposition(session.id, &e, "outbound");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Encodes one message into a pooled buffer and sends it as a frame.
async fn send_message<H: PacketHandler>(
    conn: &TcpConnection,
    state: &ServerState<H>,
    ctx: &CodecContext<'_>,
    message: &Clientbound,
) -> Result<(), CinderError> {
    let mut buf = state.pool.acquire();
    state.table.encode_into(ctx, &mut buf, message)?;
    let bytes = buf.to_vec();
    drop(buf);
    conn.send(&bytes).await?;
    tracing::trace!(id = %conn.id(), kind = ?message.kind(), len = bytes.len(), "message sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framing_corruption_closes() {
        let err = ProtocolError::from(cinder_buffer::BufferError::MalformedVarInt);
        assert!(matches!(
            apply_disposition(ConnectionId::new(1), &err, "inbound"),
            Flow::Close(_)
        ));
    }

    #[test]
    fn test_bad_content_is_dropped() {
        let err = ProtocolError::UnknownOpcode(0x70);
        assert!(matches!(
            apply_disposition(ConnectionId::new(1), &err, "inbound"),
            Flow::Continue
        ));
        let err = ProtocolError::Unencodable("mod:ghost".into());
        assert!(matches!(
            apply_disposition(ConnectionId::new(1), &err, "outbound"),
            Flow::Continue
        ));
    }

    #[test]
    fn test_session_starts_with_given_locale() {
        let session = Session::new(ConnectionId::new(3), "127.0.0.1:1".parse().unwrap(), "fr_fr");
        assert_eq!(session.locale(), "fr_fr");
        assert_eq!(session.id(), ConnectionId::new(3));
    }
}
