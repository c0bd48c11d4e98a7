//! Transport abstraction layer for Cinder.
//!
//! Provides the [`Transport`] and [`Connection`] traits that hide how
//! frames reach the server, and a [`TcpTransport`] that carries them as
//! varint length-prefixed chunks over plain TCP.
//!
//! A connection moves whole frames. It never looks inside them; opcodes
//! and payloads belong to `cinder-protocol`.

#![allow(async_fn_in_trait)]

mod error;
mod frame;
mod tcp;

pub use error::TransportError;
pub use frame::{read_frame, write_frame, DEFAULT_MAX_FRAME_LEN};
pub use tcp::{TcpConnection, TcpTransport};

use std::fmt;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Stops handing out new connections.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// A single connection that sends and receives whole frames.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Sends one frame to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the sending side of the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
        assert_eq!(ConnectionId::new(7).into_inner(), 7);
    }

    #[test]
    fn test_connection_id_works_as_map_key() {
        use std::collections::HashMap;
        let mut locales = HashMap::new();
        locales.insert(ConnectionId::new(1), "en_us");
        locales.insert(ConnectionId::new(2), "de_de");
        assert_eq!(locales[&ConnectionId::new(2)], "de_de");
    }

    #[test]
    fn test_framing_errors_are_classified() {
        assert!(TransportError::MalformedFrame("x".into()).is_framing_corruption());
        assert!(!TransportError::Shutdown.is_framing_corruption());
    }
}
