//! Error types for the protocol layer.
//!
//! A [`ProtocolError`] always comes with a [`Disposition`]: what the
//! connection handler should do about it. Callers never have to pattern
//! match on the variants to decide whether a peer gets disconnected.

use cinder_buffer::BufferError;
use cinder_registry::RegistryError;

/// Errors that can occur while encoding or decoding messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Reading or writing the underlying bytes failed.
    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// An id lookup failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The server tried to send something the client can't represent,
    /// such as an item with no network id and no substitute.
    #[error("unencodable value: {0}")]
    Unencodable(String),

    /// The frame's opcode has no decoder in this protocol version.
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(i32),

    /// An entity metadata entry named a type code nobody registered.
    #[error("unknown value type code {0}")]
    UnknownTypeCode(i32),

    /// A dynamic value was written through a type of a different kind.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A rich text field was not valid JSON.
    #[error("invalid text: {0}")]
    InvalidText(#[from] serde_json::Error),

    /// The bytes parsed but the message breaks a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

/// What the connection should do after an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The byte stream can no longer be trusted.
    CloseConnection,
    /// Skip this message and keep reading.
    DropMessage,
    /// The server produced something invalid. Log loudly, keep the
    /// connection.
    ServerBug,
}

impl ProtocolError {
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::Buffer(err) if err.is_framing_corruption() => {
                Disposition::CloseConnection
            }
            Self::Buffer(BufferError::CapacityExceeded { .. }) => Disposition::ServerBug,
            Self::Buffer(_) => Disposition::DropMessage,
            Self::Registry(
                RegistryError::UnknownNetworkId { .. }
                | RegistryError::UnknownInternalId { .. },
            ) => Disposition::DropMessage,
            Self::Registry(_) => Disposition::ServerBug,
            Self::Unencodable(_) | Self::TypeMismatch { .. } => Disposition::ServerBug,
            Self::UnknownOpcode(_)
            | Self::UnknownTypeCode(_)
            | Self::InvalidText(_)
            | Self::InvalidMessage(_) => Disposition::DropMessage,
        }
    }
}
