//! Unified error type for the Cinder server.

use std::path::PathBuf;

use cinder_buffer::BufferError;
use cinder_protocol::ProtocolError;
use cinder_registry::RegistryError;
use cinder_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates a `From` impl, so the
/// `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum CinderError {
    /// A transport-level error (accept, framing, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, unknown opcode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Loading or querying id registries failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// The server configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A global tracing subscriber was already installed.
    #[error("logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),
}

/// Errors from reading or validating a [`ServerConfig`](crate::ServerConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: CinderError = TransportError::ConnectionClosed("gone".into()).into();
        assert!(matches!(err, CinderError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: CinderError = ProtocolError::UnknownOpcode(0x42).into();
        assert!(matches!(err, CinderError::Protocol(_)));
        assert_eq!(err.to_string(), "unknown opcode 0x42");
    }

    #[test]
    fn test_from_registry_error() {
        let err: CinderError = RegistryError::DuplicateType("string".into()).into();
        assert!(matches!(err, CinderError::Registry(_)));
    }

    #[test]
    fn test_from_config_error() {
        let err: CinderError = ConfigError::Invalid {
            field: "max_frame_len",
            reason: "must be positive".into(),
        }
        .into();
        assert!(matches!(err, CinderError::Config(_)));
        assert!(err.to_string().contains("max_frame_len"));
    }
}
