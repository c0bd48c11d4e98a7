//! Error types for the registry layer.

use crate::ProtocolVersion;

/// Errors raised while building or querying registries.
///
/// Build-time variants (`DuplicateId`, `DuplicateType`,
/// `InvalidStateCount`, `Manifest`) are configuration errors: they should
/// stop the server at startup. Lookup variants (`UnknownNetworkId`,
/// `UnknownInternalId`) happen per message.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A network id arrived that has no mapping in this protocol version.
    #[error("unknown {kind} network id {id}")]
    UnknownNetworkId { kind: String, id: i32 },

    /// An internal id isn't registered.
    #[error("unknown {kind} id {id:?}")]
    UnknownInternalId { kind: String, id: String },

    /// The same internal id was registered twice.
    #[error("duplicate {kind} id {id:?}")]
    DuplicateId { kind: String, id: String },

    /// A value type was registered twice under the same name or code.
    #[error("type {0:?} is already registered")]
    DuplicateType(String),

    /// A manifest entry declared zero states.
    #[error("{id:?} declares an invalid state count of {states}")]
    InvalidStateCount { id: String, states: u32 },

    /// A manifest category that the server needs is missing.
    #[error("manifest for {version} has no {category:?} category")]
    MissingCategory {
        version: ProtocolVersion,
        category: String,
    },

    /// No registries were loaded for the requested protocol version.
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(ProtocolVersion),

    /// The manifest document could not be parsed.
    #[error("invalid manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}
