//! Identifier registries for Cinder.
//!
//! - [`Manifest`]: the per-version list of ids a client knows, loaded
//!   from JSON.
//! - [`NetworkIdRegistry`]: internal id ↔ network id for one category,
//!   grouped per version in [`VersionRegistries`] and
//!   [`NetworkRegistries`].
//! - [`ItemCatalog`]: the server's item types, independent of protocol
//!   version.
//!
//! Everything here is built once at startup and then shared read-only.

mod catalog;
mod error;
mod manifest;
mod network;

pub use catalog::{DEFAULT_MAX_STACK_SIZE, ItemCatalog, ItemDefinition, ItemType};
pub use error::RegistryError;
pub use manifest::{Manifest, ManifestEntry, ProtocolVersion};
pub use network::{
    BLOCKS, ITEMS, NetworkEntry, NetworkIdRegistry, NetworkRegistries, VersionRegistries, WINDOWS,
};
