//! The explicit context threaded through every codec call.

use std::sync::Arc;

use cinder_registry::{ItemCatalog, Manifest, NetworkRegistries, ProtocolVersion, VersionRegistries};

use crate::text::{DEFAULT_LOCALE, Translations};
use crate::types::TypeRegistry;
use crate::ProtocolError;

/// Everything a codec may look up, for one protocol version.
///
/// Built once at startup and shared behind an `Arc`.
#[derive(Debug)]
pub struct ProtocolRegistries {
    pub network: Arc<VersionRegistries>,
    pub catalog: ItemCatalog,
    pub types: TypeRegistry,
    pub translations: Translations,
}

impl ProtocolRegistries {
    pub fn new(
        network: Arc<VersionRegistries>,
        catalog: ItemCatalog,
        types: TypeRegistry,
        translations: Translations,
    ) -> Self {
        Self {
            network,
            catalog,
            types,
            translations,
        }
    }

    /// Registries built from one manifest with the standard value types
    /// and no server-side translations.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self, ProtocolError> {
        let network = NetworkRegistries::new().load(manifest)?;
        let catalog = ItemCatalog::from_manifest(manifest)?;
        Ok(Self::new(
            network,
            catalog,
            TypeRegistry::standard()?,
            Translations::new(),
        ))
    }

    /// [`from_manifest`](Self::from_manifest) over the bundled manifest.
    pub fn builtin() -> Result<Self, ProtocolError> {
        Self::from_manifest(&Manifest::builtin()?)
    }

    pub fn version(&self) -> ProtocolVersion {
        self.network.version
    }
}

/// Per-call context: shared registries plus the connection's locale.
#[derive(Debug, Clone, Copy)]
pub struct CodecContext<'a> {
    pub registries: &'a ProtocolRegistries,
    pub locale: &'a str,
}

impl<'a> CodecContext<'a> {
    pub fn new(registries: &'a ProtocolRegistries, locale: &'a str) -> Self {
        Self { registries, locale }
    }

    /// Context for the default locale.
    pub fn default_locale(registries: &'a ProtocolRegistries) -> Self {
        Self::new(registries, DEFAULT_LOCALE)
    }
}
