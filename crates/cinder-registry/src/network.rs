//! Internal id ↔ network id tables.
//!
//! Internal ids are the server's stable string identifiers
//! (`minecraft:stone`). Network ids are the small integers a particular
//! client version expects on the wire. A [`NetworkIdRegistry`] holds both
//! directions for one category of one protocol version, and never changes
//! after it is built.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::{Manifest, ManifestEntry, ProtocolVersion, RegistryError};

/// Category names the server relies on.
pub const ITEMS: &str = "items";
pub const BLOCKS: &str = "blocks";
pub const WINDOWS: &str = "windows";

/// What a network id decodes back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkEntry<'a> {
    pub id: &'a str,
    /// Zero-based state within the entry's run. Always 0 for single-state
    /// entries.
    pub state: u32,
}

#[derive(Debug, Clone)]
struct Slot {
    base: i32,
    states: u32,
}

/// Bidirectional id table for one category.
#[derive(Debug, Clone)]
pub struct NetworkIdRegistry {
    kind: String,
    by_internal: HashMap<String, Slot>,
    /// Indexed by network id; the entry owning each id.
    by_network: Vec<(Arc<str>, u32)>,
}

impl NetworkIdRegistry {
    /// Returned by [`resolve`](Self::resolve) for ids with no mapping.
    pub const UNMAPPED: i32 = -1;

    /// Builds a table from manifest entries. Network ids are assigned by
    /// position; an entry with `n` states owns `n` consecutive ids.
    pub fn from_entries(
        kind: impl Into<String>,
        entries: &[ManifestEntry],
    ) -> Result<Self, RegistryError> {
        let kind = kind.into();
        let mut by_internal = HashMap::with_capacity(entries.len());
        let mut by_network = Vec::with_capacity(entries.len());

        for entry in entries {
            if entry.states == 0 {
                return Err(RegistryError::InvalidStateCount {
                    id: entry.id.clone(),
                    states: entry.states,
                });
            }
            let base = i32::try_from(by_network.len()).map_err(|_| {
                RegistryError::InvalidStateCount {
                    id: entry.id.clone(),
                    states: entry.states,
                }
            })?;
            let slot = Slot {
                base,
                states: entry.states,
            };
            if by_internal.insert(entry.id.clone(), slot).is_some() {
                return Err(RegistryError::DuplicateId {
                    kind,
                    id: entry.id.clone(),
                });
            }
            let shared: Arc<str> = Arc::from(entry.id.as_str());
            for state in 0..entry.states {
                by_network.push((Arc::clone(&shared), state));
            }
        }

        tracing::debug!(
            kind = %kind,
            entries = by_internal.len(),
            network_ids = by_network.len(),
            "network id registry built"
        );
        Ok(Self {
            kind,
            by_internal,
            by_network,
        })
    }

    /// The category this table covers (`items`, `blocks`, ...).
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Network id of an internal id's first state, or [`UNMAPPED`](Self::UNMAPPED).
    pub fn resolve(&self, internal: &str) -> i32 {
        self.get(internal).unwrap_or(Self::UNMAPPED)
    }

    /// Network id of an internal id's first state.
    pub fn get(&self, internal: &str) -> Option<i32> {
        self.by_internal.get(internal).map(|slot| slot.base)
    }

    /// Network id of a specific state. `None` if the id is unknown or the
    /// state is out of range.
    pub fn state_id(&self, internal: &str, state: u32) -> Option<i32> {
        let slot = self.by_internal.get(internal)?;
        if state >= slot.states {
            return None;
        }
        Some(slot.base + state as i32)
    }

    /// Number of states registered for an internal id.
    pub fn state_count(&self, internal: &str) -> Option<u32> {
        self.by_internal.get(internal).map(|slot| slot.states)
    }

    /// Decode-side lookup. Unknown ids are a hard failure.
    pub fn internal_id(&self, network: i32) -> Result<NetworkEntry<'_>, RegistryError> {
        usize::try_from(network)
            .ok()
            .and_then(|idx| self.by_network.get(idx))
            .map(|(id, state)| NetworkEntry {
                id: id.as_ref(),
                state: *state,
            })
            .ok_or_else(|| RegistryError::UnknownNetworkId {
                kind: self.kind.clone(),
                id: network,
            })
    }

    /// Number of internal ids (not network ids).
    pub fn len(&self) -> usize {
        self.by_internal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_internal.is_empty()
    }

    /// Total network ids, counting every state.
    pub fn network_id_count(&self) -> usize {
        self.by_network.len()
    }

    /// Internal ids with their first network id, in network id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.by_network
            .iter()
            .enumerate()
            .filter(|(_, (_, state))| *state == 0)
            .map(|(idx, (id, _))| (&**id, idx as i32))
    }
}

// ---------------------------------------------------------------------------
// Per-version set
// ---------------------------------------------------------------------------

/// The tables for one protocol version.
#[derive(Debug, Clone)]
pub struct VersionRegistries {
    pub version: ProtocolVersion,
    pub items: NetworkIdRegistry,
    pub blocks: NetworkIdRegistry,
    pub windows: NetworkIdRegistry,
}

impl VersionRegistries {
    /// Builds every table the server needs from one manifest.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self, RegistryError> {
        let version = manifest.protocol_version;
        let table = |category: &str| -> Result<NetworkIdRegistry, RegistryError> {
            let entries =
                manifest
                    .category(category)
                    .ok_or_else(|| RegistryError::MissingCategory {
                        version,
                        category: category.to_owned(),
                    })?;
            NetworkIdRegistry::from_entries(category, entries)
        };
        Ok(Self {
            version,
            items: table(ITEMS)?,
            blocks: table(BLOCKS)?,
            windows: table(WINDOWS)?,
        })
    }
}

/// Registries for every protocol version the server speaks.
#[derive(Debug, Clone, Default)]
pub struct NetworkRegistries {
    versions: BTreeMap<ProtocolVersion, Arc<VersionRegistries>>,
}

impl NetworkRegistries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the tables for the manifest's version.
    pub fn load(&mut self, manifest: &Manifest) -> Result<Arc<VersionRegistries>, RegistryError> {
        let tables = Arc::new(VersionRegistries::from_manifest(manifest)?);
        tracing::info!(version = %tables.version, "loaded network registries");
        self.versions.insert(tables.version, Arc::clone(&tables));
        Ok(tables)
    }

    pub fn get(&self, version: ProtocolVersion) -> Result<Arc<VersionRegistries>, RegistryError> {
        self.versions
            .get(&version)
            .cloned()
            .ok_or(RegistryError::UnsupportedVersion(version))
    }

    pub fn versions(&self) -> impl Iterator<Item = ProtocolVersion> + '_ {
        self.versions.keys().copied()
    }
}
