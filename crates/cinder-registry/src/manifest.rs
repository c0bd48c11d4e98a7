//! The static manifest that network ids are assigned from.
//!
//! A manifest lists, per category, every internal id the client knows
//! about in canonical order. The position in that list *is* the network
//! id, with multi-state entries (blocks) reserving one id per state:
//!
//! ```json
//! {
//!   "protocol_version": 340,
//!   "categories": {
//!     "blocks": ["minecraft:air", { "id": "minecraft:stone", "states": 7 }]
//!   }
//! }
//! ```
//!
//! Here `air` is 0 and `stone` owns 1..=7.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::RegistryError;

/// The manifest shipped with the crate.
const BUILTIN_MANIFEST: &str = include_str!("../manifests/default.json");

/// A protocol version number as sent by clients in their handshake.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProtocolVersion(pub u32);

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// One manifest entry.
///
/// Deserializes from either a bare string (`"minecraft:stone"`) or an
/// object with optional `states` and `max_stack_size`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawEntry")]
pub struct ManifestEntry {
    pub id: String,
    /// Number of consecutive network ids this entry owns.
    pub states: u32,
    /// Only meaningful for items. `None` means the default of 64.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_stack_size: Option<u8>,
}

impl ManifestEntry {
    /// A single-state entry.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            states: 1,
            max_stack_size: None,
        }
    }

    /// An entry owning `states` consecutive network ids.
    pub fn with_states(id: impl Into<String>, states: u32) -> Self {
        Self {
            states,
            ..Self::new(id)
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Id(String),
    Full {
        id: String,
        #[serde(default = "one")]
        states: u32,
        #[serde(default)]
        max_stack_size: Option<u8>,
    },
}

fn one() -> u32 {
    1
}

impl From<RawEntry> for ManifestEntry {
    fn from(raw: RawEntry) -> Self {
        match raw {
            RawEntry::Id(id) => Self::new(id),
            RawEntry::Full {
                id,
                states,
                max_stack_size,
            } => Self {
                id,
                states,
                max_stack_size,
            },
        }
    }
}

/// All categories for one protocol version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub protocol_version: ProtocolVersion,
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<ManifestEntry>>,
}

impl Manifest {
    /// Parses a manifest from JSON.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The manifest bundled with this crate.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_json(BUILTIN_MANIFEST)
    }

    /// Entries of one category, in canonical order.
    pub fn category(&self, name: &str) -> Option<&[ManifestEntry]> {
        self.categories.get(name).map(Vec::as_slice)
    }
}
