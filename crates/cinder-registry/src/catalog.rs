//! The server's own item types.
//!
//! The catalog is the server-side view of items, independent of any
//! protocol version: every item gets a stable numeric id in registration
//! order, a maximum stack size, and (for items the vanilla client has never
//! heard of) the id of a vanilla item to show in its place.

use std::collections::HashMap;

use crate::network::ITEMS;
use crate::{Manifest, RegistryError};

/// Stack size for items that don't declare one.
pub const DEFAULT_MAX_STACK_SIZE: u8 = 64;

/// Everything needed to register an item type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDefinition {
    pub id: String,
    pub max_stack_size: u8,
    /// Internal id of the item the client should display instead.
    pub substitute: Option<String>,
}

impl ItemDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            max_stack_size: DEFAULT_MAX_STACK_SIZE,
            substitute: None,
        }
    }

    pub fn max_stack_size(mut self, size: u8) -> Self {
        self.max_stack_size = size;
        self
    }

    pub fn substitute(mut self, id: impl Into<String>) -> Self {
        self.substitute = Some(id.into());
        self
    }
}

/// A registered item type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemType {
    pub id: String,
    pub internal_id: u32,
    pub max_stack_size: u8,
    pub substitute: Option<String>,
}

impl ItemType {
    /// Items that can't stack get a disambiguation tag on the wire so the
    /// client never merges two of them.
    pub fn is_stackable(&self) -> bool {
        self.max_stack_size > 1
    }
}

/// All registered item types.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    items: Vec<ItemType>,
    index: HashMap<String, u32>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every item in the manifest's `items` category, in order.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self, RegistryError> {
        let entries = manifest
            .category(ITEMS)
            .ok_or_else(|| RegistryError::MissingCategory {
                version: manifest.protocol_version,
                category: ITEMS.to_owned(),
            })?;
        let mut catalog = Self::new();
        for entry in entries {
            let mut def = ItemDefinition::new(entry.id.clone());
            if let Some(size) = entry.max_stack_size {
                def = def.max_stack_size(size);
            }
            catalog.register(def)?;
        }
        Ok(catalog)
    }

    /// Adds an item type and returns its internal numeric id.
    pub fn register(&mut self, def: ItemDefinition) -> Result<u32, RegistryError> {
        if self.index.contains_key(&def.id) {
            return Err(RegistryError::DuplicateId {
                kind: ITEMS.to_owned(),
                id: def.id,
            });
        }
        if def.max_stack_size == 0 {
            return Err(RegistryError::InvalidStateCount {
                id: def.id,
                states: 0,
            });
        }
        let internal_id = self.items.len() as u32;
        tracing::trace!(id = %def.id, internal_id, "item registered");
        self.index.insert(def.id.clone(), internal_id);
        self.items.push(ItemType {
            id: def.id,
            internal_id,
            max_stack_size: def.max_stack_size,
            substitute: def.substitute,
        });
        Ok(internal_id)
    }

    pub fn get(&self, id: &str) -> Option<&ItemType> {
        self.index.get(id).map(|&idx| &self.items[idx as usize])
    }

    /// Like [`get`](Self::get), but an unknown id is an error.
    pub fn require(&self, id: &str) -> Result<&ItemType, RegistryError> {
        self.get(id).ok_or_else(|| RegistryError::UnknownInternalId {
            kind: ITEMS.to_owned(),
            id: id.to_owned(),
        })
    }

    pub fn by_internal_id(&self, internal_id: u32) -> Option<&ItemType> {
        self.items.get(internal_id as usize)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemType> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_ids_follow_registration_order() {
        let mut catalog = ItemCatalog::new();
        assert_eq!(catalog.register(ItemDefinition::new("a")).unwrap(), 0);
        assert_eq!(catalog.register(ItemDefinition::new("b")).unwrap(), 1);
        assert_eq!(catalog.by_internal_id(1).unwrap().id, "b");
        assert_eq!(catalog.get("a").unwrap().max_stack_size, DEFAULT_MAX_STACK_SIZE);
    }

    #[test]
    fn test_duplicate_item_rejected() {
        let mut catalog = ItemCatalog::new();
        catalog.register(ItemDefinition::new("a")).unwrap();
        let err = catalog.register(ItemDefinition::new("a")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateId { .. }));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_require_unknown_is_error() {
        let catalog = ItemCatalog::new();
        match catalog.require("ghost") {
            Err(RegistryError::UnknownInternalId { kind, id }) => {
                assert_eq!(kind, "items");
                assert_eq!(id, "ghost");
            }
            other => panic!("expected UnknownInternalId, got {other:?}"),
        }
    }

    #[test]
    fn test_manifest_stack_sizes_apply() {
        let catalog = ItemCatalog::from_manifest(&Manifest::builtin().unwrap()).unwrap();
        let sword = catalog.require("minecraft:diamond_sword").unwrap();
        assert!(!sword.is_stackable());
        let pearl = catalog.require("minecraft:ender_pearl").unwrap();
        assert_eq!(pearl.max_stack_size, 16);
        assert!(catalog.require("minecraft:stone").unwrap().is_stackable());
    }

    #[test]
    fn test_substitute_is_kept() {
        let mut catalog = ItemCatalog::new();
        catalog
            .register(
                ItemDefinition::new("mod:ruby")
                    .max_stack_size(16)
                    .substitute("minecraft:diamond"),
            )
            .unwrap();
        let ruby = catalog.require("mod:ruby").unwrap();
        assert_eq!(ruby.substitute.as_deref(), Some("minecraft:diamond"));
    }
}
