//! Wire protocol for Cinder.
//!
//! This crate turns typed game messages into bytes and back:
//!
//! - **Values** ([`Position`], [`ItemStack`], [`Text`], ...) and the
//!   dynamically typed metadata [`Value`]s with their [`TypeRegistry`].
//! - **Messages** ([`Clientbound`], [`Serverbound`]) and one [`Codec`]
//!   per message in [`codecs`].
//! - **Dispatch** ([`ProtocolTable`]): opcode ↔ codec for one protocol
//!   version.
//! - **Errors** ([`ProtocolError`]) and the [`Disposition`] that tells a
//!   connection what to do about each one.
//!
//! # Architecture
//!
//! Codecs never reach for globals. Everything they look up (network ids,
//! the item catalog, value types, translations, the peer's locale) comes
//! in through a [`CodecContext`].
//!
//! ```text
//! Transport (frames) → ProtocolTable (opcode) → Codec (message) → handler
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
pub mod codecs;
mod context;
mod error;
pub mod messages;
pub mod recipe;
mod table;
pub mod text;
pub mod types;
pub mod values;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::Codec;
pub use context::{CodecContext, ProtocolRegistries};
pub use error::{Disposition, ProtocolError};
pub use messages::{Clientbound, ClientboundKind, MessageSet, Serverbound, ServerboundKind};
pub use recipe::{CraftingGrid, Ingredient, NetworkRecipe};
pub use table::{opcodes, ProtocolTable, ProtocolTableBuilder};
pub use text::{Text, Translations, DEFAULT_LOCALE};
pub use types::{TypeRegistry, Value};
pub use values::{BlockState, ItemStack, Position, Vector3d, Vector3f};
