//! Typed messages.
//!
//! Every message is a plain struct. The [`Clientbound`] and [`Serverbound`]
//! enums wrap them so a connection can carry "any message in this
//! direction" as one value.

use crate::recipe::NetworkRecipe;
use crate::text::Text;
use crate::types::Value;
use crate::values::{BlockState, ItemStack, Position, Vector3d, Vector3f};

// ---------------------------------------------------------------------------
// Message sets
// ---------------------------------------------------------------------------

/// An enum of messages for one direction.
pub trait MessageSet: Sized {
    /// Fieldless discriminant, used to key codec tables.
    type Kind: Copy + Eq + std::hash::Hash + std::fmt::Debug + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
}

/// A message struct that is one variant of the set `E`.
pub trait Variant<E: MessageSet>: Sized + Into<E> {
    const KIND: E::Kind;

    fn extract(message: &E) -> Option<&Self>;
}

macro_rules! message_set {
    (
        $(#[$meta:meta])*
        pub enum $name:ident / $kind:ident {
            $($variant:ident($ty:ty),)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub enum $name {
            $($variant($ty),)*
        }

        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $kind {
            $($variant,)*
        }

        impl MessageSet for $name {
            type Kind = $kind;

            fn kind(&self) -> $kind {
                match self {
                    $(Self::$variant(_) => $kind::$variant,)*
                }
            }
        }

        $(
            impl From<$ty> for $name {
                fn from(message: $ty) -> Self {
                    Self::$variant(message)
                }
            }

            impl Variant<$name> for $ty {
                const KIND: $kind = $kind::$variant;

                fn extract(message: &$name) -> Option<&Self> {
                    match message {
                        $name::$variant(inner) => Some(inner),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }
            }
        )*
    };
}

message_set! {
    /// Messages the server sends.
    pub enum Clientbound / ClientboundKind {
        BlockChange(BlockChange),
        ChatMessage(ChatMessage),
        OpenWindow(OpenWindow),
        WindowItems(WindowItems),
        SetSlot(SetSlot),
        Disconnect(Disconnect),
        KeepAlive(KeepAlive),
        UnlockRecipes(UnlockRecipes),
        EntityMetadata(EntityMetadata),
        EntityVelocity(EntityVelocity),
        DeclareRecipes(DeclareRecipes),
    }
}

message_set! {
    /// Messages the client sends.
    pub enum Serverbound / ServerboundKind {
        ChatRequest(ChatRequest),
        ClientSettings(ClientSettings),
        KeepAlive(KeepAlive),
        CreativeInventoryAction(CreativeInventoryAction),
        PlayerBlockPlacement(PlayerBlockPlacement),
    }
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

/// Liveness probe. The server sends one; the client echoes the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    pub id: i64,
}

/// Which hand an action used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Hand {
    #[default]
    Main,
    Off,
}

impl Hand {
    pub fn to_wire(self) -> i32 {
        match self {
            Self::Main => 0,
            Self::Off => 1,
        }
    }

    pub fn from_wire(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Main),
            1 => Some(Self::Off),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Clientbound
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockChange {
    pub position: Position,
    pub block: BlockState,
}

/// Where on screen a chat message appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatPosition {
    #[default]
    Chat,
    System,
    ActionBar,
}

impl ChatPosition {
    pub fn to_wire(self) -> i8 {
        match self {
            Self::Chat => 0,
            Self::System => 1,
            Self::ActionBar => 2,
        }
    }

    pub fn from_wire(raw: i8) -> Option<Self> {
        match raw {
            0 => Some(Self::Chat),
            1 => Some(Self::System),
            2 => Some(Self::ActionBar),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub text: Text,
    pub position: ChatPosition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenWindow {
    pub window_id: u8,
    /// Internal id from the `windows` category.
    pub window_type: String,
    pub title: Text,
    pub slot_count: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowItems {
    pub window_id: u8,
    pub items: Vec<Option<ItemStack>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetSlot {
    /// -1 targets the cursor.
    pub window_id: i8,
    pub slot: i16,
    pub item: Option<ItemStack>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnect {
    pub reason: Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockAction {
    /// Replaces the client's whole recipe book.
    Init,
    Add,
    Remove,
}

impl UnlockAction {
    pub fn to_wire(self) -> i32 {
        match self {
            Self::Init => 0,
            Self::Add => 1,
            Self::Remove => 2,
        }
    }

    pub fn from_wire(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Init),
            1 => Some(Self::Add),
            2 => Some(Self::Remove),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockRecipes {
    pub action: UnlockAction,
    pub book_open: bool,
    pub filter_craftable: bool,
    pub recipes: Vec<String>,
    /// Recipes to highlight as new. Only sent with [`UnlockAction::Init`].
    pub highlighted: Vec<String>,
}

/// One entity metadata field.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataEntry {
    pub index: u8,
    pub value: Value,
}

impl MetadataEntry {
    pub fn new(index: u8, value: Value) -> Self {
        Self { index, value }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityMetadata {
    pub entity_id: i32,
    pub entries: Vec<MetadataEntry>,
}

/// Blocks per tick. Each component is clamped to what the wire can hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityVelocity {
    pub entity_id: i32,
    pub velocity: Vector3d,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclareRecipes {
    pub recipes: Vec<NetworkRecipe>,
}

// ---------------------------------------------------------------------------
// Serverbound
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatVisibility {
    Full,
    CommandsOnly,
    Hidden,
}

impl ChatVisibility {
    pub fn to_wire(self) -> i32 {
        match self {
            Self::Full => 0,
            Self::CommandsOnly => 1,
            Self::Hidden => 2,
        }
    }

    pub fn from_wire(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Full),
            1 => Some(Self::CommandsOnly),
            2 => Some(Self::Hidden),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub locale: String,
    pub view_distance: i8,
    pub chat_visibility: ChatVisibility,
    pub chat_colors: bool,
    /// Bit mask of visible skin layers.
    pub skin_parts: u8,
    pub main_hand: Hand,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreativeInventoryAction {
    pub slot: i16,
    pub item: Option<ItemStack>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerBlockPlacement {
    pub position: Position,
    /// Face index 0..=5 (down, up, north, south, west, east).
    pub face: i32,
    pub hand: Hand,
    /// Where on the face the cursor was, each component in 0..=1.
    pub cursor: Vector3f,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        let message: Clientbound = KeepAlive { id: 3 }.into();
        assert_eq!(message.kind(), ClientboundKind::KeepAlive);
        assert_eq!(<KeepAlive as Variant<Clientbound>>::KIND, ClientboundKind::KeepAlive);
        assert_eq!(
            <KeepAlive as Variant<Serverbound>>::KIND,
            ServerboundKind::KeepAlive
        );
    }

    #[test]
    fn test_extract_only_matching_variant() {
        let message = Clientbound::from(Disconnect {
            reason: Text::literal("bye"),
        });
        assert!(Disconnect::extract(&message).is_some());
        assert!(<KeepAlive as Variant<Clientbound>>::extract(&message).is_none());
    }

    #[test]
    fn test_wire_enums_reject_unknown_values() {
        assert_eq!(Hand::from_wire(1), Some(Hand::Off));
        assert_eq!(Hand::from_wire(2), None);
        assert_eq!(ChatPosition::from_wire(2), Some(ChatPosition::ActionBar));
        assert_eq!(ChatPosition::from_wire(-1), None);
        assert_eq!(UnlockAction::from_wire(3), None);
        assert_eq!(ChatVisibility::from_wire(1), Some(ChatVisibility::CommandsOnly));
    }
}
