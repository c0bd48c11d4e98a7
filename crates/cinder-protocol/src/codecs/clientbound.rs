//! Codecs for messages the server sends.
//!
//! Decoding is implemented too: tests and tooling read back what the
//! server wrote.

use cinder_buffer::ByteBuffer;
use cinder_registry::RegistryError;

use crate::codec::{read_string_list, write_len, write_string_list};
use crate::messages::{
    BlockChange, ChatMessage, ChatPosition, DeclareRecipes, Disconnect, EntityMetadata,
    EntityVelocity, KeepAlive, MetadataEntry, OpenWindow, SetSlot, UnlockAction, UnlockRecipes,
    WindowItems,
};
use crate::recipe::NetworkRecipe;
use crate::types::{standard, ItemStackSerializer, ValueSerializer};
use crate::values::{velocity_from_wire, velocity_to_wire, BlockState, Position, Vector3d};
use crate::{Codec, CodecContext, ProtocolError};

/// Ends an entity metadata list.
pub const METADATA_END: u8 = 0xFF;

/// Longest recipe id accepted on decode.
const MAX_RECIPE_ID_LEN: usize = 256;

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// `[position][varint block state id]`
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockChangeCodec;

impl Codec for BlockChangeCodec {
    type Message = BlockChange;

    fn encode(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        message: &BlockChange,
    ) -> Result<(), ProtocolError> {
        let blocks = &ctx.registries.network.blocks;
        let state_id = blocks
            .state_id(&message.block.block, message.block.state)
            .ok_or_else(|| {
                tracing::error!(
                    block = %message.block.block,
                    state = message.block.state,
                    "block state has no network id"
                );
                ProtocolError::Unencodable(format!(
                    "block {} state {}",
                    message.block.block, message.block.state
                ))
            })?;
        buf.write_i64(message.position.pack())?;
        buf.write_var_int(state_id)?;
        Ok(())
    }

    fn decode(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<BlockChange, ProtocolError> {
        let position = Position::unpack(buf.read_i64()?);
        let state_id = buf.read_var_int()?;
        let entry = ctx.registries.network.blocks.internal_id(state_id)?;
        Ok(BlockChange {
            position,
            block: BlockState::new(entry.id, entry.state),
        })
    }
}

// ---------------------------------------------------------------------------
// Chat and connection
// ---------------------------------------------------------------------------

/// `[text][i8 position]`
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatMessageCodec;

impl Codec for ChatMessageCodec {
    type Message = ChatMessage;

    fn encode(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        message: &ChatMessage,
    ) -> Result<(), ProtocolError> {
        standard::TEXT.write(ctx, buf, &message.text)?;
        buf.write_i8(message.position.to_wire())?;
        Ok(())
    }

    fn decode(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<ChatMessage, ProtocolError> {
        let text = standard::TEXT.read(ctx, buf)?;
        let raw = buf.read_i8()?;
        let position = ChatPosition::from_wire(raw)
            .ok_or_else(|| ProtocolError::InvalidMessage(format!("chat position {raw}")))?;
        Ok(ChatMessage { text, position })
    }
}

/// `[text reason]`
#[derive(Debug, Clone, Copy, Default)]
pub struct DisconnectCodec;

impl Codec for DisconnectCodec {
    type Message = Disconnect;

    fn encode(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        message: &Disconnect,
    ) -> Result<(), ProtocolError> {
        standard::TEXT.write(ctx, buf, &message.reason)
    }

    fn decode(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<Disconnect, ProtocolError> {
        Ok(Disconnect {
            reason: standard::TEXT.read(ctx, buf)?,
        })
    }
}

/// `[i64 id]`, shared by both directions.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAliveCodec;

impl Codec for KeepAliveCodec {
    type Message = KeepAlive;

    fn encode(
        &self,
        _ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        message: &KeepAlive,
    ) -> Result<(), ProtocolError> {
        Ok(buf.write_i64(message.id)?)
    }

    fn decode(
        &self,
        _ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<KeepAlive, ProtocolError> {
        Ok(KeepAlive {
            id: buf.read_i64()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Windows and inventory
// ---------------------------------------------------------------------------

/// `[u8 window id][string type][text title][u8 slots]`
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenWindowCodec;

impl Codec for OpenWindowCodec {
    type Message = OpenWindow;

    fn encode(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        message: &OpenWindow,
    ) -> Result<(), ProtocolError> {
        if ctx.registries.network.windows.get(&message.window_type).is_none() {
            tracing::error!(window = %message.window_type, "window type unknown to the client");
            return Err(ProtocolError::Unencodable(format!(
                "window type {}",
                message.window_type
            )));
        }
        buf.write_u8(message.window_id)?;
        buf.write_string(&message.window_type)?;
        standard::TEXT.write(ctx, buf, &message.title)?;
        buf.write_u8(message.slot_count)?;
        Ok(())
    }

    fn decode(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<OpenWindow, ProtocolError> {
        let window_id = buf.read_u8()?;
        let window_type = buf.read_string_limited(32)?;
        let windows = &ctx.registries.network.windows;
        if windows.get(&window_type).is_none() {
            return Err(RegistryError::UnknownInternalId {
                kind: windows.kind().to_owned(),
                id: window_type,
            }
            .into());
        }
        let title = standard::TEXT.read(ctx, buf)?;
        let slot_count = buf.read_u8()?;
        Ok(OpenWindow {
            window_id,
            window_type,
            title,
            slot_count,
        })
    }
}

/// `[u8 window id][i16 count][item stack × count]`
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowItemsCodec;

impl Codec for WindowItemsCodec {
    type Message = WindowItems;

    fn encode(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        message: &WindowItems,
    ) -> Result<(), ProtocolError> {
        let count = i16::try_from(message.items.len()).map_err(|_| {
            ProtocolError::Unencodable(format!("{} window slots", message.items.len()))
        })?;
        buf.write_u8(message.window_id)?;
        buf.write_i16(count)?;
        for item in &message.items {
            ItemStackSerializer.write(ctx, buf, item)?;
        }
        Ok(())
    }

    fn decode(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<WindowItems, ProtocolError> {
        let window_id = buf.read_u8()?;
        let count = buf.read_i16()?;
        // An empty slot is two bytes; anything claiming more is lying.
        let count = usize::try_from(count)
            .ok()
            .filter(|&count| count * 2 <= buf.readable_bytes())
            .ok_or_else(|| ProtocolError::InvalidMessage(format!("window slot count {count}")))?;
        let items = (0..count)
            .map(|_| ItemStackSerializer.read(ctx, buf))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(WindowItems { window_id, items })
    }
}

/// `[i8 window id][i16 slot][item stack]`
#[derive(Debug, Clone, Copy, Default)]
pub struct SetSlotCodec;

impl Codec for SetSlotCodec {
    type Message = SetSlot;

    fn encode(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        message: &SetSlot,
    ) -> Result<(), ProtocolError> {
        buf.write_i8(message.window_id)?;
        buf.write_i16(message.slot)?;
        ItemStackSerializer.write(ctx, buf, &message.item)
    }

    fn decode(&self, ctx: &CodecContext<'_>, buf: &mut ByteBuffer) -> Result<SetSlot, ProtocolError> {
        Ok(SetSlot {
            window_id: buf.read_i8()?,
            slot: buf.read_i16()?,
            item: ItemStackSerializer.read(ctx, buf)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Recipes
// ---------------------------------------------------------------------------

/// `[varint action][bool book open][bool filter][ids][ids if init]`
#[derive(Debug, Clone, Copy, Default)]
pub struct UnlockRecipesCodec;

impl Codec for UnlockRecipesCodec {
    type Message = UnlockRecipes;

    fn encode(
        &self,
        _ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        message: &UnlockRecipes,
    ) -> Result<(), ProtocolError> {
        buf.write_var_int(message.action.to_wire())?;
        buf.write_bool(message.book_open)?;
        buf.write_bool(message.filter_craftable)?;
        write_string_list(buf, &message.recipes)?;
        if message.action == UnlockAction::Init {
            write_string_list(buf, &message.highlighted)?;
        }
        Ok(())
    }

    fn decode(
        &self,
        _ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<UnlockRecipes, ProtocolError> {
        let raw = buf.read_var_int()?;
        let action = UnlockAction::from_wire(raw)
            .ok_or_else(|| ProtocolError::InvalidMessage(format!("unlock action {raw}")))?;
        let book_open = buf.read_bool()?;
        let filter_craftable = buf.read_bool()?;
        let recipes = read_string_list(buf, MAX_RECIPE_ID_LEN)?;
        let highlighted = if action == UnlockAction::Init {
            read_string_list(buf, MAX_RECIPE_ID_LEN)?
        } else {
            Vec::new()
        };
        Ok(UnlockRecipes {
            action,
            book_open,
            filter_craftable,
            recipes,
            highlighted,
        })
    }
}

/// `[varint count][recipe × count]`
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclareRecipesCodec;

impl Codec for DeclareRecipesCodec {
    type Message = DeclareRecipes;

    fn encode(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        message: &DeclareRecipes,
    ) -> Result<(), ProtocolError> {
        write_len(buf, message.recipes.len())?;
        for recipe in &message.recipes {
            recipe.write(ctx, buf)?;
        }
        Ok(())
    }

    fn decode(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<DeclareRecipes, ProtocolError> {
        let count = buf.read_length()?;
        let recipes = (0..count)
            .map(|_| NetworkRecipe::read(ctx, buf))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DeclareRecipes { recipes })
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// `[varint entity id]([u8 index][varint type code][value])* 0xFF`
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityMetadataCodec;

impl Codec for EntityMetadataCodec {
    type Message = EntityMetadata;

    fn encode(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        message: &EntityMetadata,
    ) -> Result<(), ProtocolError> {
        buf.write_var_int(message.entity_id)?;
        for entry in &message.entries {
            if entry.index == METADATA_END {
                return Err(ProtocolError::Unencodable(format!(
                    "metadata index {METADATA_END:#x} is the terminator"
                )));
            }
            buf.write_u8(entry.index)?;
            ctx.registries.types.write_tagged(ctx, buf, &entry.value)?;
        }
        buf.write_u8(METADATA_END)?;
        Ok(())
    }

    fn decode(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<EntityMetadata, ProtocolError> {
        let entity_id = buf.read_var_int()?;
        let mut entries = Vec::new();
        loop {
            let index = buf.read_u8()?;
            if index == METADATA_END {
                break;
            }
            let value = ctx.registries.types.read_tagged(ctx, buf)?;
            entries.push(MetadataEntry { index, value });
        }
        Ok(EntityMetadata { entity_id, entries })
    }
}

/// `[varint entity id][i16 x][i16 y][i16 z]`, each scaled by 8000 and
/// clamped.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityVelocityCodec;

impl Codec for EntityVelocityCodec {
    type Message = EntityVelocity;

    fn encode(
        &self,
        _ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        message: &EntityVelocity,
    ) -> Result<(), ProtocolError> {
        let v = message.velocity;
        buf.write_var_int(message.entity_id)?;
        buf.write_i16(velocity_to_wire(v.x))?;
        buf.write_i16(velocity_to_wire(v.y))?;
        buf.write_i16(velocity_to_wire(v.z))?;
        Ok(())
    }

    fn decode(
        &self,
        _ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<EntityVelocity, ProtocolError> {
        let entity_id = buf.read_var_int()?;
        let x = velocity_from_wire(buf.read_i16()?);
        let y = velocity_from_wire(buf.read_i16()?);
        let z = velocity_from_wire(buf.read_i16()?);
        Ok(EntityVelocity {
            entity_id,
            velocity: Vector3d::new(x, y, z),
        })
    }
}
