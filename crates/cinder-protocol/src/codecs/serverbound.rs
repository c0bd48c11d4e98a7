//! Codecs for messages the client sends.
//!
//! Everything read here comes from an untrusted peer: string lengths are
//! bounded and enum values are checked.

use cinder_buffer::ByteBuffer;

use crate::messages::{
    ChatRequest, ChatVisibility, ClientSettings, CreativeInventoryAction, Hand,
    PlayerBlockPlacement,
};
use crate::types::{ItemStackSerializer, ValueSerializer};
use crate::values::{Position, Vector3f};
use crate::{Codec, CodecContext, ProtocolError};

/// Longest chat line a client may send.
pub const MAX_CHAT_LEN: usize = 256;

/// Longest locale tag a client may send.
pub const MAX_LOCALE_LEN: usize = 16;

fn read_hand(buf: &mut ByteBuffer) -> Result<Hand, ProtocolError> {
    let raw = buf.read_var_int()?;
    Hand::from_wire(raw).ok_or_else(|| ProtocolError::InvalidMessage(format!("hand {raw}")))
}

/// `[string message]`
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatRequestCodec;

impl Codec for ChatRequestCodec {
    type Message = ChatRequest;

    fn encode(
        &self,
        _ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        message: &ChatRequest,
    ) -> Result<(), ProtocolError> {
        Ok(buf.write_string(&message.message)?)
    }

    fn decode(
        &self,
        _ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<ChatRequest, ProtocolError> {
        Ok(ChatRequest {
            message: buf.read_string_limited(MAX_CHAT_LEN)?,
        })
    }
}

/// `[string locale][i8 view distance][varint chat mode][bool colors]
/// [u8 skin parts][varint main hand]`
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientSettingsCodec;

impl Codec for ClientSettingsCodec {
    type Message = ClientSettings;

    fn encode(
        &self,
        _ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        message: &ClientSettings,
    ) -> Result<(), ProtocolError> {
        buf.write_string(&message.locale)?;
        buf.write_i8(message.view_distance)?;
        buf.write_var_int(message.chat_visibility.to_wire())?;
        buf.write_bool(message.chat_colors)?;
        buf.write_u8(message.skin_parts)?;
        buf.write_var_int(message.main_hand.to_wire())?;
        Ok(())
    }

    fn decode(
        &self,
        _ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<ClientSettings, ProtocolError> {
        let locale = buf.read_string_limited(MAX_LOCALE_LEN)?;
        let view_distance = buf.read_i8()?;
        let raw = buf.read_var_int()?;
        let chat_visibility = ChatVisibility::from_wire(raw)
            .ok_or_else(|| ProtocolError::InvalidMessage(format!("chat mode {raw}")))?;
        let chat_colors = buf.read_bool()?;
        let skin_parts = buf.read_u8()?;
        let main_hand = read_hand(buf)?;
        Ok(ClientSettings {
            locale,
            view_distance,
            chat_visibility,
            chat_colors,
            skin_parts,
            main_hand,
        })
    }
}

/// `[i16 slot][item stack]`
#[derive(Debug, Clone, Copy, Default)]
pub struct CreativeInventoryActionCodec;

impl Codec for CreativeInventoryActionCodec {
    type Message = CreativeInventoryAction;

    fn encode(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        message: &CreativeInventoryAction,
    ) -> Result<(), ProtocolError> {
        buf.write_i16(message.slot)?;
        ItemStackSerializer.write(ctx, buf, &message.item)
    }

    fn decode(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<CreativeInventoryAction, ProtocolError> {
        Ok(CreativeInventoryAction {
            slot: buf.read_i16()?,
            item: ItemStackSerializer.read(ctx, buf)?,
        })
    }
}

/// `[position][varint face][varint hand][f32 × 3 cursor]`
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerBlockPlacementCodec;

impl Codec for PlayerBlockPlacementCodec {
    type Message = PlayerBlockPlacement;

    fn encode(
        &self,
        _ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        message: &PlayerBlockPlacement,
    ) -> Result<(), ProtocolError> {
        buf.write_i64(message.position.pack())?;
        buf.write_var_int(message.face)?;
        buf.write_var_int(message.hand.to_wire())?;
        buf.write_f32(message.cursor.x)?;
        buf.write_f32(message.cursor.y)?;
        buf.write_f32(message.cursor.z)?;
        Ok(())
    }

    fn decode(
        &self,
        _ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<PlayerBlockPlacement, ProtocolError> {
        let position = Position::unpack(buf.read_i64()?);
        let face = buf.read_var_int()?;
        if !(0..=5).contains(&face) {
            return Err(ProtocolError::InvalidMessage(format!("block face {face}")));
        }
        let hand = read_hand(buf)?;
        let cursor = Vector3f::new(buf.read_f32()?, buf.read_f32()?, buf.read_f32()?);
        Ok(PlayerBlockPlacement {
            position,
            face,
            hand,
            cursor,
        })
    }
}
