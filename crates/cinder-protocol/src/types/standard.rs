//! The standard value types.
//!
//! Codes 0 through 13 follow the client's entity metadata table. Types the
//! metadata table has no slot for take codes from 14 upward.

use cinder_buffer::{ByteBuffer, CompoundTag};

use super::{DynType, ItemStackSerializer, Type, Value, ValueSerializer};
use crate::text::Text;
use crate::values::{ItemStack, Position, Vector3d, Vector3f};
use crate::{CodecContext, ProtocolError};

/// Longest rich text JSON accepted from a peer, in characters.
pub const MAX_TEXT_LEN: usize = 262_144;

/// Longest plain string accepted inside a metadata value.
pub const MAX_STRING_LEN: usize = 32_767;

// ---------------------------------------------------------------------------
// Serializers
// ---------------------------------------------------------------------------

macro_rules! primitive_serializer {
    ($($ser:ident: $ty:ty => $write:ident, $read:ident;)*) => {
        $(
            #[derive(Debug, Clone, Copy, Default)]
            pub struct $ser;

            impl ValueSerializer<$ty> for $ser {
                fn write(
                    &self,
                    _ctx: &CodecContext<'_>,
                    buf: &mut ByteBuffer,
                    value: &$ty,
                ) -> Result<(), ProtocolError> {
                    Ok(buf.$write(*value)?)
                }

                fn read(
                    &self,
                    _ctx: &CodecContext<'_>,
                    buf: &mut ByteBuffer,
                ) -> Result<$ty, ProtocolError> {
                    Ok(buf.$read()?)
                }
            }
        )*
    };
}

primitive_serializer! {
    BoolSerializer: bool => write_bool, read_bool;
    ByteSerializer: i8 => write_i8, read_i8;
    ShortSerializer: i16 => write_i16, read_i16;
    IntSerializer: i32 => write_i32, read_i32;
    LongSerializer: i64 => write_i64, read_i64;
    FloatSerializer: f32 => write_f32, read_f32;
    DoubleSerializer: f64 => write_f64, read_f64;
    VarIntSerializer: i32 => write_var_int, read_var_int;
    VarLongSerializer: i64 => write_var_long, read_var_long;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StringSerializer;

impl ValueSerializer<String> for StringSerializer {
    fn write(
        &self,
        _ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        value: &String,
    ) -> Result<(), ProtocolError> {
        Ok(buf.write_string(value)?)
    }

    fn read(&self, _ctx: &CodecContext<'_>, buf: &mut ByteBuffer) -> Result<String, ProtocolError> {
        Ok(buf.read_string_limited(MAX_STRING_LEN)?)
    }
}

/// Rich text as object-rooted JSON, localized for the connection on write.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextSerializer;

impl TextSerializer {
    pub fn write_text(
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        text: &Text,
    ) -> Result<(), ProtocolError> {
        let localized = text.localize(&ctx.registries.translations, ctx.locale);
        Ok(buf.write_string(&localized.to_json_string())?)
    }

    pub fn read_text(buf: &mut ByteBuffer) -> Result<Text, ProtocolError> {
        let json = buf.read_string_limited(MAX_TEXT_LEN)?;
        Text::from_json_str(&json)
    }
}

impl ValueSerializer<Text> for TextSerializer {
    fn write(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        value: &Text,
    ) -> Result<(), ProtocolError> {
        Self::write_text(ctx, buf, value)
    }

    fn read(&self, _ctx: &CodecContext<'_>, buf: &mut ByteBuffer) -> Result<Text, ProtocolError> {
        Self::read_text(buf)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PositionSerializer;

impl ValueSerializer<Position> for PositionSerializer {
    fn write(
        &self,
        _ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        value: &Position,
    ) -> Result<(), ProtocolError> {
        Ok(buf.write_i64(value.pack())?)
    }

    fn read(
        &self,
        _ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<Position, ProtocolError> {
        Ok(Position::unpack(buf.read_i64()?))
    }
}

/// Writes a presence flag, then the value through `inner` if present.
fn write_optional<V, S: ValueSerializer<V>>(
    inner: &S,
    ctx: &CodecContext<'_>,
    buf: &mut ByteBuffer,
    value: Option<&V>,
) -> Result<(), ProtocolError> {
    buf.write_bool(value.is_some())?;
    match value {
        Some(value) => inner.write(ctx, buf, value),
        None => Ok(()),
    }
}

fn read_optional<V, S: ValueSerializer<V>>(
    inner: &S,
    ctx: &CodecContext<'_>,
    buf: &mut ByteBuffer,
) -> Result<Option<V>, ProtocolError> {
    if buf.read_bool()? {
        inner.read(ctx, buf).map(Some)
    } else {
        Ok(None)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OptionalTextSerializer;

impl ValueSerializer<Option<Text>> for OptionalTextSerializer {
    fn write(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        value: &Option<Text>,
    ) -> Result<(), ProtocolError> {
        write_optional(&TextSerializer, ctx, buf, value.as_ref())
    }

    fn read(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<Option<Text>, ProtocolError> {
        read_optional(&TextSerializer, ctx, buf)
    }

    fn accepts_absent(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OptionalPositionSerializer;

impl ValueSerializer<Option<Position>> for OptionalPositionSerializer {
    fn write(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        value: &Option<Position>,
    ) -> Result<(), ProtocolError> {
        write_optional(&PositionSerializer, ctx, buf, value.as_ref())
    }

    fn read(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<Option<Position>, ProtocolError> {
        read_optional(&PositionSerializer, ctx, buf)
    }

    fn accepts_absent(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Vector3fSerializer;

impl ValueSerializer<Vector3f> for Vector3fSerializer {
    fn write(
        &self,
        _ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        value: &Vector3f,
    ) -> Result<(), ProtocolError> {
        buf.write_f32(value.x)?;
        buf.write_f32(value.y)?;
        buf.write_f32(value.z)?;
        Ok(())
    }

    fn read(
        &self,
        _ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<Vector3f, ProtocolError> {
        Ok(Vector3f::new(buf.read_f32()?, buf.read_f32()?, buf.read_f32()?))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Vector3dSerializer;

impl ValueSerializer<Vector3d> for Vector3dSerializer {
    fn write(
        &self,
        _ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        value: &Vector3d,
    ) -> Result<(), ProtocolError> {
        buf.write_f64(value.x)?;
        buf.write_f64(value.y)?;
        buf.write_f64(value.z)?;
        Ok(())
    }

    fn read(
        &self,
        _ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<Vector3d, ProtocolError> {
        Ok(Vector3d::new(buf.read_f64()?, buf.read_f64()?, buf.read_f64()?))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DataViewSerializer;

impl ValueSerializer<Option<CompoundTag>> for DataViewSerializer {
    fn write(
        &self,
        _ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        value: &Option<CompoundTag>,
    ) -> Result<(), ProtocolError> {
        Ok(buf.write_data_view(value.as_ref())?)
    }

    fn read(
        &self,
        _ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<Option<CompoundTag>, ProtocolError> {
        Ok(buf.read_data_view()?)
    }

    fn accepts_absent(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Type descriptors
// ---------------------------------------------------------------------------

macro_rules! standard_types {
    ($($name:ident: $v:ty = ($type_name:literal, $code:literal, $ser:expr) => $variant:ident;)*) => {
        $(
            pub static $name: Type<$v> = {
                fn wrap(value: $v) -> Value {
                    Value::$variant(value)
                }

                fn unwrap(value: &Value) -> Option<&$v> {
                    match value {
                        Value::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }

                Type::new($type_name, $code, &$ser, wrap, unwrap)
            };
        )*

        /// Every standard type, in wire code order.
        pub static ALL: &[&dyn DynType] = &[$(&$name),*];
    };
}

standard_types! {
    BYTE: i8 = ("byte", 0, ByteSerializer) => Byte;
    VAR_INT: i32 = ("var_int", 1, VarIntSerializer) => VarInt;
    FLOAT: f32 = ("float", 2, FloatSerializer) => Float;
    STRING: String = ("string", 3, StringSerializer) => String;
    TEXT: Text = ("text", 4, TextSerializer) => Text;
    ITEM_STACK: Option<ItemStack> = ("item_stack", 5, ItemStackSerializer) => ItemStack;
    BOOL: bool = ("bool", 6, BoolSerializer) => Bool;
    ROTATION: Vector3f = ("rotation", 7, Vector3fSerializer) => Rotation;
    POSITION: Position = ("position", 8, PositionSerializer) => Position;
    OPTIONAL_POSITION: Option<Position> =
        ("optional_position", 9, OptionalPositionSerializer) => OptionalPosition;
    DATA_VIEW: Option<CompoundTag> = ("data_view", 13, DataViewSerializer) => DataView;
    SHORT: i16 = ("short", 14, ShortSerializer) => Short;
    INT: i32 = ("int", 15, IntSerializer) => Int;
    LONG: i64 = ("long", 16, LongSerializer) => Long;
    DOUBLE: f64 = ("double", 17, DoubleSerializer) => Double;
    VAR_LONG: i64 = ("var_long", 18, VarLongSerializer) => VarLong;
    OPTIONAL_TEXT: Option<Text> = ("optional_text", 19, OptionalTextSerializer) => OptionalText;
    VECTOR3D: Vector3d = ("vector3d", 20, Vector3dSerializer) => Vector3d;
}
