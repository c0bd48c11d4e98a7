//! Value types and the registry that names them.
//!
//! A [`Type<V>`] pairs a name and a wire code with the
//! [`ValueSerializer`] that reads and writes `V`. The standard types live
//! in [`standard`] as statics. A [`TypeRegistry`] indexes them by name and
//! code so that self-describing payloads (entity metadata) can be written
//! from a dynamic [`Value`] and read back from a code on the wire.

use std::collections::HashMap;
use std::fmt;

use cinder_buffer::{ByteBuffer, CompoundTag};
use cinder_registry::RegistryError;

use crate::text::Text;
use crate::values::{ItemStack, Position, Vector3d, Vector3f};
use crate::{CodecContext, ProtocolError};

mod item;
pub mod standard;

pub use item::{ItemStackSerializer, NBT_ROOT, NBT_TYPE, NBT_UID};

// ---------------------------------------------------------------------------
// ValueSerializer / Type
// ---------------------------------------------------------------------------

/// Reads and writes one kind of value.
///
/// `read(write(v))` must reproduce the semantic content of `v`.
pub trait ValueSerializer<V>: Send + Sync {
    fn write(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        value: &V,
    ) -> Result<(), ProtocolError>;

    fn read(&self, ctx: &CodecContext<'_>, buf: &mut ByteBuffer) -> Result<V, ProtocolError>;

    /// Whether `None` is representable. Only true for serializers over
    /// `Option<_>`.
    fn accepts_absent(&self) -> bool {
        false
    }
}

/// A named, coded value type.
pub struct Type<V: 'static> {
    name: &'static str,
    code: i32,
    serializer: &'static dyn ValueSerializer<V>,
    wrap: fn(V) -> Value,
    unwrap: fn(&Value) -> Option<&V>,
}

impl<V: 'static> Type<V> {
    pub const fn new(
        name: &'static str,
        code: i32,
        serializer: &'static dyn ValueSerializer<V>,
        wrap: fn(V) -> Value,
        unwrap: fn(&Value) -> Option<&V>,
    ) -> Self {
        Self {
            name,
            code,
            serializer,
            wrap,
            unwrap,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn accepts_absent(&self) -> bool {
        self.serializer.accepts_absent()
    }

    pub fn write(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        value: &V,
    ) -> Result<(), ProtocolError> {
        self.serializer.write(ctx, buf, value)
    }

    pub fn read(&self, ctx: &CodecContext<'_>, buf: &mut ByteBuffer) -> Result<V, ProtocolError> {
        self.serializer.read(ctx, buf)
    }

    pub fn value(&self, value: V) -> Value {
        (self.wrap)(value)
    }
}

impl<V: 'static> fmt::Debug for Type<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Type")
            .field("name", &self.name)
            .field("code", &self.code)
            .finish()
    }
}

/// A [`Type`] with its value type erased.
pub trait DynType: Send + Sync {
    fn name(&self) -> &'static str;
    fn code(&self) -> i32;
    fn write_value(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        value: &Value,
    ) -> Result<(), ProtocolError>;
    fn read_value(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<Value, ProtocolError>;
}

impl<V: 'static> DynType for Type<V> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn code(&self) -> i32 {
        self.code
    }

    fn write_value(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        value: &Value,
    ) -> Result<(), ProtocolError> {
        let inner = (self.unwrap)(value).ok_or(ProtocolError::TypeMismatch {
            expected: self.name,
            found: value.type_name(),
        })?;
        self.serializer.write(ctx, buf, inner)
    }

    fn read_value(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<Value, ProtocolError> {
        self.serializer.read(ctx, buf).map(self.wrap)
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A value of any standard type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    VarInt(i32),
    VarLong(i64),
    String(String),
    Text(Text),
    OptionalText(Option<Text>),
    Position(Position),
    OptionalPosition(Option<Position>),
    Rotation(Vector3f),
    Vector3d(Vector3d),
    ItemStack(Option<ItemStack>),
    DataView(Option<CompoundTag>),
}

impl Value {
    /// Name of the standard type this value belongs to.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Byte(_) => "byte",
            Self::Short(_) => "short",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::VarInt(_) => "var_int",
            Self::VarLong(_) => "var_long",
            Self::String(_) => "string",
            Self::Text(_) => "text",
            Self::OptionalText(_) => "optional_text",
            Self::Position(_) => "position",
            Self::OptionalPosition(_) => "optional_position",
            Self::Rotation(_) => "rotation",
            Self::Vector3d(_) => "vector3d",
            Self::ItemStack(_) => "item_stack",
            Self::DataView(_) => "data_view",
        }
    }
}

// ---------------------------------------------------------------------------
// TypeRegistry
// ---------------------------------------------------------------------------

/// Frozen index of value types by name and wire code.
pub struct TypeRegistry {
    by_name: HashMap<&'static str, &'static dyn DynType>,
    by_code: HashMap<i32, &'static dyn DynType>,
}

impl TypeRegistry {
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::default()
    }

    /// A registry holding every type in [`standard::ALL`].
    pub fn standard() -> Result<Self, RegistryError> {
        let mut builder = Self::builder();
        for ty in standard::ALL {
            builder.register(*ty)?;
        }
        Ok(builder.build())
    }

    pub fn by_name(&self, name: &str) -> Option<&'static dyn DynType> {
        self.by_name.get(name).copied()
    }

    pub fn by_code(&self, code: i32) -> Option<&'static dyn DynType> {
        self.by_code.get(&code).copied()
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// Writes `[varint code][value]` using the type the value belongs to.
    pub fn write_tagged(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        value: &Value,
    ) -> Result<(), ProtocolError> {
        let ty = self.by_name(value.type_name()).ok_or_else(|| {
            ProtocolError::Unencodable(format!("value type {} is not registered", value.type_name()))
        })?;
        buf.write_var_int(ty.code())?;
        ty.write_value(ctx, buf, value)
    }

    /// Reads a value written by [`write_tagged`](Self::write_tagged).
    pub fn read_tagged(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<Value, ProtocolError> {
        let code = buf.read_var_int()?;
        let ty = self
            .by_code(code)
            .ok_or(ProtocolError::UnknownTypeCode(code))?;
        ty.read_value(ctx, buf)
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.by_name.keys().collect();
        names.sort();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}

impl fmt::Debug for TypeRegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.by_name.keys().collect();
        names.sort();
        f.debug_struct("TypeRegistryBuilder").field("types", &names).finish()
    }
}

/// Collects types; registering a duplicate name or code fails right away.
#[derive(Default)]
pub struct TypeRegistryBuilder {
    by_name: HashMap<&'static str, &'static dyn DynType>,
    by_code: HashMap<i32, &'static dyn DynType>,
}

impl TypeRegistryBuilder {
    pub fn register(&mut self, ty: &'static dyn DynType) -> Result<&mut Self, RegistryError> {
        if self.by_name.contains_key(ty.name()) {
            return Err(RegistryError::DuplicateType(ty.name().to_owned()));
        }
        if let Some(existing) = self.by_code.get(&ty.code()) {
            return Err(RegistryError::DuplicateType(format!(
                "{} (code {} already used by {})",
                ty.name(),
                ty.code(),
                existing.name()
            )));
        }
        self.by_name.insert(ty.name(), ty);
        self.by_code.insert(ty.code(), ty);
        Ok(self)
    }

    pub fn build(self) -> TypeRegistry {
        tracing::debug!(types = self.by_name.len(), "type registry built");
        TypeRegistry {
            by_name: self.by_name,
            by_code: self.by_code,
        }
    }
}
