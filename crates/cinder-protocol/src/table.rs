//! Opcode dispatch.
//!
//! A [`ProtocolTable`] knows, for one protocol version, which opcode and
//! codec each outbound message kind uses and which codec each inbound
//! opcode maps to. Frames look like:
//!
//! ```text
//! [varint opcode][payload written by the codec]
//! ```
//!
//! The table is generic over direction. The server uses the default
//! `ProtocolTable<Clientbound, Serverbound>`; test clients and tooling use
//! the mirror image.

use std::collections::HashMap;
use std::fmt;

use cinder_buffer::ByteBuffer;
use cinder_registry::ProtocolVersion;

use crate::codecs::{
    BlockChangeCodec, ChatMessageCodec, ChatRequestCodec, ClientSettingsCodec,
    CreativeInventoryActionCodec, DeclareRecipesCodec, DisconnectCodec, EntityMetadataCodec,
    EntityVelocityCodec, KeepAliveCodec, OpenWindowCodec, PlayerBlockPlacementCodec,
    SetSlotCodec, UnlockRecipesCodec, WindowItemsCodec,
};
use crate::messages::{Clientbound, MessageSet, Serverbound, Variant};
use crate::{Codec, CodecContext, ProtocolError};

/// Opcodes of the standard table.
pub mod opcodes {
    pub mod clientbound {
        pub const BLOCK_CHANGE: i32 = 0x0B;
        pub const CHAT_MESSAGE: i32 = 0x0F;
        pub const OPEN_WINDOW: i32 = 0x13;
        pub const WINDOW_ITEMS: i32 = 0x14;
        pub const SET_SLOT: i32 = 0x16;
        pub const DISCONNECT: i32 = 0x1A;
        pub const KEEP_ALIVE: i32 = 0x1F;
        pub const UNLOCK_RECIPES: i32 = 0x31;
        pub const ENTITY_METADATA: i32 = 0x3C;
        pub const ENTITY_VELOCITY: i32 = 0x3E;
        pub const DECLARE_RECIPES: i32 = 0x54;
    }

    pub mod serverbound {
        pub const CHAT_REQUEST: i32 = 0x02;
        pub const CLIENT_SETTINGS: i32 = 0x04;
        pub const KEEP_ALIVE: i32 = 0x0B;
        pub const CREATIVE_INVENTORY_ACTION: i32 = 0x1B;
        pub const PLAYER_BLOCK_PLACEMENT: i32 = 0x1F;
    }
}

// ---------------------------------------------------------------------------
// Type-erased adapters
// ---------------------------------------------------------------------------

trait Encoder<M>: Send + Sync {
    fn encode(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        message: &M,
    ) -> Result<(), ProtocolError>;
}

trait Decoder<M>: Send + Sync {
    fn decode(&self, ctx: &CodecContext<'_>, buf: &mut ByteBuffer) -> Result<M, ProtocolError>;
}

struct Adapter<C>(C);

impl<C, M> Encoder<M> for Adapter<C>
where
    C: Codec,
    C::Message: Variant<M>,
    M: MessageSet,
{
    fn encode(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        message: &M,
    ) -> Result<(), ProtocolError> {
        let inner = <C::Message as Variant<M>>::extract(message).ok_or_else(|| {
            ProtocolError::InvalidMessage(format!(
                "{:?} routed to the codec for {:?}",
                message.kind(),
                <C::Message as Variant<M>>::KIND
            ))
        })?;
        self.0.encode(ctx, buf, inner)
    }
}

impl<C, M> Decoder<M> for Adapter<C>
where
    C: Codec,
    C::Message: Variant<M>,
    M: MessageSet,
{
    fn decode(&self, ctx: &CodecContext<'_>, buf: &mut ByteBuffer) -> Result<M, ProtocolError> {
        self.0.decode(ctx, buf).map(Into::into)
    }
}

// ---------------------------------------------------------------------------
// ProtocolTable
// ---------------------------------------------------------------------------

/// Opcode ↔ codec mapping for one protocol version and direction.
pub struct ProtocolTable<Out: MessageSet = Clientbound, In: MessageSet = Serverbound> {
    version: ProtocolVersion,
    outbound: HashMap<Out::Kind, (i32, Box<dyn Encoder<Out>>)>,
    inbound: HashMap<i32, Box<dyn Decoder<In>>>,
}

impl<Out: MessageSet, In: MessageSet> ProtocolTable<Out, In> {
    pub fn builder(version: ProtocolVersion) -> ProtocolTableBuilder<Out, In> {
        ProtocolTableBuilder {
            table: Self {
                version,
                outbound: HashMap::new(),
                inbound: HashMap::new(),
            },
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// The opcode an outbound message kind is sent under.
    pub fn opcode(&self, kind: Out::Kind) -> Option<i32> {
        self.outbound.get(&kind).map(|(opcode, _)| *opcode)
    }

    /// Whether an inbound opcode has a decoder.
    pub fn accepts(&self, opcode: i32) -> bool {
        self.inbound.contains_key(&opcode)
    }

    /// Encodes `[varint opcode][payload]` into a fresh buffer.
    pub fn encode(&self, ctx: &CodecContext<'_>, message: &Out) -> Result<ByteBuffer, ProtocolError> {
        let mut buf = ByteBuffer::new();
        self.encode_into(ctx, &mut buf, message)?;
        Ok(buf)
    }

    /// Appends `[varint opcode][payload]` to `buf`. On error the buffer's
    /// writer index is restored, so nothing partial is left behind.
    pub fn encode_into(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        message: &Out,
    ) -> Result<(), ProtocolError> {
        let kind = message.kind();
        let (opcode, encoder) = self.outbound.get(&kind).ok_or_else(|| {
            ProtocolError::Unencodable(format!("{kind:?} has no opcode in {}", self.version))
        })?;

        let start = buf.writer_index();
        let result = buf
            .write_var_int(*opcode)
            .map_err(ProtocolError::from)
            .and_then(|()| encoder.encode(ctx, buf, message));
        if result.is_err() {
            buf.set_writer_index(start)?;
        }
        result
    }

    /// Reads the opcode and decodes the rest of the frame.
    ///
    /// A failed decode returns only the error; the caller drops the
    /// frame. Bytes left over after a successful decode are logged.
    pub fn decode(&self, ctx: &CodecContext<'_>, buf: &mut ByteBuffer) -> Result<In, ProtocolError> {
        let opcode = buf.read_var_int()?;
        let decoder = self
            .inbound
            .get(&opcode)
            .ok_or(ProtocolError::UnknownOpcode(opcode))?;
        let message = decoder.decode(ctx, buf)?;
        if buf.is_readable() {
            tracing::debug!(
                opcode,
                kind = ?message.kind(),
                trailing = buf.readable_bytes(),
                "unread bytes after message"
            );
        }
        Ok(message)
    }
}

impl<Out: MessageSet, In: MessageSet> fmt::Debug for ProtocolTable<Out, In> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolTable")
            .field("version", &self.version)
            .field("outbound", &self.outbound.len())
            .field("inbound", &self.inbound.len())
            .finish()
    }
}

/// Registers codecs, then freezes them into a [`ProtocolTable`].
pub struct ProtocolTableBuilder<Out: MessageSet, In: MessageSet> {
    table: ProtocolTable<Out, In>,
}

impl<Out: MessageSet + 'static, In: MessageSet + 'static> ProtocolTableBuilder<Out, In> {
    /// Sends `C::Message` under `opcode`. A second registration for the
    /// same message replaces the first.
    pub fn outbound<C>(mut self, opcode: i32, codec: C) -> Self
    where
        C: Codec,
        C::Message: Variant<Out>,
    {
        let kind = <C::Message as Variant<Out>>::KIND;
        if self
            .table
            .outbound
            .insert(kind, (opcode, Box::new(Adapter(codec))))
            .is_some()
        {
            tracing::warn!(?kind, opcode, "outbound codec replaced");
        }
        self
    }

    /// Decodes frames with `opcode` through `codec`.
    pub fn inbound<C>(mut self, opcode: i32, codec: C) -> Self
    where
        C: Codec,
        C::Message: Variant<In>,
    {
        if self
            .table
            .inbound
            .insert(opcode, Box::new(Adapter(codec)))
            .is_some()
        {
            tracing::warn!(opcode, "inbound codec replaced");
        }
        self
    }

    pub fn build(self) -> ProtocolTable<Out, In> {
        tracing::debug!(
            version = %self.table.version,
            outbound = self.table.outbound.len(),
            inbound = self.table.inbound.len(),
            "protocol table built"
        );
        self.table
    }
}

impl ProtocolTable {
    /// The server-side table with the standard opcodes.
    pub fn standard(version: ProtocolVersion) -> Self {
        use opcodes::{clientbound as out, serverbound as inb};

        Self::builder(version)
            .outbound(out::BLOCK_CHANGE, BlockChangeCodec)
            .outbound(out::CHAT_MESSAGE, ChatMessageCodec)
            .outbound(out::OPEN_WINDOW, OpenWindowCodec)
            .outbound(out::WINDOW_ITEMS, WindowItemsCodec)
            .outbound(out::SET_SLOT, SetSlotCodec)
            .outbound(out::DISCONNECT, DisconnectCodec)
            .outbound(out::KEEP_ALIVE, KeepAliveCodec)
            .outbound(out::UNLOCK_RECIPES, UnlockRecipesCodec)
            .outbound(out::ENTITY_METADATA, EntityMetadataCodec)
            .outbound(out::ENTITY_VELOCITY, EntityVelocityCodec)
            .outbound(out::DECLARE_RECIPES, DeclareRecipesCodec)
            .inbound(inb::CHAT_REQUEST, ChatRequestCodec)
            .inbound(inb::CLIENT_SETTINGS, ClientSettingsCodec)
            .inbound(inb::KEEP_ALIVE, KeepAliveCodec)
            .inbound(inb::CREATIVE_INVENTORY_ACTION, CreativeInventoryActionCodec)
            .inbound(inb::PLAYER_BLOCK_PLACEMENT, PlayerBlockPlacementCodec)
            .build()
    }
}

impl ProtocolTable<Serverbound, Clientbound> {
    /// The mirror of [`ProtocolTable::standard`], for clients.
    pub fn standard_client(version: ProtocolVersion) -> Self {
        use opcodes::{clientbound as inb, serverbound as out};

        Self::builder(version)
            .outbound(out::CHAT_REQUEST, ChatRequestCodec)
            .outbound(out::CLIENT_SETTINGS, ClientSettingsCodec)
            .outbound(out::KEEP_ALIVE, KeepAliveCodec)
            .outbound(out::CREATIVE_INVENTORY_ACTION, CreativeInventoryActionCodec)
            .outbound(out::PLAYER_BLOCK_PLACEMENT, PlayerBlockPlacementCodec)
            .inbound(inb::BLOCK_CHANGE, BlockChangeCodec)
            .inbound(inb::CHAT_MESSAGE, ChatMessageCodec)
            .inbound(inb::OPEN_WINDOW, OpenWindowCodec)
            .inbound(inb::WINDOW_ITEMS, WindowItemsCodec)
            .inbound(inb::SET_SLOT, SetSlotCodec)
            .inbound(inb::DISCONNECT, DisconnectCodec)
            .inbound(inb::KEEP_ALIVE, KeepAliveCodec)
            .inbound(inb::UNLOCK_RECIPES, UnlockRecipesCodec)
            .inbound(inb::ENTITY_METADATA, EntityMetadataCodec)
            .inbound(inb::ENTITY_VELOCITY, EntityVelocityCodec)
            .inbound(inb::DECLARE_RECIPES, DeclareRecipesCodec)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{ChatRequest, ClientboundKind, KeepAlive};
    use crate::ProtocolRegistries;

    fn setup() -> (ProtocolRegistries, ProtocolTable) {
        let registries = ProtocolRegistries::builtin().unwrap();
        let table = ProtocolTable::standard(registries.version());
        (registries, table)
    }

    #[test]
    fn test_encode_prefixes_opcode() {
        let (registries, table) = setup();
        let ctx = CodecContext::default_locale(&registries);
        let buf = table
            .encode(&ctx, &Clientbound::KeepAlive(KeepAlive { id: 7 }))
            .unwrap();
        let mut expected = vec![opcodes::clientbound::KEEP_ALIVE as u8];
        expected.extend_from_slice(&7i64.to_be_bytes());
        assert_eq!(buf.to_vec(), expected);
        assert_eq!(
            table.opcode(ClientboundKind::KeepAlive),
            Some(opcodes::clientbound::KEEP_ALIVE)
        );
    }

    #[test]
    fn test_decode_dispatches_on_opcode() {
        let (registries, table) = setup();
        let ctx = CodecContext::default_locale(&registries);
        let mut buf = ByteBuffer::new();
        buf.write_var_int(opcodes::serverbound::CHAT_REQUEST).unwrap();
        buf.write_string("hello").unwrap();
        let message = table.decode(&ctx, &mut buf).unwrap();
        assert_eq!(
            message,
            Serverbound::ChatRequest(ChatRequest {
                message: "hello".into()
            })
        );
    }

    #[test]
    fn test_unknown_opcode() {
        let (registries, table) = setup();
        let ctx = CodecContext::default_locale(&registries);
        let mut buf = ByteBuffer::from_bytes(&[0x7A, 1, 2, 3]);
        assert!(!table.accepts(0x7A));
        assert!(matches!(
            table.decode(&ctx, &mut buf),
            Err(ProtocolError::UnknownOpcode(0x7A))
        ));
    }

    #[test]
    fn test_trailing_bytes_do_not_fail_decode() {
        let (registries, table) = setup();
        let ctx = CodecContext::default_locale(&registries);
        let mut buf = ByteBuffer::new();
        buf.write_var_int(opcodes::serverbound::KEEP_ALIVE).unwrap();
        buf.write_i64(99).unwrap();
        buf.write_u8(0xAB).unwrap();
        let message = table.decode(&ctx, &mut buf).unwrap();
        assert_eq!(message, Serverbound::KeepAlive(KeepAlive { id: 99 }));
        assert_eq!(buf.readable_bytes(), 1);
    }

    #[test]
    fn test_failed_encode_leaves_buffer_untouched() {
        let (registries, table) = setup();
        let ctx = CodecContext::default_locale(&registries);
        let mut buf = ByteBuffer::new();
        buf.write_u8(0x42).unwrap();

        let bad = Clientbound::OpenWindow(crate::messages::OpenWindow {
            window_id: 1,
            window_type: "mod:portal".into(),
            title: "Portal".into(),
            slot_count: 9,
        });
        let err = table.encode_into(&ctx, &mut buf, &bad).unwrap_err();
        assert!(matches!(err, ProtocolError::Unencodable(_)));
        assert_eq!(buf.to_vec(), vec![0x42]);
    }

    #[test]
    fn test_missing_outbound_codec_is_unencodable() {
        let registries = ProtocolRegistries::builtin().unwrap();
        let ctx = CodecContext::default_locale(&registries);
        let table: ProtocolTable = ProtocolTable::builder(registries.version()).build();
        let err = table
            .encode(&ctx, &Clientbound::KeepAlive(KeepAlive { id: 1 }))
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Unencodable(_)));
    }

    #[test]
    fn test_client_table_mirrors_server_table() {
        let (registries, server) = setup();
        let client = ProtocolTable::standard_client(registries.version());
        let ctx = CodecContext::default_locale(&registries);

        let sent = Serverbound::KeepAlive(KeepAlive { id: -5 });
        let mut buf = client.encode(&ctx, &sent).unwrap();
        assert_eq!(server.decode(&ctx, &mut buf).unwrap(), sent);

        let reply = Clientbound::KeepAlive(KeepAlive { id: -5 });
        let mut buf = server.encode(&ctx, &reply).unwrap();
        assert_eq!(client.decode(&ctx, &mut buf).unwrap(), reply);
    }
}
