//! Integration tests for message codecs and opcode dispatch.
//!
//! Each test drives whole frames through a [`ProtocolTable`] built over
//! the bundled manifest, the same way a connection does.

use cinder_buffer::{ByteBuffer, CompoundTag};
use cinder_protocol::messages::{
    BlockChange, ChatMessage, ChatPosition, ClientSettings, ChatVisibility,
    CreativeInventoryAction, DeclareRecipes, EntityMetadata, EntityVelocity, Hand, MetadataEntry,
    PlayerBlockPlacement, UnlockAction, UnlockRecipes, WindowItems,
};
use cinder_protocol::recipe::{ShapedRecipe, SmeltingRecipe};
use cinder_protocol::types::{standard, TypeRegistry, NBT_ROOT};
use cinder_protocol::{
    opcodes, BlockState, Clientbound, CodecContext, CraftingGrid, Disposition, Ingredient,
    ItemStack, NetworkRecipe, Position, ProtocolError, ProtocolRegistries, ProtocolTable,
    Serverbound, Text, Value, Vector3d, Vector3f,
};
use cinder_registry::{ItemDefinition, RegistryError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Fixture {
    registries: ProtocolRegistries,
    server: ProtocolTable,
    client: ProtocolTable<Serverbound, Clientbound>,
}

fn fixture() -> Fixture {
    let mut registries = ProtocolRegistries::builtin().expect("builtin manifest loads");
    registries
        .catalog
        .register(
            ItemDefinition::new("mod:ruby_sword")
                .max_stack_size(1)
                .substitute("minecraft:diamond_sword"),
        )
        .unwrap();
    registries
        .translations
        .insert("en_us", "chat.greeting", "Hello, %s!");
    registries
        .translations
        .insert("de_de", "chat.greeting", "Hallo, %s!");
    let server = ProtocolTable::standard(registries.version());
    let client = ProtocolTable::standard_client(registries.version());
    Fixture {
        registries,
        server,
        client,
    }
}

impl Fixture {
    fn ctx(&self) -> CodecContext<'_> {
        CodecContext::default_locale(&self.registries)
    }

    /// Server encodes, client decodes.
    fn to_client(&self, message: Clientbound) -> Clientbound {
        let mut buf = self.server.encode(&self.ctx(), &message).unwrap();
        let decoded = self.client.decode(&self.ctx(), &mut buf).unwrap();
        assert!(!buf.is_readable(), "codec left bytes behind");
        decoded
    }

    /// Client encodes, server decodes.
    fn to_server(&self, message: Serverbound) -> Serverbound {
        let mut buf = self.client.encode(&self.ctx(), &message).unwrap();
        let decoded = self.server.decode(&self.ctx(), &mut buf).unwrap();
        assert!(!buf.is_readable(), "codec left bytes behind");
        decoded
    }
}

// ---------------------------------------------------------------------------
// Positions and blocks
// ---------------------------------------------------------------------------

#[test]
fn test_block_change_at_coordinate_extremes() {
    let fx = fixture();
    for position in [
        Position::new((1 << 25) - 1, 255, -(1 << 25)),
        Position::new(-(1 << 25), 0, (1 << 25) - 1),
        Position::new(-1, 64, -1),
    ] {
        let sent = Clientbound::BlockChange(BlockChange {
            position,
            block: BlockState::new("minecraft:stone", 3),
        });
        assert_eq!(fx.to_client(sent.clone()), sent);
    }
}

#[test]
fn test_unregistered_block_state_id_fails_without_result() {
    let fx = fixture();
    let mut buf = ByteBuffer::new();
    buf.write_var_int(opcodes::clientbound::BLOCK_CHANGE).unwrap();
    buf.write_i64(Position::new(1, 2, 3).pack()).unwrap();
    buf.write_var_int(50_000).unwrap();

    let err = fx.client.decode(&fx.ctx(), &mut buf).unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::Registry(RegistryError::UnknownNetworkId { id: 50_000, .. })
    ));
    assert_eq!(err.disposition(), Disposition::DropMessage);
}

#[test]
fn test_placement_rejects_bad_face() {
    let fx = fixture();
    let mut buf = ByteBuffer::new();
    buf.write_var_int(opcodes::serverbound::PLAYER_BLOCK_PLACEMENT)
        .unwrap();
    buf.write_i64(Position::new(0, 0, 0).pack()).unwrap();
    buf.write_var_int(9).unwrap();
    buf.write_var_int(0).unwrap();
    for _ in 0..3 {
        buf.write_f32(0.5).unwrap();
    }
    let err = fx.server.decode(&fx.ctx(), &mut buf).unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidMessage(_)));
}

#[test]
fn test_placement_round_trip() {
    let fx = fixture();
    let sent = Serverbound::PlayerBlockPlacement(PlayerBlockPlacement {
        position: Position::new(10, 70, -10),
        face: 1,
        hand: Hand::Off,
        cursor: Vector3f::new(0.5, 1.0, 0.25),
    });
    assert_eq!(fx.to_server(sent.clone()), sent);
}

// ---------------------------------------------------------------------------
// Item stacks
// ---------------------------------------------------------------------------

#[test]
fn test_window_items_with_empty_slots() {
    let fx = fixture();
    let sent = Clientbound::WindowItems(WindowItems {
        window_id: 0,
        items: vec![
            Some(ItemStack::new("minecraft:bread", 12)),
            None,
            Some(ItemStack::new("minecraft:stone", 0)),
            Some(ItemStack::new("minecraft:bow", 1)),
        ],
    });
    let Clientbound::WindowItems(received) = fx.to_client(sent) else {
        panic!("wrong message kind");
    };
    assert_eq!(
        received.items,
        vec![
            Some(ItemStack::new("minecraft:bread", 12)),
            None,
            None,
            Some(ItemStack::new("minecraft:bow", 1)),
        ]
    );
}

#[test]
fn test_empty_creative_slot_is_minus_one() {
    let fx = fixture();
    let sent = Serverbound::CreativeInventoryAction(CreativeInventoryAction {
        slot: 36,
        item: None,
    });
    let buf = fx.client.encode(&fx.ctx(), &sent).unwrap();
    let bytes = buf.to_vec();
    // opcode, i16 slot, then the empty stack marker
    assert_eq!(&bytes[3..], &[0xFF, 0xFF]);
    assert_eq!(fx.to_server(sent.clone()), sent);
}

#[test]
fn test_modded_sword_tag_stripped_after_decode() {
    let fx = fixture();
    let sent = Serverbound::CreativeInventoryAction(CreativeInventoryAction {
        slot: 1,
        item: Some(ItemStack::new("mod:ruby_sword", 1)),
    });
    let mut buf = fx.client.encode(&fx.ctx(), &sent).unwrap();

    let mut peek = buf.slice();
    peek.read_var_int().unwrap();
    peek.read_i16().unwrap();
    let network = peek.read_i16().unwrap();
    assert_eq!(
        i32::from(network),
        fx.registries.network.items.resolve("minecraft:diamond_sword")
    );
    peek.read_u8().unwrap();
    let data = peek.read_data_view().unwrap().expect("private data present");
    assert!(data.get_compound(NBT_ROOT).is_some());

    let decoded = fx.server.decode(&fx.ctx(), &mut buf).unwrap();
    assert_eq!(decoded, sent);
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

#[test]
fn test_bare_array_text_wraps_in_object() {
    let fx = fixture();
    let mut buf = ByteBuffer::new();
    buf.write_var_int(opcodes::clientbound::CHAT_MESSAGE).unwrap();
    buf.write_string(r#"["Hello ", {"text": "world", "bold": true}]"#)
        .unwrap();
    buf.write_i8(0).unwrap();

    let Clientbound::ChatMessage(message) = fx.client.decode(&fx.ctx(), &mut buf).unwrap() else {
        panic!("wrong message kind");
    };
    let expected = Text::literal("")
        .with_extra(Text::literal("Hello "))
        .with_extra(Text::literal("world").bold(true));
    assert_eq!(message.text, expected);
    assert_eq!(message.text.to_plain(), "Hello world");

    // Re-encoding yields an object root.
    let mut out = fx
        .server
        .encode(&fx.ctx(), &Clientbound::ChatMessage(message))
        .unwrap();
    out.read_var_int().unwrap();
    let json = out.read_string().unwrap();
    assert!(json.starts_with('{'));
}

#[test]
fn test_chat_is_localized_per_connection() {
    let fx = fixture();
    let message = Clientbound::ChatMessage(ChatMessage {
        text: Text::translate("chat.greeting", vec![Text::literal("Steve")]),
        position: ChatPosition::System,
    });

    for (locale, expected) in [("de_de", "Hallo, Steve!"), ("fr_fr", "Hello, Steve!")] {
        let ctx = CodecContext::new(&fx.registries, locale);
        let mut buf = fx.server.encode(&ctx, &message).unwrap();
        let Clientbound::ChatMessage(received) = fx.client.decode(&ctx, &mut buf).unwrap() else {
            panic!("wrong message kind");
        };
        assert_eq!(received.text.to_plain(), expected);
    }
}

#[test]
fn test_client_settings_round_trip() {
    let fx = fixture();
    let sent = Serverbound::ClientSettings(ClientSettings {
        locale: "de_DE".into(),
        view_distance: 8,
        chat_visibility: ChatVisibility::Full,
        chat_colors: true,
        skin_parts: 0x7F,
        main_hand: Hand::Main,
    });
    assert_eq!(fx.to_server(sent.clone()), sent);
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[test]
fn test_velocity_clamps_to_wire_range() {
    let fx = fixture();
    let sent = Clientbound::EntityVelocity(EntityVelocity {
        entity_id: 5,
        velocity: Vector3d::new(100.0, -100.0, f64::NAN),
    });
    let Clientbound::EntityVelocity(received) = fx.to_client(sent) else {
        panic!("wrong message kind");
    };
    assert_eq!(received.velocity.x, f64::from(i16::MAX) / 8000.0);
    assert_eq!(received.velocity.y, f64::from(i16::MIN) / 8000.0);
    assert_eq!(received.velocity.z, 0.0);
}

#[test]
fn test_metadata_round_trip() {
    let fx = fixture();
    let sent = Clientbound::EntityMetadata(EntityMetadata {
        entity_id: 42,
        entries: vec![
            MetadataEntry::new(0, Value::Byte(0x20)),
            MetadataEntry::new(2, Value::OptionalText(Some(Text::literal("Rex")))),
            MetadataEntry::new(3, Value::Bool(true)),
            MetadataEntry::new(6, Value::ItemStack(Some(ItemStack::new("minecraft:apple", 3)))),
            MetadataEntry::new(7, Value::Rotation(Vector3f::new(0.0, 90.0, 0.0))),
            MetadataEntry::new(9, Value::OptionalPosition(None)),
        ],
    });
    assert_eq!(fx.to_client(sent.clone()), sent);
}

#[test]
fn test_duplicate_type_registration_fails() {
    let mut builder = TypeRegistry::builder();
    builder.register(&standard::STRING).unwrap();
    let err = builder.register(&standard::STRING).unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateType(_)));
}

// ---------------------------------------------------------------------------
// Recipes
// ---------------------------------------------------------------------------

fn bread_recipe() -> NetworkRecipe {
    NetworkRecipe::Shaped(
        ShapedRecipe::new(
            "minecraft:bread",
            3,
            1,
            vec![Ingredient::of("minecraft:wheat"); 3],
            ItemStack::new("minecraft:bread", 1),
        )
        .unwrap(),
    )
}

#[test]
fn test_declare_recipes_round_trip() {
    let fx = fixture();
    let smelt = NetworkRecipe::Smelting(SmeltingRecipe {
        id: "minecraft:iron_ingot".into(),
        ingredient: Ingredient::of("minecraft:iron_ore"),
        result: ItemStack::new("minecraft:iron_ingot", 1),
        experience: 0.7,
        cooking_time: 200,
    });
    let sent = Clientbound::DeclareRecipes(DeclareRecipes {
        recipes: vec![bread_recipe(), smelt],
    });
    assert_eq!(fx.to_client(sent.clone()), sent);
}

#[test]
fn test_decoded_recipe_still_matches_grid() {
    let fx = fixture();
    let sent = Clientbound::DeclareRecipes(DeclareRecipes {
        recipes: vec![bread_recipe()],
    });
    let Clientbound::DeclareRecipes(received) = fx.to_client(sent) else {
        panic!("wrong message kind");
    };
    let wheat = Some(ItemStack::new("minecraft:wheat", 1));
    let grid = CraftingGrid::from_slots(
        3,
        3,
        vec![
            None, None, None,
            wheat.clone(), wheat.clone(), wheat,
            None, None, None,
        ],
    )
    .unwrap();
    assert!(received.recipes[0].matches(&grid));
}

#[test]
fn test_unlock_recipes_round_trip() {
    let fx = fixture();
    let sent = Clientbound::UnlockRecipes(UnlockRecipes {
        action: UnlockAction::Init,
        book_open: true,
        filter_craftable: false,
        recipes: vec!["minecraft:bread".into(), "minecraft:torch".into()],
        highlighted: vec!["minecraft:bread".into()],
    });
    assert_eq!(fx.to_client(sent.clone()), sent);
}

// ---------------------------------------------------------------------------
// Compound data on the wire
// ---------------------------------------------------------------------------

#[test]
fn test_compound_only_private_fields_decodes_as_none() {
    let fx = fixture();
    let mut private = CompoundTag::new();
    private.insert("type", cinder_buffer::Tag::Int(0));
    let mut root = CompoundTag::new();
    root.insert(NBT_ROOT, cinder_buffer::Tag::Compound(private));

    let mut buf = ByteBuffer::new();
    buf.write_var_int(opcodes::serverbound::CREATIVE_INVENTORY_ACTION)
        .unwrap();
    buf.write_i16(5).unwrap();
    buf.write_i16(fx.registries.network.items.resolve("minecraft:stone") as i16)
        .unwrap();
    buf.write_u8(4).unwrap();
    buf.write_data_view(Some(&root)).unwrap();

    let Serverbound::CreativeInventoryAction(action) =
        fx.server.decode(&fx.ctx(), &mut buf).unwrap()
    else {
        panic!("wrong message kind");
    };
    assert_eq!(action.item, Some(ItemStack::new("minecraft:stone", 4)));
}
