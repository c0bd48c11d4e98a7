//! One codec per message.

mod clientbound;
mod serverbound;

pub use clientbound::{
    BlockChangeCodec, ChatMessageCodec, DeclareRecipesCodec, DisconnectCodec,
    EntityMetadataCodec, EntityVelocityCodec, KeepAliveCodec, METADATA_END, OpenWindowCodec,
    SetSlotCodec, UnlockRecipesCodec, WindowItemsCodec,
};
pub use serverbound::{
    ChatRequestCodec, ClientSettingsCodec, CreativeInventoryActionCodec, MAX_CHAT_LEN,
    MAX_LOCALE_LEN, PlayerBlockPlacementCodec,
};
