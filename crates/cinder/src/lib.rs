//! # Cinder
//!
//! A block game protocol server. Cinder accepts TCP connections, splits
//! the byte stream into length-prefixed frames, decodes each frame into a
//! typed [`Serverbound`] message, and hands it to your [`PacketHandler`].
//! Replies are encoded per connection, in the client's own locale.
//!
//! The layers live in their own crates and are re-exported here:
//!
//! - [`buffer`]: byte buffers, varints, compound tags, buffer pool
//! - [`registry`]: network id tables per protocol version, item catalog
//! - [`protocol`]: value types, messages, codecs, opcode tables
//! - [`transport`]: transport traits and the TCP framing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cinder::prelude::*;
//!
//! struct Echo;
//!
//! impl PacketHandler for Echo {
//!     async fn handle(
//!         &self,
//!         _session: &Session,
//!         message: Serverbound,
//!     ) -> Result<Vec<Clientbound>, CinderError> {
//!         Ok(match message {
//!             Serverbound::ChatRequest(chat) => vec![Clientbound::ChatMessage(ChatMessage {
//!                 text: Text::literal(chat.message),
//!                 position: ChatPosition::Chat,
//!             })],
//!             _ => Vec::new(),
//!         })
//!     }
//! }
//!
//! # async fn start() -> Result<(), CinderError> {
//! let server = CinderServer::builder()
//!     .config(ServerConfig::default())
//!     .handler(Echo)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
pub mod logging;
mod server;

pub use cinder_buffer as buffer;
pub use cinder_protocol as protocol;
pub use cinder_registry as registry;
pub use cinder_transport as transport;

pub use config::{BufferPoolConfig, LoggingConfig, ServerConfig};
pub use error::{CinderError, ConfigError};
pub use handler::{PacketHandler, Session};
pub use server::{CinderServer, CinderServerBuilder};

/// The types most handlers need.
pub mod prelude {
    pub use crate::protocol::messages::{
        BlockChange, ChatMessage, ChatPosition, ChatRequest, ClientSettings,
        CreativeInventoryAction, Disconnect, OpenWindow, PlayerBlockPlacement, SetSlot,
        WindowItems,
    };
    pub use crate::protocol::{
        BlockState, Clientbound, ItemStack, Position, Serverbound, Text,
    };
    pub use crate::{
        CinderError, CinderServer, PacketHandler, ServerConfig, Session,
    };
}
