//! Item stacks on the wire.
//!
//! ```text
//! [i16 network id | -1] [u8 quantity] [compound tag or end byte]
//! ```
//!
//! The server hides two fields in the stack's compound data under
//! [`NBT_ROOT`]:
//!
//! - [`NBT_TYPE`]: the item's internal numeric id. Modded items travel as
//!   their client substitute; this field brings them back as themselves.
//! - [`NBT_UID`]: a random 64-bit tag on items that can't stack, so the
//!   client never merges two of them into one slot.
//!
//! Both are removed again on decode.

use cinder_buffer::{ByteBuffer, CompoundTag, Tag};
use rand::Rng;

use super::ValueSerializer;
use crate::values::ItemStack;
use crate::{CodecContext, ProtocolError, ProtocolRegistries};

/// Compound key holding the server's private item fields.
pub const NBT_ROOT: &str = "cinder";
/// Internal numeric item type id.
pub const NBT_TYPE: &str = "type";
/// Disambiguation tag for non-stackable items.
pub const NBT_UID: &str = "uid";

const EMPTY_SLOT: i16 = -1;

#[derive(Debug, Clone, Copy, Default)]
pub struct ItemStackSerializer;

impl ItemStackSerializer {
    fn network_id(
        registries: &ProtocolRegistries,
        stack: &ItemStack,
        substitute: Option<&str>,
    ) -> Result<i16, ProtocolError> {
        let items = &registries.network.items;
        let network = items
            .get(&stack.item)
            .or_else(|| substitute.and_then(|id| items.get(id)));
        let Some(network) = network else {
            tracing::error!(
                item = %stack.item,
                version = %registries.version(),
                "item has no network id and no usable substitute"
            );
            return Err(ProtocolError::Unencodable(format!(
                "item {} has no network id",
                stack.item
            )));
        };
        i16::try_from(network).map_err(|_| {
            ProtocolError::Unencodable(format!("network id {network} does not fit in i16"))
        })
    }
}

impl ValueSerializer<Option<ItemStack>> for ItemStackSerializer {
    fn write(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
        value: &Option<ItemStack>,
    ) -> Result<(), ProtocolError> {
        let Some(stack) = value.as_ref().filter(|stack| !stack.is_empty()) else {
            return Ok(buf.write_i16(EMPTY_SLOT)?);
        };

        let registries = ctx.registries;
        let item = registries.catalog.get(&stack.item).ok_or_else(|| {
            tracing::error!(item = %stack.item, "item is not in the catalog");
            ProtocolError::Unencodable(format!("item {} is not registered", stack.item))
        })?;
        let network = Self::network_id(registries, stack, item.substitute.as_deref())?;

        let mut private = CompoundTag::new();
        private.insert(NBT_TYPE, Tag::Int(item.internal_id as i32));
        if !item.is_stackable() {
            private.insert(NBT_UID, Tag::Long(rand::rng().random::<i64>()));
        }
        let mut data = stack.data.clone().unwrap_or_default();
        data.insert(NBT_ROOT, Tag::Compound(private));

        buf.write_i16(network)?;
        buf.write_u8(stack.quantity)?;
        buf.write_data_view(Some(&data))?;
        Ok(())
    }

    fn read(
        &self,
        ctx: &CodecContext<'_>,
        buf: &mut ByteBuffer,
    ) -> Result<Option<ItemStack>, ProtocolError> {
        let network = buf.read_i16()?;
        if network == EMPTY_SLOT {
            return Ok(None);
        }
        let quantity = buf.read_u8()?;
        let mut data = buf.read_data_view()?;

        let internal_type = match data.as_mut().and_then(|data| data.remove(NBT_ROOT)) {
            Some(Tag::Compound(private)) => private.get_int(NBT_TYPE),
            _ => None,
        };
        if data.as_ref().is_some_and(CompoundTag::is_empty) {
            data = None;
        }

        let registries = ctx.registries;
        let items = &registries.network.items;
        let entry = items.internal_id(i32::from(network))?;
        // The private type only counts when the received id is the one we
        // would have sent for it.
        let known = internal_type
            .and_then(|id| u32::try_from(id).ok())
            .and_then(|id| registries.catalog.by_internal_id(id))
            .filter(|item| {
                let own = items.get(&item.id);
                let via_substitute = item.substitute.as_deref().and_then(|id| items.get(id));
                own.or(via_substitute) == Some(i32::from(network))
            });
        let item = match known {
            Some(item) => item.id.clone(),
            None => entry.id.to_owned(),
        };

        if quantity == 0 {
            return Ok(None);
        }
        Ok(Some(ItemStack {
            item,
            quantity,
            data,
        }))
    }

    fn accepts_absent(&self) -> bool {
        true
    }
}
