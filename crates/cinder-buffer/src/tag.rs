//! Compound tags: the nested key/value structure attached to item stacks
//! and other wire values for auxiliary state.
//!
//! The binary layout is the classic named-tag format: every entry is a
//! one byte type id, a 16-bit length-prefixed name and a payload. A
//! compound ends with an `End` (0) byte.
//!
//! ```text
//! absent compound:   00
//! empty compound:    0A 00 00 00
//!                    ^  ^---^ ^
//!                    |  name  end
//!                    compound
//! ```

use std::collections::BTreeMap;

use crate::{BufferError, ByteBuffer};

/// Deepest nesting of compounds and lists accepted on read or write.
pub const MAX_TAG_DEPTH: usize = 512;

const TAG_END: u8 = 0;
const TAG_BYTE: u8 = 1;
const TAG_SHORT: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_LONG: u8 = 4;
const TAG_FLOAT: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_BYTE_ARRAY: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_LIST: u8 = 9;
const TAG_COMPOUND: u8 = 10;
const TAG_INT_ARRAY: u8 = 11;
const TAG_LONG_ARRAY: u8 = 12;

/// A single tag value.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<u8>),
    String(String),
    /// All elements must share one tag type.
    List(Vec<Tag>),
    Compound(CompoundTag),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    /// The wire type id of this tag.
    pub fn type_id(&self) -> u8 {
        match self {
            Self::Byte(_) => TAG_BYTE,
            Self::Short(_) => TAG_SHORT,
            Self::Int(_) => TAG_INT,
            Self::Long(_) => TAG_LONG,
            Self::Float(_) => TAG_FLOAT,
            Self::Double(_) => TAG_DOUBLE,
            Self::ByteArray(_) => TAG_BYTE_ARRAY,
            Self::String(_) => TAG_STRING,
            Self::List(_) => TAG_LIST,
            Self::Compound(_) => TAG_COMPOUND,
            Self::IntArray(_) => TAG_INT_ARRAY,
            Self::LongArray(_) => TAG_LONG_ARRAY,
        }
    }
}

/// A compound tag: named child tags.
///
/// Keys are kept sorted so that encoding the same compound always
/// produces the same bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompoundTag {
    entries: BTreeMap<String, Tag>,
}

impl CompoundTag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a tag, returning the previous value under `key`.
    pub fn insert(&mut self, key: impl Into<String>, tag: Tag) -> Option<Tag> {
        self.entries.insert(key.into(), tag)
    }

    pub fn get(&self, key: &str) -> Option<&Tag> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Tag> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tag)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.entries.get(key) {
            Some(Tag::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_long(&self, key: &str) -> Option<i64> {
        match self.entries.get(key) {
            Some(Tag::Long(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(Tag::String(v)) => Some(v),
            _ => None,
        }
    }

    pub fn get_compound(&self, key: &str) -> Option<&CompoundTag> {
        match self.entries.get(key) {
            Some(Tag::Compound(v)) => Some(v),
            _ => None,
        }
    }
}

impl FromIterator<(String, Tag)> for CompoundTag {
    fn from_iter<I: IntoIterator<Item = (String, Tag)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// ByteBuffer integration
// ---------------------------------------------------------------------------

impl ByteBuffer {
    /// Writes an optional compound tag.
    ///
    /// `None` is written as a lone end byte, which is distinct from an
    /// empty compound.
    pub fn write_data_view(
        &mut self,
        view: Option<&CompoundTag>,
    ) -> Result<(), BufferError> {
        match view {
            None => self.write_u8(TAG_END),
            Some(compound) => {
                self.write_u8(TAG_COMPOUND)?;
                self.write_utf("")?;
                write_compound(self, compound, 1)
            }
        }
    }

    /// Reads an optional compound tag written by
    /// [`write_data_view`](Self::write_data_view).
    pub fn read_data_view(&mut self) -> Result<Option<CompoundTag>, BufferError> {
        match self.read_u8()? {
            TAG_END => Ok(None),
            TAG_COMPOUND => {
                // The root name is always empty on the wire; ignore it.
                let _name = self.read_utf()?;
                read_compound(self, 1).map(Some)
            }
            other => Err(BufferError::UnknownTagType(other)),
        }
    }
}

fn write_compound(
    buf: &mut ByteBuffer,
    compound: &CompoundTag,
    depth: usize,
) -> Result<(), BufferError> {
    check_depth(depth)?;
    for (name, tag) in compound.iter() {
        buf.write_u8(tag.type_id())?;
        buf.write_utf(name)?;
        write_payload(buf, tag, depth)?;
    }
    buf.write_u8(TAG_END)
}

fn write_payload(
    buf: &mut ByteBuffer,
    tag: &Tag,
    depth: usize,
) -> Result<(), BufferError> {
    match tag {
        Tag::Byte(v) => buf.write_i8(*v),
        Tag::Short(v) => buf.write_i16(*v),
        Tag::Int(v) => buf.write_i32(*v),
        Tag::Long(v) => buf.write_i64(*v),
        Tag::Float(v) => buf.write_f32(*v),
        Tag::Double(v) => buf.write_f64(*v),
        Tag::ByteArray(bytes) => {
            buf.write_i32(array_len(bytes.len())?)?;
            buf.write_bytes(bytes)
        }
        Tag::String(s) => buf.write_utf(s),
        Tag::List(items) => {
            check_depth(depth + 1)?;
            let element = items.first().map_or(TAG_END, Tag::type_id);
            if items.iter().any(|item| item.type_id() != element) {
                return Err(BufferError::MixedListTag);
            }
            buf.write_u8(element)?;
            buf.write_i32(array_len(items.len())?)?;
            for item in items {
                write_payload(buf, item, depth + 1)?;
            }
            Ok(())
        }
        Tag::Compound(compound) => write_compound(buf, compound, depth + 1),
        Tag::IntArray(values) => {
            buf.write_i32(array_len(values.len())?)?;
            values.iter().try_for_each(|v| buf.write_i32(*v))
        }
        Tag::LongArray(values) => {
            buf.write_i32(array_len(values.len())?)?;
            values.iter().try_for_each(|v| buf.write_i64(*v))
        }
    }
}

fn read_compound(
    buf: &mut ByteBuffer,
    depth: usize,
) -> Result<CompoundTag, BufferError> {
    check_depth(depth)?;
    let mut compound = CompoundTag::new();
    loop {
        let tag_type = buf.read_u8()?;
        if tag_type == TAG_END {
            return Ok(compound);
        }
        let name = buf.read_utf()?;
        let tag = read_payload(buf, tag_type, depth)?;
        compound.insert(name, tag);
    }
}

fn read_payload(
    buf: &mut ByteBuffer,
    tag_type: u8,
    depth: usize,
) -> Result<Tag, BufferError> {
    Ok(match tag_type {
        TAG_BYTE => Tag::Byte(buf.read_i8()?),
        TAG_SHORT => Tag::Short(buf.read_i16()?),
        TAG_INT => Tag::Int(buf.read_i32()?),
        TAG_LONG => Tag::Long(buf.read_i64()?),
        TAG_FLOAT => Tag::Float(buf.read_f32()?),
        TAG_DOUBLE => Tag::Double(buf.read_f64()?),
        TAG_BYTE_ARRAY => {
            let len = read_array_len(buf, 1)?;
            Tag::ByteArray(buf.read_bytes(len)?)
        }
        TAG_STRING => Tag::String(buf.read_utf()?),
        TAG_LIST => {
            check_depth(depth + 1)?;
            let element = buf.read_u8()?;
            let len = read_array_len(buf, 1)?;
            if element == TAG_END && len > 0 {
                return Err(BufferError::UnknownTagType(TAG_END));
            }
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(read_payload(buf, element, depth + 1)?);
            }
            Tag::List(items)
        }
        TAG_COMPOUND => Tag::Compound(read_compound(buf, depth + 1)?),
        TAG_INT_ARRAY => {
            let len = read_array_len(buf, 4)?;
            let mut values = Vec::with_capacity(len);
            for _ in 0..len {
                values.push(buf.read_i32()?);
            }
            Tag::IntArray(values)
        }
        TAG_LONG_ARRAY => {
            let len = read_array_len(buf, 8)?;
            let mut values = Vec::with_capacity(len);
            for _ in 0..len {
                values.push(buf.read_i64()?);
            }
            Tag::LongArray(values)
        }
        other => return Err(BufferError::UnknownTagType(other)),
    })
}

/// Reads an i32 element count and checks that at least
/// `count × min_element_size` bytes remain, so a hostile count can't
/// trigger a huge allocation.
fn read_array_len(
    buf: &mut ByteBuffer,
    min_element_size: usize,
) -> Result<usize, BufferError> {
    let raw = buf.read_i32()?;
    let len = usize::try_from(raw).map_err(|_| BufferError::NegativeLength(raw))?;
    buf.check_readable(len.saturating_mul(min_element_size))?;
    Ok(len)
}

fn array_len(len: usize) -> Result<i32, BufferError> {
    i32::try_from(len).map_err(|_| BufferError::CapacityExceeded {
        requested: len,
        max: i32::MAX as usize,
    })
}

fn check_depth(depth: usize) -> Result<(), BufferError> {
    if depth > MAX_TAG_DEPTH {
        return Err(BufferError::TagDepthExceeded(MAX_TAG_DEPTH));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CompoundTag {
        let mut inner = CompoundTag::new();
        inner.insert("Name", Tag::String("Excalibur".into()));

        let mut root = CompoundTag::new();
        root.insert("display", Tag::Compound(inner));
        root.insert("Damage", Tag::Short(3));
        root.insert("Tags", Tag::List(vec![Tag::Int(1), Tag::Int(2)]));
        root.insert("Blob", Tag::ByteArray(vec![1, 2, 3]));
        root.insert("Longs", Tag::LongArray(vec![i64::MAX, -1]));
        root
    }

    #[test]
    fn test_none_is_single_end_byte() {
        let mut buf = ByteBuffer::new();
        buf.write_data_view(None).unwrap();
        assert_eq!(buf.to_vec(), vec![0]);
        assert_eq!(buf.read_data_view().unwrap(), None);
    }

    #[test]
    fn test_empty_compound_is_distinct_from_none() {
        let mut buf = ByteBuffer::new();
        buf.write_data_view(Some(&CompoundTag::new())).unwrap();
        assert_eq!(buf.to_vec(), vec![0x0A, 0, 0, 0]);
        assert_eq!(buf.read_data_view().unwrap(), Some(CompoundTag::new()));
    }

    #[test]
    fn test_nested_compound_round_trip() {
        let tag = sample();
        let mut buf = ByteBuffer::new();
        buf.write_data_view(Some(&tag)).unwrap();
        assert_eq!(buf.read_data_view().unwrap(), Some(tag));
        assert!(!buf.is_readable());
    }

    #[test]
    fn test_mixed_list_is_rejected() {
        let mut tag = CompoundTag::new();
        tag.insert("bad", Tag::List(vec![Tag::Int(1), Tag::Byte(1)]));
        let mut buf = ByteBuffer::new();
        assert_eq!(
            buf.write_data_view(Some(&tag)),
            Err(BufferError::MixedListTag)
        );
    }

    #[test]
    fn test_unknown_tag_type_is_rejected() {
        let mut buf = ByteBuffer::from_bytes(&[0x0A, 0, 0, 42, 0, 1, b'x']);
        assert_eq!(buf.read_data_view(), Err(BufferError::UnknownTagType(42)));
    }

    #[test]
    fn test_hostile_array_length_fails_before_allocating() {
        let mut buf = ByteBuffer::new();
        buf.write_u8(TAG_COMPOUND).unwrap();
        buf.write_utf("").unwrap();
        buf.write_u8(TAG_INT_ARRAY).unwrap();
        buf.write_utf("a").unwrap();
        buf.write_i32(i32::MAX).unwrap();
        assert!(matches!(
            buf.read_data_view(),
            Err(BufferError::Underflow { .. })
        ));
    }

    #[test]
    fn test_depth_limit_on_read() {
        let mut buf = ByteBuffer::new();
        buf.write_u8(TAG_COMPOUND).unwrap();
        buf.write_utf("").unwrap();
        for _ in 0..MAX_TAG_DEPTH + 1 {
            buf.write_u8(TAG_COMPOUND).unwrap();
            buf.write_utf("n").unwrap();
        }
        assert_eq!(
            buf.read_data_view(),
            Err(BufferError::TagDepthExceeded(MAX_TAG_DEPTH))
        );
    }

    #[test]
    fn test_typed_getters() {
        let mut tag = CompoundTag::new();
        tag.insert("i", Tag::Int(5));
        tag.insert("l", Tag::Long(6));
        assert_eq!(tag.get_int("i"), Some(5));
        assert_eq!(tag.get_long("l"), Some(6));
        assert_eq!(tag.get_int("l"), None);
        assert_eq!(tag.get_string("missing"), None);
    }
}
