//! Plain domain values that appear inside messages.

use cinder_buffer::CompoundTag;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A block position, packed into one `i64` on the wire:
///
/// ```text
/// 63          38 37      26 25          0
/// [ x: 26 bits ][ y: 12 bits ][ z: 26 bits ]
/// ```
///
/// X and Z are signed. Y is unsigned. Values outside those ranges wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

const XZ_MASK: i64 = (1 << 26) - 1;
const Y_MASK: i64 = (1 << 12) - 1;

impl Position {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn pack(self) -> i64 {
        ((i64::from(self.x) & XZ_MASK) << 38)
            | ((i64::from(self.y) & Y_MASK) << 26)
            | (i64::from(self.z) & XZ_MASK)
    }

    pub fn unpack(packed: i64) -> Self {
        // Arithmetic shifts sign-extend x and z.
        let x = packed >> 38;
        let y = (packed >> 26) & Y_MASK;
        let z = (packed << 38) >> 38;
        Self {
            x: x as i32,
            y: y as i32,
            z: z as i32,
        }
    }
}

// ---------------------------------------------------------------------------
// Vectors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3d {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Single-precision vector. Used for rotations and cursor offsets.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3f {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Velocity units per block per tick on the wire.
pub const VELOCITY_SCALE: f64 = 8000.0;

/// Scales a velocity component to its wire form, clamping into `i16`.
/// NaN becomes 0.
pub fn velocity_to_wire(component: f64) -> i16 {
    if component.is_nan() {
        return 0;
    }
    // `as` saturates float → int conversions.
    (component * VELOCITY_SCALE)
        .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

pub fn velocity_from_wire(raw: i16) -> f64 {
    f64::from(raw) / VELOCITY_SCALE
}

// ---------------------------------------------------------------------------
// Blocks and items
// ---------------------------------------------------------------------------

/// A block type plus one of its states.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockState {
    pub block: String,
    pub state: u32,
}

impl BlockState {
    pub fn new(block: impl Into<String>, state: u32) -> Self {
        Self {
            block: block.into(),
            state,
        }
    }
}

/// A stack of items.
///
/// "No item" is `Option<ItemStack>::None`; a stack with quantity 0 is
/// treated the same way on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemStack {
    pub item: String,
    pub quantity: u8,
    pub data: Option<CompoundTag>,
}

impl ItemStack {
    pub fn new(item: impl Into<String>, quantity: u8) -> Self {
        Self {
            item: item.into(),
            quantity,
            data: None,
        }
    }

    pub fn with_data(mut self, data: CompoundTag) -> Self {
        self.data = Some(data);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.quantity == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_round_trip_at_bounds() {
        let max = (1 << 25) - 1;
        let min = -(1 << 25);
        for pos in [
            Position::new(max, 0, max),
            Position::new(min, 4095, min),
            Position::new(-1, 64, -1),
            Position::new(0, 0, 0),
            Position::new(12_345, 255, -54_321),
        ] {
            assert_eq!(Position::unpack(pos.pack()), pos, "{pos:?}");
        }
    }

    #[test]
    fn test_position_bit_layout() {
        let packed = Position::new(1, 1, 1).pack();
        assert_eq!(packed, (1 << 38) | (1 << 26) | 1);
        assert_eq!(Position::new(-1, 0, 0).pack() >> 38, -1);
    }

    #[test]
    fn test_position_out_of_range_wraps() {
        let pos = Position::new(1 << 25, 4096, 0);
        let back = Position::unpack(pos.pack());
        assert_eq!(back.x, -(1 << 25));
        assert_eq!(back.y, 0);
    }

    #[test]
    fn test_velocity_clamps() {
        assert_eq!(velocity_to_wire(1.0), 8000);
        assert_eq!(velocity_to_wire(100.0), i16::MAX);
        assert_eq!(velocity_to_wire(-100.0), i16::MIN);
        assert_eq!(velocity_to_wire(f64::NAN), 0);
        assert_eq!(velocity_to_wire(f64::INFINITY), i16::MAX);
        assert_eq!(velocity_from_wire(4000), 0.5);
    }
}
