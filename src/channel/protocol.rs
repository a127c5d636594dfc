//! Frame Protocol
//!
//! Layout of one published frame and the messages travelling the other
//! way.
//!
//! ## Frame Layout (after the lock word)
//!
//! ```text
//! offset  size  field
//! 0       4     count    number of records (u32 LE)
//! 4       4     tick     tick index (u32 LE, wraps)
//! 8       1     flags    bit 0 truncated, bit 1 turbo
//! 9       10×n  records
//! ```
//!
//! ## Record Layout
//!
//! ```text
//! tag u8 | id u16 | x u16 | y u16 | angle u8 | size u16
//! ```
//!
//! Positions are quantized to 16 bits over the world bounds and angles to
//! 8 bits over a full turn. Ids are truncated to their low 16 bits.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::channel::reader::BufferReader;
use crate::channel::shared::SharedBuffer;
use crate::channel::writer::BufferWriter;
use crate::config::PopulationConfig;
use crate::core::ids::EntityId;
use crate::core::polygon::Bounds;
use crate::error::SimResult;
use crate::game::entity::Entity;
use crate::game::species::Species;

/// Bytes per record.
pub const RECORD_BYTES: usize = 10;

/// Bytes of the frame header.
pub const HEADER_BYTES: usize = 9;

/// Bits used for positions.
pub const POSITION_BITS: u32 = 16;

/// Bits used for angles.
pub const ANGLE_BITS: u32 = 8;

/// Map `value` in `[0, max]` onto `[0, 2^bits - 1]`, rounding to nearest.
pub fn quantize(value: f32, max: f32, bits: u32) -> u32 {
    if max <= 0.0 || !value.is_finite() {
        return 0;
    }
    let top = ((1u64 << bits) - 1) as f64;
    let value = f64::from(value.clamp(0.0, max));
    (value * top / f64::from(max)).round() as u32
}

/// Inverse of [`quantize`].
pub fn dequantize(value: u32, max: f32, bits: u32) -> f32 {
    let top = ((1u64 << bits) - 1) as f64;
    (f64::from(value) * f64::from(max) / top) as f32
}

/// Leading fields of a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameHeader {
    /// Records that follow
    pub count: u32,
    /// Tick that produced the frame
    pub tick: u32,
    /// Some live entities did not fit
    pub truncated: bool,
    /// Producer runs uncapped
    pub turbo: bool,
}

impl FrameHeader {
    /// Append to `writer`.
    pub fn encode(&self, writer: &mut BufferWriter) {
        writer.write_u32(self.count);
        writer.write_u32(self.tick);
        writer.write_flag(self.truncated);
        writer.write_flag(self.turbo);
    }

    /// Read from `reader`.
    pub fn decode(reader: &mut BufferReader) -> SimResult<Self> {
        let count = reader.read_u32()?;
        let tick = reader.read_u32()?;
        let truncated = reader.read_flag()?;
        let turbo = reader.read_flag()?;
        Ok(Self { count, tick, truncated, turbo })
    }
}

/// One entity as seen by the consumer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityRecord {
    /// Species tag
    pub tag: u8,
    /// Low 16 bits of the entity id
    pub id: u16,
    /// Quantized x
    pub x: u16,
    /// Quantized y
    pub y: u16,
    /// Quantized facing angle
    pub angle: u8,
    /// Diameter, rounded
    pub size: u16,
}

impl EntityRecord {
    /// Quantize an entity against `bounds`.
    pub fn from_entity(entity: &Entity, bounds: &Bounds) -> Self {
        let position = entity.body.position;
        Self {
            tag: entity.species.tag(),
            id: (entity.id & 0xFFFF) as u16,
            x: quantize(position.x, bounds.max.x, POSITION_BITS) as u16,
            y: quantize(position.y, bounds.max.y, POSITION_BITS) as u16,
            angle: quantize(entity.body.angle, TAU, ANGLE_BITS) as u8,
            size: entity.body.size.x.round().clamp(0.0, f32::from(u16::MAX)) as u16,
        }
    }

    /// Append to `writer`.
    pub fn encode(&self, writer: &mut BufferWriter) {
        writer.write_u8(self.tag);
        writer.write_u16(self.id);
        writer.write_u16(self.x);
        writer.write_u16(self.y);
        writer.write_u8(self.angle);
        writer.write_u16(self.size);
    }

    /// Read from `reader`. Fails on a tag no species owns.
    pub fn decode(reader: &mut BufferReader) -> SimResult<Self> {
        let tag = reader.read_u8()?;
        Species::from_tag(tag)?;
        Ok(Self {
            tag,
            id: reader.read_u16()?,
            x: reader.read_u16()?,
            y: reader.read_u16()?,
            angle: reader.read_u8()?,
            size: reader.read_u16()?,
        })
    }

    /// Species named by the tag.
    pub fn species(&self) -> SimResult<Species> {
        Species::from_tag(self.tag)
    }

    /// Decoded x in world units.
    pub fn world_x(&self, bounds: &Bounds) -> f32 {
        dequantize(u32::from(self.x), bounds.max.x, POSITION_BITS)
    }

    /// Decoded y in world units.
    pub fn world_y(&self, bounds: &Bounds) -> f32 {
        dequantize(u32::from(self.y), bounds.max.y, POSITION_BITS)
    }

    /// Decoded angle in radians.
    pub fn world_angle(&self) -> f32 {
        dequantize(u32::from(self.angle), TAU, ANGLE_BITS)
    }
}

/// Messages from the presentation side to the simulation worker.
#[derive(Clone, Debug)]
pub enum Command {
    /// Attach the shared buffer and populate the world
    Init {
        /// Block frames are published into
        buffer: SharedBuffer,
        /// Initial population
        counts: PopulationConfig,
    },
    /// Pause or resume
    Pause(bool),
    /// Scale simulated time
    Speed(f32),
    /// Drag an entity to a world position
    Move {
        /// Entity to move
        id: EntityId,
        /// Target x
        x: f32,
        /// Target y
        y: f32,
    },
    /// Remove an entity
    Destroy(EntityId),
    /// Stop the worker
    Shutdown,
}

/// Diagnostics emitted once per stats window.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    /// Ticks per second over the window
    pub tps: u32,
    /// Mean milliseconds spent per tick
    pub mspt: f64,
    /// Live carnivores
    pub carnivores: u32,
    /// Live herbivores
    pub herbivores: u32,
    /// Live plants
    pub plants: u32,
    /// Simulated milliseconds since start
    pub uptime_ms: u64,
    /// Completed ticks
    pub tick: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;
    use proptest::prelude::*;

    #[test]
    fn test_quantize_edges() {
        assert_eq!(quantize(0.0, 4500.0, 16), 0);
        assert_eq!(quantize(4500.0, 4500.0, 16), 65_535);
        assert_eq!(quantize(-10.0, 4500.0, 16), 0);
        assert_eq!(quantize(9000.0, 4500.0, 16), 65_535);
        assert_eq!(quantize(f32::NAN, 4500.0, 16), 0);
        assert_eq!(quantize(TAU, TAU, 8), 255);
    }

    #[test]
    fn test_header_layout() {
        let mut writer = BufferWriter::new();
        FrameHeader { count: 2, tick: 7, truncated: false, turbo: true }.encode(&mut writer);
        assert_eq!(writer.len(), HEADER_BYTES);
        assert_eq!(writer.as_bytes()[8], 0b10);

        let mut reader = BufferReader::new(writer.as_bytes().to_vec());
        let header = FrameHeader::decode(&mut reader).unwrap();
        assert_eq!(header.count, 2);
        assert!(header.turbo && !header.truncated);
    }

    #[test]
    fn test_record_size() {
        let mut writer = BufferWriter::new();
        let record = EntityRecord { tag: 1, id: 300, x: 1, y: 2, angle: 3, size: 60 };
        record.encode(&mut writer);
        assert_eq!(writer.len(), RECORD_BYTES);

        let mut reader = BufferReader::new(writer.as_bytes().to_vec());
        assert_eq!(EntityRecord::decode(&mut reader).unwrap(), record);
        assert_eq!(record.species().unwrap(), Species::Herbivore);
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let mut writer = BufferWriter::new();
        EntityRecord { tag: 9, id: 1, x: 0, y: 0, angle: 0, size: 40 }.encode(&mut writer);
        let mut reader = BufferReader::new(writer.as_bytes().to_vec());
        assert!(matches!(
            EntityRecord::decode(&mut reader),
            Err(SimError::UnknownSpecies(9))
        ));
    }

    proptest! {
        #[test]
        fn prop_position_error_bounded(value in 0.0f32..4500.0) {
            let max = 4500.0;
            let decoded = dequantize(quantize(value, max, 16), max, 16);
            prop_assert!((decoded - value).abs() <= max / 65_535.0);
        }
    }
}
