//! Frame publication and consumption.
//!
//! The producer stages a whole frame in a private writer and copies it in
//! under the lock. The consumer copies the frame out under the lock and
//! decodes its private copy afterwards. Either side gives up on a busy
//! lock instead of waiting for the other.

use std::time::Duration;

use tracing::{debug, warn};

use crate::channel::protocol::{EntityRecord, FrameHeader, HEADER_BYTES, RECORD_BYTES};
use crate::channel::reader::BufferReader;
use crate::channel::shared::SharedBuffer;
use crate::channel::writer::BufferWriter;
use crate::error::{SimError, SimResult};
use crate::game::world::World;

/// Buffer size holding `records` records plus header and lock word.
pub fn buffer_size_for(records: usize) -> usize {
    crate::channel::shared::LOCK_BYTES + HEADER_BYTES + records * RECORD_BYTES
}

/// Producer side: writes one frame per tick.
#[derive(Debug)]
pub struct FramePublisher {
    buffer: SharedBuffer,
    writer: BufferWriter,
    timeout: Duration,
    truncation_reported: bool,
}

impl FramePublisher {
    /// Publisher polling the lock for at most `timeout`.
    pub fn new(buffer: SharedBuffer, timeout: Duration) -> Self {
        let writer = BufferWriter::with_capacity(buffer.payload_capacity());
        Self {
            buffer,
            writer,
            timeout,
            truncation_reported: false,
        }
    }

    /// The block frames go to.
    pub fn buffer(&self) -> &SharedBuffer {
        &self.buffer
    }

    /// Records that fit in one frame.
    pub fn max_records(&self) -> usize {
        self.buffer.payload_capacity().saturating_sub(HEADER_BYTES) / RECORD_BYTES
    }

    /// Serialize every live entity and copy the frame into the buffer.
    ///
    /// Returns `Ok(false)` when the lock stayed busy; the frame is skipped.
    pub fn publish(&mut self, world: &World, turbo: bool) -> SimResult<bool> {
        let capacity = self.buffer.payload_capacity();
        if capacity < HEADER_BYTES {
            return Err(SimError::FrameOverflow { needed: HEADER_BYTES, capacity });
        }

        let live = world.len();
        let count = live.min(self.max_records());
        let truncated = count < live;
        if truncated && !self.truncation_reported {
            warn!(live, capacity = count, "frame truncated");
            self.truncation_reported = true;
        }

        self.writer.reset();
        FrameHeader {
            count: count as u32,
            tick: world.tick() as u32,
            truncated,
            turbo,
        }
        .encode(&mut self.writer);

        let bounds = world.bounds();
        for entity in world.entities().take(count) {
            EntityRecord::from_entity(entity, &bounds).encode(&mut self.writer);
        }

        let guard = match self.buffer.lock_timeout(self.timeout) {
            Ok(guard) => guard,
            Err(SimError::ChannelContended) => {
                debug!(tick = world.tick(), "publish skipped, buffer busy");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        guard.write(0, self.writer.as_bytes())?;
        Ok(true)
    }
}

/// One decoded frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    /// Frame header
    pub header: FrameHeader,
    /// Entity records
    pub records: Vec<EntityRecord>,
}

/// Consumer side: copies frames out on its own schedule.
#[derive(Clone, Debug)]
pub struct FrameConsumer {
    buffer: SharedBuffer,
}

impl FrameConsumer {
    /// Consumer of `buffer`.
    pub fn new(buffer: SharedBuffer) -> Self {
        Self { buffer }
    }

    /// Copy the current frame if the lock is free right now.
    pub fn poll(&self) -> SimResult<Option<Snapshot>> {
        let Some(bytes) = self.copy_frame() else {
            return Ok(None);
        };
        Self::decode(bytes).map(Some)
    }

    /// Copy the current frame, polling the lock for at most `timeout`.
    pub fn poll_timeout(&self, timeout: Duration) -> SimResult<Snapshot> {
        let guard = self.buffer.lock_timeout(timeout)?;
        let bytes = Self::copy_locked(&guard);
        drop(guard);
        Self::decode(bytes)
    }

    fn copy_frame(&self) -> Option<Vec<u8>> {
        let guard = self.buffer.try_lock()?;
        Some(Self::copy_locked(&guard))
    }

    fn copy_locked(guard: &crate::channel::shared::LockGuard<'_>) -> Vec<u8> {
        let mut bytes = guard.read(0, HEADER_BYTES);
        if bytes.len() < 4 {
            return bytes;
        }
        let count = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        bytes.extend(guard.read(HEADER_BYTES, count.saturating_mul(RECORD_BYTES)));
        bytes
    }

    fn decode(bytes: Vec<u8>) -> SimResult<Snapshot> {
        let mut reader = BufferReader::new(bytes);
        let header = FrameHeader::decode(&mut reader)?;
        let records = (0..header.count)
            .map(|_| EntityRecord::decode(&mut reader))
            .collect::<SimResult<Vec<_>>>()?;
        Ok(Snapshot { header, records })
    }
}
