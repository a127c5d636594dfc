//! Cross-Thread Channel
//!
//! One producer (the simulation worker) and one consumer (the presentation
//! side) share a lock-guarded byte block. Each tick the producer replaces
//! the frame; the consumer copies whichever frame is current when it polls.
//!
//! ## Module Structure
//!
//! - `shared`: Lock word and payload block
//! - `writer` / `reader`: Little-endian fields and bit packing
//! - `protocol`: Frame layout, quantization, commands, stats
//! - `frame`: Publisher and consumer

pub mod shared;
pub mod writer;
pub mod reader;
pub mod protocol;
pub mod frame;

pub use shared::{LockGuard, SharedBuffer};
pub use writer::BufferWriter;
pub use reader::BufferReader;
pub use protocol::{Command, EntityRecord, FrameHeader, StatsReport};
pub use frame::{buffer_size_for, FrameConsumer, FramePublisher, Snapshot};
