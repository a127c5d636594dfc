//! Simulation errors.
//!
//! Only configuration mistakes and channel faults are errors. A lookup of a
//! destroyed entity is routine and returns `None` instead.

use crate::game::collider::ShapeKind;

/// Errors raised by the simulation and its channel.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Type tag that does not name a registered species
    #[error("unknown species tag {0}")]
    UnknownSpecies(u8),

    /// Shape pair the resolver has no routine for
    #[error("no collision resolver for {a:?} vs {b:?}")]
    UnsupportedShapePair {
        /// Shape of the first collider
        a: ShapeKind,
        /// Shape of the second collider
        b: ShapeKind,
    },

    /// Channel lock could not be taken within the poll budget
    #[error("shared buffer is locked by the other side")]
    ChannelContended,

    /// Write past the end of the shared buffer
    #[error("frame needs {needed} bytes but the buffer holds {capacity}")]
    FrameOverflow {
        /// Bytes required
        needed: usize,
        /// Bytes available
        capacity: usize,
    },

    /// Read past the end of a frame snapshot
    #[error("unexpected end of frame at byte {offset}")]
    UnexpectedEof {
        /// Cursor position of the failed read
        offset: usize,
    },

    /// Command that needs a running world arrived before `init`
    #[error("simulation has not been initialised")]
    NotInitialized,

    /// Worker thread is gone
    #[error("simulation worker disconnected")]
    WorkerDisconnected,

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O failure while loading configuration
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed configuration JSON
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result alias used across the crate.
pub type SimResult<T> = Result<T, SimError>;
