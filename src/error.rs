use std::{num::NonZeroUsize, path::PathBuf};

use thiserror::Error;

use crate::comm::CommPhase;

/// Width, height and channel count of an image, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub width: NonZeroUsize,
    pub height: NonZeroUsize,
    pub channels: NonZeroUsize,
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.channels)
    }
}

/// Everything that can go wrong while loading, blending, or saving.
///
/// All variants are terminal for the whole worker group; there is no
/// localized recovery path.
#[derive(Debug, Error)]
pub enum MorphError {
    #[error("failed to load image from {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to save image to {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("source images differ in shape: {first} vs {second}")]
    DimensionMismatch { first: Shape, second: Shape },

    #[error("pixel buffer holds {actual} bytes, expected {expected} for the given dimensions")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("blend weight {0} is outside [0.0, 1.0]")]
    InvalidAlpha(f64),

    #[error(
        "partition chunk for rank {rank} ({offset}..+{count}) does not fit a buffer of {len} bytes"
    )]
    PartitionOutOfBounds {
        rank: usize,
        offset: usize,
        count: usize,
        len: usize,
    },

    #[error("{phase} failed: {detail}")]
    Communication { phase: CommPhase, detail: String },

    #[error("{phase}: {detail}")]
    Protocol { phase: CommPhase, detail: String },
}

impl MorphError {
    pub(crate) fn comm(phase: CommPhase, err: &std::io::Error) -> Self {
        Self::Communication {
            phase,
            detail: err.to_string(),
        }
    }

    pub(crate) fn protocol(phase: CommPhase, detail: impl Into<String>) -> Self {
        Self::Protocol {
            phase,
            detail: detail.into(),
        }
    }
}
