
use log::debug;

use crate::{
    blend,
    comm::{CommPhase, Communicator},
    error::MorphError,
    image::ImageBuffer,
    partition::PartitionPlan,
};

pub const DEFAULT_ALPHA: f64 = 0.5;

/// Per-blend configuration, supplied explicitly rather than read from
/// process-wide state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MorphConfig {
    /// Weight of the first source image, in `[0.0, 1.0]`.
    pub alpha: f64,
    /// Rank that holds the full source and result images.
    pub root: usize,
}

impl MorphConfig {
    pub fn new(alpha: f64) -> Result<Self, MorphError> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(MorphError::InvalidAlpha(alpha));
        }
        Ok(Self { alpha, root: 0 })
    }
}

impl Default for MorphConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            root: 0,
        }
    }
}

/// Fixed-size scalar header broadcast in step 1: buffer size plus the
/// blend weight, so a worker launched with a divergent alpha cannot
/// silently corrupt the result.
const HEADER_LEN: usize = 16;

fn encode_header(total_size: usize, alpha: f64) -> [u8; HEADER_LEN] {
    let mut buf = [0u8; HEADER_LEN];
    buf[..8].copy_from_slice(&(total_size as u64).to_le_bytes());
    buf[8..].copy_from_slice(&alpha.to_le_bytes());
    buf
}

fn decode_header(payload: &[u8]) -> Result<(usize, f64), MorphError> {
    if payload.len() != HEADER_LEN {
        return Err(MorphError::protocol(
            CommPhase::Header,
            format!("header of {} bytes, expected {HEADER_LEN}", payload.len()),
        ));
    }
    let total_size = u64::from_le_bytes([
        payload[0], payload[1], payload[2], payload[3], payload[4], payload[5], payload[6],
        payload[7],
    ]);
    let alpha = f64::from_le_bytes([
        payload[8], payload[9], payload[10], payload[11], payload[12], payload[13], payload[14],
        payload[15],
    ]);
    Ok((usize::try_from(total_size).map_err(|_| {
        MorphError::protocol(CommPhase::Header, "buffer size does not fit this platform")
    })?, alpha))
}

/// Blends two images across the whole worker group.
///
/// The root rank supplies both source images and receives the blended
/// result; every other rank passes `None` for both and receives
/// `Ok(None)`, its contribution being the slice it computes and donates
/// during the gather.
///
/// Protocol, in order, each step a barrier across the group:
/// 1. the root validates the source shapes and broadcasts the scalar
///    header (total byte count and alpha);
/// 2. every rank derives the identical [`PartitionPlan`] locally;
/// 3. slices of the first source are scattered;
/// 4. slices of the second source are scattered;
/// 5. every rank blends its two slices;
/// 6. result slices are gathered back onto the root at their plan offsets.
///
/// All-or-nothing: any failing step aborts the operation for the whole
/// group with no partial result.
pub fn morph_distributed<C: Communicator>(
    comm: &mut C,
    config: &MorphConfig,
    src1: Option<&ImageBuffer>,
    src2: Option<&ImageBuffer>,
) -> Result<Option<ImageBuffer>, MorphError> {
    let is_root = comm.rank() == config.root;

    let header = if is_root {
        let (src1, src2) = match (src1, src2) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return Err(MorphError::protocol(
                    CommPhase::Header,
                    "root rank called without both source images",
                ));
            }
        };
        // Checked before any communication happens.
        if !src1.same_shape(src2) {
            return Err(MorphError::DimensionMismatch {
                first: src1.shape(),
                second: src2.shape(),
            });
        }
        if !(0.0..=1.0).contains(&config.alpha) {
            return Err(MorphError::InvalidAlpha(config.alpha));
        }
        Some(encode_header(src1.size(), config.alpha))
    } else {
        None
    };

    // Step 1: scalar broadcast. Only the root knew the size and weight
    // beforehand; afterwards every rank agrees on both.
    let header = comm.broadcast(
        config.root,
        CommPhase::Header,
        header.as_ref().map(|h| h.as_slice()),
    )?;
    let (total_size, alpha) = decode_header(&header)?;

    // Step 2: derived, not transmitted.
    let plan = PartitionPlan::new(total_size, comm.world_size());
    debug!(
        "rank {}: plan ready, {} bytes of {total_size} are mine",
        comm.rank(),
        plan.count(comm.rank())
    );

    // Steps 3 and 4.
    let slice1 = comm.scatterv(
        config.root,
        CommPhase::ScatterFirst,
        src1.map(ImageBuffer::pixels),
        &plan,
    )?;
    let slice2 = comm.scatterv(
        config.root,
        CommPhase::ScatterSecond,
        src2.map(ImageBuffer::pixels),
        &plan,
    )?;

    // Step 5: local compute, no shared state.
    let blended = blend::blend(&slice1, &slice2, alpha);

    // Step 6.
    let gathered = comm.gatherv(config.root, CommPhase::Gather, &blended, &plan)?;

    match (gathered, src1) {
        (Some(pixels), Some(src1)) => Ok(Some(ImageBuffer::from_pixels(
            src1.width(),
            src1.height(),
            src1.channels(),
            pixels,
        )?)),
        _ => Ok(None),
    }
}

/// Single-process reference blend over the full buffers. Used directly
/// when there is only one worker, and as the oracle the distributed path
/// is tested against.
pub fn morph_sequential(
    src1: &ImageBuffer,
    src2: &ImageBuffer,
    alpha: f64,
) -> Result<ImageBuffer, MorphError> {
    if !src1.same_shape(src2) {
        return Err(MorphError::DimensionMismatch {
            first: src1.shape(),
            second: src2.shape(),
        });
    }
    if !(0.0..=1.0).contains(&alpha) {
        return Err(MorphError::InvalidAlpha(alpha));
    }

    let pixels = blend::blend(src1.pixels(), src2.pixels(), alpha);
    ImageBuffer::from_pixels(src1.width(), src1.height(), src1.channels(), pixels)
}

/// Runs the worker side of one blend and returns. The worker owns no
/// image data before or after; it exists to compute its slice.
pub fn run_worker<C: Communicator>(comm: &mut C, config: &MorphConfig) -> Result<(), MorphError> {
    let result = morph_distributed(comm, config, None, None)?;
    debug_assert!(result.is_none());
    Ok(())
}
