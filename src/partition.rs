#[cfg(test)]
mod tests;

use std::{num::NonZeroUsize, ops::Range};

use smallvec::SmallVec;

use crate::error::MorphError;

/// Deterministic mapping of a flat buffer's byte ranges to worker ranks.
///
/// Every rank recomputes the identical plan locally from `(total_size,
/// workers)`, so the plan itself never needs to be transmitted. Ranks
/// `0..workers-1` receive `total_size / workers` bytes each and the last
/// rank absorbs the remainder, covering `[0, total_size)` exactly with no
/// gaps or overlaps.
///
/// For `total_size < workers` the quotient is zero: every non-last rank
/// gets a zero-length slice and the last rank gets the whole buffer.
/// Zero-length slices are legitimate and flow through the collectives
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    counts: SmallVec<[usize; 8]>,
    offsets: SmallVec<[usize; 8]>,
    total_size: usize,
}

impl PartitionPlan {
    #[must_use]
    pub fn new(total_size: usize, workers: NonZeroUsize) -> Self {
        let workers = workers.get();
        let base = total_size / workers;

        let mut counts = SmallVec::with_capacity(workers);
        let mut offsets = SmallVec::with_capacity(workers);
        for rank in 0..workers - 1 {
            counts.push(base);
            offsets.push(rank * base);
        }
        offsets.push((workers - 1) * base);
        counts.push(total_size - (workers - 1) * base);

        Self {
            counts,
            offsets,
            total_size,
        }
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Byte count owned by `rank`. Panics if `rank` is out of range.
    #[must_use]
    pub fn count(&self, rank: usize) -> usize {
        self.counts[rank]
    }

    /// Starting offset of the slice owned by `rank`. Panics if `rank` is
    /// out of range.
    #[must_use]
    pub fn offset(&self, rank: usize) -> usize {
        self.offsets[rank]
    }

    #[must_use]
    pub fn range(&self, rank: usize) -> Range<usize> {
        self.offsets[rank]..self.offsets[rank] + self.counts[rank]
    }

    /// Bounds-checked view of the slice owned by `rank` within a full
    /// buffer. The buffer must hold exactly `total_size` bytes.
    pub fn chunk<'a>(&self, buf: &'a [u8], rank: usize) -> Result<&'a [u8], MorphError> {
        self.check(buf.len(), rank)?;
        Ok(&buf[self.range(rank)])
    }

    /// Mutable counterpart of [`Self::chunk`], used when gathering result
    /// slices back into place.
    pub fn chunk_mut<'a>(&self, buf: &'a mut [u8], rank: usize) -> Result<&'a mut [u8], MorphError> {
        self.check(buf.len(), rank)?;
        let range = self.range(rank);
        Ok(&mut buf[range])
    }

    fn check(&self, len: usize, rank: usize) -> Result<(), MorphError> {
        if rank >= self.counts.len() || len != self.total_size {
            return Err(MorphError::PartitionOutOfBounds {
                rank,
                offset: self.offsets.get(rank).copied().unwrap_or(0),
                count: self.counts.get(rank).copied().unwrap_or(0),
                len,
            });
        }
        Ok(())
    }
}
