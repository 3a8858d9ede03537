mod channel;
mod frame;
mod socket;


use std::num::NonZeroUsize;

pub use channel::ChannelCommunicator;
pub use socket::{COORDINATOR_RANK, TcpCommunicator};

use crate::{error::MorphError, partition::PartitionPlan};

/// Protocol step a collective call belongs to. Every frame on the wire is
/// tagged with its phase, so a participant that falls out of step fails
/// loudly instead of consuming bytes meant for a different phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommPhase {
    /// Worker handshake when the group is formed.
    Setup,
    /// Step 1: scalar header (total size + blend weight) from the root.
    Header,
    /// Step 3: slices of the first source image.
    ScatterFirst,
    /// Step 4: slices of the second source image.
    ScatterSecond,
    /// Step 6: result slices back to the root.
    Gather,
}

impl CommPhase {
    pub(crate) fn tag(self) -> u8 {
        match self {
            Self::Setup => 0,
            Self::Header => 1,
            Self::ScatterFirst => 2,
            Self::ScatterSecond => 3,
            Self::Gather => 4,
        }
    }
}

impl std::fmt::Display for CommPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Setup => "worker handshake",
            Self::Header => "header broadcast",
            Self::ScatterFirst => "scatter of source 1",
            Self::ScatterSecond => "scatter of source 2",
            Self::Gather => "result gather",
        })
    }
}

/// The four collective primitives the blend protocol is built on, plus an
/// addressable rank identity.
///
/// Every collective is blocking and acts as a full barrier: all ranks must
/// invoke the same operation in the same order with counts consistent with
/// the shared plan, or the operation never completes. There is no timeout
/// and no partial completion; a peer that dies mid-collective surfaces as a
/// [`MorphError::Communication`] on the surviving side once its transport
/// closes.
///
/// A communicator is acquired once at process startup and passed into each
/// blend as a dependency. Teardown happens on drop.
pub trait Communicator {
    /// This process's unique identity within the worker group.
    fn rank(&self) -> usize;

    /// Total number of participating processes.
    fn world_size(&self) -> NonZeroUsize;

    /// Distributes one payload from `root` to every rank. The root passes
    /// `Some(payload)`, all other ranks pass `None`; every rank receives
    /// the payload bytes.
    fn broadcast(
        &mut self,
        root: usize,
        phase: CommPhase,
        payload: Option<&[u8]>,
    ) -> Result<Vec<u8>, MorphError>;

    /// Distributes contiguous, non-overlapping slices of `send` from
    /// `root` to every rank according to `plan`. Each rank (the root
    /// included) receives exactly `plan.count(rank)` bytes. Zero-length
    /// slices are legal.
    fn scatterv(
        &mut self,
        root: usize,
        phase: CommPhase,
        send: Option<&[u8]>,
        plan: &PartitionPlan,
    ) -> Result<Vec<u8>, MorphError>;

    /// Collects every rank's `send` slice onto `root`, placing each at its
    /// offset in the plan. Only the root receives `Some(buffer)`.
    fn gatherv(
        &mut self,
        root: usize,
        phase: CommPhase,
        send: &[u8],
        plan: &PartitionPlan,
    ) -> Result<Option<Vec<u8>>, MorphError>;
}

fn expect_root_payload(
    phase: CommPhase,
    payload: Option<&[u8]>,
    is_root: bool,
) -> Result<(), MorphError> {
    if is_root != payload.is_some() {
        return Err(MorphError::protocol(
            phase,
            if is_root {
                "root rank called a collective without its payload"
            } else {
                "non-root rank supplied a payload to a rooted collective"
            },
        ));
    }
    Ok(())
}

fn check_send_len(phase: CommPhase, plan: &PartitionPlan, rank: usize, len: usize) -> Result<(), MorphError> {
    if len != plan.count(rank) {
        return Err(MorphError::protocol(
            phase,
            format!(
                "rank {rank} sent {len} bytes where the plan assigns {}",
                plan.count(rank)
            ),
        ));
    }
    Ok(())
}
