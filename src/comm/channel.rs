//! In-process transport over `std::sync::mpsc` channels.
//!
//! Used for single-worker operation and for exercising the full collective
//! protocol across threads in tests. Unlike the socket transport this is a
//! full mesh, so any rank may act as root.

use std::{
    num::NonZeroUsize,
    sync::mpsc::{Receiver, Sender, channel},
};

use crate::{
    comm::{CommPhase, Communicator, check_send_len, expect_root_payload},
    error::MorphError,
    partition::PartitionPlan,
};

struct Message {
    tag: u8,
    from: usize,
    payload: Vec<u8>,
}

pub struct ChannelCommunicator {
    rank: usize,
    world_size: NonZeroUsize,
    /// Senders to every other rank; `None` at this rank's own index so
    /// that dropping the peers' endpoints is observable as a hangup.
    senders: Vec<Option<Sender<Message>>>,
    receiver: Receiver<Message>,
}

impl ChannelCommunicator {
    /// Creates one connected communicator per rank.
    #[must_use]
    pub fn create(world_size: NonZeroUsize) -> Vec<Self> {
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..world_size.get()).map(|_| channel()).unzip();

        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, receiver)| Self {
                rank,
                world_size,
                senders: senders
                    .iter()
                    .enumerate()
                    .map(|(dest, s)| (dest != rank).then(|| s.clone()))
                    .collect(),
                receiver,
            })
            .collect()
    }

    fn send_to(&self, dest: usize, phase: CommPhase, payload: Vec<u8>) -> Result<(), MorphError> {
        self.senders[dest]
            .as_ref()
            .ok_or_else(|| MorphError::protocol(phase, "rank addressed itself"))?
            .send(Message {
                tag: phase.tag(),
                from: self.rank,
                payload,
            })
            .map_err(|_| MorphError::Communication {
                phase,
                detail: format!("rank {dest} hung up"),
            })
    }

    /// Blocks until a message for `phase` arrives. Messages from a given
    /// sender arrive in order, so a tag mismatch means the peers fell out
    /// of step.
    fn recv(&self, phase: CommPhase) -> Result<Message, MorphError> {
        let msg = self.receiver.recv().map_err(|_| MorphError::Communication {
            phase,
            detail: "all peers hung up".into(),
        })?;
        if msg.tag != phase.tag() {
            return Err(MorphError::protocol(
                phase,
                format!("rank {} sent a frame for a different step", msg.from),
            ));
        }
        Ok(msg)
    }

    fn check_plan(&self, phase: CommPhase, plan: &PartitionPlan) -> Result<(), MorphError> {
        if plan.worker_count() != self.world_size.get() {
            return Err(MorphError::protocol(
                phase,
                format!(
                    "plan covers {} ranks but the world holds {}",
                    plan.worker_count(),
                    self.world_size
                ),
            ));
        }
        Ok(())
    }
}

impl Communicator for ChannelCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn world_size(&self) -> NonZeroUsize {
        self.world_size
    }

    fn broadcast(
        &mut self,
        root: usize,
        phase: CommPhase,
        payload: Option<&[u8]>,
    ) -> Result<Vec<u8>, MorphError> {
        expect_root_payload(phase, payload, self.rank == root)?;

        if self.rank == root {
            // expect_root_payload guarantees Some on the root
            #[allow(clippy::unwrap_used)]
            let payload = payload.unwrap();
            for dest in (0..self.world_size.get()).filter(|&d| d != root) {
                self.send_to(dest, phase, payload.to_vec())?;
            }
            Ok(payload.to_vec())
        } else {
            Ok(self.recv(phase)?.payload)
        }
    }

    fn scatterv(
        &mut self,
        root: usize,
        phase: CommPhase,
        send: Option<&[u8]>,
        plan: &PartitionPlan,
    ) -> Result<Vec<u8>, MorphError> {
        self.check_plan(phase, plan)?;
        expect_root_payload(phase, send, self.rank == root)?;

        if self.rank == root {
            #[allow(clippy::unwrap_used)]
            let send = send.unwrap();
            for dest in (0..self.world_size.get()).filter(|&d| d != root) {
                self.send_to(dest, phase, plan.chunk(send, dest)?.to_vec())?;
            }
            Ok(plan.chunk(send, root)?.to_vec())
        } else {
            let msg = self.recv(phase)?;
            check_send_len(phase, plan, self.rank, msg.payload.len())?;
            Ok(msg.payload)
        }
    }

    fn gatherv(
        &mut self,
        root: usize,
        phase: CommPhase,
        send: &[u8],
        plan: &PartitionPlan,
    ) -> Result<Option<Vec<u8>>, MorphError> {
        self.check_plan(phase, plan)?;
        check_send_len(phase, plan, self.rank, send.len())?;

        if self.rank == root {
            let mut result = vec![0; plan.total_size()];
            plan.chunk_mut(&mut result, root)?.copy_from_slice(send);
            for _ in 0..self.world_size.get() - 1 {
                let msg = self.recv(phase)?;
                check_send_len(phase, plan, msg.from, msg.payload.len())?;
                plan.chunk_mut(&mut result, msg.from)?
                    .copy_from_slice(&msg.payload);
            }
            Ok(Some(result))
        } else {
            self.send_to(root, phase, send.to_vec())?;
            Ok(None)
        }
    }
}
