//! Multi-process transport: one TCP stream per worker, star topology
//! around the coordinating rank.
//!
//! The process launcher owns the topology: it binds a listener, hands it
//! to [`TcpCommunicator::coordinator`], and tells every worker process the
//! address to dial. The core only ever sees "my rank" and "world size".

use std::{
    net::{SocketAddr, TcpListener, TcpStream},
    num::NonZeroUsize,
    thread,
    time::Duration,
};

use log::{debug, info};

use crate::{
    comm::{CommPhase, Communicator, check_send_len, expect_root_payload, frame},
    error::MorphError,
    partition::PartitionPlan,
};

/// The rank that holds the full source and result images. The socket
/// transport always routes collectives through this rank.
pub const COORDINATOR_RANK: usize = 0;

const CONNECT_ATTEMPTS: u32 = 100;
const CONNECT_BACKOFF: Duration = Duration::from_millis(50);

enum Role {
    /// Streams to every worker, indexed by `rank - 1`.
    Coordinator { workers: Vec<TcpStream> },
    Worker { coordinator: TcpStream },
}

pub struct TcpCommunicator {
    rank: usize,
    world_size: NonZeroUsize,
    role: Role,
}

impl TcpCommunicator {
    /// Accepts one connection per worker rank and forms the group. The
    /// listener must already be bound; its address is what workers dial.
    pub fn coordinator(listener: &TcpListener, world_size: NonZeroUsize) -> Result<Self, MorphError> {
        let phase = CommPhase::Setup;
        let mut slots: Vec<Option<TcpStream>> = (1..world_size.get()).map(|_| None).collect();

        for _ in 1..world_size.get() {
            let (mut stream, peer) = listener
                .accept()
                .map_err(|e| MorphError::comm(phase, &e))?;
            stream
                .set_nodelay(true)
                .map_err(|e| MorphError::comm(phase, &e))?;

            let hello = frame::read_frame(&mut stream, phase)?;
            let (rank, claimed_world) = decode_hello(&hello)
                .ok_or_else(|| MorphError::protocol(phase, "malformed worker hello"))?;
            if claimed_world != world_size.get() {
                return Err(MorphError::protocol(
                    phase,
                    format!(
                        "worker at {peer} expects a world of {claimed_world}, coordinator has {}",
                        world_size
                    ),
                ));
            }
            let slot = slots
                .get_mut(rank.wrapping_sub(1))
                .ok_or_else(|| MorphError::protocol(phase, format!("worker claimed invalid rank {rank}")))?;
            if slot.replace(stream).is_some() {
                return Err(MorphError::protocol(
                    phase,
                    format!("two workers claimed rank {rank}"),
                ));
            }
            debug!("rank {rank} joined from {peer}");
        }

        // Every slot was filled exactly once, so the unwrap cannot fire.
        #[allow(clippy::unwrap_used)]
        let workers: Vec<TcpStream> = slots.into_iter().map(|s| s.unwrap()).collect();
        info!("worker group of {} formed", world_size);

        Ok(Self {
            rank: COORDINATOR_RANK,
            world_size,
            role: Role::Coordinator { workers },
        })
    }

    /// Dials the coordinator and identifies this process as `rank`.
    /// Retries the connection briefly in case this worker was scheduled
    /// before the coordinator finished binding.
    pub fn worker(
        addr: SocketAddr,
        rank: usize,
        world_size: NonZeroUsize,
    ) -> Result<Self, MorphError> {
        let phase = CommPhase::Setup;
        if rank == COORDINATOR_RANK || rank >= world_size.get() {
            return Err(MorphError::protocol(
                phase,
                format!("rank {rank} is not a valid worker rank in a world of {world_size}"),
            ));
        }

        let mut stream = connect_with_retry(addr).map_err(|e| MorphError::comm(phase, &e))?;
        stream
            .set_nodelay(true)
            .map_err(|e| MorphError::comm(phase, &e))?;
        frame::write_frame(&mut stream, phase, &encode_hello(rank, world_size.get()))?;
        debug!("rank {rank} connected to coordinator at {addr}");

        Ok(Self {
            rank,
            world_size,
            role: Role::Worker { coordinator: stream },
        })
    }

    fn require_star_root(&self, root: usize, phase: CommPhase) -> Result<(), MorphError> {
        if root != COORDINATOR_RANK {
            return Err(MorphError::protocol(
                phase,
                format!("socket transport only supports rank {COORDINATOR_RANK} as root, got {root}"),
            ));
        }
        Ok(())
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

impl Communicator for TcpCommunicator {
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
        self.require_star_root(root, phase)?;
        expect_root_payload(phase, payload, self.rank == root)?;

        match &mut self.role {
            Role::Coordinator { workers } => {
                // expect_root_payload guarantees Some on the root
                #[allow(clippy::unwrap_used)]
                let payload = payload.unwrap();
                for stream in workers.iter_mut() {
                    frame::write_frame(stream, phase, payload)?;
                }
                Ok(payload.to_vec())
            }
            Role::Worker { coordinator } => frame::read_frame(coordinator, phase),
        }
    }

    fn scatterv(
        &mut self,
        root: usize,
        phase: CommPhase,
        send: Option<&[u8]>,
        plan: &PartitionPlan,
    ) -> Result<Vec<u8>, MorphError> {
        self.require_star_root(root, phase)?;
        self.check_plan(phase, plan)?;
        expect_root_payload(phase, send, self.rank == root)?;

        match &mut self.role {
            Role::Coordinator { workers } => {
                #[allow(clippy::unwrap_used)]
                let send = send.unwrap();
                for (stream, rank) in workers.iter_mut().zip(1..) {
                    frame::write_frame(stream, phase, plan.chunk(send, rank)?)?;
                }
                Ok(plan.chunk(send, COORDINATOR_RANK)?.to_vec())
            }
            Role::Worker { coordinator } => {
                let slice = frame::read_frame(coordinator, phase)?;
                check_send_len(phase, plan, self.rank, slice.len())?;
                Ok(slice)
            }
        }
    }

    fn gatherv(
        &mut self,
        root: usize,
        phase: CommPhase,
        send: &[u8],
        plan: &PartitionPlan,
    ) -> Result<Option<Vec<u8>>, MorphError> {
        self.require_star_root(root, phase)?;
        self.check_plan(phase, plan)?;
        check_send_len(phase, plan, self.rank, send.len())?;

        match &mut self.role {
            Role::Coordinator { workers } => {
                let mut result = vec![0; plan.total_size()];
                plan.chunk_mut(&mut result, COORDINATOR_RANK)?.copy_from_slice(send);
                for (stream, rank) in workers.iter_mut().zip(1..) {
                    let slice = frame::read_frame(stream, phase)?;
                    check_send_len(phase, plan, rank, slice.len())?;
                    plan.chunk_mut(&mut result, rank)?.copy_from_slice(&slice);
                }
                Ok(Some(result))
            }
            Role::Worker { coordinator } => {
                frame::write_frame(coordinator, phase, send)?;
                Ok(None)
            }
        }
    }
}

fn encode_hello(rank: usize, world: usize) -> [u8; 8] {
    let mut buf = [0u8; 8];
    buf[..4].copy_from_slice(&(rank as u32).to_le_bytes());
    buf[4..].copy_from_slice(&(world as u32).to_le_bytes());
    buf
}

fn decode_hello(payload: &[u8]) -> Option<(usize, usize)> {
    if payload.len() != 8 {
        return None;
    }
    let rank = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
    let world = u32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]);
    Some((rank as usize, world as usize))
}

fn connect_with_retry(addr: SocketAddr) -> std::io::Result<TcpStream> {
    let mut last_err = None;
    for _ in 0..CONNECT_ATTEMPTS {
        match TcpStream::connect(addr) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
        thread::sleep(CONNECT_BACKOFF);
    }
    // The loop always runs at least once, so last_err is Some.
    #[allow(clippy::unwrap_used)]
    Err(last_err.unwrap())
}
