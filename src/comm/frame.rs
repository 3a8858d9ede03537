//! Length-prefixed message framing for the socket transport.
//!
//! Every message carries a 2-byte magic for stream synchronization, a
//! 1-byte phase tag, and a 4-byte little-endian payload length. The tag
//! lets the receiver verify that both sides are executing the same
//! protocol step before any payload bytes are interpreted.

use std::io::{Read, Write};

use crate::{comm::CommPhase, error::MorphError};

const MAGIC: [u8; 2] = *b"PM";
pub(super) const HEADER_SIZE: usize = 7;

/// Upper bound on a single frame's payload. Generous for image slices but
/// small enough to catch a corrupted length field before allocating.
pub(super) const MAX_PAYLOAD: usize = 1 << 31;

pub(super) fn write_frame<W: Write>(
    writer: &mut W,
    phase: CommPhase,
    payload: &[u8],
) -> Result<(), MorphError> {
    debug_assert!(payload.len() < MAX_PAYLOAD);

    let len = u32::try_from(payload.len()).map_err(|_| {
        MorphError::protocol(
            phase,
            format!("payload of {} bytes exceeds frame limit", payload.len()),
        )
    })?;

    let mut header = [0u8; HEADER_SIZE];
    header[..2].copy_from_slice(&MAGIC);
    header[2] = phase.tag();
    header[3..].copy_from_slice(&len.to_le_bytes());

    writer
        .write_all(&header)
        .and_then(|()| writer.write_all(payload))
        .and_then(|()| writer.flush())
        .map_err(|e| MorphError::comm(phase, &e))
}

pub(super) fn read_frame<R: Read>(reader: &mut R, phase: CommPhase) -> Result<Vec<u8>, MorphError> {
    let mut header = [0u8; HEADER_SIZE];
    reader
        .read_exact(&mut header)
        .map_err(|e| MorphError::comm(phase, &e))?;

    if header[..2] != MAGIC {
        return Err(MorphError::protocol(phase, "bad frame magic"));
    }
    if header[2] != phase.tag() {
        return Err(MorphError::protocol(
            phase,
            format!("received frame tag {} while executing a different step", header[2]),
        ));
    }

    let len = u32::from_le_bytes([header[3], header[4], header[5], header[6]]) as usize;
    if len >= MAX_PAYLOAD {
        return Err(MorphError::protocol(
            phase,
            format!("frame length {len} exceeds limit"),
        ));
    }

    let mut payload = vec![0; len];
    reader
        .read_exact(&mut payload)
        .map_err(|e| MorphError::comm(phase, &e))?;
    Ok(payload)
}
