/*!
 * Event Records
 * The flat result payload copied to user space, and its wire image
 */

use crate::core::types::SubmitInfo;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Event kind as it appears in the record's `kind` field.
///
/// Values are ABI-stable; variants are declared in value order so the
/// serialized variant index equals the discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum EventKind {
    None = 0,
    MemoryLoad = 1,
    MemoryLock = 2,
    Observe = 3,
    SendString = 4,
    SendDescriptor = 5,
    RecvString = 6,
    RecvStringToRing = 7,
    RecvDescriptor = 8,
    Accept = 9,
    Connect = 10,
    Join = 11,
    Irq = 12,
}

/// Result code of a completed operation.
///
/// Travels in the event record's `error` field; syscall-level failures use
/// `SyscallError` instead and never appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum OpError {
    Success = 0,
    ClosedRemotely = 1,
    BufferExhausted = 2,
    Faulted = 3,
}

/// Wire-image codec failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordCodecError {
    #[error("record buffer truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("malformed record image: {0}")]
    Malformed(String),
}

/// One completed-operation record, as copied to user space.
///
/// Fields that are not meaningful for the record's kind are zero. The wire
/// image is a fixed 64-byte little-endian layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(C)]
pub struct EventRecord {
    pub kind: EventKind,
    pub error: OpError,
    pub submit_info: SubmitInfo,
    pub offset: u64,
    pub length: u64,
    pub msg_request: i64,
    pub msg_sequence: i64,
    pub handle: u64,
}

impl EventRecord {
    /// Size of one encoded record in the user-space buffer
    pub const WIRE_SIZE: usize = 64;

    /// A record of the given kind with every payload field zeroed.
    pub(crate) fn blank(kind: EventKind, submit_info: SubmitInfo) -> Self {
        Self {
            kind,
            error: OpError::Success,
            submit_info,
            offset: 0,
            length: 0,
            msg_request: 0,
            msg_sequence: 0,
            handle: 0,
        }
    }

    /// Encode into the leading `WIRE_SIZE` bytes of `buf`.
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<(), RecordCodecError> {
        if buf.len() < Self::WIRE_SIZE {
            return Err(RecordCodecError::Truncated {
                needed: Self::WIRE_SIZE,
                available: buf.len(),
            });
        }
        match bincode::serialize(self) {
            Ok(bytes) => {
                buf[..Self::WIRE_SIZE].copy_from_slice(&bytes);
                Ok(())
            }
            // The record is a fixed POD; a serializer failure here is a
            // corrupted-state condition, not a recoverable error.
            Err(e) => panic!("event record serialization failed: {e}"),
        }
    }

    /// Decode from the leading `WIRE_SIZE` bytes of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self, RecordCodecError> {
        if buf.len() < Self::WIRE_SIZE {
            return Err(RecordCodecError::Truncated {
                needed: Self::WIRE_SIZE,
                available: buf.len(),
            });
        }
        bincode::deserialize(&buf[..Self::WIRE_SIZE])
            .map_err(|e| RecordCodecError::Malformed(e.to_string()))
    }
}

impl Default for EventRecord {
    fn default() -> Self {
        Self::blank(EventKind::None, 0)
    }
}
