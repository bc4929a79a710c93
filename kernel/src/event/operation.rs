/*!
 * Async Operations
 *
 * One outstanding long-running request. The payload is a tagged sum over
 * the operation kinds; the initiating subsystem owns the value exclusively
 * while it fills in result fields, and hands it to the completion
 * dispatcher by move, after which the record is frozen.
 */

use super::completion::Completion;
use super::record::{EventKind, EventRecord, OpError};
use crate::core::types::SubmitInfo;

/// Kind-specific result fields of an operation.
///
/// `RingItem` and `TimerExpired` are kernel-internal records: they pass
/// through hubs for bookkeeping and wakeups but are never user-visible.
#[derive(Debug)]
pub enum OpPayload {
    MemoryLoad {
        offset: u64,
        length: u64,
    },
    MemoryLock,
    Observe,
    SendString,
    SendDescriptor,
    RecvString {
        msg_request: i64,
        msg_sequence: i64,
        /// Received bytes, staged until the IPC layer copies them out.
        data: Vec<u8>,
    },
    RecvStringToRing {
        msg_request: i64,
        msg_sequence: i64,
        offset: u64,
        length: u64,
    },
    RecvDescriptor {
        msg_request: i64,
        msg_sequence: i64,
        handle: u64,
    },
    Accept {
        handle: u64,
    },
    Connect {
        handle: u64,
    },
    Join,
    Irq,
    /// Internal ring bookkeeping record
    RingItem { offset: u64 },
    /// Internal wait-timeout wakeup marker
    TimerExpired,
}

/// An in-flight asynchronous operation.
pub struct AsyncOp {
    pub(crate) completion: Completion,
    error: OpError,
    payload: OpPayload,
}

impl AsyncOp {
    pub fn new(payload: OpPayload, completion: Completion) -> Self {
        Self {
            completion,
            error: OpError::Success,
            payload,
        }
    }

    /// The correlation token this operation will echo, if it posts to a hub.
    pub fn submit_info(&self) -> SubmitInfo {
        match &self.completion {
            Completion::PostToHub { submit_info, .. } => *submit_info,
            _ => 0,
        }
    }

    pub fn error(&self) -> OpError {
        self.error
    }

    pub fn set_error(&mut self, error: OpError) {
        self.error = error;
    }

    pub fn payload(&self) -> &OpPayload {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut OpPayload {
        &mut self.payload
    }

    /// Whether this operation may be projected and copied to user space.
    pub fn user_visible(&self) -> bool {
        !matches!(
            self.payload,
            OpPayload::RingItem { .. } | OpPayload::TimerExpired
        )
    }

    pub(crate) fn is_timeout_marker(&self) -> bool {
        matches!(self.payload, OpPayload::TimerExpired)
    }

    /// Project the frozen operation into its user-space record.
    ///
    /// Pure with respect to the operation's state. Fatal for internal
    /// records, which must never reach a projection site.
    pub fn project(&self) -> EventRecord {
        let submit_info = self.submit_info();
        match &self.payload {
            OpPayload::MemoryLoad { offset, length } => {
                let mut rec = EventRecord::blank(EventKind::MemoryLoad, submit_info);
                rec.offset = *offset;
                rec.length = *length;
                rec
            }
            OpPayload::MemoryLock => EventRecord::blank(EventKind::MemoryLock, submit_info),
            OpPayload::Observe => EventRecord::blank(EventKind::Observe, submit_info),
            OpPayload::SendString => {
                let mut rec = EventRecord::blank(EventKind::SendString, submit_info);
                rec.error = self.error;
                rec
            }
            OpPayload::SendDescriptor => {
                let mut rec = EventRecord::blank(EventKind::SendDescriptor, submit_info);
                rec.error = self.error;
                rec
            }
            OpPayload::RecvString {
                msg_request,
                msg_sequence,
                data,
            } => {
                let mut rec = EventRecord::blank(EventKind::RecvString, submit_info);
                rec.error = self.error;
                rec.msg_request = *msg_request;
                rec.msg_sequence = *msg_sequence;
                rec.length = data.len() as u64;
                rec
            }
            OpPayload::RecvStringToRing {
                msg_request,
                msg_sequence,
                offset,
                length,
            } => {
                let mut rec = EventRecord::blank(EventKind::RecvStringToRing, submit_info);
                rec.error = self.error;
                rec.msg_request = *msg_request;
                rec.msg_sequence = *msg_sequence;
                rec.offset = *offset;
                rec.length = *length;
                rec
            }
            OpPayload::RecvDescriptor {
                msg_request,
                msg_sequence,
                handle,
            } => {
                let mut rec = EventRecord::blank(EventKind::RecvDescriptor, submit_info);
                rec.error = self.error;
                rec.msg_request = *msg_request;
                rec.msg_sequence = *msg_sequence;
                rec.handle = *handle;
                rec
            }
            OpPayload::Accept { handle } => {
                let mut rec = EventRecord::blank(EventKind::Accept, submit_info);
                rec.handle = *handle;
                rec
            }
            OpPayload::Connect { handle } => {
                let mut rec = EventRecord::blank(EventKind::Connect, submit_info);
                rec.handle = *handle;
                rec
            }
            OpPayload::Join => EventRecord::blank(EventKind::Join, submit_info),
            OpPayload::Irq => EventRecord::blank(EventKind::Irq, submit_info),
            OpPayload::RingItem { .. } => {
                panic!("ring items are internal records and cannot be projected")
            }
            OpPayload::TimerExpired => {
                panic!("timeout markers are internal records and cannot be projected")
            }
        }
    }
}

impl std::fmt::Debug for AsyncOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncOp")
            .field("payload", &self.payload)
            .field("error", &self.error)
            .finish()
    }
}
