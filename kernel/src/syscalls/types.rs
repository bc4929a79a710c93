/*!
 * Event Syscall Types
 * Syscall surface enumeration, outcomes, and synchronous error codes
 */

use crate::core::types::{Handle, IrqVector, SubmitInfo, Ticket};
use crate::event::EventRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Synchronous syscall failures.
///
/// These are returned directly from the syscall; errors produced by
/// completed operations travel in the event record's `error` field instead.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SyscallError {
    #[error("no such handle: {0}")]
    NoSuchHandle(Handle),

    #[error("wrong handle type for handle {0}")]
    WrongHandleType(Handle),

    #[error("output buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("timed out waiting for events")]
    Timeout,
}

/// Result type for event syscalls
pub type SyscallResult<T> = std::result::Result<T, SyscallError>;

/// Event-core syscall surface.
///
/// Every submit variant names its target object, the hub the completion
/// posts to, and the opaque correlation token echoed in the record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "syscall")]
#[non_exhaustive]
pub enum EventSyscall {
    // ========================================================================
    // Hub lifecycle
    // ========================================================================

    /// Allocate an event hub
    CreateEventHub,

    /// Close the hub handle, releasing queued completions
    DestroyEventHub {
        /// Hub handle
        hub: Handle,
    },

    /// Drain up to `max` completed operations, blocking per `timeout_ns`
    WaitForEvents {
        /// Hub handle
        hub: Handle,
        /// Maximum records to drain
        max: usize,
        /// Non-positive polls; `WAIT_FOREVER` blocks; otherwise a one-shot
        /// timer bounds the wait (nanoseconds)
        timeout_ns: i64,
    },

    // ========================================================================
    // Operation submission
    // ========================================================================

    /// Start a memory-range load
    SubmitMemoryLoad {
        /// Memory object handle
        memory: Handle,
        /// Range offset (bytes)
        offset: u64,
        /// Range length (bytes)
        length: u64,
        hub: Handle,
        submit_info: SubmitInfo,
    },

    /// Lock a memory object's backing pages
    SubmitMemoryLock {
        memory: Handle,
        hub: Handle,
        submit_info: SubmitInfo,
    },

    /// Observe a thread's next state transition
    SubmitObserve {
        thread: Handle,
        hub: Handle,
        submit_info: SubmitInfo,
    },

    /// Send a string message on a channel
    SubmitSendString {
        channel: Handle,
        hub: Handle,
        submit_info: SubmitInfo,
    },

    /// Send a descriptor on a channel
    SubmitSendDescriptor {
        channel: Handle,
        hub: Handle,
        submit_info: SubmitInfo,
    },

    /// Receive a string message into a kernel buffer
    SubmitRecvString {
        channel: Handle,
        hub: Handle,
        submit_info: SubmitInfo,
    },

    /// Receive a string message into a ring
    SubmitRecvStringToRing {
        channel: Handle,
        ring: Handle,
        hub: Handle,
        submit_info: SubmitInfo,
    },

    /// Receive a descriptor from a channel
    SubmitRecvDescriptor {
        channel: Handle,
        hub: Handle,
        submit_info: SubmitInfo,
    },

    /// Accept a connection on an endpoint
    SubmitAccept {
        endpoint: Handle,
        hub: Handle,
        submit_info: SubmitInfo,
    },

    /// Connect to an endpoint
    SubmitConnect {
        endpoint: Handle,
        hub: Handle,
        submit_info: SubmitInfo,
    },

    /// Join a thread
    SubmitJoin {
        thread: Handle,
        hub: Handle,
        submit_info: SubmitInfo,
    },

    /// Wait for the next interrupt on a line
    SubmitAwaitIrq {
        irq: Handle,
        hub: Handle,
        submit_info: SubmitInfo,
    },

    // ========================================================================
    // IRQ lines
    // ========================================================================

    /// Allocate an IRQ line object
    CreateIrqLine {
        /// Hardware vector
        vector: IrqVector,
    },
}

/// Structured syscall result for the demultiplexer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum SyscallOutcome {
    /// A newly allocated handle
    Handle { handle: Handle },
    /// Ticket for a submitted operation
    Ticket { ticket: Ticket },
    /// Drained event records
    Events { records: Vec<EventRecord> },
    /// Operations released by a destroy
    Released { count: usize },
    /// Synchronous failure
    Error { error: SyscallError },
}

impl From<SyscallError> for SyscallOutcome {
    fn from(error: SyscallError) -> Self {
        SyscallOutcome::Error { error }
    }
}
