/*!
 * Core Types
 * Common types shared across the kernel
 */

use serde::{Deserialize, Serialize};

/// User-space handle to a kernel object
pub type Handle = u64;

/// Kernel thread ID
pub type Tid = u64;

/// Ticket returned by a submit syscall, correlating the in-flight request
pub type Ticket = u64;

/// Opaque 128-bit correlation token supplied at submission and echoed
/// verbatim in the event record
pub type SubmitInfo = u128;

/// IRQ vector number
pub type IrqVector = u32;

/// Reserved handle value that never names an object
pub const INVALID_HANDLE: Handle = 0;

/// Identity of an event hub, equal to the handle it was created under
pub type HubId = u64;

/// Snapshot of scheduler activity counters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub enqueues: u64,
    pub parks: u64,
    pub ready_len: usize,
}

/// Snapshot of event-hub registry counters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EventStats {
    pub hubs_created: u64,
    pub hubs_destroyed: u64,
    pub ops_released: u64,
}
