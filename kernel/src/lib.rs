/*!
 * Nimbus Kernel
 * Asynchronous event-delivery core
 *
 * Long-running kernel operations (memory transfers, IPC, connection
 * establishment, interrupts, thread joins) complete asynchronously into
 * event hubs that user-space threads drain by polling or blocking.
 */

pub mod core;
pub mod event;
pub mod sched;
pub mod syscalls;
pub mod time;

pub use event::{
    complete, AsyncOp, Completion, EventHub, EventKind, EventRecord, IrqLine, OpError, OpPayload,
};
pub use sched::{current, KernelThread, Scheduler};
pub use syscalls::{EventManager, EventSyscall, OperationSink, SyscallError, SyscallOutcome};
pub use time::TimerService;
