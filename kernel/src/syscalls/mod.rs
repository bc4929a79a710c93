/*!
 * Syscall Surface
 * User-space entry points for the event-delivery core
 */

pub mod events;
pub mod handles;
pub mod types;

pub use events::{EventManager, InlineSink, OperationSink};
pub use handles::{HandleTable, KernelObject};
pub use types::{EventSyscall, SyscallError, SyscallOutcome, SyscallResult};
