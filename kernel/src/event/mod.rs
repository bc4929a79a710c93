/*!
 * Event Delivery Core
 *
 * Long-running kernel operations report completion here: a finished
 * operation carries a completion descriptor, the dispatcher routes it to
 * an event hub (or resumes a forked thread), and consuming threads drain
 * hubs by polling or blocking.
 */

mod completion;
mod hub;
mod irq;
mod operation;
mod record;

pub use completion::{complete, Completion};
pub use hub::{EventHub, HubGuard};
pub use irq::IrqLine;
pub use operation::{AsyncOp, OpPayload};
pub use record::{EventKind, EventRecord, OpError, RecordCodecError};
