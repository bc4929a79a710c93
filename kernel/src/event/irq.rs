/*!
 * IRQ Lines
 * Interrupt-side producer of completion events
 */

use super::completion::complete;
use super::operation::{AsyncOp, OpPayload};
use crate::core::types::IrqVector;
use crate::sched::Scheduler;
use parking_lot::Mutex;
use tracing::debug;

/// One interrupt line with its queue of armed wait operations.
///
/// `fire` may run on any thread; it stands in for the interrupt handler and
/// must therefore never sleep. Pending operations are detached under the
/// line's own lock before any hub lock is touched.
pub struct IrqLine {
    vector: IrqVector,
    pending: Mutex<Vec<AsyncOp>>,
}

impl IrqLine {
    pub(crate) fn new(vector: IrqVector) -> Self {
        Self {
            vector,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn vector(&self) -> IrqVector {
        self.vector
    }

    /// Arm a wait: the operation completes on the next `fire`.
    pub fn attach(&self, op: AsyncOp) {
        debug_assert!(
            matches!(op.payload(), OpPayload::Irq),
            "non-IRQ operation attached to IRQ line"
        );
        self.pending.lock().push(op);
    }

    /// Deliver the interrupt: route every armed operation through the
    /// completion dispatcher. Returns how many were delivered.
    pub fn fire(&self, sched: &Scheduler) -> usize {
        let pending = std::mem::take(&mut *self.pending.lock());
        let delivered = pending.len();
        for op in pending {
            complete(op, sched);
        }
        if delivered > 0 {
            debug!(vector = self.vector, delivered, "irq fired");
        }
        delivered
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::completion::Completion;

    #[test]
    fn test_fire_without_waiters_is_noop() {
        let sched = Scheduler::new();
        let line = IrqLine::new(9);
        assert_eq!(line.fire(&sched), 0);
    }

    #[test]
    fn test_fire_drains_pending() {
        let sched = Scheduler::new();
        let line = IrqLine::new(9);
        line.attach(AsyncOp::new(OpPayload::Irq, Completion::Discard));
        line.attach(AsyncOp::new(OpPayload::Irq, Completion::Discard));
        assert_eq!(line.pending_count(), 2);
        assert_eq!(line.fire(&sched), 2);
        assert_eq!(line.pending_count(), 0);
    }
}
