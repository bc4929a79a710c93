/*!
 * Event Hub
 *
 * The synchronization point between completing operations and draining
 * threads: a FIFO of completed operations plus a FIFO of sleeping waiters,
 * both behind one lock. Raising drains every waiter to the scheduler, so
 * the queue and the waiter list are never both populated.
 */

use super::operation::AsyncOp;
use crate::core::limits::HUB_DEPTH_WARN;
use crate::core::lockorder::{self, RankToken, RANK_HUB};
use crate::core::types::HubId;
use crate::sched::{self, Scheduler};
use crate::sched::KernelThread;
use parking_lot::{Mutex, MutexGuard};
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use tracing::{trace, warn};

struct HubInner {
    queue: VecDeque<AsyncOp>,
    waiters: VecDeque<Weak<KernelThread>>,
    closed: bool,
}

/// An event hub addressed by a user-space handle.
pub struct EventHub {
    id: HubId,
    inner: Mutex<HubInner>,
}

/// Exclusive access to a hub. Queue and waiter operations require the
/// caller to hold one of these; the embedded rank token enforces the
/// hub-before-scheduler lock order.
pub struct HubGuard<'a> {
    hub: &'a EventHub,
    inner: MutexGuard<'a, HubInner>,
    _rank: RankToken,
}

impl EventHub {
    pub(crate) fn new(id: HubId) -> Self {
        Self {
            id,
            inner: Mutex::new(HubInner {
                queue: VecDeque::new(),
                waiters: VecDeque::new(),
                closed: false,
            }),
        }
    }

    pub fn id(&self) -> HubId {
        self.id
    }

    pub fn lock(&self) -> HubGuard<'_> {
        let rank = lockorder::acquire(RANK_HUB);
        HubGuard {
            hub: self,
            inner: self.inner.lock(),
            _rank: rank,
        }
    }

    /// Put the calling thread to sleep on this hub until a raise drains it.
    ///
    /// Consumes the guard: the waiter is registered, the hub lock released,
    /// and the thread parked. On wakeup the hub lock is reacquired and a
    /// fresh guard returned; the caller rechecks the queue and may sleep
    /// again. The scheduler lock is held at no point on this path.
    pub fn block_current<'a>(&'a self, guard: HubGuard<'a>, sched: &Scheduler) -> HubGuard<'a> {
        let thread = sched::current();
        debug_assert!(
            !guard.has_event(),
            "blocking with deliverable events queued"
        );
        thread.begin_wait(self.id);
        {
            let HubGuard { mut inner, _rank, .. } = guard;
            inner.waiters.push_back(Arc::downgrade(&thread));
            // Both the hub lock and its rank drop here, before the park.
        }
        sched.park_current(&thread);
        thread.end_wait();
        self.lock()
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub").field("id", &self.id).finish()
    }
}

impl HubGuard<'_> {
    pub fn has_event(&self) -> bool {
        !self.inner.queue.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed
    }

    pub fn queue_len(&self) -> usize {
        self.inner.queue.len()
    }

    pub fn waiter_count(&self) -> usize {
        self.inner.waiters.len()
    }

    /// Pop the oldest completed operation.
    ///
    /// Callers test `has_event` first; popping an empty queue is a
    /// contract violation and fatal.
    pub fn dequeue(&mut self) -> AsyncOp {
        match self.inner.queue.pop_front() {
            Some(op) => op,
            None => panic!("event hub {}: dequeue on empty queue", self.hub.id),
        }
    }

    /// Append a completed operation and wake every waiter.
    ///
    /// Wakeups are level-triggered: all sleepers are moved to the ready
    /// queue and recheck the queue themselves, so none can be lost. The
    /// scheduler lock is taken and released once per waiter, keeping each
    /// hold bounded.
    pub fn raise(&mut self, op: AsyncOp, sched: &Scheduler) {
        if self.inner.closed {
            trace!(hub = self.hub.id, "raise on closed hub, dropping completion");
            return;
        }
        self.inner.queue.push_back(op);
        if self.inner.queue.len() == HUB_DEPTH_WARN {
            warn!("event hub {} reached depth {HUB_DEPTH_WARN}", self.hub.id);
        }
        while let Some(waiter) = self.inner.waiters.pop_front() {
            // An exited waiter leaves a dangling weak ref; skip it.
            let Some(thread) = waiter.upgrade() else { continue };
            sched.enqueue(thread);
        }
    }

    /// Shut the hub down: drop all queued operations and wake all waiters
    /// so they can observe the closure. Returns how many operations were
    /// released.
    pub(crate) fn close(&mut self, sched: &Scheduler) -> usize {
        self.inner.closed = true;
        let released = self.inner.queue.len();
        self.inner.queue.clear();
        while let Some(waiter) = self.inner.waiters.pop_front() {
            let Some(thread) = waiter.upgrade() else { continue };
            sched.enqueue(thread);
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::completion::Completion;
    use crate::event::operation::OpPayload;
    use crate::event::record::EventKind;

    fn op(payload: OpPayload) -> AsyncOp {
        AsyncOp::new(payload, Completion::Discard)
    }

    #[test]
    fn test_raise_then_dequeue_fifo() {
        let sched = Scheduler::new();
        let hub = EventHub::new(1);
        let mut guard = hub.lock();

        guard.raise(op(OpPayload::Observe), &sched);
        guard.raise(op(OpPayload::Join), &sched);
        assert!(guard.has_event());

        assert_eq!(guard.dequeue().project().kind, EventKind::Observe);
        assert_eq!(guard.dequeue().project().kind, EventKind::Join);
        assert!(!guard.has_event());
    }

    #[test]
    #[should_panic(expected = "dequeue on empty queue")]
    fn test_dequeue_on_empty_is_fatal() {
        let hub = EventHub::new(2);
        let mut guard = hub.lock();
        let _ = guard.dequeue();
    }

    #[test]
    fn test_raise_skips_dead_waiters() {
        let sched = Scheduler::new();
        let hub = EventHub::new(3);
        let mut guard = hub.lock();

        let gone = Arc::new(KernelThread::new(50));
        guard.inner.waiters.push_back(Arc::downgrade(&gone));
        drop(gone);

        guard.raise(op(OpPayload::Irq), &sched);
        assert_eq!(guard.waiter_count(), 0);
        assert_eq!(sched.stats().enqueues, 0);
    }

    #[test]
    fn test_raise_drains_all_waiters() {
        let sched = Scheduler::new();
        let hub = EventHub::new(4);
        let mut guard = hub.lock();

        let t1 = Arc::new(KernelThread::new(60));
        let t2 = Arc::new(KernelThread::new(61));
        guard.inner.waiters.push_back(Arc::downgrade(&t1));
        guard.inner.waiters.push_back(Arc::downgrade(&t2));

        guard.raise(op(OpPayload::Irq), &sched);
        // Queue non-empty implies no one left waiting.
        assert!(guard.has_event());
        assert_eq!(guard.waiter_count(), 0);
        assert_eq!(sched.stats().enqueues, 2);
    }

    #[test]
    fn test_close_releases_queued_ops_and_rejects_raises() {
        let sched = Scheduler::new();
        let hub = EventHub::new(5);
        let mut guard = hub.lock();

        guard.raise(op(OpPayload::Observe), &sched);
        guard.raise(op(OpPayload::Observe), &sched);
        assert_eq!(guard.close(&sched), 2);
        assert!(guard.is_closed());
        assert!(!guard.has_event());

        guard.raise(op(OpPayload::Observe), &sched);
        assert!(!guard.has_event());
    }
}
