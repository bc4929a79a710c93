/*!
 * Cooperative Scheduler
 *
 * Ready queue for the event core. A completed operation or a raised hub
 * re-queues sleeping threads here; the queue lock is the outermost lock a
 * producer may take while still holding a hub lock, never the reverse.
 */

mod thread;

pub use thread::KernelThread;

use crate::core::lockorder::{self, RANK_SCHED};
use crate::core::types::{SchedulerStats, Tid};
use log::info;
use parking_lot::Mutex;
use std::cell::OnceCell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_TID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: OnceCell<Arc<KernelThread>> = const { OnceCell::new() };
}

/// The kernel thread executing on the calling CPU.
///
/// Lazily registers the caller on first use, the way a CPU-local current
/// pointer would be set up at thread creation.
pub fn current() -> Arc<KernelThread> {
    CURRENT.with(|cell| {
        cell.get_or_init(|| {
            Arc::new(KernelThread::new(NEXT_TID.fetch_add(1, Ordering::Relaxed)))
        })
        .clone()
    })
}

/// Cooperative ready queue.
///
/// Threads are enqueued by producers (completion dispatch, hub raise) and
/// acknowledge their own dispatch when they resume. There is no preemption;
/// a thread leaves the CPU only by parking itself.
pub struct Scheduler {
    ready: Mutex<VecDeque<Arc<KernelThread>>>,
    enqueues: AtomicU64,
    parks: AtomicU64,
}

impl Scheduler {
    pub fn new() -> Self {
        info!("Scheduler initialized (cooperative, permit parker)");
        Self {
            ready: Mutex::new(VecDeque::new()),
            enqueues: AtomicU64::new(0),
            parks: AtomicU64::new(0),
        }
    }

    /// Make `thread` runnable.
    ///
    /// Takes and releases the ready-queue lock; callers may hold a hub lock,
    /// which is the one permitted nesting.
    pub fn enqueue(&self, thread: Arc<KernelThread>) {
        let _rank = lockorder::acquire(RANK_SCHED);
        let mut ready = self.ready.lock();
        ready.push_back(Arc::clone(&thread));
        thread.unpark();
        self.enqueues.fetch_add(1, Ordering::Relaxed);
    }

    /// Park the calling thread until a producer enqueues it again.
    ///
    /// Must be called with no ranked lock held; the caller released its hub
    /// lock before getting here. On return the thread has consumed its
    /// ready-queue slot.
    pub fn park_current(&self, thread: &Arc<KernelThread>) {
        lockorder::assert_unlocked();
        self.parks.fetch_add(1, Ordering::Relaxed);
        thread.park();
        self.ack(thread.tid());
    }

    // Remove the resumed thread's entry from the ready queue.
    fn ack(&self, tid: Tid) {
        let _rank = lockorder::acquire(RANK_SCHED);
        let mut ready = self.ready.lock();
        if let Some(pos) = ready.iter().position(|t| t.tid() == tid) {
            ready.remove(pos);
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            enqueues: self.enqueues.load(Ordering::Relaxed),
            parks: self.parks.load(Ordering::Relaxed),
            ready_len: self.ready.lock().len(),
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
