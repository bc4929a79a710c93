/*!
 * Timer Service
 *
 * One-shot deadline timers for blocking waits. Expiry completes the armed
 * operation through the ordinary dispatcher, so a timeout wakes hub
 * waiters exactly the way any other completion does.
 */

use crate::event::{complete, AsyncOp};
use crate::sched::Scheduler;
use log::info;
use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

struct TimerEntry {
    deadline: Instant,
    seq: u64,
    op: AsyncOp,
}

// Min-heap by (deadline, seq); the operation itself has no ordering.
impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}
impl Eq for TimerEntry {}
impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}
impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct TimerState {
    heap: BinaryHeap<TimerEntry>,
    next_seq: u64,
    shutdown: bool,
}

struct TimerShared {
    sched: Arc<Scheduler>,
    state: Mutex<TimerState>,
    expired: Condvar,
}

/// One-shot timer arming surface backed by a single worker thread.
pub struct TimerService {
    shared: Arc<TimerShared>,
    worker: Option<JoinHandle<()>>,
}

impl TimerService {
    pub fn new(sched: Arc<Scheduler>) -> Self {
        let shared = Arc::new(TimerShared {
            sched,
            state: Mutex::new(TimerState {
                heap: BinaryHeap::new(),
                next_seq: 0,
                shutdown: false,
            }),
            expired: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = match std::thread::Builder::new()
            .name("nimbus-timer".into())
            .spawn(move || run_worker(worker_shared))
        {
            Ok(handle) => Some(handle),
            // Without its worker the service would silently never fire.
            Err(e) => panic!("timer worker spawn failed: {e}"),
        };
        info!("Timer service initialized");
        Self { shared, worker }
    }

    /// Arm a one-shot timer: at `deadline` the operation is completed
    /// through the dispatcher.
    pub fn arm(&self, deadline: Instant, op: AsyncOp) {
        let mut state = self.shared.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(TimerEntry { deadline, seq, op });
        self.shared.expired.notify_one();
    }

    pub fn armed_count(&self) -> usize {
        self.shared.state.lock().heap.len()
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.expired.notify_one();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_worker(shared: Arc<TimerShared>) {
    let mut state = shared.state.lock();
    loop {
        if state.shutdown {
            return;
        }
        match state.heap.peek().map(|entry| entry.deadline) {
            None => {
                shared.expired.wait(&mut state);
            }
            Some(deadline) if deadline <= Instant::now() => {
                if let Some(entry) = state.heap.pop() {
                    // Dispatch outside the timer lock; completion takes hub
                    // and scheduler locks of its own.
                    drop(state);
                    complete(entry.op, &shared.sched);
                    state = shared.state.lock();
                }
            }
            Some(deadline) => {
                let _ = shared.expired.wait_until(&mut state, deadline);
            }
        }
    }
}
