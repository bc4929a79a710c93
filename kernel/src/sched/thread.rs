/*!
 * Kernel Threads
 * Thread identity and the permit parker used for cooperative blocking
 */

use crate::core::types::{HubId, Tid};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};

/// A kernel thread as seen by the event core.
///
/// The parker is the hosted realization of a context checkpoint: `park`
/// saves the thread by putting it to sleep on its own condvar, and a later
/// `unpark` resumes execution at the point after the save. A wake permit
/// granted before `park` is consumed immediately, so a wakeup that races
/// ahead of the sleep is never lost.
pub struct KernelThread {
    tid: Tid,
    parker: Parker,
    // Hub currently waited on (0 = none). A thread sits on at most one
    // hub's waiter list at a time.
    waiting_on: AtomicU64,
}

struct Parker {
    permit: Mutex<bool>,
    wakeup: Condvar,
}

impl KernelThread {
    pub(crate) fn new(tid: Tid) -> Self {
        Self {
            tid,
            parker: Parker {
                permit: Mutex::new(false),
                wakeup: Condvar::new(),
            },
            waiting_on: AtomicU64::new(0),
        }
    }

    pub fn tid(&self) -> Tid {
        self.tid
    }

    /// Sleep until a wake permit is granted, then consume it.
    pub(crate) fn park(&self) {
        let mut permit = self.parker.permit.lock();
        while !*permit {
            self.parker.wakeup.wait(&mut permit);
        }
        *permit = false;
    }

    /// Grant the wake permit.
    pub(crate) fn unpark(&self) {
        let mut permit = self.parker.permit.lock();
        *permit = true;
        self.parker.wakeup.notify_one();
    }

    pub(crate) fn begin_wait(&self, hub: HubId) {
        let prev = self.waiting_on.swap(hub, Ordering::AcqRel);
        if cfg!(debug_assertions) && prev != 0 {
            panic!(
                "thread {} entered a wait on hub {hub} while already waiting on hub {prev}",
                self.tid
            );
        }
    }

    pub(crate) fn end_wait(&self) {
        self.waiting_on.store(0, Ordering::Release);
    }
}

impl std::fmt::Debug for KernelThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelThread").field("tid", &self.tid).finish()
    }
}
