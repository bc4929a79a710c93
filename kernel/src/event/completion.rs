/*!
 * Completion Dispatch
 *
 * The tagged descriptor naming where a finished operation is delivered,
 * and the single routing point every producer funnels through.
 */

use super::hub::EventHub;
use super::operation::AsyncOp;
use crate::core::types::SubmitInfo;
use crate::sched::{KernelThread, Scheduler};
use std::sync::{Arc, Weak};
use tracing::trace;

/// Where a finished operation is delivered.
///
/// The weak references are lookup-only: a completion never keeps its hub or
/// thread alive, and an upgrade failure is the ordinary shutdown path.
pub enum Completion {
    /// Release the operation with no side effects
    Discard,
    /// Append to a hub's event queue and wake its waiters
    PostToHub {
        hub: Weak<EventHub>,
        submit_info: SubmitInfo,
    },
    /// Re-queue a thread that forked off and parked awaiting this result
    ResumeForkedThread { thread: Weak<KernelThread> },
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Completion::Discard => f.write_str("Discard"),
            Completion::PostToHub { submit_info, .. } => f
                .debug_struct("PostToHub")
                .field("submit_info", submit_info)
                .finish(),
            Completion::ResumeForkedThread { .. } => f.write_str("ResumeForkedThread"),
        }
    }
}

enum Route {
    Release,
    Post(Arc<EventHub>),
    Resume(Arc<KernelThread>),
    Vanished(&'static str),
}

/// Deliver a finished operation according to its completion descriptor.
///
/// The caller's work is already done, so this never reports failure back:
/// an undeliverable completion is dropped, and the drop is visible only at
/// trace level.
pub fn complete(op: AsyncOp, sched: &Scheduler) {
    let route = match &op.completion {
        Completion::Discard => Route::Release,
        Completion::PostToHub { hub, .. } => match hub.upgrade() {
            Some(hub) => Route::Post(hub),
            None => Route::Vanished("hub"),
        },
        Completion::ResumeForkedThread { thread } => match thread.upgrade() {
            Some(thread) => Route::Resume(thread),
            None => Route::Vanished("thread"),
        },
    };

    match route {
        Route::Release => {}
        Route::Post(hub) => {
            let mut guard = hub.lock();
            guard.raise(op, sched);
        }
        Route::Resume(thread) => sched.enqueue(thread),
        Route::Vanished(referent) => {
            trace!(referent, "completion dropped, referent destroyed");
        }
    }
}
