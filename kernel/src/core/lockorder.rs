/*!
 * Lock Rank Checking
 *
 * The event core has a fixed two-level lock order: a hub lock may be held
 * when the scheduler ready-queue lock is taken, never the reverse. Each
 * acquisition records its rank in a thread-local; taking a rank at or below
 * the one already held is a fatal misordering.
 */

use std::cell::Cell;

/// Rank of any event-hub lock
pub(crate) const RANK_HUB: u8 = 1;

/// Rank of the scheduler ready-queue lock
pub(crate) const RANK_SCHED: u8 = 2;

thread_local! {
    static HELD: Cell<u8> = const { Cell::new(0) };
}

/// Witness for one ranked acquisition; restores the previous rank on drop.
#[must_use]
pub(crate) struct RankToken {
    prev: u8,
}

/// Record acquisition of a ranked lock.
///
/// Fatal in debug builds if `rank` is not strictly above the rank already
/// held by this thread.
pub(crate) fn acquire(rank: u8) -> RankToken {
    HELD.with(|held| {
        let prev = held.get();
        if cfg!(debug_assertions) && prev >= rank {
            panic!("lock rank violation: acquiring rank {rank} while holding rank {prev}");
        }
        held.set(rank);
        RankToken { prev }
    })
}

/// Fatal in debug builds if the calling thread holds any ranked lock.
/// Checked before the thread is allowed to go to sleep.
pub(crate) fn assert_unlocked() {
    HELD.with(|held| {
        let rank = held.get();
        if cfg!(debug_assertions) && rank != 0 {
            panic!("thread attempted to sleep while holding a rank-{rank} lock");
        }
    });
}

impl Drop for RankToken {
    fn drop(&mut self) {
        HELD.with(|held| held.set(self.prev));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_acquisition() {
        let hub = acquire(RANK_HUB);
        let sched = acquire(RANK_SCHED);
        drop(sched);
        drop(hub);
    }

    #[test]
    #[should_panic(expected = "lock rank violation")]
    fn test_inverted_acquisition_is_fatal() {
        let _sched = acquire(RANK_SCHED);
        let _hub = acquire(RANK_HUB);
    }

    #[test]
    #[should_panic(expected = "sleep while holding")]
    fn test_sleep_with_lock_held_is_fatal() {
        let _hub = acquire(RANK_HUB);
        assert_unlocked();
    }

    #[test]
    fn test_rank_restored_after_release() {
        drop(acquire(RANK_SCHED));
        // The scheduler rank is free again, so the hub rank is legal.
        drop(acquire(RANK_HUB));
    }
}
