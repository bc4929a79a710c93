/*!
 * System Limits and Constants
 *
 * Centralized location for event-core limits and thresholds.
 * All values include rationale comments explaining WHY they exist.
 */

/// Maximum event records drained by a single wait syscall
/// Bounds the time the hub lock is held while copying out
pub const MAX_WAIT_BATCH: usize = 64;

/// Event-queue depth at which a warning is logged
/// A hub this deep usually means the consumer stopped draining
pub const HUB_DEPTH_WARN: usize = 4096;

/// Timeout value meaning "block until an event arrives"
/// Any other positive value arms a one-shot wakeup timer
pub const WAIT_FOREVER: i64 = i64::MAX;
