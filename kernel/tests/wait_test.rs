/*!
 * Wait Syscall Integration Tests
 * Polling, blocking, timeouts, and waiter wakeups across threads
 */

use nimbus_kernel::core::limits::WAIT_FOREVER;
use nimbus_kernel::event::{complete, AsyncOp, Completion, EventKind, EventRecord, OpError, OpPayload};
use nimbus_kernel::syscalls::{EventManager, SyscallError};
use nimbus_kernel::Scheduler;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const MS: i64 = 1_000_000;

fn manager() -> EventManager {
    EventManager::with_inline_sink(Arc::new(Scheduler::new()))
}

fn post(mgr: &EventManager, hub: u64, payload: OpPayload, submit_info: u128) {
    let target = mgr.hub(hub).unwrap();
    let op = AsyncOp::new(
        payload,
        Completion::PostToHub {
            hub: Arc::downgrade(&target),
            submit_info,
        },
    );
    complete(op, mgr.scheduler());
}

#[test]
fn test_polled_dequeue() {
    let mgr = manager();
    let hub = mgr.create_event_hub();
    post(&mgr, hub, OpPayload::Observe, 0xA);

    let mut buf = [EventRecord::default(); 4];
    let n = mgr.wait_for_events(hub, &mut buf, 0).unwrap();
    assert_eq!(n, 1);
    assert_eq!(buf[0].kind, EventKind::Observe);
    assert_eq!(buf[0].error, OpError::Success);
    assert_eq!(buf[0].submit_info, 0xA);
    assert_eq!(buf[0].offset, 0);
    assert_eq!(buf[0].length, 0);
    assert_eq!(buf[0].handle, 0);

    // Queue is drained; a second poll comes back empty.
    assert_eq!(mgr.wait_for_events(hub, &mut buf, 0).unwrap(), 0);
}

#[test]
fn test_empty_out_buffer_returns_immediately() {
    let mgr = manager();
    let hub = mgr.create_event_hub();
    post(&mgr, hub, OpPayload::Observe, 1);

    let mut buf: [EventRecord; 0] = [];
    let start = Instant::now();
    assert_eq!(mgr.wait_for_events(hub, &mut buf, WAIT_FOREVER).unwrap(), 0);
    assert!(start.elapsed() < Duration::from_millis(100));
    // The queued event was left untouched.
    let mut one = [EventRecord::default(); 1];
    assert_eq!(mgr.wait_for_events(hub, &mut one, 0).unwrap(), 1);
}

#[test]
fn test_blocking_wait_sees_concurrent_raise() {
    let mgr = manager();
    let hub = mgr.create_event_hub();

    let mgr2 = mgr.clone();
    let waiter = thread::spawn(move || {
        let mut buf = [EventRecord::default(); 1];
        let n = mgr2.wait_for_events(hub, &mut buf, WAIT_FOREVER).unwrap();
        (n, buf[0])
    });

    thread::sleep(Duration::from_millis(50));
    post(
        &mgr,
        hub,
        OpPayload::MemoryLoad {
            offset: 0x1000,
            length: 0x400,
        },
        0xB,
    );

    let (n, rec) = waiter.join().unwrap();
    assert_eq!(n, 1);
    assert_eq!(rec.kind, EventKind::MemoryLoad);
    assert_eq!(rec.offset, 0x1000);
    assert_eq!(rec.length, 0x400);
    assert_eq!(rec.submit_info, 0xB);
    assert!(mgr.scheduler().stats().enqueues >= 1);
}

#[test]
fn test_single_event_wakes_all_waiters_one_wins() {
    let mgr = manager();
    let hub = mgr.create_event_hub();

    let spawn_waiter = |mgr: EventManager| {
        thread::spawn(move || {
            let mut buf = [EventRecord::default(); 1];
            mgr.wait_for_events(hub, &mut buf, 400 * MS)
        })
    };
    let w1 = spawn_waiter(mgr.clone());
    let w2 = spawn_waiter(mgr.clone());

    thread::sleep(Duration::from_millis(80));
    post(&mgr, hub, OpPayload::Irq, 0xC);

    let outcomes = [w1.join().unwrap(), w2.join().unwrap()];
    let wins = outcomes.iter().filter(|r| matches!(r, Ok(1))).count();
    let timeouts = outcomes
        .iter()
        .filter(|r| matches!(r, Err(SyscallError::Timeout)))
        .count();
    assert_eq!(wins, 1, "exactly one waiter drains the event");
    assert_eq!(timeouts, 1, "the loser rechecks, re-blocks, and times out");
}

#[test]
fn test_timeout_elapses_without_events() {
    let mgr = manager();
    let hub = mgr.create_event_hub();

    let mut buf = [EventRecord::default(); 1];
    let start = Instant::now();
    let result = mgr.wait_for_events(hub, &mut buf, 60 * MS);
    assert!(matches!(result, Err(SyscallError::Timeout)));
    assert!(start.elapsed() >= Duration::from_millis(60));
}

#[test]
fn test_timeout_does_not_cancel_operations() {
    let mgr = manager();
    let hub = mgr.create_event_hub();

    let mut buf = [EventRecord::default(); 1];
    assert!(matches!(
        mgr.wait_for_events(hub, &mut buf, 30 * MS),
        Err(SyscallError::Timeout)
    ));

    // The operation completes later into the same hub and is still drained.
    post(&mgr, hub, OpPayload::Connect { handle: 7 }, 0xD);
    let n = mgr.wait_for_events(hub, &mut buf, 0).unwrap();
    assert_eq!(n, 1);
    assert_eq!(buf[0].kind, EventKind::Connect);
    assert_eq!(buf[0].handle, 7);
}

#[test]
fn test_destroy_wakes_blocked_waiter() {
    let mgr = manager();
    let hub = mgr.create_event_hub();

    let mgr2 = mgr.clone();
    let waiter = thread::spawn(move || {
        let mut buf = [EventRecord::default(); 1];
        mgr2.wait_for_events(hub, &mut buf, WAIT_FOREVER)
    });

    thread::sleep(Duration::from_millis(50));
    mgr.destroy_event_hub(hub).unwrap();

    assert!(matches!(
        waiter.join().unwrap(),
        Err(SyscallError::NoSuchHandle(h)) if h == hub
    ));
}

#[test]
fn test_wait_on_wrong_handle_type() {
    let mgr = manager();
    let line = mgr.create_irq_line(5);

    let mut buf = [EventRecord::default(); 1];
    assert!(matches!(
        mgr.wait_for_events(line, &mut buf, 0),
        Err(SyscallError::WrongHandleType(h)) if h == line
    ));
}

#[test]
fn test_wait_into_byte_buffer() {
    let mgr = manager();
    let hub = mgr.create_event_hub();
    post(&mgr, hub, OpPayload::Accept { handle: 9 }, 0xE);

    let mut buf = vec![0u8; 2 * EventRecord::WIRE_SIZE];
    let n = mgr.wait_for_events_into(hub, &mut buf, 2, 0).unwrap();
    assert_eq!(n, 1);

    let rec = EventRecord::decode(&buf).unwrap();
    assert_eq!(rec.kind, EventKind::Accept);
    assert_eq!(rec.handle, 9);
    assert_eq!(rec.submit_info, 0xE);
}

#[test]
fn test_wait_into_undersized_buffer() {
    let mgr = manager();
    let hub = mgr.create_event_hub();

    let mut buf = vec![0u8; EventRecord::WIRE_SIZE - 1];
    assert!(matches!(
        mgr.wait_for_events_into(hub, &mut buf, 1, 0),
        Err(SyscallError::BufferTooSmall { .. })
    ));
}

#[test]
fn test_irq_fire_wakes_hub_waiter() {
    let mgr = manager();
    let hub = mgr.create_event_hub();
    let irq = mgr.create_irq_line(3);
    mgr.submit_await_irq(irq, hub, 0xF).unwrap();

    let mgr2 = mgr.clone();
    let waiter = thread::spawn(move || {
        let mut buf = [EventRecord::default(); 1];
        let n = mgr2.wait_for_events(hub, &mut buf, WAIT_FOREVER).unwrap();
        (n, buf[0])
    });

    thread::sleep(Duration::from_millis(50));
    let line = mgr.irq_line(irq).unwrap();
    assert_eq!(line.fire(mgr.scheduler()), 1);

    let (n, rec) = waiter.join().unwrap();
    assert_eq!(n, 1);
    assert_eq!(rec.kind, EventKind::Irq);
    assert_eq!(rec.submit_info, 0xF);
}
