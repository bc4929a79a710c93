/*!
 * Event Syscalls
 *
 * The thin surface user space drives the event core through: hub
 * lifecycle, one submit per operation kind, and the drain/block wait loop.
 * Submits construct the operation, attach its hub completion, hand it to
 * the initiating subsystem, and return a ticket without ever sleeping.
 */

use super::handles::{HandleTable, KernelObject};
use super::types::{EventSyscall, SyscallError, SyscallOutcome, SyscallResult};
use crate::core::limits::{MAX_WAIT_BATCH, WAIT_FOREVER};
use crate::core::types::{EventStats, Handle, IrqVector, SubmitInfo, Ticket};
use crate::event::{complete, AsyncOp, Completion, EventHub, EventRecord, IrqLine, OpPayload};
use crate::sched::Scheduler;
use crate::time::TimerService;
use log::info;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Receives freshly submitted operations and drives them to completion.
///
/// Each subsystem (memory, IPC, thread lifecycle) registers one of these;
/// it owns the operation exclusively until it hands it to the dispatcher.
pub trait OperationSink: Send + Sync {
    fn initiate(&self, target: Handle, op: AsyncOp);
}

/// Sink that completes every operation immediately with its initial result
/// fields. Stands in for real subsystems in hosted builds.
pub struct InlineSink {
    sched: Arc<Scheduler>,
}

impl InlineSink {
    pub fn new(sched: Arc<Scheduler>) -> Self {
        Self { sched }
    }
}

impl OperationSink for InlineSink {
    fn initiate(&self, _target: Handle, op: AsyncOp) {
        complete(op, &self.sched);
    }
}

struct Counters {
    hubs_created: AtomicU64,
    hubs_destroyed: AtomicU64,
    ops_released: AtomicU64,
}

/// Manager for event hubs and the syscalls that drive them.
#[derive(Clone)]
pub struct EventManager {
    handles: Arc<HandleTable>,
    sched: Arc<Scheduler>,
    timers: Arc<TimerService>,
    sink: Arc<dyn OperationSink>,
    next_ticket: Arc<AtomicU64>,
    stats: Arc<Counters>,
}

impl EventManager {
    pub fn new(sched: Arc<Scheduler>, sink: Arc<dyn OperationSink>) -> Self {
        info!("Event manager initialized");
        Self {
            handles: Arc::new(HandleTable::new()),
            timers: Arc::new(TimerService::new(sched.clone())),
            sched,
            sink,
            next_ticket: Arc::new(AtomicU64::new(1)),
            stats: Arc::new(Counters {
                hubs_created: AtomicU64::new(0),
                hubs_destroyed: AtomicU64::new(0),
                ops_released: AtomicU64::new(0),
            }),
        }
    }

    /// Manager whose submits complete inline, for hosted use and tests.
    pub fn with_inline_sink(sched: Arc<Scheduler>) -> Self {
        let sink = Arc::new(InlineSink::new(sched.clone()));
        Self::new(sched, sink)
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.sched
    }

    // ========================================================================
    // Hub lifecycle
    // ========================================================================

    pub fn create_event_hub(&self) -> Handle {
        let handle = self.handles.next_handle();
        let hub = Arc::new(EventHub::new(handle));
        self.handles.install(handle, KernelObject::Hub(hub));
        self.stats.hubs_created.fetch_add(1, Ordering::Relaxed);
        info!("event hub {handle} created");
        handle
    }

    /// Close the hub: queued operations are released, waiters wake and
    /// observe the closure, and later completions aimed here fail their
    /// weak-ref upgrade. Returns the number of operations released.
    pub fn destroy_event_hub(&self, handle: Handle) -> SyscallResult<usize> {
        let hub = self.handles.remove_hub(handle)?;
        let released = {
            let mut guard = hub.lock();
            guard.close(&self.sched)
        };
        self.stats.hubs_destroyed.fetch_add(1, Ordering::Relaxed);
        self.stats
            .ops_released
            .fetch_add(released as u64, Ordering::Relaxed);
        info!("event hub {handle} destroyed, released {released} operations");
        Ok(released)
    }

    /// Resolve a hub handle to the live hub object.
    pub fn hub(&self, handle: Handle) -> SyscallResult<Arc<EventHub>> {
        self.handles.hub(handle)
    }

    pub fn create_irq_line(&self, vector: IrqVector) -> Handle {
        let handle = self.handles.next_handle();
        self.handles
            .install(handle, KernelObject::IrqLine(Arc::new(IrqLine::new(vector))));
        handle
    }

    pub fn irq_line(&self, handle: Handle) -> SyscallResult<Arc<IrqLine>> {
        self.handles.irq_line(handle)
    }

    pub fn stats(&self) -> EventStats {
        EventStats {
            hubs_created: self.stats.hubs_created.load(Ordering::Relaxed),
            hubs_destroyed: self.stats.hubs_destroyed.load(Ordering::Relaxed),
            ops_released: self.stats.ops_released.load(Ordering::Relaxed),
        }
    }

    // ========================================================================
    // Submission
    // ========================================================================

    fn hub_completion(
        &self,
        hub: Handle,
        submit_info: SubmitInfo,
    ) -> SyscallResult<Completion> {
        let hub = self.handles.hub(hub)?;
        Ok(Completion::PostToHub {
            hub: Arc::downgrade(&hub),
            submit_info,
        })
    }

    fn initiate(&self, target: Handle, op: AsyncOp) -> Ticket {
        self.sink.initiate(target, op);
        self.next_ticket.fetch_add(1, Ordering::Relaxed)
    }

    pub fn submit_memory_load(
        &self,
        memory: Handle,
        offset: u64,
        length: u64,
        hub: Handle,
        submit_info: SubmitInfo,
    ) -> SyscallResult<Ticket> {
        let completion = self.hub_completion(hub, submit_info)?;
        Ok(self.initiate(memory, AsyncOp::new(OpPayload::MemoryLoad { offset, length }, completion)))
    }

    pub fn submit_memory_lock(
        &self,
        memory: Handle,
        hub: Handle,
        submit_info: SubmitInfo,
    ) -> SyscallResult<Ticket> {
        let completion = self.hub_completion(hub, submit_info)?;
        Ok(self.initiate(memory, AsyncOp::new(OpPayload::MemoryLock, completion)))
    }

    pub fn submit_observe(
        &self,
        thread: Handle,
        hub: Handle,
        submit_info: SubmitInfo,
    ) -> SyscallResult<Ticket> {
        let completion = self.hub_completion(hub, submit_info)?;
        Ok(self.initiate(thread, AsyncOp::new(OpPayload::Observe, completion)))
    }

    pub fn submit_send_string(
        &self,
        channel: Handle,
        hub: Handle,
        submit_info: SubmitInfo,
    ) -> SyscallResult<Ticket> {
        let completion = self.hub_completion(hub, submit_info)?;
        Ok(self.initiate(channel, AsyncOp::new(OpPayload::SendString, completion)))
    }

    pub fn submit_send_descriptor(
        &self,
        channel: Handle,
        hub: Handle,
        submit_info: SubmitInfo,
    ) -> SyscallResult<Ticket> {
        let completion = self.hub_completion(hub, submit_info)?;
        Ok(self.initiate(channel, AsyncOp::new(OpPayload::SendDescriptor, completion)))
    }

    pub fn submit_recv_string(
        &self,
        channel: Handle,
        hub: Handle,
        submit_info: SubmitInfo,
    ) -> SyscallResult<Ticket> {
        let completion = self.hub_completion(hub, submit_info)?;
        let payload = OpPayload::RecvString {
            msg_request: 0,
            msg_sequence: 0,
            data: Vec::new(),
        };
        Ok(self.initiate(channel, AsyncOp::new(payload, completion)))
    }

    pub fn submit_recv_string_to_ring(
        &self,
        channel: Handle,
        _ring: Handle,
        hub: Handle,
        submit_info: SubmitInfo,
    ) -> SyscallResult<Ticket> {
        let completion = self.hub_completion(hub, submit_info)?;
        let payload = OpPayload::RecvStringToRing {
            msg_request: 0,
            msg_sequence: 0,
            offset: 0,
            length: 0,
        };
        Ok(self.initiate(channel, AsyncOp::new(payload, completion)))
    }

    pub fn submit_recv_descriptor(
        &self,
        channel: Handle,
        hub: Handle,
        submit_info: SubmitInfo,
    ) -> SyscallResult<Ticket> {
        let completion = self.hub_completion(hub, submit_info)?;
        let payload = OpPayload::RecvDescriptor {
            msg_request: 0,
            msg_sequence: 0,
            handle: 0,
        };
        Ok(self.initiate(channel, AsyncOp::new(payload, completion)))
    }

    pub fn submit_accept(
        &self,
        endpoint: Handle,
        hub: Handle,
        submit_info: SubmitInfo,
    ) -> SyscallResult<Ticket> {
        let completion = self.hub_completion(hub, submit_info)?;
        Ok(self.initiate(endpoint, AsyncOp::new(OpPayload::Accept { handle: 0 }, completion)))
    }

    pub fn submit_connect(
        &self,
        endpoint: Handle,
        hub: Handle,
        submit_info: SubmitInfo,
    ) -> SyscallResult<Ticket> {
        let completion = self.hub_completion(hub, submit_info)?;
        Ok(self.initiate(endpoint, AsyncOp::new(OpPayload::Connect { handle: 0 }, completion)))
    }

    pub fn submit_join(
        &self,
        thread: Handle,
        hub: Handle,
        submit_info: SubmitInfo,
    ) -> SyscallResult<Ticket> {
        let completion = self.hub_completion(hub, submit_info)?;
        Ok(self.initiate(thread, AsyncOp::new(OpPayload::Join, completion)))
    }

    /// Arm an interrupt wait on an IRQ line. The line completes the
    /// operation on its next `fire`, so this submit bypasses the sink.
    pub fn submit_await_irq(
        &self,
        irq: Handle,
        hub: Handle,
        submit_info: SubmitInfo,
    ) -> SyscallResult<Ticket> {
        let line = self.handles.irq_line(irq)?;
        let completion = self.hub_completion(hub, submit_info)?;
        line.attach(AsyncOp::new(OpPayload::Irq, completion));
        Ok(self.next_ticket.fetch_add(1, Ordering::Relaxed))
    }

    // ========================================================================
    // Waiting
    // ========================================================================

    /// Drain up to `out.len()` completed operations from the hub.
    ///
    /// Non-positive timeout polls; `WAIT_FOREVER` blocks until an event
    /// arrives; any other positive timeout arms a one-shot timer whose
    /// synthetic completion wakes the hub. The wakeup marker is internal
    /// and never copied out; the deadline itself decides whether the call
    /// reports a timeout.
    pub fn wait_for_events(
        &self,
        hub: Handle,
        out: &mut [EventRecord],
        timeout_ns: i64,
    ) -> SyscallResult<usize> {
        let target = self.handles.hub(hub)?;
        if out.is_empty() {
            return Ok(0);
        }
        let max = out.len().min(MAX_WAIT_BATCH);
        let poll_only = timeout_ns <= 0;

        let deadline = if !poll_only && timeout_ns != WAIT_FOREVER {
            let deadline = Instant::now() + Duration::from_nanos(timeout_ns as u64);
            let marker = AsyncOp::new(
                OpPayload::TimerExpired,
                Completion::PostToHub {
                    hub: Arc::downgrade(&target),
                    submit_info: 0,
                },
            );
            self.timers.arm(deadline, marker);
            Some(deadline)
        } else {
            None
        };

        let mut guard = target.lock();
        loop {
            if guard.is_closed() {
                return Err(SyscallError::NoSuchHandle(hub));
            }
            let mut drained = 0;
            while drained < max && guard.has_event() {
                let op = guard.dequeue();
                // A wakeup marker's only job was getting us here.
                if op.is_timeout_marker() {
                    continue;
                }
                out[drained] = op.project();
                drained += 1;
            }
            if drained > 0 {
                return Ok(drained);
            }
            if poll_only {
                return Ok(0);
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(SyscallError::Timeout);
                }
            }
            guard = target.block_current(guard, &self.sched);
        }
    }

    /// ABI-level wait: records are encoded into a raw byte buffer, which
    /// must hold `max` wire records.
    pub fn wait_for_events_into(
        &self,
        hub: Handle,
        buf: &mut [u8],
        max: usize,
        timeout_ns: i64,
    ) -> SyscallResult<usize> {
        let needed = max.saturating_mul(EventRecord::WIRE_SIZE);
        if buf.len() < needed {
            return Err(SyscallError::BufferTooSmall {
                needed,
                available: buf.len(),
            });
        }
        let mut records = vec![EventRecord::default(); max.min(MAX_WAIT_BATCH)];
        let drained = self.wait_for_events(hub, &mut records, timeout_ns)?;
        for (i, record) in records[..drained].iter().enumerate() {
            record
                .encode_into(&mut buf[i * EventRecord::WIRE_SIZE..])
                .map_err(|_| SyscallError::BufferTooSmall {
                    needed,
                    available: buf.len(),
                })?;
        }
        Ok(drained)
    }

    // ========================================================================
    // Demultiplexer
    // ========================================================================

    /// Route one decoded syscall to its implementation.
    pub fn dispatch(&self, call: EventSyscall) -> SyscallOutcome {
        match call {
            EventSyscall::CreateEventHub => SyscallOutcome::Handle {
                handle: self.create_event_hub(),
            },
            EventSyscall::DestroyEventHub { hub } => match self.destroy_event_hub(hub) {
                Ok(count) => SyscallOutcome::Released { count },
                Err(e) => e.into(),
            },
            EventSyscall::WaitForEvents {
                hub,
                max,
                timeout_ns,
            } => {
                let mut records = vec![EventRecord::default(); max.min(MAX_WAIT_BATCH)];
                match self.wait_for_events(hub, &mut records, timeout_ns) {
                    Ok(n) => {
                        records.truncate(n);
                        SyscallOutcome::Events { records }
                    }
                    Err(e) => e.into(),
                }
            }
            EventSyscall::SubmitMemoryLoad {
                memory,
                offset,
                length,
                hub,
                submit_info,
            } => self
                .submit_memory_load(memory, offset, length, hub, submit_info)
                .into_outcome(),
            EventSyscall::SubmitMemoryLock {
                memory,
                hub,
                submit_info,
            } => self.submit_memory_lock(memory, hub, submit_info).into_outcome(),
            EventSyscall::SubmitObserve {
                thread,
                hub,
                submit_info,
            } => self.submit_observe(thread, hub, submit_info).into_outcome(),
            EventSyscall::SubmitSendString {
                channel,
                hub,
                submit_info,
            } => self.submit_send_string(channel, hub, submit_info).into_outcome(),
            EventSyscall::SubmitSendDescriptor {
                channel,
                hub,
                submit_info,
            } => self
                .submit_send_descriptor(channel, hub, submit_info)
                .into_outcome(),
            EventSyscall::SubmitRecvString {
                channel,
                hub,
                submit_info,
            } => self.submit_recv_string(channel, hub, submit_info).into_outcome(),
            EventSyscall::SubmitRecvStringToRing {
                channel,
                ring,
                hub,
                submit_info,
            } => self
                .submit_recv_string_to_ring(channel, ring, hub, submit_info)
                .into_outcome(),
            EventSyscall::SubmitRecvDescriptor {
                channel,
                hub,
                submit_info,
            } => self
                .submit_recv_descriptor(channel, hub, submit_info)
                .into_outcome(),
            EventSyscall::SubmitAccept {
                endpoint,
                hub,
                submit_info,
            } => self.submit_accept(endpoint, hub, submit_info).into_outcome(),
            EventSyscall::SubmitConnect {
                endpoint,
                hub,
                submit_info,
            } => self.submit_connect(endpoint, hub, submit_info).into_outcome(),
            EventSyscall::SubmitJoin {
                thread,
                hub,
                submit_info,
            } => self.submit_join(thread, hub, submit_info).into_outcome(),
            EventSyscall::SubmitAwaitIrq {
                irq,
                hub,
                submit_info,
            } => self.submit_await_irq(irq, hub, submit_info).into_outcome(),
            EventSyscall::CreateIrqLine { vector } => SyscallOutcome::Handle {
                handle: self.create_irq_line(vector),
            },
        }
    }
}

trait IntoOutcome {
    fn into_outcome(self) -> SyscallOutcome;
}

impl IntoOutcome for SyscallResult<Ticket> {
    fn into_outcome(self) -> SyscallOutcome {
        match self {
            Ok(ticket) => SyscallOutcome::Ticket { ticket },
            Err(e) => e.into(),
        }
    }
}
