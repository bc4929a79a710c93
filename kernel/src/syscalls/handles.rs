/*!
 * Handle Table
 * Typed user-space handle resolution for kernel objects
 */

use super::types::{SyscallError, SyscallResult};
use crate::core::types::Handle;
use crate::event::{EventHub, IrqLine};
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Kernel objects addressable by handle
pub enum KernelObject {
    Hub(Arc<EventHub>),
    IrqLine(Arc<IrqLine>),
}

impl KernelObject {
    pub fn type_name(&self) -> &'static str {
        match self {
            KernelObject::Hub(_) => "event_hub",
            KernelObject::IrqLine(_) => "irq_line",
        }
    }
}

/// Global handle table.
///
/// Handles start at 1; zero stays reserved as the invalid handle.
pub struct HandleTable {
    objects: DashMap<Handle, KernelObject, RandomState>,
    next_id: AtomicU64,
}

impl HandleTable {
    pub fn new() -> Self {
        Self {
            objects: DashMap::with_hasher(RandomState::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Reserve the next handle value without installing an object.
    pub fn next_handle(&self) -> Handle {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn install(&self, handle: Handle, object: KernelObject) {
        self.objects.insert(handle, object);
    }

    /// Remove the hub under `handle`. Fails on unknown handles and leaves
    /// non-hub objects in place.
    pub fn remove_hub(&self, handle: Handle) -> SyscallResult<Arc<EventHub>> {
        // Type-check first so a mismatch does not unlink the object.
        let _ = self.hub(handle)?;
        match self
            .objects
            .remove_if(&handle, |_, obj| matches!(obj, KernelObject::Hub(_)))
        {
            Some((_, KernelObject::Hub(hub))) => Ok(hub),
            _ => Err(SyscallError::NoSuchHandle(handle)),
        }
    }

    pub fn hub(&self, handle: Handle) -> SyscallResult<Arc<EventHub>> {
        match self.objects.get(&handle) {
            None => Err(SyscallError::NoSuchHandle(handle)),
            Some(entry) => match entry.value() {
                KernelObject::Hub(hub) => Ok(Arc::clone(hub)),
                _ => Err(SyscallError::WrongHandleType(handle)),
            },
        }
    }

    pub fn irq_line(&self, handle: Handle) -> SyscallResult<Arc<IrqLine>> {
        match self.objects.get(&handle) {
            None => Err(SyscallError::NoSuchHandle(handle)),
            Some(entry) => match entry.value() {
                KernelObject::IrqLine(line) => Ok(Arc::clone(line)),
                _ => Err(SyscallError::WrongHandleType(handle)),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}
