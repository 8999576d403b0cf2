//! Single-slot rendezvous between the command loop and its producer thread.

use polybridge_core::Value;
use std::sync::{Condvar, Mutex, MutexGuard};

#[derive(Default)]
struct SlotState {
    value: Option<Value>,
    delivered: bool,
    rejected: bool,
    terminated: bool,
}

/// A one-value mailbox built on a mutex and a condition variable.
///
/// At most one value is pending at a time: the producer delivers through
/// [`accept`](Self::accept) or [`reject`](Self::reject), the consumer blocks
/// in [`wait`](Self::wait) and drains the slot. The termination flag lives
/// under the same lock and persists across deliveries.
#[derive(Default)]
pub struct RendezvousSlot {
    state: Mutex<SlotState>,
    cond: Condvar,
}

impl RendezvousSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Deliver a value on the success path and wake the consumer.
    pub fn accept(&self, value: Value) {
        let mut state = self.lock();
        state.value = Some(value);
        state.delivered = true;
        state.rejected = false;
        self.cond.notify_one();
    }

    /// Deliver a value on the failure path and wake the consumer.
    ///
    /// Rejection also requests termination, so the loop winds down after
    /// draining the failed iteration.
    pub fn reject(&self, value: Value) {
        let mut state = self.lock();
        state.value = Some(value);
        state.delivered = true;
        state.rejected = true;
        state.terminated = true;
        self.cond.notify_one();
    }

    /// Block until a delivery arrives, then drain the slot.
    ///
    /// Returns the delivered value and whether it came through the reject
    /// path.
    pub fn wait(&self) -> (Value, bool) {
        let mut state = self.lock();
        while !state.delivered {
            state = self
                .cond
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }

        let value = state.value.take().unwrap_or(Value::Null);
        let rejected = state.rejected;
        state.delivered = false;
        state.rejected = false;
        (value, rejected)
    }

    /// Flip the persistent termination flag.
    pub fn request_exit(&self) {
        self.lock().terminated = true;
    }

    pub fn is_terminated(&self) -> bool {
        self.lock().terminated
    }
}
