//! Operation slots: pending/success/error lifecycle tracking for
//! user-triggered requests.
//!
//! Each slot holds the authoritative outcome of at most one in-flight
//! invocation. Invocations are identified by a generation counter: a new
//! `begin` supersedes any older in-flight ticket, and a cancelled slot
//! rejects everything issued before the cancel. A completed slot never
//! re-enters `Pending` except through a brand-new `begin`.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use crate::error::ApiError;

/// Lifecycle of one user-triggered operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationState<T> {
    Idle,
    Pending,
    Success(T),
    Failed(String),
}

impl<T> OperationState<T> {
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Success(_) | Self::Failed(_))
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }
}

/// Proof of one `begin` call; completions must present it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpTicket {
    generation: u64,
}

#[derive(Debug)]
struct SlotInner<T> {
    state: OperationState<T>,
    generation: u64,
    /// Generations at or below this mark were torn down by `cancel`.
    cancel_generation: u64,
}

/// One status/result cell. Thread-safe; completion applies only when the
/// presenting ticket is still the newest invocation.
#[derive(Debug)]
pub struct OpSlot<T> {
    inner: Mutex<SlotInner<T>>,
}

impl<T> Default for OpSlot<T> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(SlotInner {
                state: OperationState::Idle,
                generation: 0,
                cancel_generation: 0,
            }),
        }
    }
}

impl<T: Clone> OpSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new invocation: the slot becomes `Pending` and any older
    /// in-flight ticket is superseded.
    pub fn begin(&self) -> OpTicket {
        let mut inner = self.inner.lock().expect("op slot lock is not poisoned");
        inner.generation += 1;
        inner.state = OperationState::Pending;
        OpTicket {
            generation: inner.generation,
        }
    }

    /// Apply a successful outcome for `ticket`. Late arrivals are rejected
    /// with `Cancelled` or `Superseded` and leave the slot untouched.
    pub fn complete(&self, ticket: OpTicket, value: T) -> Result<(), ApiError> {
        self.settle(ticket, OperationState::Success(value))
    }

    /// Apply a failed outcome for `ticket`, same gating as `complete`.
    pub fn fail(&self, ticket: OpTicket, reason: impl Into<String>) -> Result<(), ApiError> {
        self.settle(ticket, OperationState::Failed(reason.into()))
    }

    fn settle(&self, ticket: OpTicket, outcome: OperationState<T>) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().expect("op slot lock is not poisoned");
        if ticket.generation <= inner.cancel_generation {
            return Err(ApiError::Cancelled);
        }
        if ticket.generation != inner.generation || !inner.state.is_pending() {
            return Err(ApiError::Superseded);
        }
        inner.state = outcome;
        Ok(())
    }

    /// Tear down the slot: state returns to `Idle` and every outstanding
    /// ticket is rejected on completion.
    pub fn cancel(&self) {
        let mut inner = self.inner.lock().expect("op slot lock is not poisoned");
        inner.cancel_generation = inner.generation;
        inner.state = OperationState::Idle;
    }

    pub fn state(&self) -> OperationState<T> {
        self.inner
            .lock()
            .expect("op slot lock is not poisoned")
            .state
            .clone()
    }
}

/// Per-key slot map for operations tied to a specific entity, e.g. one
/// prediction per symbol. Re-invoking a key supersedes that key's previous
/// in-flight invocation without touching other keys.
#[derive(Debug)]
pub struct KeyedSlots<K, T> {
    slots: Mutex<HashMap<K, Arc<OpSlot<T>>>>,
}

impl<K, T> Default for KeyedSlots<K, T> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone, T: Clone> KeyedSlots<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot for `key`, created on first use.
    pub fn slot(&self, key: &K) -> Arc<OpSlot<T>> {
        let mut slots = self.slots.lock().expect("keyed slots lock is not poisoned");
        slots.entry(key.clone()).or_default().clone()
    }

    pub fn state(&self, key: &K) -> OperationState<T> {
        self.slots
            .lock()
            .expect("keyed slots lock is not poisoned")
            .get(key)
            .map(|slot| slot.state())
            .unwrap_or(OperationState::Idle)
    }

    pub fn cancel_all(&self) {
        let slots = self.slots.lock().expect("keyed slots lock is not poisoned");
        for slot in slots.values() {
            slot.cancel();
        }
    }
}
