use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use crate::models::{DimensionValue, ParticipantId, PreferenceProfile};

/// Participants waiting to be matched, keyed by identity
pub type Waiting<P, V> = HashMap<P, PreferenceProfile<V>>;

/// Thread-safe store of waiting participants
///
/// Every read and write goes through one mutex. A running cycle holds the
/// guard from `lock` for its whole duration, so `insert`/`remove` callers
/// block until the cycle ends and never observe a half-committed cycle.
/// Large registries or slow match handlers therefore show up directly as
/// submit/cancel latency.
///
/// The lock is not reentrant. While a [`RegistryGuard`] is alive its thread
/// is recorded as the owner so callers can detect a reentrant call with
/// [`Registry::is_held_by_current_thread`] instead of deadlocking.
#[derive(Debug)]
pub struct Registry<P, V: DimensionValue> {
    entries: Mutex<Waiting<P, V>>,
    owner: Mutex<Option<ThreadId>>,
}

/// Exclusive access to the registry's entries
pub struct RegistryGuard<'a, P, V: DimensionValue> {
    entries: MutexGuard<'a, Waiting<P, V>>,
    owner: &'a Mutex<Option<ThreadId>>,
}

impl<P, V: DimensionValue> Deref for RegistryGuard<'_, P, V> {
    type Target = Waiting<P, V>;

    fn deref(&self) -> &Self::Target {
        &self.entries
    }
}

impl<P, V: DimensionValue> DerefMut for RegistryGuard<'_, P, V> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.entries
    }
}

impl<P, V: DimensionValue> Drop for RegistryGuard<'_, P, V> {
    // Runs before `entries` is released
    fn drop(&mut self) {
        *self.owner.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl<P: ParticipantId, V: DimensionValue> Registry<P, V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            owner: Mutex::new(None),
        }
    }

    /// Store a profile unless the participant is already waiting
    pub fn insert(&self, participant: P, profile: PreferenceProfile<V>) -> bool {
        let mut entries = self.lock();
        if entries.contains_key(&participant) {
            return false;
        }
        entries.insert(participant, profile);
        true
    }

    /// Drop a participant's profile, returning whether one was stored
    pub fn remove(&self, participant: &P) -> bool {
        self.lock().remove(participant).is_some()
    }

    pub fn contains(&self, participant: &P) -> bool {
        self.lock().contains_key(participant)
    }

    /// Copy of the stored profile
    pub fn get(&self, participant: &P) -> Option<PreferenceProfile<V>> {
        self.lock().get(participant).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Take exclusive access to the whole registry
    ///
    /// A poisoned lock is recovered: entries are only ever removed one whole
    /// group at a time before the handler runs, so the map is consistent even
    /// if a handler panicked while the guard was held.
    pub fn lock(&self) -> RegistryGuard<'_, P, V> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        *self.owner.lock().unwrap_or_else(PoisonError::into_inner) = Some(thread::current().id());

        RegistryGuard {
            entries,
            owner: &self.owner,
        }
    }

    /// Whether the calling thread currently holds the guard from `lock`
    pub fn is_held_by_current_thread(&self) -> bool {
        *self.owner.lock().unwrap_or_else(PoisonError::into_inner) == Some(thread::current().id())
    }
}

impl<P: ParticipantId, V: DimensionValue> Default for Registry<P, V> {
    fn default() -> Self {
        Self::new()
    }
}
