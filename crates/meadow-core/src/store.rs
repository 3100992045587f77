//! Last-known-good snapshot with change notification.
//!
//! Every accepted snapshot replaces the previous one wholesale. Observers run
//! synchronously after each accepted apply, in no guaranteed order.

use std::fmt;

use meadow_proto::Snapshot;

use crate::error::StoreError;

/// Callback invoked with the new snapshot after each accepted change.
pub type Observer = Box<dyn FnMut(&Snapshot) + Send>;

/// Handle returned by [`StateStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Holder of the most recently accepted snapshot.
pub struct StateStore {
    snapshot: Snapshot,
    revision: u64,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("revision", &self.revision)
            .field("animals", &self.snapshot.animals.len())
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl StateStore {
    /// Create a store holding the empty snapshot.
    pub fn new() -> Self {
        Self {
            snapshot: Snapshot::default(),
            revision: 0,
            observers: Vec::new(),
            next_subscription: 1,
        }
    }

    /// Replace the snapshot.
    ///
    /// # Errors
    ///
    /// - `StoreError` if the snapshot violates the minimal shape. The previous
    ///   snapshot is kept and observers are not notified.
    pub fn apply(&mut self, snapshot: Snapshot) -> Result<(), StoreError> {
        validate(&snapshot)?;

        self.snapshot = snapshot;
        self.revision += 1;
        tracing::debug!(
            revision = self.revision,
            animals = self.snapshot.animals.len(),
            day = self.snapshot.total_days,
            "snapshot applied"
        );
        self.notify();
        Ok(())
    }

    /// Current snapshot, or the empty default if none was accepted yet.
    pub fn read(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Accepted applies since construction or the last reset.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Register an observer.
    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&Snapshot) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove an observer. Returns false if `id` was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    /// Blank the snapshot and notify observers.
    pub fn reset(&mut self) {
        self.snapshot = Snapshot::default();
        self.revision = 0;
        self.notify();
    }

    fn notify(&mut self) {
        for (_, observer) in &mut self.observers {
            observer(&self.snapshot);
        }
    }
}

fn validate(snapshot: &Snapshot) -> Result<(), StoreError> {
    for (item, &value) in &snapshot.resources {
        if !value.is_finite() {
            return Err(StoreError::NonFiniteResource { item: item.clone() });
        }
    }

    // Names may repeat: the authority names offspring by herd size, which can
    // collide with an existing animal.
    for (index, animal) in snapshot.animals.iter().enumerate() {
        if animal.name.is_empty() {
            return Err(StoreError::EmptyAnimalName { index });
        }
        for (field, value) in [("health", animal.health), ("hunger", animal.hunger)] {
            if !value.is_finite() {
                return Err(StoreError::NonFiniteVital { animal: animal.name.clone(), field });
            }
        }
    }

    Ok(())
}
