//! Module: cache
//! Responsibility: the at-most-one-execution discipline: one computed
//! mapping per descriptor per batch, shared by every requester.
//! Does not own: what a computation does; it only guards when one runs.

#[cfg(test)]
mod tests;

use crate::{descriptor::AggregateDescriptor, error::Error, executor::ResultMapping};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

///
/// CacheOutcome
///
/// Whether a lookup ran the computation or shared an existing mapping.
/// Feeds the loader's execution counters.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CacheOutcome {
    Computed,
    Shared,
}

// Per-descriptor slot: the slot mutex is the critical section for that
// descriptor's computation. An empty slot after an error means the
// computation failed and may be retried by a later caller.
struct DescriptorSlot {
    mapping: Mutex<Option<Arc<ResultMapping>>>,
}

impl DescriptorSlot {
    const fn new() -> Self {
        Self {
            mapping: Mutex::new(None),
        }
    }
}

///
/// ResultCache
///
/// Descriptor → mapping registry, exclusively owned by one loader scope.
///
/// The registry mutex is held only to look up or insert a slot; the
/// per-descriptor slot mutex is held for the duration of that descriptor's
/// computation. Concurrent requesters for the same descriptor block on the
/// slot and then read the shared mapping; requesters for different
/// descriptors proceed independently.
///

#[derive(Default)]
pub struct ResultCache {
    slots: Mutex<HashMap<AggregateDescriptor, Arc<DescriptorSlot>>>,
}

impl ResultCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Number of descriptors with a registered slot (computed or in flight).
    #[must_use]
    pub fn descriptor_count(&self) -> usize {
        self.slots.lock().map_or(0, |slots| slots.len())
    }

    /// Return the mapping for `descriptor`, computing it at most once.
    ///
    /// Exactly one caller invokes `compute`; concurrent same-descriptor
    /// callers block until it finishes and observe the same mapping. A
    /// failed computation propagates to its caller and leaves the slot
    /// empty; no partial mapping is ever visible, and no other descriptor
    /// is affected.
    pub fn get_or_compute<F>(
        &self,
        descriptor: &AggregateDescriptor,
        compute: F,
    ) -> Result<(Arc<ResultMapping>, CacheOutcome), Error>
    where
        F: FnOnce() -> Result<ResultMapping, Error>,
    {
        let slot = {
            let mut slots = self
                .slots
                .lock()
                .map_err(|_| Error::invariant("result cache registry lock poisoned"))?;

            slots
                .entry(descriptor.clone())
                .or_insert_with(|| Arc::new(DescriptorSlot::new()))
                .clone()
        };

        let mut mapping = slot
            .mapping
            .lock()
            .map_err(|_| Error::invariant("result cache slot lock poisoned"))?;

        if let Some(existing) = mapping.as_ref() {
            return Ok((existing.clone(), CacheOutcome::Shared));
        }

        let computed = Arc::new(compute()?);
        *mapping = Some(computed.clone());

        Ok((computed, CacheOutcome::Computed))
    }
}
