use crate::error::Error;
use std::{fmt, sync::Mutex};

///
/// Deferred
///
/// A pending aggregation request: `Pending -> Resolved`, nothing else.
///
/// `value()` is idempotent: the first call resolves through the result
/// cache and stores the scalar; later calls return it without re-resolving.
/// A failed resolution is returned to the caller and leaves the deferred
/// pending, so the next call retries; the cache still guarantees at most one
/// successful grouped execution underneath. No cancellation, no timeout:
/// resolution is synchronous with the first access.
///

pub struct Deferred<T> {
    state: Mutex<DeferredState<T>>,
}

enum DeferredState<T> {
    Pending(Box<dyn Fn() -> Result<T, Error> + Send>),
    Resolved(T),
}

impl<T: Clone> Deferred<T> {
    pub(crate) fn new<F>(resolve: F) -> Self
    where
        F: Fn() -> Result<T, Error> + Send + 'static,
    {
        Self {
            state: Mutex::new(DeferredState::Pending(Box::new(resolve))),
        }
    }

    /// Resolve on first access, then return the cached scalar.
    pub fn value(&self) -> Result<T, Error> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::invariant("deferred value lock poisoned"))?;

        let value = match &*state {
            DeferredState::Resolved(value) => return Ok(value.clone()),
            DeferredState::Pending(resolve) => resolve()?,
        };

        *state = DeferredState::Resolved(value.clone());

        Ok(value)
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.state
            .lock()
            .is_ok_and(|state| matches!(&*state, DeferredState::Resolved(_)))
    }
}

impl<T: fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.lock() {
            Ok(state) => match &*state {
                DeferredState::Pending(_) => f.write_str("Deferred(<pending>)"),
                DeferredState::Resolved(value) => write!(f, "Deferred({value:?})"),
            },
            Err(_) => f.write_str("Deferred(<poisoned>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    };

    #[test]
    fn value_resolves_once_and_caches() {
        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();
        let deferred = Deferred::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(42u64)
        });

        assert!(!deferred.is_resolved());
        assert_eq!(deferred.value().expect("first access should resolve"), 42);
        assert_eq!(deferred.value().expect("second access should be cached"), 42);
        assert!(deferred.is_resolved());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_resolution_stays_pending_and_retries() {
        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();
        let deferred = Deferred::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(Error::invariant("transient"))
            } else {
                Ok(7u64)
            }
        });

        assert!(deferred.value().is_err());
        assert!(!deferred.is_resolved());
        assert_eq!(deferred.value().expect("retry should resolve"), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
