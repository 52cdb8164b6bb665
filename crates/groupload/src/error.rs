use crate::{relation::ResolutionError, store::StoreError};
use thiserror::Error as ThisError;

///
/// Error
///
/// Top-level error surface of the engine.
///
/// Resolution failures are fatal configuration errors raised at the first
/// aggregation for a relation path; store failures pass through unchanged
/// from the persistence layer; invariant errors mark a collaborator returning
/// a shape the engine cannot interpret. A failed aggregation aborts only its
/// own resolution; other descriptors and already-resolved mappings are
/// unaffected.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("engine invariant violated: {message}")]
    Invariant { message: String },
}

impl Error {
    /// Construct an engine-boundary invariant violation.
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_resolution(&self) -> bool {
        matches!(self, Self::Resolution(_))
    }

    #[must_use]
    pub const fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}
