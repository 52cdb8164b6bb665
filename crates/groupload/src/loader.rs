//! Module: loader
//! Responsibility: the explicit cache-scope object for one fetch/batch
//! window. Owns the store handle, catalog, parent batch, result cache, and
//! metrics, and hands out proxies bound to that scope.
//! Does not own: its own lifecycle; the orchestrator creates one loader per
//! window and discards it when the window ends.

use crate::{
    cache::ResultCache,
    obs::{AggregateMetrics, MetricsSnapshot},
    proxy::AggregateProxy,
    relation::{EntityIdentity, RelationCatalog},
    store::RelationStore,
    value::Value,
};
use std::sync::Arc;

///
/// ParentBatch
///
/// The identifier universe for one loader window: every grouped query is
/// scoped to exactly these parents. Duplicates collapse on construction;
/// order is preserved. Immutable for the window's lifetime.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ParentBatch {
    ids: Vec<Value>,
}

impl ParentBatch {
    pub fn new(ids: impl IntoIterator<Item = Value>) -> Self {
        let mut seen = Vec::new();
        for id in ids {
            if !seen.contains(&id) {
                seen.push(id);
            }
        }

        Self { ids: seen }
    }

    pub fn from_parents<'a, P>(parents: impl IntoIterator<Item = &'a P>) -> Self
    where
        P: EntityIdentity + 'a,
    {
        Self::new(parents.into_iter().map(EntityIdentity::id))
    }

    #[must_use]
    pub fn ids(&self) -> &[Value] {
        &self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &Value) -> bool {
        self.ids.contains(id)
    }
}

// Shared interior of one loader scope. Proxies hold an Arc to this so the
// cache, batch, and metrics survive as long as any proxy does.
pub(crate) struct LoaderCore<S, C> {
    pub(crate) store: S,
    pub(crate) catalog: C,
    pub(crate) batch: ParentBatch,
    pub(crate) cache: ResultCache,
    pub(crate) metrics: AggregateMetrics,
}

///
/// Loader
///
/// One batch window's aggregation scope. `proxy_for` is side-effect-free:
/// resolution and execution happen at the first aggregate call on a proxy,
/// never at construction.
///

pub struct Loader<S, C> {
    core: Arc<LoaderCore<S, C>>,
}

impl<S, C> Loader<S, C>
where
    S: RelationStore,
    C: RelationCatalog,
{
    pub fn new(store: S, catalog: C, batch: ParentBatch) -> Self {
        Self {
            core: Arc::new(LoaderCore {
                store,
                catalog,
                batch,
                cache: ResultCache::new(),
                metrics: AggregateMetrics::new(),
            }),
        }
    }

    /// Return the aggregation handle for one (parent, relation) pair.
    ///
    /// The parent stays plain data; all aggregation behavior lives in the
    /// returned wrapper.
    #[must_use]
    pub fn proxy_for(
        &self,
        parent: &impl EntityIdentity,
        relation: impl Into<String>,
    ) -> AggregateProxy<S, C> {
        AggregateProxy::new(
            self.core.clone(),
            parent.entity().to_string(),
            parent.id(),
            relation.into(),
        )
    }

    #[must_use]
    pub fn batch(&self) -> &ParentBatch {
        &self.core.batch
    }

    /// Counters for this loader scope.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.core.metrics.snapshot()
    }
}

impl<S, C> Clone for Loader<S, C> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}
