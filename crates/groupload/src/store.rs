//! Module: store
//! Responsibility: the persistence-layer boundary: scope construction, scope
//! operation application, the grouped-aggregate primitive, and fallback row
//! materialization.
//! Does not own: grouping policy, caching, or relation resolution; the engine
//! hands the store a fully-described plan and propagates its failures
//! unchanged.

use crate::{
    descriptor::{AggregateColumn, AggregateFunction},
    filter::FilterOp,
    relation::JoinHop,
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

///
/// Row
///
/// One materialized target row, column name → value. Only the fallback path
/// and enumeration ever produce rows; batched aggregation never does.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Row(BTreeMap<String, Value>);

impl Row {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    /// Column lookup; an absent column reads as null.
    #[must_use]
    pub fn get(&self, column: &str) -> &Value {
        static NULL: Value = Value::Null;

        self.0.get(column).unwrap_or(&NULL)
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

///
/// GroupedQueryPlan
///
/// One grouped aggregate projection, fully described: optional through hop,
/// the parent-facing grouping key, the batch's identifier universe, the
/// dedup requirement, and the terminal to compute. The store executes this
/// as a single query and returns the per-group mapping.
///

#[derive(Debug)]
pub struct GroupedQueryPlan<'a> {
    pub join: Option<&'a JoinHop>,
    pub group_column: &'a str,
    pub parent_ids: &'a [Value],
    pub distinct: bool,
    pub function: AggregateFunction,
    pub column: &'a AggregateColumn,
}

///
/// ParentScopePlan
///
/// Restriction of a relation path to one parent, used by fallback
/// materialization and enumeration. Deliberately the N+1 shape: one parent,
/// one query.
///

#[derive(Debug)]
pub struct ParentScopePlan<'a> {
    pub join: Option<&'a JoinHop>,
    pub group_column: &'a str,
    pub parent_id: &'a Value,
    pub distinct: bool,
}

///
/// StoreError
///
/// Failures raised by the persistence layer. The engine adds no retry policy
/// and never masks these; they pass through to the caller unchanged.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum StoreError {
    #[error("unknown entity: {entity}")]
    UnknownEntity { entity: String },

    #[error("unknown column: {column}")]
    UnknownColumn { column: String },

    #[error("unsupported scope operation: {operation}")]
    UnsupportedOperation { operation: String },

    #[error("type mismatch on column {column}: {message}")]
    TypeMismatch { column: String, message: String },

    #[error("backend unavailable: {message}")]
    Unavailable { message: String },
}

///
/// RelationStore
///
/// The grouped-query primitive consumed from the host persistence layer.
///
/// `Scope` is opaque to the engine: it is built per target entity, refined by
/// replaying recorded filter operations, and finally handed back with a plan.
/// The engine guarantees it calls `grouped_aggregate` at most once per
/// distinct descriptor per batch; the store guarantees nothing beyond
/// executing what it is given.
///

pub trait RelationStore {
    type Scope: Clone;

    /// Build the base query scope for a target entity.
    fn base_scope(&self, entity: &str) -> Result<Self::Scope, StoreError>;

    /// Apply one recorded operation onto a scope.
    fn apply(&self, scope: Self::Scope, op: &FilterOp) -> Result<Self::Scope, StoreError>;

    /// Execute one grouped aggregate query, returning group key → value.
    ///
    /// Parents with no matching rows must be absent from the mapping, not
    /// mapped to a zero; absence policy belongs to the engine.
    fn grouped_aggregate(
        &self,
        scope: Self::Scope,
        plan: &GroupedQueryPlan<'_>,
    ) -> Result<BTreeMap<Value, Value>, StoreError>;

    /// Materialize the target rows of one parent's relation.
    fn materialize(
        &self,
        scope: Self::Scope,
        plan: &ParentScopePlan<'_>,
    ) -> Result<Vec<Row>, StoreError>;
}

// A shared handle is as good as the store itself: loaders take ownership of
// their store value, and hosts that keep using the store pass an Arc.
impl<S> RelationStore for std::sync::Arc<S>
where
    S: RelationStore + ?Sized,
{
    type Scope = S::Scope;

    fn base_scope(&self, entity: &str) -> Result<Self::Scope, StoreError> {
        (**self).base_scope(entity)
    }

    fn apply(&self, scope: Self::Scope, op: &FilterOp) -> Result<Self::Scope, StoreError> {
        (**self).apply(scope, op)
    }

    fn grouped_aggregate(
        &self,
        scope: Self::Scope,
        plan: &GroupedQueryPlan<'_>,
    ) -> Result<BTreeMap<Value, Value>, StoreError> {
        (**self).grouped_aggregate(scope, plan)
    }

    fn materialize(
        &self,
        scope: Self::Scope,
        plan: &ParentScopePlan<'_>,
    ) -> Result<Vec<Row>, StoreError> {
        (**self).materialize(scope, plan)
    }
}
