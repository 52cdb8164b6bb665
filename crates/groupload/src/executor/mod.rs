//! Module: executor
//! Responsibility: turn (parent batch, resolved path, filter chain, terminal)
//! into exactly one grouped store query and wrap its per-parent mapping.
//! Does not own: caching, absence defaults at the call site, or the store's
//! query semantics.


use crate::{
    descriptor::{AggregateColumn, AggregateFunction},
    error::Error,
    filter::FilterChain,
    relation::ResolvedPath,
    store::{GroupedQueryPlan, RelationStore},
    value::Value,
};
use std::collections::BTreeMap;

///
/// ResultMapping
///
/// Parent identifier → aggregate value for one descriptor, produced by one
/// grouped query execution. Read-only after population. A parent absent from
/// the mapping had no matching group; [`Self::value_for`] applies the
/// per-function absence policy.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResultMapping(BTreeMap<Value, Value>);

impl ResultMapping {
    #[must_use]
    pub const fn new(mapping: BTreeMap<Value, Value>) -> Self {
        Self(mapping)
    }

    #[must_use]
    pub fn get(&self, parent_id: &Value) -> Option<&Value> {
        self.0.get(parent_id)
    }

    #[must_use]
    pub fn contains(&self, parent_id: &Value) -> bool {
        self.0.contains_key(parent_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up one parent's value under the per-function absence policy:
    /// count and sum default to zero, exists to false, and the value-shaped
    /// terminals (average/minimum/maximum) to no value at all.
    #[must_use]
    pub fn value_for(&self, function: AggregateFunction, parent_id: &Value) -> Option<Value> {
        match self.0.get(parent_id) {
            Some(value) => Some(value.clone()),
            None => function.absent_value(),
        }
    }
}

impl From<BTreeMap<Value, Value>> for ResultMapping {
    fn from(mapping: BTreeMap<Value, Value>) -> Self {
        Self(mapping)
    }
}

///
/// BatchQueryExecutor
///
/// Stateless grouped-query construction. One call, one store query: the
/// relation's built-in scope replays first, then the caller's chain, then
/// the grouped plan scoped to the batch's identifiers executes.
///

pub struct BatchQueryExecutor;

impl BatchQueryExecutor {
    /// Issue one grouped query for `function(column)` over the resolved path.
    ///
    /// Store failures propagate unmodified.
    pub fn execute<S>(
        store: &S,
        parent_ids: &[Value],
        path: &ResolvedPath,
        chain: &FilterChain,
        function: AggregateFunction,
        column: &AggregateColumn,
    ) -> Result<ResultMapping, Error>
    where
        S: RelationStore,
    {
        let column = Self::effective_column(path, function, column);

        let scope = store.base_scope(&path.target)?;
        let scope = path.scope.materialize(store, scope)?;
        let scope = chain.materialize(store, scope)?;

        let plan = GroupedQueryPlan {
            join: path.join.as_ref(),
            group_column: &path.group_column,
            parent_ids,
            distinct: path.requires_distinct,
            function,
            column: &column,
        };

        let mapping = store.grouped_aggregate(scope, &plan)?;

        Ok(ResultMapping::from(mapping))
    }

    /// Wildcard column policy: a deduplicated count needs a concrete column
    /// to count distinct over, so `*` resolves to the target's primary key.
    /// Every other combination passes through unmodified.
    fn effective_column(
        path: &ResolvedPath,
        function: AggregateFunction,
        column: &AggregateColumn,
    ) -> AggregateColumn {
        if column.is_wildcard() && function == AggregateFunction::Count && path.requires_distinct {
            if let Some(join) = &path.join {
                return AggregateColumn::field(join.target_primary_key.clone());
            }
        }

        column.clone()
    }
}
