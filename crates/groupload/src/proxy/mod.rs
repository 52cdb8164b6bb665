//! Module: proxy
//! Responsibility: the per-(parent, relation) aggregation handle: chain
//! extension, aggregate dispatch through the shared cache, and the fallback
//! path for anything a grouped query cannot express.
//! Does not own: grouped-query construction (executor) or the at-most-once
//! discipline (cache).


use crate::{
    deferred::Deferred,
    descriptor::{AggregateColumn, AggregateDescriptor, AggregateFunction},
    error::Error,
    executor::BatchQueryExecutor,
    filter::{FilterChain, FilterOp, ops},
    loader::LoaderCore,
    relation::{RelationCatalog, resolve},
    store::{ParentScopePlan, RelationStore, Row},
    value::Value,
};
use std::{fmt, sync::Arc};

///
/// CallKind
///
/// Static classification of one incoming operation name. A proxy answers as
/// exactly one of three things (aggregate dispatch, chain extension, or
/// fallback materialization) and the first two are selected here by the
/// dispatch table. Fallback is never named by an operation: per-row blocks
/// and enumeration are call-site-typed terminals, not data.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CallKind {
    Aggregate(AggregateFunction),
    Chain,
}

/// Classify an operation name against the aggregate dispatch table.
#[must_use]
pub fn classify(operation: &str) -> CallKind {
    AggregateFunction::from_name(operation).map_or(CallKind::Chain, CallKind::Aggregate)
}

///
/// CallOutcome
///
/// Result of one dynamic `call`: a resolved aggregate value (absence policy
/// already applied) or a new, still-unexecuted proxy.
///

pub enum CallOutcome<S, C> {
    Value(Option<Value>),
    Chained(AggregateProxy<S, C>),
}

impl<S, C> fmt::Debug for CallOutcome<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Chained(proxy) => f.debug_tuple("Chained").field(proxy).finish(),
        }
    }
}

///
/// AggregateProxy
///
/// The handle returned in place of a live relation. Construction is always
/// side-effect-free; chain builders are pure; aggregate terminals resolve
/// through the loader's shared cache, so asking the same question from every
/// parent in the batch still executes one grouped query.
///

pub struct AggregateProxy<S, C> {
    core: Arc<LoaderCore<S, C>>,
    source: String,
    parent_id: Value,
    relation: String,
    chain: FilterChain,
}

impl<S, C> AggregateProxy<S, C>
where
    S: RelationStore,
    C: RelationCatalog,
{
    pub(crate) const fn new(
        core: Arc<LoaderCore<S, C>>,
        source: String,
        parent_id: Value,
        relation: String,
    ) -> Self {
        Self {
            core,
            source,
            parent_id,
            relation,
            chain: FilterChain::new(),
        }
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn parent_id(&self) -> &Value {
        &self.parent_id
    }

    #[must_use]
    pub fn relation(&self) -> &str {
        &self.relation
    }

    #[must_use]
    pub const fn chain(&self) -> &FilterChain {
        &self.chain
    }

    // ------------------------------------------------------------------
    // Chain extension (pure)
    // ------------------------------------------------------------------

    /// Append one recorded operation; returns a new, unexecuted proxy.
    #[must_use]
    pub fn refine(mut self, op: FilterOp) -> Self {
        self.chain = self.chain.append(op);
        self
    }

    #[must_use]
    pub fn where_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.refine(FilterOp::new(
            ops::WHERE_EQ,
            [Value::Text(field.into()), value.into()],
        ))
    }

    #[must_use]
    pub fn where_ne(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.refine(FilterOp::new(
            ops::WHERE_NE,
            [Value::Text(field.into()), value.into()],
        ))
    }

    #[must_use]
    pub fn where_gt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.refine(FilterOp::new(
            ops::WHERE_GT,
            [Value::Text(field.into()), value.into()],
        ))
    }

    #[must_use]
    pub fn where_lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.refine(FilterOp::new(
            ops::WHERE_LT,
            [Value::Text(field.into()), value.into()],
        ))
    }

    #[must_use]
    pub fn where_in(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = Value>,
    ) -> Self {
        let mut args = vec![Value::Text(field.into())];
        args.extend(values);

        self.refine(FilterOp::new(ops::WHERE_IN, args))
    }

    #[must_use]
    pub fn order_by(self, field: impl Into<String>) -> Self {
        self.refine(FilterOp::new(ops::ORDER_BY, [Value::Text(field.into())]))
    }

    #[must_use]
    pub fn order_by_desc(self, field: impl Into<String>) -> Self {
        self.refine(FilterOp::new(
            ops::ORDER_BY_DESC,
            [Value::Text(field.into())],
        ))
    }

    // ------------------------------------------------------------------
    // Aggregate terminals (batched)
    // ------------------------------------------------------------------

    pub fn count(&self) -> Result<u64, Error> {
        let value = self
            .aggregate(AggregateFunction::Count, AggregateColumn::Wildcard)?
            .ok_or_else(|| Error::invariant("grouped count resolved to no value"))?;

        value.as_count().ok_or_else(|| {
            Error::invariant(format!("grouped count returned a non-count value: {value}"))
        })
    }

    pub fn count_column(&self, column: impl Into<String>) -> Result<u64, Error> {
        let column = AggregateColumn::field(column);
        let value = self
            .aggregate(AggregateFunction::Count, column)?
            .ok_or_else(|| Error::invariant("grouped count resolved to no value"))?;

        value.as_count().ok_or_else(|| {
            Error::invariant(format!("grouped count returned a non-count value: {value}"))
        })
    }

    pub fn sum(&self, column: impl Into<String>) -> Result<Value, Error> {
        self.aggregate(AggregateFunction::Sum, AggregateColumn::field(column))?
            .ok_or_else(|| Error::invariant("grouped sum resolved to no value"))
    }

    pub fn average(&self, column: impl Into<String>) -> Result<Option<Value>, Error> {
        self.aggregate(AggregateFunction::Average, AggregateColumn::field(column))
    }

    pub fn minimum(&self, column: impl Into<String>) -> Result<Option<Value>, Error> {
        self.aggregate(AggregateFunction::Minimum, AggregateColumn::field(column))
    }

    pub fn maximum(&self, column: impl Into<String>) -> Result<Option<Value>, Error> {
        self.aggregate(AggregateFunction::Maximum, AggregateColumn::field(column))
    }

    pub fn exists(&self) -> Result<bool, Error> {
        match self.aggregate(AggregateFunction::Exists, AggregateColumn::Wildcard)? {
            Some(Value::Bool(present)) => Ok(present),
            // Membership test: any recorded group means at least one row.
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }

    // ------------------------------------------------------------------
    // Dynamic dispatch
    // ------------------------------------------------------------------

    /// Resolve one (operation, args) call by the static classification
    /// table: known aggregate names dispatch (first argument, when present,
    /// names the column); everything else extends the chain.
    pub fn call(&self, operation: &str, args: &[Value]) -> Result<CallOutcome<S, C>, Error> {
        match classify(operation) {
            CallKind::Aggregate(function) => {
                let column = match args.first() {
                    None => AggregateColumn::Wildcard,
                    Some(Value::Text(name)) => AggregateColumn::field(name.clone()),
                    Some(other) => {
                        return Err(Error::invariant(format!(
                            "aggregate column argument must be text, got: {other}"
                        )));
                    }
                };

                Ok(CallOutcome::Value(self.aggregate(function, column)?))
            }
            CallKind::Chain => Ok(CallOutcome::Chained(
                self.clone().refine(FilterOp::new(operation, args.to_vec())),
            )),
        }
    }

    // ------------------------------------------------------------------
    // Per-row fallback terminals (deliberately unbatched)
    // ------------------------------------------------------------------
    //
    // A caller-supplied per-row computation cannot be expressed as one
    // grouped aggregate, so these materialize the real relation for this one
    // parent and fold directly: the N+1 shape, for this call only.

    pub fn count_by<F>(&self, predicate: F) -> Result<u64, Error>
    where
        F: Fn(&Row) -> bool,
    {
        let rows = self.fallback_rows()?;

        Ok(rows.iter().filter(|row| predicate(row)).count() as u64)
    }

    pub fn sum_by<F>(&self, compute: F) -> Result<Value, Error>
    where
        F: Fn(&Row) -> Value,
    {
        let mut acc = Value::Int(0);
        for row in &self.fallback_rows()? {
            let value = compute(row);
            if value.is_null() {
                continue;
            }
            acc = acc.numeric_add(&value).ok_or_else(|| {
                Error::invariant(format!("per-row sum block returned non-numeric value: {value}"))
            })?;
        }

        Ok(acc)
    }

    pub fn min_by<F>(&self, compute: F) -> Result<Option<Value>, Error>
    where
        F: Fn(&Row) -> Value,
    {
        let rows = self.fallback_rows()?;

        Ok(rows
            .iter()
            .map(|row| compute(row))
            .filter(|value| !value.is_null())
            .min())
    }

    pub fn max_by<F>(&self, compute: F) -> Result<Option<Value>, Error>
    where
        F: Fn(&Row) -> Value,
    {
        let rows = self.fallback_rows()?;

        Ok(rows
            .iter()
            .map(|row| compute(row))
            .filter(|value| !value.is_null())
            .max())
    }

    /// Materialize the real relation for this parent. The proxy never
    /// substitutes for actual rows; enumeration always takes this path.
    pub fn records(&self) -> Result<Vec<Row>, Error> {
        self.fallback_rows()
    }

    // ------------------------------------------------------------------
    // Deferred variants
    // ------------------------------------------------------------------

    pub fn async_count(&self) -> Deferred<u64>
    where
        S: Send + Sync + 'static,
        C: Send + Sync + 'static,
    {
        let proxy = self.clone();

        Deferred::new(move || proxy.count())
    }

    pub fn async_sum(&self, column: impl Into<String>) -> Deferred<Value>
    where
        S: Send + Sync + 'static,
        C: Send + Sync + 'static,
    {
        let proxy = self.clone();
        let column = column.into();

        Deferred::new(move || proxy.sum(column.clone()))
    }

    pub fn async_average(&self, column: impl Into<String>) -> Deferred<Option<Value>>
    where
        S: Send + Sync + 'static,
        C: Send + Sync + 'static,
    {
        let proxy = self.clone();
        let column = column.into();

        Deferred::new(move || proxy.average(column.clone()))
    }

    pub fn async_minimum(&self, column: impl Into<String>) -> Deferred<Option<Value>>
    where
        S: Send + Sync + 'static,
        C: Send + Sync + 'static,
    {
        let proxy = self.clone();
        let column = column.into();

        Deferred::new(move || proxy.minimum(column.clone()))
    }

    pub fn async_maximum(&self, column: impl Into<String>) -> Deferred<Option<Value>>
    where
        S: Send + Sync + 'static,
        C: Send + Sync + 'static,
    {
        let proxy = self.clone();
        let column = column.into();

        Deferred::new(move || proxy.maximum(column.clone()))
    }

    pub fn async_exists(&self) -> Deferred<bool>
    where
        S: Send + Sync + 'static,
        C: Send + Sync + 'static,
    {
        let proxy = self.clone();

        Deferred::new(move || proxy.exists())
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    fn aggregate(
        &self,
        function: AggregateFunction,
        column: AggregateColumn,
    ) -> Result<Option<Value>, Error> {
        let path = resolve(&self.core.catalog, &self.source, &self.relation)?;
        let descriptor = AggregateDescriptor::new(
            self.source.clone(),
            self.relation.clone(),
            self.chain.clone(),
            function,
            column.clone(),
        );

        let (mapping, outcome) = self.core.cache.get_or_compute(&descriptor, || {
            BatchQueryExecutor::execute(
                &self.core.store,
                self.core.batch.ids(),
                &path,
                &self.chain,
                function,
                &column,
            )
        })?;
        self.core.metrics.record_cache_outcome(outcome);

        Ok(mapping.value_for(function, &self.parent_id))
    }

    fn fallback_rows(&self) -> Result<Vec<Row>, Error> {
        self.core.metrics.record_fallback();

        let path = resolve(&self.core.catalog, &self.source, &self.relation)?;

        let scope = self.core.store.base_scope(&path.target)?;
        let scope = path.scope.materialize(&self.core.store, scope)?;
        let scope = self.chain.materialize(&self.core.store, scope)?;

        let plan = ParentScopePlan {
            join: path.join.as_ref(),
            group_column: &path.group_column,
            parent_id: &self.parent_id,
            distinct: path.requires_distinct,
        };

        Ok(self.core.store.materialize(scope, &plan)?)
    }
}

impl<S, C> Clone for AggregateProxy<S, C> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            source: self.source.clone(),
            parent_id: self.parent_id.clone(),
            relation: self.relation.clone(),
            chain: self.chain.clone(),
        }
    }
}

impl<S, C> fmt::Debug for AggregateProxy<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateProxy")
            .field("source", &self.source)
            .field("parent_id", &self.parent_id)
            .field("relation", &self.relation)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}
