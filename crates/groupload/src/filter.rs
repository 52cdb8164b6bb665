use crate::{
    store::{RelationStore, StoreError},
    value::Value,
};
use derive_more::{Deref, IntoIterator};
use serde::{Deserialize, Serialize};

/// Conventional operation names recorded by the proxy's refinement helpers.
///
/// The engine itself never interprets these (they are replayed opaquely onto
/// store scopes), but hosts implementing `RelationStore::apply` will want to
/// recognize the same vocabulary the built-in builders emit.
pub mod ops {
    pub const WHERE_EQ: &str = "where_eq";
    pub const WHERE_NE: &str = "where_ne";
    pub const WHERE_GT: &str = "where_gt";
    pub const WHERE_LT: &str = "where_lt";
    pub const WHERE_IN: &str = "where_in";
    pub const ORDER_BY: &str = "order_by";
    pub const ORDER_BY_DESC: &str = "order_by_desc";
}

///
/// FilterOp
///
/// One recorded (operation, arguments) pair. Operations are opaque to the
/// engine: they are replayed verbatim onto a store scope at materialization
/// time and participate verbatim in cache-key identity.
///
/// Chain elements never carry closures; per-row computation blocks exist only
/// as call-site terminals on the proxy and always take the fallback path.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct FilterOp {
    operation: String,
    args: Vec<Value>,
}

impl FilterOp {
    pub fn new(operation: impl Into<String>, args: impl IntoIterator<Item = Value>) -> Self {
        Self {
            operation: operation.into(),
            args: args.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

///
/// FilterChain
///
/// Ordered, immutable sequence of filter operations. Extension always
/// produces a new chain; two chains are equal iff every element's operation
/// and arguments are equal, in order. No implicit reordering or
/// canonicalization: the same operations in a different order are a
/// different chain (and therefore a different cache key).
///

#[derive(
    Clone, Debug, Default, Deref, Deserialize, Eq, Hash, IntoIterator, PartialEq, Serialize,
)]
pub struct FilterChain(#[into_iterator(owned, ref)] Vec<FilterOp>);

impl FilterChain {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_ops(ops: impl IntoIterator<Item = FilterOp>) -> Self {
        Self(ops.into_iter().collect())
    }

    /// Produce a new chain with `op` appended. Pure; `self` is untouched.
    #[must_use]
    pub fn append(&self, op: FilterOp) -> Self {
        let mut ops = self.0.clone();
        ops.push(op);

        Self(ops)
    }

    /// Replay every stored operation against `base`, in order.
    ///
    /// Used only when a query actually executes or the fallback path
    /// materializes the real relation. Store rejections propagate unchanged.
    pub fn materialize<S>(&self, store: &S, base: S::Scope) -> Result<S::Scope, StoreError>
    where
        S: RelationStore + ?Sized,
    {
        let mut scope = base;
        for op in &self.0 {
            scope = store.apply(scope, op)?;
        }

        Ok(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(operation: &str, arg: i64) -> FilterOp {
        FilterOp::new(operation, [Value::Int(arg)])
    }

    #[test]
    fn append_leaves_the_original_chain_untouched() {
        let base = FilterChain::new().append(op("where_gt", 1));
        let extended = base.append(op("where_lt", 9));

        assert_eq!(base.len(), 1);
        assert_eq!(extended.len(), 2);
        assert_eq!(extended[0], base[0]);
    }

    #[test]
    fn chains_with_reordered_ops_are_distinct() {
        let ab = FilterChain::new().append(op("a", 1)).append(op("b", 2));
        let ba = FilterChain::new().append(op("b", 2)).append(op("a", 1));

        assert_ne!(ab, ba);
    }

    #[test]
    fn chains_with_identical_ops_are_equal() {
        let left = FilterChain::new().append(op("a", 1)).append(op("b", 2));
        let right = FilterChain::from_ops([op("a", 1), op("b", 2)]);

        assert_eq!(left, right);
    }
}
