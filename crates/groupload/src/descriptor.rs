use crate::{filter::FilterChain, value::Value};
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// AggregateFunction
///
/// Aggregate terminal selector. `from_name` is the static dispatch table the
/// proxy uses to classify incoming calls: a known aggregate name dispatches,
/// anything else extends the filter chain.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum AggregateFunction {
    Count,
    Sum,
    Average,
    Minimum,
    Maximum,
    Exists,
}

impl AggregateFunction {
    /// All terminal kinds, in dispatch-table order.
    pub const ALL: [Self; 6] = [
        Self::Count,
        Self::Sum,
        Self::Average,
        Self::Minimum,
        Self::Maximum,
        Self::Exists,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Average => "average",
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
            Self::Exists => "exists",
        }
    }

    /// Static classification table: operation name → terminal kind.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Return whether this terminal requires a concrete column to aggregate.
    #[must_use]
    pub const fn requires_column(self) -> bool {
        matches!(self, Self::Sum | Self::Average | Self::Minimum | Self::Maximum)
    }

    /// Canonical value for a parent absent from a result mapping.
    ///
    /// `None` means "no value" rather than a zero: a parent with no matching
    /// rows has no average, minimum, or maximum.
    #[must_use]
    pub const fn absent_value(self) -> Option<Value> {
        match self {
            Self::Count => Some(Value::Uint(0)),
            Self::Sum => Some(Value::Int(0)),
            Self::Exists => Some(Value::Bool(false)),
            Self::Average | Self::Minimum | Self::Maximum => None,
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

///
/// AggregateColumn
///
/// Column target of an aggregate terminal. `Wildcard` is the `*` sentinel:
/// the executor rewrites it to the target's primary key for deduplicated
/// counts and otherwise passes it through to the store unmodified.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum AggregateColumn {
    #[default]
    Wildcard,
    Field(String),
}

impl AggregateColumn {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    #[must_use]
    pub const fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard)
    }

    #[must_use]
    pub fn as_field(&self) -> Option<&str> {
        match self {
            Self::Wildcard => None,
            Self::Field(name) => Some(name),
        }
    }
}

impl fmt::Display for AggregateColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard => write!(f, "*"),
            Self::Field(name) => write!(f, "{name}"),
        }
    }
}

///
/// AggregateDescriptor
///
/// Canonical identity of one pending aggregation: relation path + filter
/// chain + function + column. Used verbatim as the result-cache key; two
/// descriptors are equal iff every component is equal. The chain keeps its
/// recorded order; no canonicalization happens here.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct AggregateDescriptor {
    source: String,
    relation: String,
    chain: FilterChain,
    function: AggregateFunction,
    column: AggregateColumn,
}

impl AggregateDescriptor {
    pub fn new(
        source: impl Into<String>,
        relation: impl Into<String>,
        chain: FilterChain,
        function: AggregateFunction,
        column: AggregateColumn,
    ) -> Self {
        Self {
            source: source.into(),
            relation: relation.into(),
            chain,
            function,
            column,
        }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn relation(&self) -> &str {
        &self.relation
    }

    #[must_use]
    pub const fn chain(&self) -> &FilterChain {
        &self.chain
    }

    #[must_use]
    pub const fn function(&self) -> AggregateFunction {
        self.function
    }

    #[must_use]
    pub const fn column(&self) -> &AggregateColumn {
        &self.column
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterOp;

    #[test]
    fn dispatch_table_round_trips_every_terminal() {
        for kind in AggregateFunction::ALL {
            assert_eq!(AggregateFunction::from_name(kind.name()), Some(kind));
        }
        assert_eq!(AggregateFunction::from_name("where_eq"), None);
    }

    #[test]
    fn descriptors_differ_on_any_component() {
        let chain = FilterChain::new().append(FilterOp::new("where_eq", [Value::Int(1)]));
        let base = AggregateDescriptor::new(
            "authors",
            "posts",
            chain.clone(),
            AggregateFunction::Count,
            AggregateColumn::Wildcard,
        );

        let other_function = AggregateDescriptor::new(
            "authors",
            "posts",
            chain.clone(),
            AggregateFunction::Exists,
            AggregateColumn::Wildcard,
        );
        let other_column = AggregateDescriptor::new(
            "authors",
            "posts",
            chain,
            AggregateFunction::Count,
            AggregateColumn::field("id"),
        );

        assert_ne!(base, other_function);
        assert_ne!(base, other_column);
    }

    #[test]
    fn absent_values_follow_the_per_function_policy() {
        assert_eq!(
            AggregateFunction::Count.absent_value(),
            Some(Value::Uint(0))
        );
        assert_eq!(AggregateFunction::Sum.absent_value(), Some(Value::Int(0)));
        assert_eq!(
            AggregateFunction::Exists.absent_value(),
            Some(Value::Bool(false))
        );
        assert_eq!(AggregateFunction::Average.absent_value(), None);
        assert_eq!(AggregateFunction::Minimum.absent_value(), None);
        assert_eq!(AggregateFunction::Maximum.absent_value(), None);
    }
}
