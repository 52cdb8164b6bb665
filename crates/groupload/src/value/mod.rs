#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
};

///
/// Value
///
/// Canonical scalar vocabulary shared by parent identifiers, filter
/// arguments, grouping keys, and aggregate results.
///
/// Equality, ordering, and hashing are all defined by [`Self::canonical_cmp`]
/// so a value can serve as a grouping key or cache-key component without a
/// separate canonical form.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Cross-family rank: null < bool < numeric < text.
    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Uint(_) | Self::Float(_) => 2,
            Self::Text(_) => 3,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Return the numeric payload widened to `f64`, if this value is numeric.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Uint(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Null | Self::Bool(_) | Self::Text(_) => None,
        }
    }

    /// Interpret this value as a non-negative row count.
    #[must_use]
    pub const fn as_count(&self) -> Option<u64> {
        match self {
            Self::Uint(v) => Some(*v),
            Self::Int(v) if *v >= 0 => Some(*v as u64),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Canonical total order across families.
    ///
    /// Families order by rank; integers compare exactly; once a float is
    /// involved the comparison happens in the `f64` domain via `total_cmp`.
    #[must_use]
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        let rank = self.rank().cmp(&other.rank());
        if rank != Ordering::Equal {
            return rank;
        }

        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (a, b) => Self::numeric_cmp(a, b),
        }
    }

    // Both operands are numeric here; rank equality is checked by the caller.
    fn numeric_cmp(a: &Self, b: &Self) -> Ordering {
        match (a, b) {
            (Self::Int(x), Self::Int(y)) => x.cmp(y),
            (Self::Uint(x), Self::Uint(y)) => x.cmp(y),
            (Self::Int(x), Self::Uint(y)) => i128::from(*x).cmp(&i128::from(*y)),
            (Self::Uint(x), Self::Int(y)) => i128::from(*x).cmp(&i128::from(*y)),
            (x, y) => {
                let x = normalize_zero(x.as_f64().unwrap_or(f64::NAN));
                let y = normalize_zero(y.as_f64().unwrap_or(f64::NAN));
                x.total_cmp(&y)
            }
        }
    }

    /// Add two numeric values, preserving integer exactness where possible.
    ///
    /// Integer sums stay integral (widened through `i128`, spilling into
    /// `Float` only past the 64-bit range); float operands promote the sum to
    /// `Float`. Non-numeric operands yield `None`.
    #[must_use]
    pub fn numeric_add(&self, other: &Self) -> Option<Self> {
        match (self.integral(), other.integral()) {
            (Some(x), Some(y)) => {
                let sum = x + y;
                Some(match (i64::try_from(sum), u64::try_from(sum)) {
                    (Ok(sum), _) => Self::Int(sum),
                    (_, Ok(sum)) => Self::Uint(sum),
                    _ => Self::Float(sum as f64),
                })
            }
            _ => Some(Self::Float(self.as_f64()? + other.as_f64()?)),
        }
    }

    const fn integral(&self) -> Option<i128> {
        match self {
            Self::Int(v) => Some(*v as i128),
            Self::Uint(v) => Some(*v as i128),
            _ => None,
        }
    }

    // Canonical f64 bit pattern used for numeric hashing: collapses every NaN
    // payload into one pattern so Eq and Hash agree.
    fn numeric_hash_bits(&self) -> u64 {
        let v = normalize_zero(self.as_f64().unwrap_or(f64::NAN));
        if v.is_nan() {
            f64::NAN.to_bits()
        } else {
            v.to_bits()
        }
    }
}

// Collapse -0.0 into 0.0 so comparison and hashing treat the zeros as one.
fn normalize_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical_cmp(other)
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Null => {}
            Self::Bool(v) => v.hash(state),
            Self::Int(_) | Self::Uint(_) | Self::Float(_) => {
                self.numeric_hash_bits().hash(state);
            }
            Self::Text(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Uint(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Uint(u64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}
