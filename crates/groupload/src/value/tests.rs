use crate::value::Value;
use proptest::prelude::*;
use std::{
    cmp::Ordering,
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

fn hash_of(value: &Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[test]
fn families_order_by_rank() {
    let ordered = [
        Value::Null,
        Value::Bool(false),
        Value::Int(-3),
        Value::Text("a".to_string()),
    ];

    for window in ordered.windows(2) {
        assert_eq!(
            window[0].canonical_cmp(&window[1]),
            Ordering::Less,
            "expected {:?} < {:?}",
            window[0],
            window[1]
        );
    }
}

#[test]
fn integer_families_compare_exactly() {
    assert_eq!(Value::Int(7), Value::Uint(7));
    assert_eq!(Value::Uint(7), Value::Int(7));
    assert!(Value::Int(-1) < Value::Uint(0));
    assert!(Value::Uint(u64::MAX) > Value::Int(i64::MAX));
}

#[test]
fn float_and_integer_compare_in_f64_domain() {
    assert_eq!(Value::Float(3.0), Value::Int(3));
    assert!(Value::Float(2.5) < Value::Int(3));
    assert!(Value::Float(f64::NAN) > Value::Float(f64::INFINITY));
}

#[test]
fn equal_numerics_hash_identically() {
    let same = [Value::Int(5), Value::Uint(5), Value::Float(5.0)];
    let expected = hash_of(&same[0]);

    for value in &same {
        assert_eq!(hash_of(value), expected, "hash mismatch for {value:?}");
    }
}

#[test]
fn negative_zero_hashes_like_zero() {
    assert_eq!(Value::Float(-0.0), Value::Float(0.0));
    assert_eq!(hash_of(&Value::Float(-0.0)), hash_of(&Value::Float(0.0)));
}

#[test]
fn numeric_add_keeps_integer_exactness() {
    let sum = Value::Int(40)
        .numeric_add(&Value::Uint(2))
        .expect("integer add should produce a value");
    assert_eq!(sum, Value::Int(42));

    let promoted = Value::Int(1)
        .numeric_add(&Value::Float(0.5))
        .expect("mixed add should produce a value");
    assert_eq!(promoted, Value::Float(1.5));
}

#[test]
fn numeric_add_rejects_non_numeric_operands() {
    assert!(Value::Text("a".to_string()).numeric_add(&Value::Int(1)).is_none());
    assert!(Value::Int(1).numeric_add(&Value::Null).is_none());
}

#[test]
fn count_accessor_accepts_non_negative_integers_only() {
    assert_eq!(Value::Uint(9).as_count(), Some(9));
    assert_eq!(Value::Int(9).as_count(), Some(9));
    assert_eq!(Value::Int(-9).as_count(), None);
    assert_eq!(Value::Float(9.0).as_count(), None);
}

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<u64>().prop_map(Value::Uint),
        any::<f64>().prop_map(Value::Float),
        "[a-z]{0,8}".prop_map(Value::Text),
    ]
}

proptest! {
    #[test]
    fn canonical_cmp_is_antisymmetric(a in arb_value(), b in arb_value()) {
        prop_assert_eq!(a.canonical_cmp(&b), b.canonical_cmp(&a).reverse());
    }

    #[test]
    fn equal_values_always_hash_equal(a in arb_value(), b in arb_value()) {
        if a == b {
            prop_assert_eq!(hash_of(&a), hash_of(&b));
        }
    }

    #[test]
    fn canonical_cmp_is_reflexive(a in arb_value()) {
        prop_assert_eq!(a.canonical_cmp(&a), Ordering::Equal);
    }
}
