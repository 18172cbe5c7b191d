//! Property-based testing strategies for docexpr expressions.
//!
//! Every generated string is a valid expression. Scalar and enumerable
//! strategies are kept apart so operators only ever receive operands of the
//! cardinality they accept.

use proptest::prelude::*;

const RESERVED: &[&str] = &[
    "and", "or", "like", "in", "between", "any", "all", "true", "false", "null",
];

/// Field names that never collide with keywords.
pub fn arb_field() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,6}".prop_filter("Avoid reserved words", |s| !RESERVED.contains(&s.as_str()))
}

pub fn arb_literal() -> impl Strategy<Value = String> {
    prop_oneof![
        (-1000i32..1000).prop_map(|n| n.to_string()),
        (0i32..10_000).prop_map(|n| format!("{}.{}", n / 10, n % 10)),
        "[a-z ]{0,6}".prop_map(|s| format!("'{}'", s)),
        any::<bool>().prop_map(|b| b.to_string()),
        Just("null".to_string()),
    ]
}

/// `$.a.b`, `$.a[0]` or a bare field.
pub fn arb_scalar_path() -> impl Strategy<Value = String> {
    (prop::collection::vec(arb_field(), 1..3), prop::option::of(-3i32..3), any::<bool>()).prop_map(
        |(fields, index, bare)| {
            let path = if bare {
                fields.join(".")
            } else {
                format!("$.{}", fields.join("."))
            };

            match index {
                Some(index) => format!("{}[{}]", path, index),
                None => path,
            }
        },
    )
}

/// `$.a[*]` or `$.a[@ > n]`.
pub fn arb_enumerable_path() -> impl Strategy<Value = String> {
    (arb_field(), prop::option::of(0i32..50)).prop_map(|(field, bound)| match bound {
        Some(bound) => format!("$.{}[@ > {}]", field, bound),
        None => format!("$.{}[*]", field),
    })
}

pub fn arb_scalar_expr() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![arb_literal(), arb_scalar_path(), arb_field().prop_map(|p| format!("@{}", p))];

    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            (
                inner.clone(),
                prop::sample::select(vec!["+", "-", "*", "/", "%", "=", "!=", ">", ">=", "<", "<=", "AND", "OR", "LIKE"]),
                inner.clone()
            )
                .prop_map(|(l, op, r)| format!("{} {} {}", l, op, r)),
            inner.clone().prop_map(|e| format!("({})", e)),
            (inner.clone(), inner.clone(), inner.clone())
                .prop_map(|(a, b, c)| format!("{} BETWEEN ({}) AND ({})", a, b, c)),
            (
                prop::sample::select(vec!["UPPER", "LOWER", "LENGTH", "STRING", "IS_NULL", "TRIM"]),
                inner.clone()
            )
                .prop_map(|(f, e)| format!("{}({})", f, e)),
            (
                prop::sample::select(vec!["COUNT", "SUM", "MIN", "MAX", "FIRST", "ANY"]),
                arb_enumerable_path()
            )
                .prop_map(|(f, e)| format!("{}({})", f, e)),
            (arb_enumerable_path(), prop::sample::select(vec!["ANY", "ALL"]), inner.clone())
                .prop_map(|(l, q, r)| format!("({} {} = {})", l, q, r)),
            (inner.clone(), inner.clone(), inner.clone()).prop_map(|(a, b, c)| format!("IIF({}, {}, {})", a, b, c)),
            prop::collection::vec((arb_field(), inner.clone()), 1..3).prop_map(|entries| {
                let body = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{ {} }}", body)
            }),
            prop::collection::vec(inner.clone(), 0..3).prop_map(|items| format!("[{}]", items.join(", "))),
            (inner.clone(), inner).prop_map(|(a, b)| format!("COALESCE({}, {})", a, b)),
        ]
    })
}

pub fn arb_enumerable_expr() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_enumerable_path(),
        (arb_enumerable_path(), arb_scalar_expr()).prop_map(|(s, e)| format!("MAP({} => {})", s, e)),
        (arb_enumerable_path(), arb_scalar_expr()).prop_map(|(s, e)| format!("FILTER({} => {})", s, e)),
        arb_scalar_path().prop_map(|p| format!("ITEMS({})", p)),
    ]
}

/// Integer arithmetic with its expected value; divisors are never zero.
pub fn arb_arithmetic_expr() -> impl Strategy<Value = (String, i64)> {
    (-100i32..100, -100i32..100, 1i32..20, prop::sample::select(vec!["+", "-", "*"])).prop_map(|(a, b, c, op)| {
        let (a, b, c) = (a as i64, b as i64, c as i64);
        let expected = match op {
            "+" => a + b * c,
            "-" => a - b * c,
            "*" => a * b * c,
            _ => unreachable!(),
        };
        let code = match op {
            "*" => format!("{} * {} * {}", a, b, c),
            _ => format!("{} {} {} * {}", a, op, b, c),
        };
        (code, expected)
    })
}
