//! Evaluation primitives shared by both backends.
use chrono::Duration;
use regex_lite::Regex;
use smol_str::SmolStr;

use super::{
    builtin::{Builtin, CallResult, pack},
    context::EvalContext,
    error::EvalError,
};
use crate::{
    ast::{
        node::PathRoot,
        operator::{BinaryOp, Quantifier},
    },
    value::{Collation, Decimal, Document, Value},
};

/// Resolves the binding a path starts from.
///
/// `field` is only used to name the path in the error.
pub fn path_root<'a>(ctx: &EvalContext<'a>, root: PathRoot, field: &str) -> Result<&'a Value, EvalError> {
    let binding = match root {
        PathRoot::Root => ctx.root,
        PathRoot::Current => ctx.current,
    };

    binding.ok_or_else(|| EvalError::NoRootDocument(field.into()))
}

/// Field access. Missing fields and non-documents read as null.
#[inline]
pub fn member(value: &Value, name: &str) -> Value {
    match value {
        _ if name.is_empty() => value.clone(),
        Value::Document(doc) => doc.get(name).cloned().unwrap_or_default(),
        _ => Value::Null,
    }
}

/// Fixed index access; negative indexes count from the end.
pub fn array_index(value: &Value, index: i64) -> Value {
    match value {
        Value::Array(array) => {
            let index = if index < 0 { array.len() as i64 + index } else { index };
            usize::try_from(index)
                .ok()
                .and_then(|index| array.get(index))
                .cloned()
                .unwrap_or_default()
        }
        _ => Value::Null,
    }
}

/// Index access with an index computed at evaluation time.
pub fn array_index_by(value: &Value, index: &Value, source: &str) -> Result<Value, EvalError> {
    match index {
        Value::Int32(_) | Value::Int64(_) => Ok(array_index(value, index.as_i64().unwrap_or_default())),
        Value::Double(n) if n.fract() == 0.0 => Ok(array_index(value, *n as i64)),
        _ => Err(EvalError::IndexNotNumber(source.to_string())),
    }
}

/// Elements visited by `[*]` and `[predicate]`: an array's items, nothing otherwise.
pub fn elements(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(array) => array.iter().cloned().collect(),
        _ => Vec::new(),
    }
}

/// `ITEMS` coercion: arrays and binaries are spread, any other value is a
/// one-element sequence.
pub fn items(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(array) => array.iter().cloned().collect(),
        Value::Binary(bytes) => bytes.iter().map(|b| Value::Int32(*b as i32)).collect(),
        value => vec![value.clone()],
    }
}

/// Builds a document literal. A lone sigil key yields a typed value instead.
pub fn document_init(entries: Vec<(SmolStr, Value)>) -> Value {
    if let [(key, payload)] = entries.as_slice() {
        if key.starts_with('$') {
            let payload = match payload {
                Value::String(s) => Some(s.to_string()),
                value if value.is_number() => Some(value.to_string()),
                _ => None,
            };

            if let Some(value) = payload.and_then(|payload| Value::from_sigil(key, &payload)) {
                return value;
            }
        }
    }

    Value::Document(entries.into_iter().collect::<Document>())
}

/// Invokes a builtin with already evaluated arguments.
///
/// Enumerable arguments must already be packed with [`pack`].
#[inline]
pub fn call(function: &Builtin, collation: &Collation, args: &[Value]) -> Result<CallResult, EvalError> {
    function.call(collation, args)
}

/// Materializes an enumerable argument.
pub fn collect_values(values: impl Iterator<Item = Result<Value, EvalError>>) -> Result<Value, EvalError> {
    values.collect::<Result<Vec<_>, _>>().map(pack)
}

pub fn binary(op: BinaryOp, left: &Value, right: &Value, collation: &Collation) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Modulo | BinaryOp::Divide | BinaryOp::Multiply | BinaryOp::Add | BinaryOp::Subtract => {
            arithmetic(op, left, right)
        }
        _ => compare(op, left, right, collation).map(Value::Boolean),
    }
}

/// Applies `op` element-wise over `left` and reduces with the quantifier.
///
/// ANY stops at the first match and ALL at the first mismatch.
pub fn quantified(
    op: BinaryOp,
    quantifier: Quantifier,
    left: impl IntoIterator<Item = Result<Value, EvalError>>,
    right: &Value,
    collation: &Collation,
) -> Result<Value, EvalError> {
    quantified_by(quantifier, left, |value| {
        binary(op, value, right, collation).map(|matched| matched.is_truthy())
    })
}

/// Applies `matches` element by element and stops at the first element that
/// decides the result. Later elements are never pulled.
pub fn quantified_by(
    quantifier: Quantifier,
    left: impl IntoIterator<Item = Result<Value, EvalError>>,
    matches: impl Fn(&Value) -> Result<bool, EvalError>,
) -> Result<Value, EvalError> {
    for value in left {
        let matched = matches(&value?)?;
        match (quantifier, matched) {
            (Quantifier::Any, true) => return Ok(Value::Boolean(true)),
            (Quantifier::All, false) => return Ok(Value::Boolean(false)),
            _ => {}
        }
    }

    Ok(Value::Boolean(quantifier == Quantifier::All))
}

pub fn compare(op: BinaryOp, left: &Value, right: &Value, collation: &Collation) -> Result<bool, EvalError> {
    let result = match op {
        BinaryOp::Equal => left.equals(right, collation),
        BinaryOp::NotEqual => !left.equals(right, collation),
        BinaryOp::GreaterThan => left.compare(right, collation).is_gt(),
        BinaryOp::GreaterThanOrEqual => left.compare(right, collation).is_ge(),
        BinaryOp::LessThan => left.compare(right, collation).is_lt(),
        BinaryOp::LessThanOrEqual => left.compare(right, collation).is_le(),
        BinaryOp::Like => match (left, right) {
            (Value::String(s), Value::String(pattern)) => like(s, pattern, collation),
            _ => false,
        },
        BinaryOp::Between => match right {
            Value::Array(range) if range.len() == 2 => {
                let (start, end) = (&range.as_slice()[0], &range.as_slice()[1]);
                left.compare(start, collation).is_ge() && left.compare(end, collation).is_le()
            }
            _ => return Err(EvalError::invalid_types(op.name(), &[left.clone(), right.clone()])),
        },
        BinaryOp::In => match right {
            Value::Array(values) => values.iter().any(|value| left.equals(value, collation)),
            value => left.equals(value, collation),
        },
        _ => return Err(EvalError::invalid_types(op.name(), &[left.clone(), right.clone()])),
    };

    Ok(result)
}

/// SQL `LIKE`: `%` matches any run, `_` any single character.
///
/// The pattern is compiled on every call. Constant patterns go through
/// [`LikePattern`] instead.
pub fn like(s: &str, pattern: &str, collation: &Collation) -> bool {
    like_regex(pattern, collation.is_ignore_case()).is_some_and(|re| re.is_match(s))
}

/// A `LIKE` pattern compiled once, for both collations.
#[derive(Debug, Clone)]
pub struct LikePattern {
    binary: Option<Regex>,
    ignore_case: Option<Regex>,
}

impl LikePattern {
    pub fn new(pattern: &str) -> Self {
        Self {
            binary: like_regex(pattern, false),
            ignore_case: like_regex(pattern, true),
        }
    }

    /// Non-string operands never match.
    pub fn matches(&self, value: &Value, collation: &Collation) -> bool {
        let re = if collation.is_ignore_case() {
            &self.ignore_case
        } else {
            &self.binary
        };

        match (value, re) {
            (Value::String(s), Some(re)) => re.is_match(s),
            _ => false,
        }
    }
}

fn like_regex(pattern: &str, ignore_case: bool) -> Option<Regex> {
    let body = pattern
        .chars()
        .map(|c| match c {
            '%' => ".*".to_string(),
            '_' => ".".to_string(),
            c => regex_lite::escape(&c.to_string()),
        })
        .collect::<String>();
    let flags = if ignore_case { "(?is)" } else { "(?s)" };

    Regex::new(&format!("{}^{}$", flags, body)).ok()
}

/// Arithmetic with Int32 → Int64 → Double promotion.
///
/// `+` also concatenates strings and shifts dates by milliseconds. Any other
/// operand combination yields null.
pub fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (op, left, right) {
        (BinaryOp::Add, Value::String(a), b) => Ok(Value::String(format!("{}{}", a, concat_text(b)).into())),
        (BinaryOp::Add, a, Value::String(b)) => Ok(Value::String(format!("{}{}", concat_text(a), b).into())),
        (BinaryOp::Add, Value::DateTime(date), n) | (BinaryOp::Add, n, Value::DateTime(date)) if n.is_number() => {
            Ok(shift_date(date, n.as_i64().unwrap_or_default()))
        }
        (BinaryOp::Subtract, Value::DateTime(date), n) if n.is_number() => {
            Ok(shift_date(date, n.as_i64().unwrap_or_default().saturating_neg()))
        }
        (_, a, b) if a.is_number() && b.is_number() => numeric(op, a, b),
        _ => Ok(Value::Null),
    }
}

fn concat_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        value => value.to_string(),
    }
}

fn shift_date(date: &chrono::DateTime<chrono::Utc>, millis: i64) -> Value {
    Duration::try_milliseconds(millis)
        .and_then(|delta| date.checked_add_signed(delta))
        .map(Value::DateTime)
        .unwrap_or(Value::Null)
}

fn numeric(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Int32(a), Value::Int32(b)) => match int32(op, *a, *b)? {
            Some(n) => Ok(Value::Int32(n)),
            None => int64(op, *a as i64, *b as i64),
        },
        (Value::Int32(_) | Value::Int64(_), Value::Int32(_) | Value::Int64(_)) => int64(
            op,
            left.as_i64().unwrap_or_default(),
            right.as_i64().unwrap_or_default(),
        ),
        (Value::Decimal(_), b) | (b, Value::Decimal(_)) if !matches!(b, Value::Double(_)) => {
            let n = float(op, left.as_f64().unwrap_or_default(), right.as_f64().unwrap_or_default());
            Ok(Decimal::parse(&n.to_string()).map(Value::Decimal).unwrap_or(Value::Null))
        }
        _ => Ok(Value::Double(float(
            op,
            left.as_f64().unwrap_or_default(),
            right.as_f64().unwrap_or_default(),
        ))),
    }
}

/// `None` on overflow.
fn int32(op: BinaryOp, a: i32, b: i32) -> Result<Option<i32>, EvalError> {
    match op {
        BinaryOp::Add => Ok(a.checked_add(b)),
        BinaryOp::Subtract => Ok(a.checked_sub(b)),
        BinaryOp::Multiply => Ok(a.checked_mul(b)),
        BinaryOp::Divide if b == 0 => Err(EvalError::ZeroDivision),
        BinaryOp::Divide => Ok(a.checked_div(b)),
        BinaryOp::Modulo if b == 0 => Err(EvalError::ZeroDivision),
        BinaryOp::Modulo => Ok(a.checked_rem(b)),
        _ => Ok(None),
    }
}

fn int64(op: BinaryOp, a: i64, b: i64) -> Result<Value, EvalError> {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Subtract => a.checked_sub(b),
        BinaryOp::Multiply => a.checked_mul(b),
        BinaryOp::Divide if b == 0 => return Err(EvalError::ZeroDivision),
        BinaryOp::Divide => a.checked_div(b),
        BinaryOp::Modulo if b == 0 => return Err(EvalError::ZeroDivision),
        BinaryOp::Modulo => a.checked_rem(b),
        _ => return Ok(Value::Null),
    };

    Ok(result
        .map(Value::Int64)
        .unwrap_or_else(|| Value::Double(float(op, a as f64, b as f64))))
}

fn float(op: BinaryOp, a: f64, b: f64) -> f64 {
    match op {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Divide => a / b,
        BinaryOp::Modulo => a % b,
        _ => f64::NAN,
    }
}
