use std::sync::LazyLock;

use base64::prelude::*;
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Timelike, Utc};
use itertools::Itertools;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use smol_str::SmolStr;
use uuid::Uuid;

use super::{error::EvalError, ops};
use crate::{
    ast::operator::BinaryOp,
    value::{Array, Collation, Decimal, ObjectId, Value, parse_datetime},
};

/// How an argument is bound to a parameter.
///
/// Enumerable arguments are materialized into a single `Value::Array` before
/// the implementation is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Scalar,
    Enumerable,
}

pub type ScalarFn = fn(&Collation, &[Value]) -> Result<Value, EvalError>;
pub type EnumerableFn = fn(&Collation, &[Value]) -> Result<Vec<Value>, EvalError>;

#[derive(Debug, Clone, Copy)]
pub enum Implementation {
    Scalar(ScalarFn),
    Enumerable(EnumerableFn),
}

#[derive(Debug, Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub params: &'static [ParamKind],
    pub implementation: Implementation,
    /// Result differs between calls with the same arguments.
    pub volatile: bool,
}

impl Builtin {
    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    #[inline]
    pub fn is_scalar(&self) -> bool {
        matches!(self.implementation, Implementation::Scalar(_))
    }

    pub fn call(&self, collation: &Collation, args: &[Value]) -> Result<CallResult, EvalError> {
        match self.implementation {
            Implementation::Scalar(f) => f(collation, args).map(CallResult::Scalar),
            Implementation::Enumerable(f) => f(collation, args).map(CallResult::Values),
        }
    }
}

#[derive(Debug, Clone)]
pub enum CallResult {
    Scalar(Value),
    Values(Vec<Value>),
}

const S: ParamKind = ParamKind::Scalar;
const E: ParamKind = ParamKind::Enumerable;

/// Scalar to enumerable coercion.
pub static ITEMS: Builtin = Builtin {
    name: "ITEMS",
    params: &[S],
    implementation: Implementation::Enumerable(items),
    volatile: false,
};

/// Enumerable to scalar coercion.
pub static ARRAY: Builtin = Builtin {
    name: "ARRAY",
    params: &[E],
    implementation: Implementation::Scalar(array),
    volatile: false,
};

fn items(_: &Collation, args: &[Value]) -> Result<Vec<Value>, EvalError> {
    match args {
        [value] => Ok(ops::items(value)),
        _ => Err(EvalError::invalid_types(ITEMS.name, args)),
    }
}

fn array(_: &Collation, args: &[Value]) -> Result<Value, EvalError> {
    match args {
        [value @ Value::Array(_)] => Ok(value.clone()),
        _ => Err(EvalError::invalid_types(ARRAY.name, args)),
    }
}

fn scalar(name: &'static str, params: &'static [ParamKind], f: ScalarFn) -> Builtin {
    Builtin {
        name,
        params,
        implementation: Implementation::Scalar(f),
        volatile: false,
    }
}

fn enumerable(name: &'static str, params: &'static [ParamKind], f: EnumerableFn) -> Builtin {
    Builtin {
        name,
        params,
        implementation: Implementation::Enumerable(f),
        volatile: false,
    }
}

fn volatile(name: &'static str, f: ScalarFn) -> Builtin {
    Builtin {
        name,
        params: &[],
        implementation: Implementation::Scalar(f),
        volatile: true,
    }
}

/// Looks up a function by case-insensitive name and argument count.
pub fn lookup(name: &str, arity: usize) -> Option<&'static Builtin> {
    BUILTINS
        .get(name.to_ascii_uppercase().as_str())
        .and_then(|overloads| overloads.iter().find(|builtin| builtin.arity() == arity))
}

pub static BUILTINS: LazyLock<FxHashMap<&'static str, SmallVec<[Builtin; 2]>>> = LazyLock::new(|| {
    let mut map: FxHashMap<&'static str, SmallVec<[Builtin; 2]>> = FxHashMap::default();
    let mut register = |builtin: Builtin| map.entry(builtin.name).or_default().push(builtin);

    register(ITEMS);
    register(ARRAY);

    // conversion
    register(scalar("STRING", &[S], |_, args| match args {
        [value @ Value::String(_)] => Ok(value.clone()),
        [value] => Ok(Value::String(value.to_string().into())),
        _ => Err(EvalError::invalid_types("STRING", args)),
    }));
    register(scalar("INT32", &[S], |_, args| match args {
        [value @ Value::Int32(_)] => Ok(value.clone()),
        [Value::String(s)] => Ok(s.trim().parse::<i32>().map(Value::Int32).unwrap_or(Value::Null)),
        [value] if value.is_number() => Ok(value
            .as_f64()
            .filter(|n| n.is_finite() && *n >= i32::MIN as f64 && *n <= i32::MAX as f64)
            .map(|n| Value::Int32(n as i32))
            .unwrap_or(Value::Null)),
        [_] => Ok(Value::Null),
        _ => Err(EvalError::invalid_types("INT32", args)),
    }));
    register(scalar("INT64", &[S], |_, args| match args {
        [Value::Int32(n)] => Ok(Value::Int64(*n as i64)),
        [value @ Value::Int64(_)] => Ok(value.clone()),
        [Value::String(s)] => Ok(s.trim().parse::<i64>().map(Value::Int64).unwrap_or(Value::Null)),
        [value] if value.is_number() => Ok(value
            .as_f64()
            .filter(|n| n.is_finite() && *n >= i64::MIN as f64 && *n <= i64::MAX as f64)
            .map(|n| Value::Int64(n as i64))
            .unwrap_or(Value::Null)),
        [_] => Ok(Value::Null),
        _ => Err(EvalError::invalid_types("INT64", args)),
    }));
    register(scalar("DOUBLE", &[S], |_, args| match args {
        [Value::String(s)] => Ok(s.trim().parse::<f64>().map(Value::Double).unwrap_or(Value::Null)),
        [value] => Ok(value.as_f64().map(Value::Double).unwrap_or(Value::Null)),
        _ => Err(EvalError::invalid_types("DOUBLE", args)),
    }));
    register(scalar("DECIMAL", &[S], |_, args| match args {
        [value @ Value::Decimal(_)] => Ok(value.clone()),
        [Value::String(s)] => Ok(Decimal::parse(s).map(Value::Decimal).unwrap_or(Value::Null)),
        [value] if value.is_number() => Ok(Decimal::parse(&value.to_string())
            .map(Value::Decimal)
            .unwrap_or(Value::Null)),
        [_] => Ok(Value::Null),
        _ => Err(EvalError::invalid_types("DECIMAL", args)),
    }));
    register(scalar("BOOLEAN", &[S], |_, args| match args {
        [value @ Value::Boolean(_)] => Ok(value.clone()),
        [Value::String(s)] if s.trim().eq_ignore_ascii_case("true") => Ok(Value::Boolean(true)),
        [Value::String(s)] if s.trim().eq_ignore_ascii_case("false") => Ok(Value::Boolean(false)),
        [_] => Ok(Value::Null),
        _ => Err(EvalError::invalid_types("BOOLEAN", args)),
    }));
    register(scalar("BINARY", &[S], |_, args| match args {
        [value @ Value::Binary(_)] => Ok(value.clone()),
        [Value::String(s)] => Ok(BASE64_STANDARD
            .decode(s.as_bytes())
            .map(|bytes| Value::Binary(bytes.into()))
            .unwrap_or(Value::Null)),
        [_] => Ok(Value::Null),
        _ => Err(EvalError::invalid_types("BINARY", args)),
    }));
    register(scalar("OBJECTID", &[S], |_, args| match args {
        [value @ Value::ObjectId(_)] => Ok(value.clone()),
        [Value::String(s)] => Ok(s.parse::<ObjectId>().map(Value::ObjectId).unwrap_or(Value::Null)),
        [_] => Ok(Value::Null),
        _ => Err(EvalError::invalid_types("OBJECTID", args)),
    }));
    register(scalar("GUID", &[S], |_, args| match args {
        [value @ Value::Guid(_)] => Ok(value.clone()),
        [Value::String(s)] => Ok(Uuid::parse_str(s).map(Value::Guid).unwrap_or(Value::Null)),
        [_] => Ok(Value::Null),
        _ => Err(EvalError::invalid_types("GUID", args)),
    }));
    register(scalar("DATETIME", &[S], |_, args| match args {
        [value @ Value::DateTime(_)] => Ok(value.clone()),
        [Value::String(s)] => Ok(parse_datetime(s).map(Value::DateTime).unwrap_or(Value::Null)),
        [value @ (Value::Int32(_) | Value::Int64(_))] => Ok(value
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .map(Value::DateTime)
            .unwrap_or(Value::Null)),
        [_] => Ok(Value::Null),
        _ => Err(EvalError::invalid_types("DATETIME", args)),
    }));
    register(scalar("DATETIME", &[S, S, S], |_, args| match args {
        [year, month, day] if year.is_number() && month.is_number() && day.is_number() => {
            Ok(date_from_parts(year, month, day).map(Value::DateTime).unwrap_or(Value::Null))
        }
        _ => Err(EvalError::invalid_types("DATETIME", args)),
    }));
    register(scalar("JSON", &[S], |_, args| match args {
        [Value::String(s)] => Ok(serde_json::from_str::<serde_json::Value>(s)?.into()),
        [Value::Null] => Ok(Value::Null),
        _ => Err(EvalError::invalid_types("JSON", args)),
    }));

    // generators
    register(volatile("NOW", |_, _| Ok(Value::DateTime(Utc::now()))));
    register(volatile("NOW_UTC", |_, _| Ok(Value::DateTime(Utc::now()))));
    register(volatile("TODAY", |_, _| {
        Ok(Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|naive| Value::DateTime(naive.and_utc()))
            .unwrap_or(Value::Null))
    }));
    register(volatile("GUID", |_, _| Ok(Value::Guid(Uuid::new_v4()))));
    register(volatile("OBJECTID", |_, _| Ok(Value::ObjectId(ObjectId::new()))));
    register(scalar("MINVALUE", &[], |_, _| Ok(Value::MinValue)));
    register(scalar("MAXVALUE", &[], |_, _| Ok(Value::MaxValue)));

    // type tests
    register(scalar("IS_NULL", &[S], |_, args| Ok(Value::Boolean(args[0].is_null()))));
    register(scalar("IS_NUMBER", &[S], |_, args| Ok(Value::Boolean(args[0].is_number()))));
    register(scalar("IS_STRING", &[S], |_, args| Ok(Value::Boolean(args[0].is_string()))));
    register(scalar("IS_DOCUMENT", &[S], |_, args| Ok(Value::Boolean(args[0].is_document()))));
    register(scalar("IS_ARRAY", &[S], |_, args| Ok(Value::Boolean(args[0].is_array()))));
    register(scalar("IS_BINARY", &[S], |_, args| {
        Ok(Value::Boolean(matches!(args[0], Value::Binary(_))))
    }));
    register(scalar("IS_BOOLEAN", &[S], |_, args| {
        Ok(Value::Boolean(matches!(args[0], Value::Boolean(_))))
    }));
    register(scalar("IS_DATETIME", &[S], |_, args| {
        Ok(Value::Boolean(matches!(args[0], Value::DateTime(_))))
    }));
    register(scalar("IS_OBJECTID", &[S], |_, args| {
        Ok(Value::Boolean(matches!(args[0], Value::ObjectId(_))))
    }));
    register(scalar("IS_GUID", &[S], |_, args| Ok(Value::Boolean(matches!(args[0], Value::Guid(_))))));

    // aggregates
    register(scalar("COUNT", &[E], |_, args| Ok(Value::Int32(values(args).len() as i32))));
    register(scalar("SUM", &[E], |_, args| sum(values(args))));
    register(scalar("AVG", &[E], |_, args| {
        let numbers = values(args).iter().filter(|v| v.is_number()).cloned().collect_vec();
        if numbers.is_empty() {
            return Ok(Value::Int32(0));
        }

        let total = sum(&numbers)?;
        Ok(total
            .as_f64()
            .map(|total| Value::Double(total / numbers.len() as f64))
            .unwrap_or(Value::Null))
    }));
    register(scalar("MIN", &[E], |collation, args| {
        Ok(values(args)
            .iter()
            .min_by(|a, b| a.compare(b, collation))
            .cloned()
            .unwrap_or(Value::MinValue))
    }));
    register(scalar("MAX", &[E], |collation, args| {
        Ok(values(args)
            .iter()
            .max_by(|a, b| a.compare(b, collation))
            .cloned()
            .unwrap_or(Value::MaxValue))
    }));
    register(scalar("FIRST", &[E], |_, args| {
        Ok(values(args).first().cloned().unwrap_or_default())
    }));
    register(scalar("LAST", &[E], |_, args| Ok(values(args).last().cloned().unwrap_or_default())));
    register(scalar("ANY", &[E], |_, args| Ok(Value::Boolean(!values(args).is_empty()))));

    // misc
    register(scalar("LENGTH", &[S], |_, args| match args {
        [Value::Null] => Ok(Value::Int32(0)),
        [Value::String(s)] => Ok(Value::Int32(s.chars().count() as i32)),
        [Value::Binary(bytes)] => Ok(Value::Int32(bytes.len() as i32)),
        [Value::Array(array)] => Ok(Value::Int32(array.len() as i32)),
        [Value::Document(doc)] => Ok(Value::Int32(doc.len() as i32)),
        [value] => Ok(Value::Int32(value.to_string().chars().count() as i32)),
        _ => Err(EvalError::invalid_types("LENGTH", args)),
    }));
    register(enumerable("KEYS", &[S], |_, args| match args {
        [Value::Document(doc)] => Ok(doc.keys().map(|key| Value::String(key.clone())).collect()),
        _ => Ok(Vec::new()),
    }));
    register(enumerable("VALUES", &[S], |_, args| match args {
        [Value::Document(doc)] => Ok(doc.values().cloned().collect()),
        _ => Ok(Vec::new()),
    }));
    register(scalar("EXTEND", &[S, S], |_, args| match args {
        [Value::Document(source), Value::Document(extend)] => {
            let mut merged = source.clone();
            extend
                .iter()
                .for_each(|(key, value)| merged.insert(key.clone(), value.clone()));
            Ok(Value::Document(merged))
        }
        [value @ Value::Document(_), Value::Null] | [Value::Null, value @ Value::Document(_)] => Ok(value.clone()),
        _ => Err(EvalError::invalid_types("EXTEND", args)),
    }));
    register(scalar("COALESCE", &[S, S], |_, args| match args {
        [Value::Null, fallback] => Ok(fallback.clone()),
        [value, _] => Ok(value.clone()),
        _ => Err(EvalError::invalid_types("COALESCE", args)),
    }));
    register(enumerable("DISTINCT", &[E], |collation, args| {
        Ok(distinct(values(args).iter().cloned(), collation))
    }));
    register(enumerable("UNION", &[E, E], |collation, args| match args {
        [Value::Array(left), Value::Array(right)] => {
            Ok(distinct(left.iter().chain(right.iter()).cloned(), collation))
        }
        _ => Err(EvalError::invalid_types("UNION", args)),
    }));
    register(enumerable("EXCEPT", &[E, E], |collation, args| match args {
        [Value::Array(left), Value::Array(right)] => Ok(distinct(
            left.iter()
                .filter(|value| !right.iter().any(|other| value.equals(other, collation)))
                .cloned(),
            collation,
        )),
        _ => Err(EvalError::invalid_types("EXCEPT", args)),
    }));
    register(enumerable("TOP", &[E, S], |_, args| match args {
        [Value::Array(values), count] if count.is_number() => {
            let count = count.as_i64().unwrap_or_default().max(0) as usize;
            Ok(values.iter().take(count).cloned().collect())
        }
        _ => Err(EvalError::invalid_types("TOP", args)),
    }));
    register(scalar("JOIN", &[E], |_, args| Ok(join(values(args), ""))));
    register(scalar("JOIN", &[E, S], |_, args| match args {
        [Value::Array(values), Value::String(separator)] => Ok(join(values.as_slice(), separator)),
        _ => Err(EvalError::invalid_types("JOIN", args)),
    }));

    // strings
    register(scalar("LOWER", &[S], |_, args| {
        map_string("LOWER", args, |s| s.to_lowercase().into())
    }));
    register(scalar("UPPER", &[S], |_, args| {
        map_string("UPPER", args, |s| s.to_uppercase().into())
    }));
    register(scalar("TRIM", &[S], |_, args| map_string("TRIM", args, |s| s.trim().into())));
    register(scalar("LTRIM", &[S], |_, args| map_string("LTRIM", args, |s| s.trim_start().into())));
    register(scalar("RTRIM", &[S], |_, args| map_string("RTRIM", args, |s| s.trim_end().into())));
    register(scalar("SUBSTRING", &[S, S], |_, args| match args {
        [Value::String(s), start] if start.is_number() => {
            Ok(substring(s, start.as_i64().unwrap_or_default(), None))
        }
        [Value::Null, _] => Ok(Value::Null),
        _ => Err(EvalError::invalid_types("SUBSTRING", args)),
    }));
    register(scalar("SUBSTRING", &[S, S, S], |_, args| match args {
        [Value::String(s), start, length] if start.is_number() && length.is_number() => Ok(substring(
            s,
            start.as_i64().unwrap_or_default(),
            length.as_i64(),
        )),
        [Value::Null, _, _] => Ok(Value::Null),
        _ => Err(EvalError::invalid_types("SUBSTRING", args)),
    }));
    register(scalar("INDEXOF", &[S, S], |collation, args| match args {
        [Value::String(s), Value::String(pattern)] => Ok(index_of(s, pattern, 0, collation)),
        _ => Err(EvalError::invalid_types("INDEXOF", args)),
    }));
    register(scalar("INDEXOF", &[S, S, S], |collation, args| match args {
        [Value::String(s), Value::String(pattern), start] if start.is_number() => Ok(index_of(
            s,
            pattern,
            start.as_i64().unwrap_or_default().max(0) as usize,
            collation,
        )),
        _ => Err(EvalError::invalid_types("INDEXOF", args)),
    }));
    register(scalar("REPLACE", &[S, S, S], |_, args| match args {
        [Value::String(s), Value::String(from), Value::String(to)] => {
            Ok(Value::String(s.replace(from.as_str(), to).into()))
        }
        [Value::Null, _, _] => Ok(Value::Null),
        _ => Err(EvalError::invalid_types("REPLACE", args)),
    }));
    register(scalar("LPAD", &[S, S, S], |_, args| pad("LPAD", args, true)));
    register(scalar("RPAD", &[S, S, S], |_, args| pad("RPAD", args, false)));
    register(enumerable("SPLIT", &[S, S], |_, args| match args {
        [Value::String(s), Value::String(separator)] if !separator.is_empty() => Ok(s
            .split(separator.as_str())
            .map(|part| Value::String(part.into()))
            .collect()),
        [Value::String(_), Value::String(_)] => Err(EvalError::invalid_argument("SPLIT", "separator is empty")),
        [Value::Null, _] => Ok(Vec::new()),
        _ => Err(EvalError::invalid_types("SPLIT", args)),
    }));
    register(scalar("STARTSWITH", &[S, S], |collation, args| {
        test_string("STARTSWITH", args, collation, |s, p| s.starts_with(p))
    }));
    register(scalar("ENDSWITH", &[S, S], |collation, args| {
        test_string("ENDSWITH", args, collation, |s, p| s.ends_with(p))
    }));
    register(scalar("CONTAINS", &[S, S], |collation, args| {
        test_string("CONTAINS", args, collation, |s, p| s.contains(p))
    }));

    // math
    register(scalar("ABS", &[S], |_, args| match args {
        [Value::Int32(n)] => Ok(n.checked_abs().map(Value::Int32).unwrap_or(Value::Int64((*n as i64).abs()))),
        [Value::Int64(n)] => Ok(n.checked_abs().map(Value::Int64).unwrap_or(Value::Double((*n as f64).abs()))),
        [Value::Double(n)] => Ok(Value::Double(n.abs())),
        [Value::Decimal(d)] => Ok(Decimal::parse(d.as_str().trim_start_matches('-'))
            .map(Value::Decimal)
            .unwrap_or(Value::Null)),
        [Value::Null] => Ok(Value::Null),
        _ => Err(EvalError::invalid_types("ABS", args)),
    }));
    register(scalar("ROUND", &[S, S], |_, args| match args {
        [value @ (Value::Int32(_) | Value::Int64(_)), digits] if digits.is_number() => Ok(value.clone()),
        [Value::Double(n), digits] if digits.is_number() => {
            Ok(Value::Double(round(*n, digits.as_i64().unwrap_or_default())))
        }
        [Value::Decimal(d), digits] if digits.is_number() => Ok(Decimal::parse(
            &round(d.to_f64(), digits.as_i64().unwrap_or_default()).to_string(),
        )
        .map(Value::Decimal)
        .unwrap_or(Value::Null)),
        [Value::Null, _] => Ok(Value::Null),
        _ => Err(EvalError::invalid_types("ROUND", args)),
    }));
    register(scalar("POW", &[S, S], |_, args| match args {
        [x, y] if x.is_number() && y.is_number() => Ok(Value::Double(
            x.as_f64().unwrap_or_default().powf(y.as_f64().unwrap_or_default()),
        )),
        [Value::Null, _] | [_, Value::Null] => Ok(Value::Null),
        _ => Err(EvalError::invalid_types("POW", args)),
    }));

    // dates
    register(scalar("YEAR", &[S], |_, args| date_part("YEAR", args, |d| d.year())));
    register(scalar("MONTH", &[S], |_, args| date_part("MONTH", args, |d| d.month() as i32)));
    register(scalar("DAY", &[S], |_, args| date_part("DAY", args, |d| d.day() as i32)));
    register(scalar("HOUR", &[S], |_, args| date_part("HOUR", args, |d| d.hour() as i32)));
    register(scalar("MINUTE", &[S], |_, args| date_part("MINUTE", args, |d| d.minute() as i32)));
    register(scalar("SECOND", &[S], |_, args| date_part("SECOND", args, |d| d.second() as i32)));
    register(scalar("DATEADD", &[S, S, S], |_, args| match args {
        [Value::String(part), amount, Value::DateTime(date)] if amount.is_number() => {
            let part = DatePart::parse(part).ok_or_else(|| {
                EvalError::invalid_argument("DATEADD", format!("unknown date part `{}`", part))
            })?;
            Ok(part
                .add(*date, amount.as_i64().unwrap_or_default())
                .map(Value::DateTime)
                .unwrap_or(Value::Null))
        }
        [_, _, Value::Null] => Ok(Value::Null),
        _ => Err(EvalError::invalid_types("DATEADD", args)),
    }));
    register(scalar("DATEDIFF", &[S, S, S], |_, args| match args {
        [Value::String(part), Value::DateTime(start), Value::DateTime(end)] => {
            let part = DatePart::parse(part).ok_or_else(|| {
                EvalError::invalid_argument("DATEDIFF", format!("unknown date part `{}`", part))
            })?;
            Ok(Value::Int64(part.diff(*start, *end)))
        }
        [_, Value::Null, _] | [_, _, Value::Null] => Ok(Value::Null),
        _ => Err(EvalError::invalid_types("DATEDIFF", args)),
    }));

    map
});

/// Elements of a materialized enumerable argument.
#[inline]
fn values(args: &[Value]) -> &[Value] {
    match args.first() {
        Some(Value::Array(array)) => array.as_slice(),
        _ => &[],
    }
}

fn sum(values: &[Value]) -> Result<Value, EvalError> {
    values
        .iter()
        .filter(|value| value.is_number())
        .try_fold(Value::Int32(0), |acc, value| ops::arithmetic(BinaryOp::Add, &acc, value))
}

fn distinct(values: impl Iterator<Item = Value>, collation: &Collation) -> Vec<Value> {
    values.fold(Vec::new(), |mut acc: Vec<Value>, value| {
        if !acc.iter().any(|seen| seen.equals(&value, collation)) {
            acc.push(value);
        }
        acc
    })
}

fn join(values: &[Value], separator: &str) -> Value {
    Value::String(values.iter().map(|value| value.to_string()).join(separator).into())
}

fn map_string(name: &str, args: &[Value], f: impl Fn(&str) -> SmolStr) -> Result<Value, EvalError> {
    match args {
        [Value::String(s)] => Ok(Value::String(f(s))),
        [Value::Null] => Ok(Value::Null),
        _ => Err(EvalError::invalid_types(name, args)),
    }
}

fn test_string(
    name: &str,
    args: &[Value],
    collation: &Collation,
    f: impl Fn(&str, &str) -> bool,
) -> Result<Value, EvalError> {
    match args {
        [Value::String(s), Value::String(pattern)] if collation.is_ignore_case() => {
            Ok(Value::Boolean(f(&s.to_lowercase(), &pattern.to_lowercase())))
        }
        [Value::String(s), Value::String(pattern)] => Ok(Value::Boolean(f(s, pattern))),
        [Value::Null, _] | [_, Value::Null] => Ok(Value::Boolean(false)),
        _ => Err(EvalError::invalid_types(name, args)),
    }
}

fn substring(s: &str, start: i64, length: Option<i64>) -> Value {
    let start = start.max(0) as usize;
    let chars = s.chars().skip(start);

    match length {
        Some(length) => Value::String(chars.take(length.max(0) as usize).collect::<String>().into()),
        None => Value::String(chars.collect::<String>().into()),
    }
}

fn index_of(s: &str, pattern: &str, start: usize, collation: &Collation) -> Value {
    let (s, pattern) = if collation.is_ignore_case() {
        (s.to_lowercase(), pattern.to_lowercase())
    } else {
        (s.to_string(), pattern.to_string())
    };

    let offset = s.char_indices().nth(start).map(|(i, _)| i);
    let found = offset.and_then(|offset| {
        s[offset..]
            .find(pattern.as_str())
            .map(|i| start + s[offset..offset + i].chars().count())
    });

    Value::Int32(found.map(|i| i as i32).unwrap_or(-1))
}

fn pad(name: &str, args: &[Value], left: bool) -> Result<Value, EvalError> {
    match args {
        [Value::String(s), width, Value::String(fill)] if width.is_number() => {
            let fill = fill
                .chars()
                .next()
                .ok_or_else(|| EvalError::invalid_argument(name, "padding character is empty"))?;
            let width = width.as_i64().unwrap_or_default().max(0) as usize;
            let padding = fill.to_string().repeat(width.saturating_sub(s.chars().count()));

            Ok(Value::String(
                if left { format!("{}{}", padding, s) } else { format!("{}{}", s, padding) }.into(),
            ))
        }
        [Value::Null, _, _] => Ok(Value::Null),
        _ => Err(EvalError::invalid_types(name, args)),
    }
}

fn round(n: f64, digits: i64) -> f64 {
    let factor = 10f64.powi(digits.clamp(0, 15) as i32);
    (n * factor).round() / factor
}

fn date_from_parts(year: &Value, month: &Value, day: &Value) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(
        year.as_i64()? as i32,
        u32::try_from(month.as_i64()?).ok()?,
        u32::try_from(day.as_i64()?).ok()?,
    )?
    .and_hms_opt(0, 0, 0)
    .map(|naive| naive.and_utc())
}

fn date_part(name: &str, args: &[Value], f: impl Fn(&DateTime<Utc>) -> i32) -> Result<Value, EvalError> {
    match args {
        [Value::DateTime(date)] => Ok(Value::Int32(f(date))),
        [Value::Null] => Ok(Value::Null),
        _ => Err(EvalError::invalid_types(name, args)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DatePart {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl DatePart {
    /// `M` is month and `m` is minute; full names are case-insensitive.
    fn parse(s: &str) -> Option<Self> {
        match s {
            "y" | "yyyy" => return Some(DatePart::Year),
            "M" => return Some(DatePart::Month),
            "d" | "dd" => return Some(DatePart::Day),
            "h" | "hh" => return Some(DatePart::Hour),
            "m" | "mm" => return Some(DatePart::Minute),
            "s" | "ss" => return Some(DatePart::Second),
            _ => {}
        }

        match s.to_ascii_lowercase().as_str() {
            "year" => Some(DatePart::Year),
            "month" => Some(DatePart::Month),
            "day" => Some(DatePart::Day),
            "hour" => Some(DatePart::Hour),
            "minute" => Some(DatePart::Minute),
            "second" => Some(DatePart::Second),
            _ => None,
        }
    }

    fn add(&self, date: DateTime<Utc>, amount: i64) -> Option<DateTime<Utc>> {
        let months = |n: i64| {
            let months = Months::new(u32::try_from(n.unsigned_abs()).ok()?);
            if n >= 0 {
                date.checked_add_months(months)
            } else {
                date.checked_sub_months(months)
            }
        };

        match self {
            DatePart::Year => months(amount.checked_mul(12)?),
            DatePart::Month => months(amount),
            DatePart::Day => date.checked_add_signed(Duration::try_days(amount)?),
            DatePart::Hour => date.checked_add_signed(Duration::try_hours(amount)?),
            DatePart::Minute => date.checked_add_signed(Duration::try_minutes(amount)?),
            DatePart::Second => date.checked_add_signed(Duration::try_seconds(amount)?),
        }
    }

    fn diff(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
        let elapsed = end - start;
        match self {
            DatePart::Year => (end.year() - start.year()) as i64,
            DatePart::Month => (end.year() - start.year()) as i64 * 12 + end.month() as i64 - start.month() as i64,
            DatePart::Day => elapsed.num_days(),
            DatePart::Hour => elapsed.num_hours(),
            DatePart::Minute => elapsed.num_minutes(),
            DatePart::Second => elapsed.num_seconds(),
        }
    }
}

/// Wraps materialized enumerable arguments the way the call sites pass them.
pub(crate) fn pack(values: Vec<Value>) -> Value {
    Value::Array(Array::from(values))
}
