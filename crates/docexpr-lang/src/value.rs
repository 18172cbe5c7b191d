pub mod collation;
mod json;

use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

use base64::prelude::*;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use indexmap::IndexMap;
use smol_str::SmolStr;
use uuid::Uuid;

pub use collation::Collation;

/// Immutable document value.
///
/// Arrays and documents are reference counted, so cloning a value never copies
/// its children.
#[derive(Debug, Clone, Default)]
pub enum Value {
    MinValue,
    #[default]
    Null,
    Int32(i32),
    Int64(i64),
    Double(f64),
    Decimal(Decimal),
    String(SmolStr),
    Document(Document),
    Array(Array),
    Binary(Arc<[u8]>),
    ObjectId(ObjectId),
    Guid(Uuid),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    MaxValue,
}

impl Value {
    pub const NULL: Value = Value::Null;

    /// Single-key documents such as `{"$oid": "..."}` are read as typed literals.
    /// Returns `None` when `key` is not a recognized sigil; a malformed payload
    /// yields `Some(Value::Null)`.
    pub fn from_sigil(key: &str, payload: &str) -> Option<Value> {
        let value = match key {
            "$binary" => BASE64_STANDARD
                .decode(payload)
                .map(|bytes| Value::Binary(bytes.into()))
                .unwrap_or(Value::Null),
            "$oid" => payload.parse::<ObjectId>().map(Value::ObjectId).unwrap_or(Value::Null),
            "$guid" => Uuid::parse_str(payload).map(Value::Guid).unwrap_or(Value::Null),
            "$date" => parse_datetime(payload).map(Value::DateTime).unwrap_or(Value::Null),
            "$numberLong" => payload.trim().parse::<i64>().map(Value::Int64).unwrap_or(Value::Null),
            "$numberDecimal" => Decimal::parse(payload).map(Value::Decimal).unwrap_or(Value::Null),
            "$minValue" => Value::MinValue,
            "$maxValue" => Value::MaxValue,
            _ => return None,
        };

        Some(value)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::MinValue => "minValue",
            Value::Null => "null",
            Value::Int32(_) => "int",
            Value::Int64(_) => "long",
            Value::Double(_) => "double",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Document(_) => "document",
            Value::Array(_) => "array",
            Value::Binary(_) => "binary",
            Value::ObjectId(_) => "objectId",
            Value::Guid(_) => "guid",
            Value::Boolean(_) => "bool",
            Value::DateTime(_) => "date",
            Value::MaxValue => "maxValue",
        }
    }

    fn type_order(&self) -> u8 {
        match self {
            Value::MinValue => 0,
            Value::Null => 1,
            Value::Int32(_) | Value::Int64(_) | Value::Double(_) | Value::Decimal(_) => 2,
            Value::String(_) => 3,
            Value::Document(_) => 4,
            Value::Array(_) => 5,
            Value::Binary(_) => 6,
            Value::ObjectId(_) => 7,
            Value::Guid(_) => 8,
            Value::Boolean(_) => 9,
            Value::DateTime(_) => 10,
            Value::MaxValue => 11,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(
            self,
            Value::Int32(_) | Value::Int64(_) | Value::Double(_) | Value::Decimal(_)
        )
    }

    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    #[inline]
    pub fn is_document(&self) -> bool {
        matches!(self, Value::Document(_))
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Only a boolean `true` counts as true; every other value is false.
    #[inline]
    pub fn is_truthy(&self) -> bool {
        matches!(self, Value::Boolean(true))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(n) => Some(*n as f64),
            Value::Int64(n) => Some(*n as f64),
            Value::Double(n) => Some(*n),
            Value::Decimal(d) => Some(d.to_f64()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(n) => Some(*n as i64),
            Value::Int64(n) => Some(*n),
            Value::Double(n) => Some(*n as i64),
            Value::Decimal(d) => Some(d.to_f64() as i64),
            _ => None,
        }
    }

    /// Total order across all value types.
    pub fn compare(&self, other: &Value, collation: &Collation) -> Ordering {
        match (self, other) {
            (Value::Int32(a), Value::Int32(b)) => a.cmp(b),
            (Value::Int32(_) | Value::Int64(_), Value::Int32(_) | Value::Int64(_)) => {
                self.as_i64().cmp(&other.as_i64())
            }
            (a, b) if a.is_number() && b.is_number() => {
                let (a, b) = (a.as_f64().unwrap_or_default(), b.as_f64().unwrap_or_default());
                a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
            }
            (Value::String(a), Value::String(b)) => collation.compare(a, b),
            (Value::Document(a), Value::Document(b)) => a
                .iter()
                .zip(b.iter())
                .map(|((ka, va), (kb, vb))| {
                    collation
                        .compare(ka, kb)
                        .then_with(|| va.compare(vb, collation))
                })
                .find(|ord| ord.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Value::Array(a), Value::Array(b)) => a
                .iter()
                .zip(b.iter())
                .map(|(va, vb)| va.compare(vb, collation))
                .find(|ord| ord.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Value::Binary(a), Value::Binary(b)) => a.cmp(b),
            (Value::ObjectId(a), Value::ObjectId(b)) => a.cmp(b),
            (Value::Guid(a), Value::Guid(b)) => a.cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (a, b) => a.type_order().cmp(&b.type_order()),
        }
    }

    #[inline]
    pub fn equals(&self, other: &Value, collation: &Collation) -> bool {
        self.compare(other, collation).is_eq()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other, &Collation::binary())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            _ => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value.into())
    }
}

impl From<SmolStr> for Value {
    fn from(value: SmolStr) -> Self {
        Value::String(value)
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Value::Document(value)
    }
}

impl From<Array> for Value {
    fn from(value: Array) -> Self {
        Value::Array(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(Array::from(value))
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value)
    }
}

/// Insertion-ordered document.
///
/// Key lookup tries an exact match first and then falls back to an
/// ASCII-case-insensitive match.
#[derive(Debug, Clone, Default)]
pub struct Document(Arc<IndexMap<SmolStr, Value>>);

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).or_else(|| {
            self.0
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Inserts or replaces `key`, copying the underlying map only if it is shared.
    pub fn insert(&mut self, key: impl Into<SmolStr>, value: Value) {
        Arc::make_mut(&mut self.0).insert(key.into(), value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &Value)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &SmolStr> {
        self.0.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.values()
    }
}

impl<K: Into<SmolStr>> FromIterator<(K, Value)> for Document {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Self(Arc::new(iter.into_iter().map(|(k, v)| (k.into(), v)).collect()))
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        Value::Document(self.clone()) == Value::Document(other.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Array(Arc<Vec<Value>>);

impl Array {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    /// Returns the elements, cloning them only if the array is shared.
    pub fn into_vec(self) -> Vec<Value> {
        Arc::try_unwrap(self.0).unwrap_or_else(|shared| (*shared).clone())
    }
}

impl From<Vec<Value>> for Array {
    fn from(value: Vec<Value>) -> Self {
        Self(Arc::new(value))
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Self(Arc::new(iter.into_iter().collect()))
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Decimal number kept in its canonical textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal(SmolStr);

impl Decimal {
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        let digits = trimmed.trim_start_matches(['-', '+']);
        let valid = !digits.is_empty()
            && digits.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '-' | '+'))
            && digits.chars().next().is_some_and(|c| c.is_ascii_digit() || c == '.');

        match (valid, trimmed.parse::<f64>()) {
            (true, Ok(n)) if n.is_finite() => Some(Self(trimmed.trim_start_matches('+').into())),
            _ => None,
        }
    }

    pub fn to_f64(&self) -> f64 {
        self.0.parse().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Decimal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 12-byte object identifier: 4-byte timestamp, 5 random bytes, 3-byte counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; 12]);

static OBJECT_ID_COUNTER: AtomicU32 = AtomicU32::new(0);

impl ObjectId {
    pub fn new() -> Self {
        let mut bytes = [0u8; 12];
        let timestamp = Utc::now().timestamp() as u32;
        let random = Uuid::new_v4();
        let counter = OBJECT_ID_COUNTER.fetch_add(1, AtomicOrdering::Relaxed);

        bytes[..4].copy_from_slice(&timestamp.to_be_bytes());
        bytes[4..9].copy_from_slice(&random.as_bytes()[..5]);
        bytes[9..].copy_from_slice(&counter.to_be_bytes()[1..]);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    pub fn creation_time(&self) -> Option<DateTime<Utc>> {
        let seconds = u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]]);
        Utc.timestamp_opt(seconds as i64, 0).single()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::str::FromStr for ObjectId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC) and `YYYY-MM-DD`.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| naive.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::int_vs_long(Value::Int32(1), Value::Int64(2), Ordering::Less)]
    #[case::int_vs_double(Value::Int32(2), Value::Double(1.5), Ordering::Greater)]
    #[case::equal_numbers(Value::Int64(7), Value::Double(7.0), Ordering::Equal)]
    #[case::null_before_number(Value::Null, Value::Int32(0), Ordering::Less)]
    #[case::number_before_string(Value::Int32(100), Value::from("a"), Ordering::Less)]
    #[case::min_value(Value::MinValue, Value::Null, Ordering::Less)]
    #[case::max_value(Value::MaxValue, Value::DateTime(Utc::now()), Ordering::Greater)]
    #[case::bool_order(Value::Boolean(false), Value::Boolean(true), Ordering::Less)]
    fn test_compare(#[case] a: Value, #[case] b: Value, #[case] expected: Ordering) {
        assert_eq!(a.compare(&b, &Collation::binary()), expected);
    }

    #[test]
    fn test_string_compare_with_collation() {
        let a = Value::from("Hello");
        let b = Value::from("hello");
        assert!(!a.equals(&b, &Collation::binary()));
        assert!(a.equals(&b, &Collation::ignore_case()));
    }

    #[test]
    fn test_document_lookup_falls_back_to_case_insensitive() {
        let doc: Document = vec![("Name", Value::from("x"))].into_iter().collect();
        assert_eq!(doc.get("Name"), Some(&Value::from("x")));
        assert_eq!(doc.get("name"), Some(&Value::from("x")));
        assert_eq!(doc.get("other"), None);
    }

    #[test]
    fn test_document_insert_does_not_affect_clones() {
        let mut doc = Document::new();
        doc.insert("a", Value::Int32(1));
        let snapshot = doc.clone();
        doc.insert("b", Value::Int32(2));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(doc.len(), 2);
    }

    #[rstest]
    #[case::binary("$binary", "AQID", Value::Binary(vec![1u8, 2, 3].into()))]
    #[case::binary_malformed("$binary", "***", Value::Null)]
    #[case::number_long("$numberLong", "12345678901", Value::Int64(12_345_678_901))]
    #[case::number_long_malformed("$numberLong", "12a", Value::Null)]
    #[case::decimal("$numberDecimal", "1.25", Value::Decimal(Decimal::parse("1.25").unwrap()))]
    #[case::decimal_malformed("$numberDecimal", "abc", Value::Null)]
    #[case::guid_malformed("$guid", "not-a-guid", Value::Null)]
    #[case::oid_malformed("$oid", "xyz", Value::Null)]
    #[case::min_value("$minValue", "1", Value::MinValue)]
    #[case::max_value("$maxValue", "1", Value::MaxValue)]
    fn test_from_sigil(#[case] key: &str, #[case] payload: &str, #[case] expected: Value) {
        let value = Value::from_sigil(key, payload).unwrap();
        assert_eq!(value.type_name(), expected.type_name());
        assert_eq!(value, expected);
    }

    #[test]
    fn test_from_sigil_unknown_key() {
        assert!(Value::from_sigil("$other", "x").is_none());
    }

    #[test]
    fn test_object_id_round_trip() {
        let oid = ObjectId::new();
        let parsed: ObjectId = oid.to_string().parse().unwrap();
        assert_eq!(oid, parsed);
        assert!(oid.creation_time().is_some());
    }

    #[rstest]
    #[case("2024-01-02T03:04:05Z")]
    #[case("2024-01-02T03:04:05.123")]
    #[case("2024-01-02")]
    fn test_parse_datetime(#[case] input: &str) {
        assert!(parse_datetime(input).is_some());
    }
}
