//! Frame metadata: an ordered keyword → value mapping.
//!
//! Headers are values. There is no way to modify one in place; [`Header::derive`]
//! and [`Header::with`] hand back a new header, so frames shared between
//! several sets can never observe each other's metadata edits.

use std::fmt;

use hashbrown::HashMap;

/// A single header value.
#[derive(Debug, Clone)]
pub enum HeaderValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    StrList(Vec<String>),
}

impl HeaderValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Int(v) => Some(*v as f64),
            HeaderValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HeaderValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str_list(&self) -> Option<&[String]> {
        match self {
            HeaderValue::StrList(v) => Some(v),
            _ => None,
        }
    }

    /// Hashable projection that agrees with `==`: values equal under
    /// `PartialEq` map to the same key. NaN floats all map to one key.
    pub(crate) fn partition_key(&self) -> KeyAtom {
        match self {
            HeaderValue::Bool(v) => KeyAtom::Bool(*v),
            HeaderValue::Int(v) => {
                let widened = *v as f64;
                if widened as i64 == *v {
                    KeyAtom::Number(normalized_bits(widened))
                } else {
                    KeyAtom::WideInt(*v)
                }
            }
            HeaderValue::Float(v) => KeyAtom::Number(normalized_bits(*v)),
            HeaderValue::Str(v) => KeyAtom::Str(v.clone()),
            HeaderValue::StrList(v) => KeyAtom::StrList(v.clone()),
        }
    }
}

fn normalized_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else if value.is_nan() {
        f64::NAN.to_bits()
    } else {
        value.to_bits()
    }
}

/// Integers and floats compare numerically; everything else compares by
/// variant and value.
impl PartialEq for HeaderValue {
    fn eq(&self, other: &Self) -> bool {
        use HeaderValue::*;
        match (self, other) {
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Int(a), Float(b)) | (Float(b), Int(a)) => *a as f64 == *b && *b as i64 == *a,
            (Str(a), Str(b)) => a == b,
            (StrList(a), StrList(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Bool(v) => write!(f, "{}", if *v { "T" } else { "F" }),
            HeaderValue::Int(v) => write!(f, "{v}"),
            HeaderValue::Float(v) => write!(f, "{v}"),
            HeaderValue::Str(v) => write!(f, "'{v}'"),
            HeaderValue::StrList(v) => write!(f, "[{}]", v.join(", ")),
        }
    }
}

impl From<bool> for HeaderValue {
    fn from(v: bool) -> Self {
        HeaderValue::Bool(v)
    }
}

impl From<i64> for HeaderValue {
    fn from(v: i64) -> Self {
        HeaderValue::Int(v)
    }
}

impl From<i32> for HeaderValue {
    fn from(v: i32) -> Self {
        HeaderValue::Int(v as i64)
    }
}

impl From<usize> for HeaderValue {
    fn from(v: usize) -> Self {
        HeaderValue::Int(v as i64)
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        HeaderValue::Float(v)
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        HeaderValue::Str(v.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(v: String) -> Self {
        HeaderValue::Str(v)
    }
}

impl From<Vec<String>> for HeaderValue {
    fn from(v: Vec<String>) -> Self {
        HeaderValue::StrList(v)
    }
}

impl From<&[&str]> for HeaderValue {
    fn from(v: &[&str]) -> Self {
        HeaderValue::StrList(v.iter().map(|s| s.to_string()).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum KeyAtom {
    Bool(bool),
    Number(u64),
    WideInt(i64),
    Str(String),
    StrList(Vec<String>),
}

/// Ordered, immutable header keyword mapping.
#[derive(Debug, Clone, Default)]
pub struct Header {
    entries: Vec<(String, HeaderValue)>,
    idx_by_key: HashMap<String, usize>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.idx_by_key.get(key).map(|&idx| &self.entries[idx].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.idx_by_key.contains_key(key)
    }

    /// Values for `keys` in order, `None` where a key is absent.
    pub fn values<K: AsRef<str>>(&self, keys: &[K]) -> Vec<Option<&HeaderValue>> {
        keys.iter().map(|key| self.get(key.as_ref())).collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Consuming builder: returns this header with `key` set to `value`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.set(key.into(), value.into());
        self
    }

    /// Returns an independent copy with `overrides` applied.
    ///
    /// Overridden keys keep their position; new keys are appended in the
    /// order given.
    pub fn derive<I, K, V>(&self, overrides: I) -> Header
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<HeaderValue>,
    {
        let mut derived = self.clone();
        for (key, value) in overrides {
            derived.set(key.into(), value.into());
        }
        derived
    }

    fn set(&mut self, key: String, value: HeaderValue) {
        match self.idx_by_key.get(&key).copied() {
            Some(idx) => self.entries[idx].1 = value,
            None => {
                self.idx_by_key.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }

        if common::is_debug() {
            assert_eq!(self.entries.len(), self.idx_by_key.len());
        }
    }
}

/// Order-sensitive equality.
impl PartialEq for Header {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K, V> FromIterator<(K, V)> for Header
where
    K: Into<String>,
    V: Into<HeaderValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Header::new().derive(iter)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.iter() {
            writeln!(f, "{key:<8} = {value}")?;
        }
        Ok(())
    }
}
