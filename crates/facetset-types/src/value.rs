use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A value a document can be classified under.
///
/// Values are totally ordered and hash consistently with equality, so they can
/// key hash maps and ordered sets. An `Array` is one atomic value; only the
/// facet's `multi_value` option decides whether its elements are indexed
/// separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FacetValue {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// Ordered sequence of values
    Array(Vec<FacetValue>),
    /// Object with members kept in key order
    Object(BTreeMap<String, FacetValue>),
}

// -------------------------------------------------------------------------------------------------
// JSON bridge
// -------------------------------------------------------------------------------------------------

/// 2^63: exclusive upper bound of `i64`, exact in `f64`
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// The `i64` a float is exactly equal to, if any
fn integral(f: f64) -> Option<i64> {
    (f.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(&f)).then_some(f as i64)
}

impl From<FacetValue> for serde_json::Value {
    fn from(value: FacetValue) -> Self {
        match value {
            FacetValue::Null => Self::Null,
            FacetValue::Boolean(b) => Self::Bool(b),
            FacetValue::Integer(i) => i.into(),
            // NaN and infinities have no JSON form
            FacetValue::Float(f) => serde_json::Number::from_f64(f).map(Self::Number).unwrap_or_default(),
            FacetValue::String(s) => Self::String(s),
            FacetValue::Array(items) => items.into_iter().map(Self::from).collect(),
            FacetValue::Object(members) => members.into_iter().map(|(k, v)| (k, Self::from(v))).collect(),
        }
    }
}

/// Numbers without a fractional part become `Integer`, so `1` and `1.0`
/// convert to the same value.
impl TryFrom<&serde_json::Value> for FacetValue {
    type Error = anyhow::Error;

    fn try_from(json: &serde_json::Value) -> Result<Self> {
        use serde_json::Value as Json;

        let value = match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Boolean(*b),
            Json::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Self::Integer(i),
                (None, Some(f)) => integral(f).map_or(Self::Float(f), Self::Integer),
                (None, None) => return Err(anyhow!("number {n} has no i64 or f64 form")),
            },
            Json::String(s) => Self::String(s.clone()),
            Json::Array(items) => Self::Array(items.iter().map(Self::try_from).collect::<Result<_>>()?),
            Json::Object(members) => Self::Object(
                members
                    .iter()
                    .map(|(key, member)| Self::try_from(member).map(|value| (key.clone(), value)))
                    .collect::<Result<_>>()?,
            ),
        };
        Ok(value)
    }
}

impl From<&str> for FacetValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FacetValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&String> for FacetValue {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl From<i64> for FacetValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FacetValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for FacetValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for FacetValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FacetValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl<T: Into<FacetValue>> From<Vec<T>> for FacetValue {
    fn from(values: Vec<T>) -> Self {
        Self::Array(values.into_iter().map(Into::into).collect())
    }
}

// -------------------------------------------------------------------------------------------------
// Equality, ordering and hashing. All three are derived from `cmp`, so
// `a == b` holds exactly when `a.cmp(b)` is `Equal` and both hash the same.
// Numbers compare by value across `Integer` and `Float`.
// -------------------------------------------------------------------------------------------------

impl FacetValue {
    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Integer(_) | Self::Float(_) => 2,
            Self::String(_) => 3,
            Self::Array(_) => 4,
            Self::Object(_) => 5,
        }
    }
}

/// `i` against `f` by value; NaN sits where `total_cmp` puts it
fn cmp_int_float(i: i64, f: f64) -> Ordering {
    match integral(f) {
        Some(g) => i.cmp(&g),
        None if f.is_nan() => {
            if f.is_sign_negative() { Ordering::Greater } else { Ordering::Less }
        }
        None if f >= I64_BOUND => Ordering::Less,
        None if f < -I64_BOUND => Ordering::Greater,
        // |f| < 2^52 here, so a rounded `i` never lands on it
        None => (i as f64).total_cmp(&f),
    }
}

impl Ord for FacetValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Integer(a), Self::Float(b)) => cmp_int_float(*a, *b),
            (Self::Float(a), Self::Integer(b)) => cmp_int_float(*b, *a).reverse(),
            (Self::Float(a), Self::Float(b)) => match (integral(*a), integral(*b)) {
                (Some(a), Some(b)) => a.cmp(&b),
                _ => a.total_cmp(b),
            },
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Array(a), Self::Array(b)) => a.cmp(b),
            (Self::Object(a), Self::Object(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for FacetValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FacetValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FacetValue {}

impl Hash for FacetValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Null => {}
            Self::Boolean(b) => b.hash(state),
            Self::Integer(i) => i.hash(state),
            Self::Float(f) => match integral(*f) {
                Some(i) => i.hash(state),
                None => f.to_bits().hash(state),
            },
            Self::String(s) => s.hash(state),
            Self::Array(items) => items.hash(state),
            Self::Object(members) => members.hash(state),
        }
    }
}

fn write_list<T>(
    f: &mut fmt::Formatter<'_>,
    (open, close): (&str, &str),
    items: impl IntoIterator<Item = T>,
    mut entry: impl FnMut(&mut fmt::Formatter<'_>, T) -> fmt::Result,
) -> fmt::Result {
    f.write_str(open)?;
    for (n, item) in items.into_iter().enumerate() {
        if n > 0 {
            f.write_str(", ")?;
        }
        entry(f, item)?;
    }
    f.write_str(close)
}

impl fmt::Display for FacetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
            Self::Array(items) => write_list(f, ("[", "]"), items, |f, item| write!(f, "{item}")),
            Self::Object(members) => {
                write_list(f, ("{", "}"), members, |f, (key, value)| write!(f, "{key}: {value}"))
            }
        }
    }
}

impl FacetValue {
    /// Get the type name as a string
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Boolean(_) => "boolean",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Null => "null",
        }
    }

    /// Whether this is `Null`
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the string payload, if any
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The integer payload, if any
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Borrow the elements of an `Array`
    #[must_use]
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a member of an `Object`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Object(members) => members.get(key),
            _ => None,
        }
    }

    /// Create an object from key-value pairs
    #[must_use]
    pub fn object<K, V, I>(members: I) -> Self
    where
        K: Into<String>,
        V: Into<Self>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Object(members.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Create null value
    #[must_use]
    pub const fn null() -> Self {
        Self::Null
    }
}
