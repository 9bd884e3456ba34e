//! Hierarchical configuration dictionary.
//!
//! A [`Dict`] is a string-keyed tree whose leaves are integers, doubles,
//! sizes, strings or scalar functions of space. It is built once at
//! process start (by hand in tests, or from JSON) and passed explicitly to
//! the constructors of models and solvers.
//!
//! In JSON, a scalar function is either a plain number (a constant),
//! `{"polynomial": [c0, c1, ...]}` or
//! `{"sine": {"amplitude": a, "wavelength": l, "phase": p, "offset": o}}`.
//!
//! ```
//! use hamr_core::Dict;
//!
//! let dict = Dict::from_json_str(r#"{"ions": {"nbrPopulations": 1, "pop0": {"mass": 1.0}}}"#)
//!     .unwrap();
//! let ions = dict.node("ions").unwrap();
//! assert_eq!(ions.value::<usize>("nbrPopulations").unwrap(), 1);
//! assert_eq!(ions.node("pop0").unwrap().value::<f64>("mass").unwrap(), 1.0);
//! ```

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::DictError;

/// A scalar function of the (1D) position.
pub type ScalarFunction = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Wrap a closure as a [`ScalarFunction`].
pub fn function(f: impl Fn(f64) -> f64 + Send + Sync + 'static) -> ScalarFunction {
    Arc::new(f)
}

/// A [`ScalarFunction`] returning `value` everywhere.
pub fn constant(value: f64) -> ScalarFunction {
    Arc::new(move |_| value)
}

/// A dictionary entry.
#[derive(Clone)]
pub enum DictValue {
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Double(f64),
    /// Unsigned size.
    Size(usize),
    /// String.
    Str(String),
    /// Scalar function of space.
    Function(ScalarFunction),
    /// Nested dictionary.
    Node(Dict),
}

impl DictValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::Size(_) => "size",
            Self::Str(_) => "string",
            Self::Function(_) => "function",
            Self::Node(_) => "dictionary",
        }
    }
}

impl fmt::Debug for DictValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "Int({v})"),
            Self::Double(v) => write!(f, "Double({v})"),
            Self::Size(v) => write!(f, "Size({v})"),
            Self::Str(v) => write!(f, "Str({v:?})"),
            Self::Function(_) => f.write_str("Function(..)"),
            Self::Node(d) => write!(f, "Node({d:?})"),
        }
    }
}

impl From<i64> for DictValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for DictValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for DictValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<usize> for DictValue {
    fn from(v: usize) -> Self {
        Self::Size(v)
    }
}

impl From<&str> for DictValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for DictValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<ScalarFunction> for DictValue {
    fn from(v: ScalarFunction) -> Self {
        Self::Function(v)
    }
}

impl From<Dict> for DictValue {
    fn from(v: Dict) -> Self {
        Self::Node(v)
    }
}

/// Types that can be read out of a [`DictValue`].
pub trait FromDictValue: Sized {
    /// Name used in type mismatch errors.
    const TYPE_NAME: &'static str;

    /// Convert, or `None` when the stored type does not fit.
    fn from_dict_value(value: &DictValue) -> Option<Self>;
}

impl FromDictValue for i64 {
    const TYPE_NAME: &'static str = "int";

    fn from_dict_value(value: &DictValue) -> Option<Self> {
        match value {
            DictValue::Int(v) => Some(*v),
            DictValue::Size(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl FromDictValue for i32 {
    const TYPE_NAME: &'static str = "int";

    fn from_dict_value(value: &DictValue) -> Option<Self> {
        i64::from_dict_value(value).and_then(|v| i32::try_from(v).ok())
    }
}

impl FromDictValue for usize {
    const TYPE_NAME: &'static str = "size";

    fn from_dict_value(value: &DictValue) -> Option<Self> {
        match value {
            DictValue::Size(v) => Some(*v),
            DictValue::Int(v) => usize::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl FromDictValue for f64 {
    const TYPE_NAME: &'static str = "double";

    fn from_dict_value(value: &DictValue) -> Option<Self> {
        match value {
            DictValue::Double(v) => Some(*v),
            DictValue::Int(v) => Some(*v as f64),
            DictValue::Size(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl FromDictValue for String {
    const TYPE_NAME: &'static str = "string";

    fn from_dict_value(value: &DictValue) -> Option<Self> {
        match value {
            DictValue::Str(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromDictValue for ScalarFunction {
    const TYPE_NAME: &'static str = "function";

    fn from_dict_value(value: &DictValue) -> Option<Self> {
        match value {
            DictValue::Function(f) => Some(f.clone()),
            number => f64::from_dict_value(number).map(constant),
        }
    }
}

impl FromDictValue for Dict {
    const TYPE_NAME: &'static str = "dictionary";

    fn from_dict_value(value: &DictValue) -> Option<Self> {
        match value {
            DictValue::Node(d) => Some(d.clone()),
            _ => None,
        }
    }
}

/// String-keyed configuration tree. Keys keep their insertion order.
#[derive(Clone, Debug, Default)]
pub struct Dict {
    entries: IndexMap<String, DictValue>,
}

impl Dict {
    /// An empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, replacing any previous entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<DictValue>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<DictValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Raw entry for `key`.
    pub fn get(&self, key: &str) -> Option<&DictValue> {
        self.entries.get(key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Nested dictionary at `key`.
    pub fn node(&self, key: &str) -> Result<&Dict, DictError> {
        match self.get(key) {
            Some(DictValue::Node(d)) => Ok(d),
            Some(other) => Err(DictError::WrongType {
                key: key.to_string(),
                expected: Dict::TYPE_NAME,
                found: other.type_name(),
            }),
            None => Err(DictError::MissingKey {
                key: key.to_string(),
            }),
        }
    }

    /// Nested dictionary at `key`, created empty when absent or when
    /// `key` holds a leaf.
    pub fn node_mut(&mut self, key: &str) -> &mut Dict {
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| DictValue::Node(Dict::new()));
        if !matches!(entry, DictValue::Node(_)) {
            *entry = DictValue::Node(Dict::new());
        }
        match entry {
            DictValue::Node(d) => d,
            _ => unreachable!("entry was just made a node"),
        }
    }

    /// Typed value at `key`.
    pub fn value<T: FromDictValue>(&self, key: &str) -> Result<T, DictError> {
        let value = self.get(key).ok_or_else(|| DictError::MissingKey {
            key: key.to_string(),
        })?;
        T::from_dict_value(value).ok_or_else(|| DictError::WrongType {
            key: key.to_string(),
            expected: T::TYPE_NAME,
            found: value.type_name(),
        })
    }

    /// Typed value at `key`, `default` when absent. A present value of the
    /// wrong type is still an error.
    pub fn value_or<T: FromDictValue>(&self, key: &str, default: T) -> Result<T, DictError> {
        if self.contains(key) {
            self.value(key)
        } else {
            Ok(default)
        }
    }

    /// Parse a JSON document whose top level is an object.
    pub fn from_json_str(text: &str) -> Result<Dict, DictError> {
        let value: Value = serde_json::from_str(text).map_err(|e| DictError::Json {
            reason: e.to_string(),
        })?;
        match &value {
            Value::Object(_) => match json_to_value("<root>", &value)? {
                DictValue::Node(d) => Ok(d),
                _ => Err(DictError::UnsupportedJson {
                    key: "<root>".to_string(),
                    reason: "top level must be an object".to_string(),
                }),
            },
            _ => Err(DictError::UnsupportedJson {
                key: "<root>".to_string(),
                reason: "top level must be an object".to_string(),
            }),
        }
    }
}

fn unsupported(key: &str, reason: impl Into<String>) -> DictError {
    DictError::UnsupportedJson {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn json_to_value(key: &str, value: &Value) -> Result<DictValue, DictError> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(DictValue::Int(i)),
            None => n
                .as_f64()
                .map(DictValue::Double)
                .ok_or_else(|| unsupported(key, "number out of range")),
        },
        Value::String(s) => Ok(DictValue::Str(s.clone())),
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(f) = json_function(key, map)? {
                    return Ok(DictValue::Function(f));
                }
            }
            let mut dict = Dict::new();
            for (k, v) in map {
                dict.insert(k.clone(), json_to_value(k, v)?);
            }
            Ok(DictValue::Node(dict))
        }
        Value::Array(_) => Err(unsupported(key, "arrays are only allowed in function specs")),
        Value::Bool(_) => Err(unsupported(key, "booleans are not supported")),
        Value::Null => Err(unsupported(key, "null is not supported")),
    }
}

fn json_number(key: &str, value: &Value) -> Result<f64, DictError> {
    value
        .as_f64()
        .ok_or_else(|| unsupported(key, "expected a number"))
}

fn json_function(
    key: &str,
    map: &serde_json::Map<String, Value>,
) -> Result<Option<ScalarFunction>, DictError> {
    if let Some(v) = map.get("constant") {
        return Ok(Some(constant(json_number(key, v)?)));
    }
    if let Some(v) = map.get("polynomial") {
        let coefficients = v
            .as_array()
            .ok_or_else(|| unsupported(key, "polynomial expects a list of coefficients"))?
            .iter()
            .map(|c| json_number(key, c))
            .collect::<Result<Vec<f64>, _>>()?;
        return Ok(Some(function(move |x| {
            coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
        })));
    }
    if let Some(v) = map.get("sine") {
        let params = v
            .as_object()
            .ok_or_else(|| unsupported(key, "sine expects an object"))?;
        let field = |name: &str, default: Option<f64>| match (params.get(name), default) {
            (Some(v), _) => json_number(key, v),
            (None, Some(d)) => Ok(d),
            (None, None) => Err(unsupported(key, format!("sine requires '{name}'"))),
        };
        let amplitude = field("amplitude", Some(1.0))?;
        let wavelength = field("wavelength", None)?;
        let phase = field("phase", Some(0.0))?;
        let offset = field("offset", Some(0.0))?;
        if wavelength <= 0.0 {
            return Err(unsupported(key, "sine wavelength must be positive"));
        }
        let k = 2.0 * std::f64::consts::PI / wavelength;
        return Ok(Some(function(move |x| {
            offset + amplitude * (k * x + phase).sin()
        })));
    }
    Ok(None)
}
