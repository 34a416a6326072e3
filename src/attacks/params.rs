//! @ai:module:intent Attack parameter values, call shapes and argument binding against declared signatures
//! @ai:module:layer domain
//! @ai:module:public_api ParamValue, AttackParam, ParamSpec, Args
//! @ai:module:stateless true

use crate::attacks::error::TransformError;
use std::fmt;

/// @ai:intent A single configured parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    List(Vec<ParamValue>),
}

impl ParamValue {
    /// @ai:intent Convert a TOML value; tables and datetimes are not parameter values
    /// @ai:effects pure
    pub fn from_toml(value: &toml::Value) -> Option<Self> {
        match value {
            toml::Value::Integer(v) => Some(ParamValue::Int(*v)),
            toml::Value::Float(v) => Some(ParamValue::Float(*v)),
            toml::Value::Boolean(v) => Some(ParamValue::Bool(*v)),
            toml::Value::String(v) => Some(ParamValue::Text(v.clone())),
            toml::Value::Array(items) => items
                .iter()
                .map(ParamValue::from_toml)
                .collect::<Option<Vec<_>>>()
                .map(ParamValue::List),
            toml::Value::Table(_) | toml::Value::Datetime(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v:?}"),
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Text(v) => write!(f, "{v}"),
            ParamValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// @ai:intent The two call shapes a configured attack parameter can take
#[derive(Debug, Clone, PartialEq)]
pub enum AttackParam {
    /// Bound to the first declared parameter of the transform.
    Scalar(ParamValue),
    /// Bound by name, in configuration order.
    Keywords(Vec<(String, ParamValue)>),
}

impl AttackParam {
    /// @ai:intent Interpret one configured entry: a table is a keyword mapping, anything else a scalar
    /// @ai:post None for values that cannot be parameters (nested tables, datetimes)
    /// @ai:effects pure
    pub fn from_toml(value: &toml::Value) -> Option<Self> {
        match value {
            toml::Value::Table(table) => table
                .iter()
                .map(|(k, v)| ParamValue::from_toml(v).map(|v| (k.clone(), v)))
                .collect::<Option<Vec<_>>>()
                .map(AttackParam::Keywords),
            other => ParamValue::from_toml(other).map(AttackParam::Scalar),
        }
    }

    /// @ai:intent Human-readable label: `first=value` for scalars, `k1=v1_k2=v2` for mappings
    /// @ai:pre specs is the declared signature of the transform this parameter targets
    /// @ai:effects pure
    pub fn label(&self, specs: &[ParamSpec]) -> String {
        match self {
            AttackParam::Scalar(value) => match specs.first() {
                Some(spec) => format!("{}={}", spec.name, value),
                None => value.to_string(),
            },
            AttackParam::Keywords(pairs) => pairs
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("_"),
        }
    }
}

/// @ai:intent One declared transform parameter and its default
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: Option<f64>,
}

impl ParamSpec {
    pub const fn new(name: &'static str, default: f64) -> Self {
        Self {
            name,
            default: Some(default),
        }
    }

    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            default: None,
        }
    }
}

/// @ai:intent Arguments bound to a declared signature, defaults filled in
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    values: Vec<(&'static str, ParamValue)>,
}

impl Args {
    /// @ai:intent Bind a configured parameter to a signature
    /// @ai:pre specs lists parameters in declaration order
    /// @ai:post every declared parameter has a value
    /// @ai:effects pure
    pub fn bind(specs: &[ParamSpec], param: &AttackParam) -> Result<Self, TransformError> {
        let mut slots: Vec<(&'static str, Option<ParamValue>)> = specs
            .iter()
            .map(|s| (s.name, s.default.map(ParamValue::Float)))
            .collect();

        match param {
            AttackParam::Scalar(value) => {
                let first = slots
                    .first_mut()
                    .ok_or(TransformError::NoPositionalArgument)?;
                first.1 = Some(value.clone());
            }
            AttackParam::Keywords(pairs) => {
                for (name, value) in pairs {
                    let slot = slots
                        .iter_mut()
                        .find(|(n, _)| *n == name.as_str())
                        .ok_or_else(|| TransformError::UnexpectedArgument(name.clone()))?;
                    slot.1 = Some(value.clone());
                }
            }
        }

        let values = slots
            .into_iter()
            .map(|(name, value)| {
                value
                    .map(|v| (name, v))
                    .ok_or_else(|| TransformError::MissingArgument(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { values })
    }

    fn get(&self, name: &str) -> Result<&ParamValue, TransformError> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| TransformError::MissingArgument(name.to_string()))
    }

    /// @ai:intent Numeric argument as f64
    /// @ai:effects pure
    pub fn float(&self, name: &str) -> Result<f64, TransformError> {
        match self.get(name)? {
            ParamValue::Int(v) => Ok(*v as f64),
            ParamValue::Float(v) => Ok(*v),
            other => Err(invalid(name, format!("expected a number, got {other}"))),
        }
    }

    /// @ai:intent Integral argument; floats are accepted only without a fractional part
    /// @ai:effects pure
    pub fn int(&self, name: &str) -> Result<i64, TransformError> {
        match self.get(name)? {
            ParamValue::Int(v) => Ok(*v),
            ParamValue::Float(v) if v.fract() == 0.0 && v.is_finite() => Ok(*v as i64),
            other => Err(invalid(name, format!("expected an integer, got {other}"))),
        }
    }

    /// @ai:intent `[width, height]` argument
    /// @ai:effects pure
    pub fn size(&self, name: &str) -> Result<(u32, u32), TransformError> {
        let ParamValue::List(items) = self.get(name)? else {
            return Err(invalid(name, "expected [width, height]".to_string()));
        };
        let dims = items
            .iter()
            .map(|item| match item {
                ParamValue::Int(v) => u32::try_from(*v).ok(),
                _ => None,
            })
            .collect::<Option<Vec<u32>>>();

        match dims.as_deref() {
            Some([w, h]) => Ok((*w, *h)),
            _ => Err(invalid(name, "expected two non-negative integers".to_string())),
        }
    }
}

fn invalid(name: &str, reason: String) -> TransformError {
    TransformError::InvalidArgument {
        name: name.to_string(),
        reason,
    }
}
