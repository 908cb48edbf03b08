//! Runtime property values and their canonical text form.
#[cfg(test)]
mod tests;

use crate::{error::InternalError, model::property::PropertyKind};
use std::fmt;
use thiserror::Error as ThisError;
use time::{OffsetDateTime, UtcOffset, format_description::well_known::Rfc3339};

///
/// ValueRenderError
///
/// A value has no canonical, storable text form. Surfaced as a fatal
/// configuration error; never retried.
///

#[derive(Debug, ThisError)]
pub enum ValueRenderError {
    #[error("null values have no index form")]
    Null,

    #[error("non-finite float {0} has no canonical text form")]
    NonFinite(f64),

    #[error("binary value ({len} bytes) has no canonical text form")]
    Binary { len: usize },

    #[error("timestamp cannot be rendered: {0}")]
    Timestamp(#[from] time::error::Format),
}

impl From<ValueRenderError> for InternalError {
    fn from(err: ValueRenderError) -> Self {
        Self::codec_configuration(format!("cannot encode index value: {err}"))
    }
}

///
/// Value
///
/// Dynamic property value handed to the index engine by the persistence layer.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Text(String),
    Timestamp(OffsetDateTime),
    Blob(Vec<u8>),
}

impl Value {
    /// Value kind, or `None` for `Null`.
    #[must_use]
    pub const fn kind(&self) -> Option<PropertyKind> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(PropertyKind::Bool),
            Self::Int(_) | Self::Uint(_) | Self::Float(_) => Some(PropertyKind::Numeric),
            Self::Text(_) => Some(PropertyKind::Text),
            Self::Timestamp(_) => Some(PropertyKind::Temporal),
            Self::Blob(_) => Some(PropertyKind::Opaque),
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Uint(_) | Self::Float(_))
    }

    /// Ordering-index score for numeric values.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn score(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Uint(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Canonical text form used as the value component of an index key.
    pub fn stringify(&self) -> Result<String, ValueRenderError> {
        match self {
            Self::Null => Err(ValueRenderError::Null),
            Self::Bool(v) => Ok(v.to_string()),
            Self::Int(v) => Ok(v.to_string()),
            Self::Uint(v) => Ok(v.to_string()),
            Self::Float(v) if !v.is_finite() => Err(ValueRenderError::NonFinite(*v)),
            // Debug keeps a fractional part, so 30.0 never collides with Int(30).
            Self::Float(v) => Ok(format!("{v:?}")),
            Self::Text(v) => Ok(v.clone()),
            Self::Timestamp(v) => Ok(v.to_offset(UtcOffset::UTC).format(&Rfc3339)?),
            Self::Blob(v) => Err(ValueRenderError::Binary { len: v.len() }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stringify() {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{self:?}"),
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

impl From<OffsetDateTime> for Value {
    fn from(v: OffsetDateTime) -> Self {
        Self::Timestamp(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
