//! Normalized scalar values.
//!
//! Wire values from the protocol client are normalized into [`ScalarValue`]
//! before they reach transforms, rows, or summaries, so the rest of the
//! pipeline never sees raw BER types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A decoded metric value in portable form.
///
/// Large wire integers map onto `Int`/`Uint`; opaque byte strings are
/// rendered as hex text by the session layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Int(i64),
    Uint(u64),
    Float(f64),
    Text(String),
}

/// Decoded column values of one table row, keyed by column name.
///
/// `None` marks a field whose transform failed; a column missing entirely
/// was either absent on the device or carried a per-element protocol error.
pub type RowFields = BTreeMap<String, Option<ScalarValue>>;

impl ScalarValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Uint(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    /// Text view of the value, if it is textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Short kind label for log and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Uint(_) => "uint",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}
