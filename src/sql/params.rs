//! Driver-independent parameter values for positional `?` placeholders.

use serde::Serialize;

/// A value bound to one `?` placeholder. Builders only ever produce these; the
/// store layer turns them into driver binds.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlParam {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlParam {
    /// `Null`, `false`, `0`, `0.0`, NaN and `""` are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            SqlParam::Null => false,
            SqlParam::Bool(b) => *b,
            SqlParam::Int(n) => *n != 0,
            SqlParam::Float(f) => *f != 0.0 && !f.is_nan(),
            SqlParam::Text(s) => !s.is_empty(),
        }
    }
}

impl From<bool> for SqlParam {
    fn from(v: bool) -> Self {
        SqlParam::Bool(v)
    }
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::Int(v)
    }
}

impl From<i32> for SqlParam {
    fn from(v: i32) -> Self {
        SqlParam::Int(v.into())
    }
}

impl From<u32> for SqlParam {
    fn from(v: u32) -> Self {
        SqlParam::Int(v.into())
    }
}

impl From<f64> for SqlParam {
    fn from(v: f64) -> Self {
        SqlParam::Float(v)
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::Text(v.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        SqlParam::Text(v)
    }
}

impl From<&String> for SqlParam {
    fn from(v: &String) -> Self {
        SqlParam::Text(v.clone())
    }
}

impl<T: Into<SqlParam>> From<Option<T>> for SqlParam {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlParam::Null)
    }
}

/// Number of positional placeholders in a SQL fragment.
pub fn count_placeholders(sql: &str) -> usize {
    sql.matches('?').count()
}
