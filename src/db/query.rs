use std::fmt;

/// Scalar bound to a positional `?` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Integer(i64),
    Text(String),
    Null,
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

/// A query template together with its ordered parameters.
///
/// The template is a `&'static str`, so request data can only ever reach
/// the database as a bound parameter.
#[derive(Clone, PartialEq, Eq)]
pub struct BoundQuery {
    template: &'static str,
    params: Vec<SqlValue>,
}

impl BoundQuery {
    pub fn new(template: &'static str) -> Self {
        Self {
            template,
            params: Vec::new(),
        }
    }

    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn template(&self) -> &'static str {
        self.template
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }
}

// Parameters may hold password hashes or user text; keep them out of logs.
impl fmt::Debug for BoundQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundQuery")
            .field("template", &self.template)
            .field("params", &self.params.len())
            .finish()
    }
}
