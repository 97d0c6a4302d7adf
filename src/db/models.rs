use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::db::query::SqlValue;
use crate::error::DatabaseError;

/// One row returned by the storage collaborator, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    columns: HashMap<String, SqlValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: &str, value: impl Into<SqlValue>) {
        self.columns.insert(column.to_string(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns.get(column)
    }

    pub fn integer(&self, column: &str) -> Result<i64, DatabaseError> {
        match self.columns.get(column) {
            Some(SqlValue::Integer(value)) => Ok(*value),
            _ => Err(DatabaseError::MalformedRecord(format!(
                "expected integer column `{}`",
                column
            ))),
        }
    }

    pub fn text(&self, column: &str) -> Result<&str, DatabaseError> {
        match self.columns.get(column) {
            Some(SqlValue::Text(value)) => Ok(value),
            _ => Err(DatabaseError::MalformedRecord(format!(
                "expected text column `{}`",
                column
            ))),
        }
    }
}

/// Stored login credential. Owned by storage; read-only here.
#[derive(Clone)]
pub struct Credential {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl TryFrom<&Record> for Credential {
    type Error = DatabaseError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.integer("id")?,
            username: record.text("username")?.to_string(),
            password_hash: record.text("password_hash")?.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    pub author: String,
    pub posted_at: DateTime<Utc>,
    pub text: String,
}

impl TryFrom<&Record> for FeedEntry {
    type Error = DatabaseError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        let raw_timestamp = record.text("timestamp")?;
        let posted_at = DateTime::parse_from_rfc3339(raw_timestamp)
            .map_err(|e| {
                DatabaseError::MalformedRecord(format!("bad timestamp `{}`: {}", raw_timestamp, e))
            })?
            .with_timezone(&Utc);

        Ok(Self {
            author: record.text("username")?.to_string(),
            posted_at,
            text: record.text("text")?.to_string(),
        })
    }
}
