use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, ValueRef};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::db::models::Record;
use crate::db::query::{BoundQuery, SqlValue};
use crate::error::DatabaseError;

/// Executes bound queries. Implementations must never splice parameters
/// into the template text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Storage: Send + Sync {
    async fn execute(&self, query: &BoundQuery) -> Result<Vec<Record>, DatabaseError>;
}

pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        // Every connection to `:memory:` opens a fresh database, so pin one.
        let in_memory = config.url.contains(":memory:");

        let mut options = SqlitePoolOptions::new()
            .acquire_timeout(Duration::from_secs(5));
        options = if in_memory {
            options.max_connections(1).idle_timeout(None).max_lifetime(None)
        } else {
            options.max_connections(config.max_connections)
        };

        let pool = options
            .connect(&config.url)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        info!("Connected to database (max connections: {})", pool.options().get_max_connections());
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn execute(&self, query: &BoundQuery) -> Result<Vec<Record>, DatabaseError> {
        debug!(template = query.template(), params = query.params().len(), "executing query");

        let mut statement = sqlx::query(query.template());
        for param in query.params() {
            statement = match param {
                SqlValue::Integer(value) => statement.bind(*value),
                SqlValue::Text(value) => statement.bind(value.clone()),
                SqlValue::Null => statement.bind(Option::<String>::None),
            };
        }

        let rows = statement.fetch_all(&self.pool).await?;
        rows.iter().map(record_from_row).collect()
    }
}

fn record_from_row(row: &SqliteRow) -> Result<Record, DatabaseError> {
    let mut record = Record::new();
    for column in row.columns() {
        let index = column.ordinal();
        let value = if row.try_get_raw(index)?.is_null() {
            SqlValue::Null
        } else if let Ok(value) = row.try_get::<i64, _>(index) {
            SqlValue::Integer(value)
        } else {
            SqlValue::Text(row.try_get::<String, _>(index)?)
        };
        record.insert(column.name(), value);
    }
    Ok(record)
}
