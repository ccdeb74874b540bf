//! PostgreSQL Backend Implementation
//!
//! Renders query descriptions to SQL and executes them through a sqlx pool.
//! The schema is the shop schema: `orders`, `member`, `delivery`,
//! `order_item` and `item`.

use super::core::*;
use crate::error::{OrmError, OrmResult};
use crate::query::OrderQuery;
use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::{Column, Pool, Postgres, Row as SqlxRow, TypeInfo};
use std::time::Duration;

/// PostgreSQL storage collaborator
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: Pool<Postgres>,
}

impl PostgresOrderStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Connect a small pool for read-only retrieval
    pub async fn connect(database_url: &str, max_connections: u32) -> OrmResult<Self> {
        if !database_url.starts_with("postgresql://") && !database_url.starts_with("postgres://") {
            return Err(OrmError::Configuration(
                "Invalid PostgreSQL URL scheme".to_string(),
            ));
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create PostgreSQL pool: {}", e);
                OrmError::Database(format!("Failed to create PostgreSQL pool: {}", e))
            })?;

        tracing::info!("PostgreSQL order store connected with {} max connections", max_connections);
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn fetch_all(&self, query: &OrderQuery) -> OrmResult<Vec<Box<dyn DatabaseRow>>> {
        let (sql, params) = query.to_sql_with_params();
        tracing::debug!(kind = query.kind(), params = params.len(), "executing: {}", sql);

        let mut db_query = sqlx::query(&sql);
        for param in &params {
            db_query = bind_database_value(db_query, param);
        }

        let rows = db_query.fetch_all(&self.pool).await.map_err(|e| {
            tracing::error!("{} query failed: {}", query.kind(), e);
            OrmError::Database(format!("{} query failed: {}", query.kind(), e))
        })?;

        Ok(rows
            .into_iter()
            .map(|row| Box::new(PostgresRow::new(row)) as Box<dyn DatabaseRow>)
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "postgresql"
    }
}

/// PostgreSQL row implementation
pub struct PostgresRow {
    row: PgRow,
}

impl PostgresRow {
    pub fn new(row: PgRow) -> Self {
        Self { row }
    }
}

impl DatabaseRow for PostgresRow {
    fn get_by_index(&self, index: usize) -> OrmResult<DatabaseValue> {
        if index >= self.row.len() {
            return Err(OrmError::ColumnNotFound(format!("#{}", index)));
        }
        postgres_value_to_database_value(&self.row, index)
    }

    fn get_by_name(&self, name: &str) -> OrmResult<DatabaseValue> {
        let index = self
            .row
            .columns()
            .iter()
            .position(|col| col.name() == name)
            .ok_or_else(|| OrmError::ColumnNotFound(name.to_string()))?;
        postgres_value_to_database_value(&self.row, index)
    }

    fn column_count(&self) -> usize {
        self.row.len()
    }

    fn column_names(&self) -> Vec<String> {
        self.row
            .columns()
            .iter()
            .map(|col| col.name().to_string())
            .collect()
    }
}

/// Bind a DatabaseValue to a sqlx query
fn bind_database_value<'q>(
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
    value: &DatabaseValue,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match value {
        DatabaseValue::Null => query.bind(Option::<String>::None),
        DatabaseValue::Bool(b) => query.bind(*b),
        DatabaseValue::Int32(i) => query.bind(*i),
        DatabaseValue::Int64(i) => query.bind(*i),
        DatabaseValue::Float64(f) => query.bind(*f),
        DatabaseValue::String(s) => query.bind(s.clone()),
        DatabaseValue::Timestamp(ts) => query.bind(*ts),
    }
}

/// Convert a PostgreSQL column value to DatabaseValue
fn postgres_value_to_database_value(row: &PgRow, index: usize) -> OrmResult<DatabaseValue> {
    let type_name = row.columns()[index].type_info().name().to_string();

    fn read<'r, T>(row: &'r PgRow, index: usize, type_name: &str) -> OrmResult<Option<T>>
    where
        T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
    {
        row.try_get::<Option<T>, _>(index).map_err(|e| {
            OrmError::Serialization(format!("Failed to read {} column #{}: {}", type_name, index, e))
        })
    }

    let value = match type_name.as_str() {
        "BOOL" => read::<bool>(row, index, &type_name)?.map(DatabaseValue::Bool),
        "INT2" => read::<i16>(row, index, &type_name)?.map(|v| DatabaseValue::Int32(i32::from(v))),
        "INT4" => read::<i32>(row, index, &type_name)?.map(DatabaseValue::Int32),
        "INT8" => read::<i64>(row, index, &type_name)?.map(DatabaseValue::Int64),
        "FLOAT4" => read::<f32>(row, index, &type_name)?.map(|v| DatabaseValue::Float64(f64::from(v))),
        "FLOAT8" => read::<f64>(row, index, &type_name)?.map(DatabaseValue::Float64),
        "TIMESTAMP" => read::<chrono::NaiveDateTime>(row, index, &type_name)?.map(DatabaseValue::Timestamp),
        "TIMESTAMPTZ" => read::<chrono::DateTime<chrono::Utc>>(row, index, &type_name)?
            .map(|v| DatabaseValue::Timestamp(v.naive_utc())),
        _ => read::<String>(row, index, &type_name)?.map(DatabaseValue::String),
    };

    Ok(value.unwrap_or(DatabaseValue::Null))
}
