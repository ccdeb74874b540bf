//! Core Storage Traits
//!
//! The retrieval layer never talks to a driver directly. It hands a query
//! description to an [`OrderStore`] and reads the returned rows through the
//! [`DatabaseRow`] trait, so the same mappers run against PostgreSQL and the
//! in-memory store used by tests.

use crate::error::{OrmError, OrmResult};
use crate::query::OrderQuery;
use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// Storage collaborator: executes one query description, returns its rows
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Execute the query and return all result rows in query order
    async fn fetch_all(&self, query: &OrderQuery) -> OrmResult<Vec<Box<dyn DatabaseRow>>>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// Abstract database row trait
pub trait DatabaseRow: Send + Sync {
    /// Get a column value by index
    fn get_by_index(&self, index: usize) -> OrmResult<DatabaseValue>;

    /// Get a column value by name
    fn get_by_name(&self, name: &str) -> OrmResult<DatabaseValue>;

    fn column_count(&self) -> usize;

    fn column_names(&self) -> Vec<String>;

    /// Convert row to JSON object keyed by column name
    fn to_json(&self) -> OrmResult<JsonValue> {
        let mut map = serde_json::Map::new();
        for (i, name) in self.column_names().into_iter().enumerate() {
            map.insert(name, self.get_by_index(i)?.to_json());
        }
        Ok(JsonValue::Object(map))
    }
}

/// Typed column access on top of [`DatabaseRow`]
pub trait DatabaseRowExt {
    /// Get a typed value from a column
    fn get<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'de> serde::Deserialize<'de>;

    /// Get an optional typed value; SQL NULL becomes `None`
    fn try_get<T>(&self, column: &str) -> OrmResult<Option<T>>
    where
        T: for<'de> serde::Deserialize<'de>;
}

impl<R: DatabaseRow + ?Sized> DatabaseRowExt for R {
    fn get<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        let db_value = self.get_by_name(column)?;
        serde_json::from_value(db_value.to_json()).map_err(|e| {
            OrmError::Serialization(format!("Failed to deserialize column '{}': {}", column, e))
        })
    }

    fn try_get<T>(&self, column: &str) -> OrmResult<Option<T>>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        let db_value = self.get_by_name(column)?;
        if db_value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(db_value.to_json())
            .map(Some)
            .map_err(|e| {
                OrmError::Serialization(format!("Failed to deserialize column '{}': {}", column, e))
            })
    }
}

/// Database value enumeration for parameter binding and row access
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseValue {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    String(String),
    Timestamp(chrono::NaiveDateTime),
}

impl DatabaseValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> JsonValue {
        match self {
            DatabaseValue::Null => JsonValue::Null,
            DatabaseValue::Bool(b) => JsonValue::Bool(*b),
            DatabaseValue::Int32(i) => JsonValue::from(*i),
            DatabaseValue::Int64(i) => JsonValue::from(*i),
            DatabaseValue::Float64(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            DatabaseValue::String(s) => JsonValue::String(s.clone()),
            DatabaseValue::Timestamp(ts) => {
                JsonValue::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            }
        }
    }
}

impl From<bool> for DatabaseValue {
    fn from(value: bool) -> Self {
        DatabaseValue::Bool(value)
    }
}

impl From<i32> for DatabaseValue {
    fn from(value: i32) -> Self {
        DatabaseValue::Int32(value)
    }
}

impl From<i64> for DatabaseValue {
    fn from(value: i64) -> Self {
        DatabaseValue::Int64(value)
    }
}

impl From<f64> for DatabaseValue {
    fn from(value: f64) -> Self {
        DatabaseValue::Float64(value)
    }
}

impl From<String> for DatabaseValue {
    fn from(value: String) -> Self {
        DatabaseValue::String(value)
    }
}

impl From<&str> for DatabaseValue {
    fn from(value: &str) -> Self {
        DatabaseValue::String(value.to_string())
    }
}

impl From<chrono::NaiveDateTime> for DatabaseValue {
    fn from(value: chrono::NaiveDateTime) -> Self {
        DatabaseValue::Timestamp(value)
    }
}

impl<T> From<Option<T>> for DatabaseValue
where
    T: Into<DatabaseValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => DatabaseValue::Null,
        }
    }
}

/// Row backed by an ordered list of named values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueRow {
    columns: Vec<(String, DatabaseValue)>,
}

impl ValueRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column; builder style
    pub fn with(mut self, name: &str, value: impl Into<DatabaseValue>) -> Self {
        self.columns.push((name.to_string(), value.into()));
        self
    }
}

impl DatabaseRow for ValueRow {
    fn get_by_index(&self, index: usize) -> OrmResult<DatabaseValue> {
        self.columns
            .get(index)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| OrmError::ColumnNotFound(format!("#{}", index)))
    }

    fn get_by_name(&self, name: &str) -> OrmResult<DatabaseValue> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| OrmError::ColumnNotFound(name.to_string()))
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|(name, _)| name.clone()).collect()
    }
}
