//! Query execution - the seam between generated SQL and a database
//!
//! Associations and loaders never talk to a driver directly; they hand SQL
//! text to a [`QueryExecutor`] and read back [`ResultRow`]s.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgPool, PgRow};

use crate::error::{ModelError, ModelResult};
use crate::model::ResultRow;

/// Runs SQL produced by associations and eager loading
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute a SELECT and return every row
    async fn fetch_all(&self, sql: &str) -> ModelResult<Vec<ResultRow>>;

    /// Execute a COUNT query; reads the first column of the first row
    async fn fetch_count(&self, sql: &str) -> ModelResult<i64> {
        let rows = self.fetch_all(sql).await?;
        let value = rows
            .first()
            .and_then(|row| row.columns().next().map(|(_, value)| value.clone()))
            .unwrap_or(JsonValue::Null);
        count_from_value(&value)
    }
}

fn count_from_value(value: &JsonValue) -> ModelResult<i64> {
    match value {
        JsonValue::Null => Ok(0),
        JsonValue::Number(number) => number
            .as_i64()
            .ok_or_else(|| ModelError::Query(format!("count is not an integer: {}", number))),
        JsonValue::String(text) => text
            .trim()
            .parse()
            .map_err(|_| ModelError::Query(format!("count is not an integer: {}", text))),
        other => Err(ModelError::Query(format!("unexpected count value: {}", other))),
    }
}

#[async_trait]
impl QueryExecutor for PgPool {
    async fn fetch_all(&self, sql: &str) -> ModelResult<Vec<ResultRow>> {
        let rows = sqlx::query(sql).fetch_all(self).await?;
        Ok(rows.iter().map(row_to_result).collect())
    }
}

/// Convert a PostgreSQL row into a [`ResultRow`] keyed by column name
fn row_to_result(row: &PgRow) -> ResultRow {
    use sqlx::{Column, Row};

    let mut result = ResultRow::new();
    for (i, column) in row.columns().iter().enumerate() {
        let value = if let Ok(value) = row.try_get::<Option<String>, _>(i) {
            value.map_or(JsonValue::Null, JsonValue::String)
        } else if let Ok(value) = row.try_get::<Option<i64>, _>(i) {
            value.map_or(JsonValue::Null, JsonValue::from)
        } else if let Ok(value) = row.try_get::<Option<i32>, _>(i) {
            value.map_or(JsonValue::Null, JsonValue::from)
        } else if let Ok(value) = row.try_get::<Option<f64>, _>(i) {
            value.map_or(JsonValue::Null, JsonValue::from)
        } else if let Ok(value) = row.try_get::<Option<f32>, _>(i) {
            value.map_or(JsonValue::Null, |v| JsonValue::from(v as f64))
        } else if let Ok(value) = row.try_get::<Option<bool>, _>(i) {
            value.map_or(JsonValue::Null, JsonValue::Bool)
        } else if let Ok(value) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(i) {
            value.map_or(JsonValue::Null, |v| JsonValue::String(v.to_rfc3339()))
        } else if let Ok(value) = row.try_get::<Option<uuid::Uuid>, _>(i) {
            value.map_or(JsonValue::Null, |v| JsonValue::String(v.to_string()))
        } else if let Ok(value) = row.try_get::<Option<JsonValue>, _>(i) {
            value.unwrap_or(JsonValue::Null)
        } else {
            JsonValue::Null
        };
        result.insert(column.name(), value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixed(Vec<ResultRow>);

    #[async_trait]
    impl QueryExecutor for Fixed {
        async fn fetch_all(&self, _sql: &str) -> ModelResult<Vec<ResultRow>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_default_fetch_count() {
        let numeric = Fixed(vec![ResultRow::from_pairs([("count", json!(3))])]);
        assert_eq!(numeric.fetch_count("SELECT COUNT(*)").await.unwrap(), 3);

        let text = Fixed(vec![ResultRow::from_pairs([("count", json!("7"))])]);
        assert_eq!(text.fetch_count("SELECT COUNT(*)").await.unwrap(), 7);

        assert_eq!(Fixed(Vec::new()).fetch_count("SELECT COUNT(*)").await.unwrap(), 0);

        let invalid = Fixed(vec![ResultRow::from_pairs([("count", json!(true))])]);
        assert!(invalid.fetch_count("SELECT COUNT(*)").await.is_err());
    }
}
