//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use elif_custom_associations::{
    DeclarationOptions, ModelClass, ModelError, ModelRegistry, ModelResult, QueryExecutor, Record, ResultRow,
};
use serde_json::{json, Value};

/// Executor answering from canned responses and recording every statement
#[derive(Default)]
pub struct MemoryExecutor {
    rows: Vec<(String, Vec<ResultRow>)>,
    counts: Vec<(String, i64)>,
    log: Mutex<Vec<String>>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer statements containing `pattern` with `rows`; first match wins
    pub fn rows(mut self, pattern: &str, rows: Vec<ResultRow>) -> Self {
        self.rows.push((pattern.to_string(), rows));
        self
    }

    pub fn count(mut self, pattern: &str, count: i64) -> Self {
        self.counts.push((pattern.to_string(), count));
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.log.lock().unwrap().len()
    }
}

#[async_trait]
impl QueryExecutor for MemoryExecutor {
    async fn fetch_all(&self, sql: &str) -> ModelResult<Vec<ResultRow>> {
        self.log.lock().unwrap().push(sql.to_string());
        Ok(self
            .rows
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    async fn fetch_count(&self, sql: &str) -> ModelResult<i64> {
        self.log.lock().unwrap().push(sql.to_string());
        self.counts
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, count)| *count)
            .ok_or_else(|| ModelError::Query(format!("no canned count for: {}", sql)))
    }
}

pub fn row(value: Value) -> ResultRow {
    ResultRow::try_from(value).unwrap()
}

/// Customers reach their addresses through a `customer_addresses` link table
/// keyed by customer number rather than by id.
pub fn registry() -> ModelRegistry {
    let mut registry = ModelRegistry::new();
    registry.define(ModelClass::new("Customer", "customers").with_columns(["id", "customer_number"]));
    registry.define(ModelClass::new("Address", "addresses").with_columns(["id", "city"]));

    registry
        .declare_singular(
            "Customer",
            "address",
            DeclarationOptions::new()
                .joins(["INNER JOIN customer_addresses ON customer_addresses.address_id = addresses.id"])
                .conditions_fn(|ctx| vec![ctx.eq("customer_addresses.customer_number", "customer_number")])
                .inverse_of("customer"),
            None,
        )
        .unwrap();
    registry
        .declare_many(
            "Customer",
            "addresses",
            DeclarationOptions::new()
                .joins(["INNER JOIN customer_addresses ON customer_addresses.address_id = addresses.id"])
                .conditions_fn(|ctx| vec![ctx.eq("customer_addresses.customer_number", "customer_number")])
                .order("addresses.id"),
            None,
        )
        .unwrap();
    registry
}

pub fn customer(id: i64, number: &str) -> Arc<Record> {
    let attributes = json!({"id": id, "customer_number": number});
    Arc::new(Record::new("Customer", "id", attributes.as_object().cloned().unwrap()))
}

pub fn address(id: i64, city: &str) -> ResultRow {
    row(json!({"id": id, "city": city}))
}
