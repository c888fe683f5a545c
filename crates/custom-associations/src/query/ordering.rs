//! Query Builder ORDER BY, GROUP BY, HAVING operations

use serde_json::Value;
use super::builder::QueryBuilder;
use super::types::*;

impl QueryBuilder {
    /// Add ORDER BY clause (ascending)
    pub fn order_by(mut self, column: &str) -> Self {
        self.order_by.push(format!("{} {}", column, OrderDirection::Asc));
        self
    }

    /// Add ORDER BY clause (descending)
    pub fn order_by_desc(mut self, column: &str) -> Self {
        self.order_by.push(format!("{} {}", column, OrderDirection::Desc));
        self
    }

    /// Add a literal ORDER BY fragment such as `addresses.created_at DESC, id`
    pub fn order_by_raw(mut self, fragment: &str) -> Self {
        if !fragment.trim().is_empty() {
            self.order_by.push(fragment.trim().to_string());
        }
        self
    }

    /// Remove all ORDER BY clauses
    pub fn unorder(mut self) -> Self {
        self.order_by.clear();
        self
    }

    /// Add GROUP BY clause
    pub fn group_by(mut self, column: &str) -> Self {
        if !column.trim().is_empty() {
            self.group_by.push(column.trim().to_string());
        }
        self
    }

    /// Add HAVING equality clause
    pub fn having_eq<T: Into<Value>>(mut self, column: &str, value: T) -> Self {
        self.having_conditions.push(WhereCondition::eq(column, value));
        self
    }

    /// Add raw HAVING clause
    pub fn having_raw(mut self, condition: &str) -> Self {
        if !condition.trim().is_empty() {
            self.having_conditions.push(WhereCondition::raw(condition));
        }
        self
    }
}
