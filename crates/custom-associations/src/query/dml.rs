//! Query Builder DML operations (INSERT, UPDATE, DELETE)
//!
//! Only used to describe the statements the persistence engine runs for
//! ordinary associations; custom associations never produce them.

use super::builder::QueryBuilder;
use super::types::*;
use serde_json::Value;

impl QueryBuilder {
    /// Start an INSERT query
    pub fn insert_into(mut self, table: &str) -> Self {
        self.query_type = QueryType::Insert;
        self.insert_table = Some(table.to_string());
        self
    }

    /// Start an UPDATE query
    pub fn update(mut self, table: &str) -> Self {
        self.query_type = QueryType::Update;
        self.update_table = Some(table.to_string());
        self
    }

    /// Start a DELETE query
    pub fn delete_from(mut self, table: &str) -> Self {
        self.query_type = QueryType::Delete;
        self.delete_table = Some(table.to_string());
        self
    }

    /// Set a column value (for INSERT/UPDATE)
    pub fn set<T: Into<Value>>(mut self, column: &str, value: T) -> Self {
        self.set_clauses.push(SetClause {
            column: column.to_string(),
            value: Some(value.into()),
        });
        self
    }

    /// Set a column to NULL (for INSERT/UPDATE)
    pub fn set_null(mut self, column: &str) -> Self {
        self.set_clauses.push(SetClause {
            column: column.to_string(),
            value: None,
        });
        self
    }

    /// Statement type
    pub fn query_type(&self) -> QueryType {
        self.query_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_foreign_key_statements() {
        let nullify = QueryBuilder::new()
            .update("orders")
            .set_null("customer_id")
            .where_eq("customer_id", json!(1));
        assert_eq!(nullify.query_type(), QueryType::Update);
        assert_eq!(nullify.to_sql(), "UPDATE orders SET customer_id = NULL WHERE customer_id = 1");

        let insert = QueryBuilder::new().insert_into("orders").set("customer_id", json!(1));
        assert_eq!(insert.to_sql(), "INSERT INTO orders (customer_id) VALUES (1)");
        assert_eq!(QueryBuilder::new().insert_into("orders").to_sql(), "INSERT INTO orders DEFAULT VALUES");

        let delete = QueryBuilder::new().delete_from("orders").where_eq("customer_id", json!("a'b"));
        assert_eq!(delete.to_sql(), "DELETE FROM orders WHERE customer_id = 'a''b'");
    }
}
