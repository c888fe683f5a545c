//! Query Builder SELECT operations

use super::builder::QueryBuilder;

impl QueryBuilder {
    /// Add SELECT fields to the query
    pub fn select(mut self, fields: &str) -> Self {
        if fields == "*" {
            self.select_fields.push("*".to_string());
        } else {
            self.select_fields.extend(
                fields
                    .split(',')
                    .map(|f| f.trim().to_string())
                    .filter(|f| !f.is_empty()),
            );
        }
        self
    }

    /// Replace the SELECT list
    pub fn reselect(mut self, fields: &str) -> Self {
        self.select_fields.clear();
        self.select(fields)
    }

    /// Clear the SELECT list
    pub fn unselect(mut self) -> Self {
        self.select_fields.clear();
        self
    }

    /// Add SELECT DISTINCT to the query
    pub fn select_distinct(mut self, fields: &str) -> Self {
        self.distinct = true;
        self.select(fields)
    }

    /// Add an aliased column to the SELECT list: `table.column AS alias`
    pub fn select_as(mut self, expression: &str, alias: &str) -> Self {
        self.select_fields.push(format!("{} AS {}", expression, alias));
        self
    }

    /// Set the FROM table
    pub fn from(mut self, table: &str) -> Self {
        self.from_tables = vec![table.to_string()];
        self
    }
}
