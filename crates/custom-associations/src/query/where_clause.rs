//! Query Builder WHERE clause operations

use super::builder::QueryBuilder;
use super::types::*;
use serde_json::Value;

impl QueryBuilder {
    /// Add WHERE condition with equality
    pub fn where_eq<T>(mut self, column: &str, value: T) -> Self
    where
        T: Into<Value>,
    {
        self.where_conditions.push(WhereCondition::eq(column, value));
        self
    }

    /// Add WHERE condition with not equal
    pub fn where_ne<T: Into<Value>>(mut self, column: &str, value: T) -> Self {
        self.where_conditions.push(WhereCondition::Compare {
            column: column.to_string(),
            operator: QueryOperator::NotEqual,
            operand: Operand::Value(value.into()),
        });
        self
    }

    /// Add WHERE condition comparing two columns
    pub fn where_column(mut self, column: &str, operator: QueryOperator, other: &str) -> Self {
        self.where_conditions.push(WhereCondition::Compare {
            column: column.to_string(),
            operator,
            operand: Operand::Column(other.to_string()),
        });
        self
    }

    /// Add WHERE IN condition
    pub fn where_in(mut self, column: &str, values: Vec<Value>) -> Self {
        self.where_conditions.push(WhereCondition::in_list(column, values));
        self
    }

    /// Add WHERE NOT IN condition
    pub fn where_not_in(mut self, column: &str, values: Vec<Value>) -> Self {
        self.where_conditions.push(WhereCondition::List {
            column: column.to_string(),
            negated: true,
            values,
        });
        self
    }

    /// Add WHERE IS NULL condition
    pub fn where_null(mut self, column: &str) -> Self {
        self.where_conditions.push(WhereCondition::Null {
            column: column.to_string(),
            negated: false,
        });
        self
    }

    /// Add WHERE IS NOT NULL condition
    pub fn where_not_null(mut self, column: &str) -> Self {
        self.where_conditions.push(WhereCondition::Null {
            column: column.to_string(),
            negated: true,
        });
        self
    }

    /// Add raw WHERE condition
    pub fn where_raw(mut self, condition: &str) -> Self {
        self.where_conditions.push(WhereCondition::raw(condition));
        self
    }

    /// Add an already-built condition
    pub fn where_condition(mut self, condition: WhereCondition) -> Self {
        self.where_conditions.push(condition);
        self
    }
}
