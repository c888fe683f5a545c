//! Query Builder - Core builder implementation

use super::types::*;

/// Query builder for constructing database queries
#[derive(Debug, Clone, PartialEq)]
pub struct QueryBuilder {
    pub(crate) query_type: QueryType,
    pub(crate) select_fields: Vec<String>,
    pub(crate) from_tables: Vec<String>,
    pub(crate) insert_table: Option<String>,
    pub(crate) update_table: Option<String>,
    pub(crate) delete_table: Option<String>,
    pub(crate) set_clauses: Vec<SetClause>,
    pub(crate) where_conditions: Vec<WhereCondition>,
    pub(crate) joins: Vec<JoinClause>,
    pub(crate) order_by: Vec<String>,
    pub(crate) group_by: Vec<String>,
    pub(crate) having_conditions: Vec<WhereCondition>,
    pub(crate) limit_count: Option<i64>,
    pub(crate) offset_value: Option<i64>,
    pub(crate) distinct: bool,
    pub(crate) readonly: bool,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    /// Create a new query builder
    pub fn new() -> Self {
        Self {
            query_type: QueryType::Select,
            select_fields: Vec::new(),
            from_tables: Vec::new(),
            insert_table: None,
            update_table: None,
            delete_table: None,
            set_clauses: Vec::new(),
            where_conditions: Vec::new(),
            joins: Vec::new(),
            order_by: Vec::new(),
            group_by: Vec::new(),
            having_conditions: Vec::new(),
            limit_count: None,
            offset_value: None,
            distinct: false,
            readonly: false,
        }
    }

    /// The FROM table, if set
    pub fn table(&self) -> Option<&str> {
        self.from_tables.first().map(String::as_str)
    }

    /// WHERE conditions applied so far
    pub fn conditions(&self) -> &[WhereCondition] {
        &self.where_conditions
    }

    /// JOIN clauses applied so far, in order
    pub fn join_clauses(&self) -> &[JoinClause] {
        &self.joins
    }

    /// LIMIT value, if any
    pub fn limit_value(&self) -> Option<i64> {
        self.limit_count
    }

    /// Whether records loaded through this query are read-only
    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Mark records loaded through this query as read-only
    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    /// Whether the query carries any WHERE condition or JOIN
    pub fn is_filtered(&self) -> bool {
        !self.where_conditions.is_empty() || !self.joins.is_empty()
    }
}
