//! Query Builder SQL generation

use super::builder::QueryBuilder;
use super::types::*;

impl QueryBuilder {
    /// Convert the query to a SQL string with inlined literals
    pub fn to_sql(&self) -> String {
        match self.query_type {
            QueryType::Select => self.build_select_sql(),
            QueryType::Insert => self.build_insert_sql(),
            QueryType::Update => self.build_update_sql(),
            QueryType::Delete => self.build_delete_sql(),
        }
    }

    /// SQL counting the rows this query would return, ignoring ordering and pagination.
    ///
    /// Grouped and DISTINCT projections are counted through a subquery.
    pub fn to_count_sql(&self) -> String {
        let base = self.clone().unorder().unpaginate();
        if base.group_by.is_empty() && !base.is_distinct() {
            base.reselect("COUNT(*)").to_sql()
        } else {
            format!("SELECT COUNT(*) FROM ({}) AS counted", base.to_sql())
        }
    }

    /// Whether the projection removes duplicate rows, either via `select_distinct`
    /// or a raw `DISTINCT ...` select fragment
    pub fn is_distinct(&self) -> bool {
        self.distinct
            || self.select_fields.first().map_or(false, |field| {
                field
                    .split_whitespace()
                    .next()
                    .map_or(false, |word| word.eq_ignore_ascii_case("distinct"))
            })
    }

    /// SQL selecting a single column from the rows this query would return
    pub fn to_pluck_sql(&self, column: &str) -> String {
        self.clone().reselect(column).to_sql()
    }

    /// Build SELECT SQL
    fn build_select_sql(&self) -> String {
        let mut sql = String::new();

        // SELECT clause
        if self.distinct {
            sql.push_str("SELECT DISTINCT ");
        } else {
            sql.push_str("SELECT ");
        }

        if self.select_fields.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.select_fields.join(", "));
        }

        // FROM clause
        if !self.from_tables.is_empty() {
            sql.push_str(" FROM ");
            sql.push_str(&self.from_tables.join(", "));
        }

        // JOIN clauses
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(&join.to_sql());
        }

        self.build_where_clause(&mut sql);

        // GROUP BY clause
        if !self.group_by.is_empty() {
            sql.push_str(&format!(" GROUP BY {}", self.group_by.join(", ")));
        }

        // HAVING clause
        if !self.having_conditions.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&Self::join_conditions(&self.having_conditions));
        }

        self.build_order_limit_clause(&mut sql);

        sql
    }

    /// Build INSERT SQL
    fn build_insert_sql(&self) -> String {
        let mut sql = String::new();

        if let Some(table) = &self.insert_table {
            sql.push_str(&format!("INSERT INTO {}", table));

            if !self.set_clauses.is_empty() {
                let columns: Vec<&str> = self.set_clauses.iter().map(|c| c.column.as_str()).collect();
                let values: Vec<String> = self
                    .set_clauses
                    .iter()
                    .map(|c| c.value.as_ref().map_or_else(|| "NULL".to_string(), quote_value))
                    .collect();
                sql.push_str(&format!(" ({}) VALUES ({})", columns.join(", "), values.join(", ")));
            } else {
                sql.push_str(" DEFAULT VALUES");
            }
        }

        sql
    }

    /// Build UPDATE SQL
    fn build_update_sql(&self) -> String {
        let mut sql = String::new();

        if let Some(table) = &self.update_table {
            sql.push_str(&format!("UPDATE {}", table));

            if !self.set_clauses.is_empty() {
                let assignments: Vec<String> = self
                    .set_clauses
                    .iter()
                    .map(|c| {
                        let value = c.value.as_ref().map_or_else(|| "NULL".to_string(), quote_value);
                        format!("{} = {}", c.column, value)
                    })
                    .collect();
                sql.push_str(" SET ");
                sql.push_str(&assignments.join(", "));
            }

            self.build_where_clause(&mut sql);
        }

        sql
    }

    /// Build DELETE SQL
    fn build_delete_sql(&self) -> String {
        let mut sql = String::new();

        if let Some(table) = &self.delete_table {
            sql.push_str(&format!("DELETE FROM {}", table));
            self.build_where_clause(&mut sql);
        }

        sql
    }

    /// Helper method to build WHERE clauses
    fn build_where_clause(&self, sql: &mut String) {
        if !self.where_conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&Self::join_conditions(&self.where_conditions));
        }
    }

    fn join_conditions(conditions: &[WhereCondition]) -> String {
        conditions
            .iter()
            .map(|condition| match condition {
                // Raw fragments may contain OR, keep their precedence local
                WhereCondition::Raw(sql) if conditions.len() > 1 => format!("({})", sql),
                other => other.to_sql(),
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// Helper method to build ORDER BY and LIMIT clauses
    fn build_order_limit_clause(&self, sql: &mut String) {
        // ORDER BY clause
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }

        // LIMIT clause
        if let Some(limit) = self.limit_count {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        // OFFSET clause
        if let Some(offset) = self.offset_value {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
    }
}
