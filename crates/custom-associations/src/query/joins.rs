//! Query Builder JOIN operations

use super::builder::QueryBuilder;
use super::types::*;

impl QueryBuilder {
    /// Add INNER JOIN to the query
    pub fn join(mut self, table: &str, left_col: &str, right_col: &str) -> Self {
        self.joins.push(JoinClause::Table {
            join_type: JoinType::Inner,
            table: table.to_string(),
            alias: None,
            on: vec![WhereCondition::eq_column(left_col, right_col)],
        });
        self
    }

    /// Add LEFT OUTER JOIN to the query
    pub fn left_join(mut self, table: &str, left_col: &str, right_col: &str) -> Self {
        self.joins.push(JoinClause::Table {
            join_type: JoinType::LeftOuter,
            table: table.to_string(),
            alias: None,
            on: vec![WhereCondition::eq_column(left_col, right_col)],
        });
        self
    }

    /// Add a literal join clause, used verbatim
    pub fn join_raw(mut self, clause: &str) -> Self {
        self.joins.push(JoinClause::Raw(clause.to_string()));
        self
    }

    /// Add an already-built join clause
    pub fn join_clause(mut self, clause: JoinClause) -> Self {
        self.joins.push(clause);
        self
    }

    /// Add several join clauses in order
    pub fn join_clauses_from<I>(mut self, clauses: I) -> Self
    where
        I: IntoIterator<Item = JoinClause>,
    {
        self.joins.extend(clauses);
        self
    }
}
