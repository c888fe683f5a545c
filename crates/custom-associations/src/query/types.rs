//! Query Builder Types - Core types and enums for query building

use std::fmt;
use serde_json::Value;

/// Query operator types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Like,
    NotLike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOperator::Equal => write!(f, "="),
            QueryOperator::NotEqual => write!(f, "!="),
            QueryOperator::GreaterThan => write!(f, ">"),
            QueryOperator::GreaterThanOrEqual => write!(f, ">="),
            QueryOperator::LessThan => write!(f, "<"),
            QueryOperator::LessThanOrEqual => write!(f, "<="),
            QueryOperator::Like => write!(f, "LIKE"),
            QueryOperator::NotLike => write!(f, "NOT LIKE"),
            QueryOperator::In => write!(f, "IN"),
            QueryOperator::NotIn => write!(f, "NOT IN"),
            QueryOperator::IsNull => write!(f, "IS NULL"),
            QueryOperator::IsNotNull => write!(f, "IS NOT NULL"),
        }
    }
}

/// Right-hand side of a comparison: a literal or another column
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Value),
    Column(String),
}

impl Operand {
    pub fn to_sql(&self) -> String {
        match self {
            Operand::Value(value) => quote_value(value),
            Operand::Column(column) => column.clone(),
        }
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

/// Where clause condition
#[derive(Debug, Clone, PartialEq)]
pub enum WhereCondition {
    /// `column <op> operand`; comparing against NULL renders IS NULL / IS NOT NULL
    Compare {
        column: String,
        operator: QueryOperator,
        operand: Operand,
    },
    /// `column IN (...)` / `column NOT IN (...)`
    List {
        column: String,
        negated: bool,
        values: Vec<Value>,
    },
    /// `column IS NULL` / `column IS NOT NULL`
    Null { column: String, negated: bool },
    /// Raw SQL fragment, used verbatim
    Raw(String),
}

impl WhereCondition {
    /// `column = value`
    pub fn eq<T: Into<Value>>(column: &str, value: T) -> Self {
        WhereCondition::Compare {
            column: column.to_string(),
            operator: QueryOperator::Equal,
            operand: Operand::Value(value.into()),
        }
    }

    /// `column = other_column`
    pub fn eq_column(column: &str, other: &str) -> Self {
        WhereCondition::Compare {
            column: column.to_string(),
            operator: QueryOperator::Equal,
            operand: Operand::Column(other.to_string()),
        }
    }

    /// `column IN (values)`
    pub fn in_list(column: &str, values: Vec<Value>) -> Self {
        WhereCondition::List {
            column: column.to_string(),
            negated: false,
            values,
        }
    }

    /// Raw SQL predicate
    pub fn raw(sql: &str) -> Self {
        WhereCondition::Raw(sql.to_string())
    }

    /// Render the condition with inlined literals
    pub fn to_sql(&self) -> String {
        match self {
            WhereCondition::Compare { column, operator, operand } => match (operator, operand) {
                (QueryOperator::Equal, Operand::Value(Value::Null)) => format!("{} IS NULL", column),
                (QueryOperator::NotEqual, Operand::Value(Value::Null)) => {
                    format!("{} IS NOT NULL", column)
                }
                _ => format!("{} {} {}", column, operator, operand.to_sql()),
            },
            WhereCondition::List { column, negated, values } => {
                // An empty IN list can never match; an empty NOT IN always does
                if values.is_empty() {
                    return if *negated { "1=1".to_string() } else { "1=0".to_string() };
                }
                let rendered: Vec<String> = values.iter().map(quote_value).collect();
                let operator = if *negated { QueryOperator::NotIn } else { QueryOperator::In };
                format!("{} {} ({})", column, operator, rendered.join(", "))
            }
            WhereCondition::Null { column, negated } => {
                let operator = if *negated { QueryOperator::IsNotNull } else { QueryOperator::IsNull };
                format!("{} {}", column, operator)
            }
            WhereCondition::Raw(sql) => sql.clone(),
        }
    }
}

/// Join types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    LeftOuter,
    Right,
    Full,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER JOIN"),
            JoinType::LeftOuter => write!(f, "LEFT OUTER JOIN"),
            JoinType::Right => write!(f, "RIGHT JOIN"),
            JoinType::Full => write!(f, "FULL JOIN"),
        }
    }
}

/// Join kind requested by the surrounding query context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Outer,
}

impl From<JoinKind> for JoinType {
    fn from(kind: JoinKind) -> Self {
        match kind {
            JoinKind::Inner => JoinType::Inner,
            JoinKind::Outer => JoinType::LeftOuter,
        }
    }
}

/// Join clause
#[derive(Debug, Clone, PartialEq)]
pub enum JoinClause {
    /// Literal join clause, including its join keyword
    Raw(String),
    /// Structured join against a table
    Table {
        join_type: JoinType,
        table: String,
        alias: Option<String>,
        on: Vec<WhereCondition>,
    },
    /// Join against a parenthesized join tree: `JOIN (table alias <joins>) ON ...`
    Nested {
        join_type: JoinType,
        table: String,
        alias: Option<String>,
        joins: Vec<JoinClause>,
        on: Vec<WhereCondition>,
    },
}

impl JoinClause {
    pub fn to_sql(&self) -> String {
        match self {
            JoinClause::Raw(sql) => sql.clone(),
            JoinClause::Table { join_type, table, alias, on } => {
                let mut sql = format!("{} {}", join_type, table);
                if let Some(alias) = alias {
                    sql.push(' ');
                    sql.push_str(alias);
                }
                push_on(&mut sql, on);
                sql
            }
            JoinClause::Nested { join_type, table, alias, joins, on } => {
                let mut sql = format!("{} ({}", join_type, table);
                if let Some(alias) = alias {
                    sql.push(' ');
                    sql.push_str(alias);
                }
                for join in joins {
                    sql.push(' ');
                    sql.push_str(&join.to_sql());
                }
                sql.push(')');
                push_on(&mut sql, on);
                sql
            }
        }
    }
}

fn push_on(sql: &mut String, on: &[WhereCondition]) {
    if on.is_empty() {
        return;
    }
    let conditions: Vec<String> = on
        .iter()
        .map(|condition| match condition {
            WhereCondition::Raw(raw) if on.len() > 1 => format!("({})", raw),
            other => other.to_sql(),
        })
        .collect();
    sql.push_str(" ON ");
    sql.push_str(&conditions.join(" AND "));
}

/// Order by direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Asc => write!(f, "ASC"),
            OrderDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// Query types supported by the builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
}

/// Set clause for UPDATE and INSERT operations
#[derive(Debug, Clone, PartialEq)]
pub struct SetClause {
    pub column: String,
    pub value: Option<Value>, // None for NULL values
}

/// Format a value as an inlined SQL literal
pub fn quote_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s.replace('\'', "''")), // Escape single quotes
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string().to_uppercase(),
        Value::Null => "NULL".to_string(),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}
