//! Query Builder Module - Relation builder used by association scopes and eager-load plans
//!
//! The builder is a plain value: every method consumes and returns it, so a
//! reflection's scope can be cloned and refined per owner without sharing state.

pub mod builder;
pub mod dml;
pub mod joins;
pub mod ordering;
pub mod pagination;
pub mod select;
pub mod sql_generation;
pub mod types;
pub mod where_clause;

pub use builder::QueryBuilder;
pub use types::{
    quote_value, JoinClause, JoinKind, JoinType, Operand, OrderDirection, QueryOperator, QueryType,
    SetClause, WhereCondition,
};
