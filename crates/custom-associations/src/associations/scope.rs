//! Association Scope Resolver - lazy queries for one owner instance

use super::join::compile_joins;
use super::options::FilterContext;
use super::reflection::{AssociationMacro, Reflection};
use crate::error::{ModelError, ModelResult};
use crate::model::{ModelRegistry, Record};
use crate::query::{JoinKind, QueryBuilder};

/// Scope of a custom association for `owner`.
///
/// The joins and the filter are the whole linking condition: there is no
/// implicit key match between owner and target.
pub fn custom_scope(registry: &ModelRegistry, owner: &Record, reflection: &Reflection) -> ModelResult<QueryBuilder> {
    let target = reflection.target_class(registry)?;
    let table = reflection.target_table(registry)?;

    let mut scope = QueryBuilder::new()
        .select(&format!("{}.*", table))
        .from(&table)
        .join_clauses_from(compile_joins(reflection.joins(), JoinKind::Inner));

    if let Some(condition) = registry.type_condition(&target, &table) {
        scope = scope.where_condition(condition);
    }

    if let Some(type_column) = reflection.type_column() {
        scope = scope.where_eq(
            &format!("{}.{}", table, type_column),
            registry.base_class_name(owner.model()),
        );
    }

    if let Some(filter) = reflection.conditions() {
        for condition in filter.evaluate(&FilterContext::Owner(owner)) {
            scope = scope.where_condition(condition);
        }
    }

    Ok(apply_shaping(scope, reflection))
}

/// Scope of an ordinary foreign-key association for `owner`
pub fn standard_scope(registry: &ModelRegistry, owner: &Record, reflection: &Reflection) -> ModelResult<QueryBuilder> {
    let target = reflection.target_class(registry)?;
    let table = reflection.target_table(registry)?;
    let foreign_key = reflection.foreign_key().ok_or_else(|| {
        ModelError::Configuration(format!("association '{}' has no foreign key", reflection.name()))
    })?;

    let mut scope = QueryBuilder::new().select(&format!("{}.*", table)).from(&table);
    scope = match reflection.macro_kind() {
        AssociationMacro::BelongsTo => scope.where_eq(
            &format!("{}.{}", table, target.primary_key()),
            owner.attribute(foreign_key),
        ),
        _ => scope.where_eq(
            &format!("{}.{}", table, foreign_key),
            owner.id().cloned().unwrap_or_default(),
        ),
    };

    if let Some(condition) = registry.type_condition(&target, &table) {
        scope = scope.where_condition(condition);
    }

    if let Some(filter) = reflection.conditions() {
        for condition in filter.evaluate(&FilterContext::Owner(owner)) {
            scope = scope.where_condition(condition);
        }
    }

    Ok(apply_shaping(scope, reflection))
}

/// Apply the query-shaping options of a reflection
pub(crate) fn apply_shaping(mut scope: QueryBuilder, reflection: &Reflection) -> QueryBuilder {
    if let Some(select) = reflection.select() {
        scope = scope.reselect(select);
    }
    if let Some(order) = reflection.order() {
        scope = scope.order_by_raw(order);
    }
    if let Some(group) = reflection.group() {
        scope = scope.group_by(group);
    }
    if let Some(having) = reflection.having() {
        scope = scope.having_raw(having);
    }
    if let Some(limit) = reflection.limit() {
        scope = scope.limit(limit);
    }
    if let Some(offset) = reflection.offset() {
        scope = scope.offset(offset);
    }
    scope.readonly(reflection.is_readonly())
}
