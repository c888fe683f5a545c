//! Association resolvers - per-kind strategy hooks used by lazy and eager loading

use std::fmt;

use super::join::{compile_joins, Constraint};
use super::reflection::{AssociationMacro, Reflection};
use super::scope::{custom_scope, standard_scope};
use crate::error::{ModelError, ModelResult};
use crate::model::{ModelRegistry, Record};
use crate::query::{JoinClause, JoinKind, QueryBuilder, WhereCondition};

/// Write-path operations of an association object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteOperation {
    Writer,
    IdsWriter,
    SetOwnerAttributes,
    AddToTarget,
    SetNewRecord,
    Replace,
    ReplaceRecords,
    Build,
    BuildRecord,
    Create,
    CreateBang,
    Concat,
    CreateRecord,
    InsertRecord,
    ConcatRecords,
    DeleteAll,
    DestroyAll,
    Delete,
    Destroy,
    DeleteOrDestroy,
    RemoveRecords,
    DeleteRecords,
}

impl WriteOperation {
    pub const ALL: [WriteOperation; 22] = [
        WriteOperation::Writer,
        WriteOperation::IdsWriter,
        WriteOperation::SetOwnerAttributes,
        WriteOperation::AddToTarget,
        WriteOperation::SetNewRecord,
        WriteOperation::Replace,
        WriteOperation::ReplaceRecords,
        WriteOperation::Build,
        WriteOperation::BuildRecord,
        WriteOperation::Create,
        WriteOperation::CreateBang,
        WriteOperation::Concat,
        WriteOperation::CreateRecord,
        WriteOperation::InsertRecord,
        WriteOperation::ConcatRecords,
        WriteOperation::DeleteAll,
        WriteOperation::DestroyAll,
        WriteOperation::Delete,
        WriteOperation::Destroy,
        WriteOperation::DeleteOrDestroy,
        WriteOperation::RemoveRecords,
        WriteOperation::DeleteRecords,
    ];

    pub fn method_name(self) -> &'static str {
        match self {
            WriteOperation::Writer => "writer",
            WriteOperation::IdsWriter => "ids_writer",
            WriteOperation::SetOwnerAttributes => "set_owner_attributes",
            WriteOperation::AddToTarget => "add_to_target",
            WriteOperation::SetNewRecord => "set_new_record",
            WriteOperation::Replace => "replace",
            WriteOperation::ReplaceRecords => "replace_records",
            WriteOperation::Build => "build",
            WriteOperation::BuildRecord => "build_record",
            WriteOperation::Create => "create",
            WriteOperation::CreateBang => "create!",
            WriteOperation::Concat => "concat",
            WriteOperation::CreateRecord => "create_record",
            WriteOperation::InsertRecord => "insert_record",
            WriteOperation::ConcatRecords => "concat_records",
            WriteOperation::DeleteAll => "delete_all",
            WriteOperation::DestroyAll => "destroy_all",
            WriteOperation::Delete => "delete",
            WriteOperation::Destroy => "destroy",
            WriteOperation::DeleteOrDestroy => "delete_or_destroy",
            WriteOperation::RemoveRecords => "remove_records",
            WriteOperation::DeleteRecords => "delete_records",
        }
    }

    /// Statement family the persistence engine runs for this operation
    fn effect(self) -> WriteEffect {
        match self {
            WriteOperation::DeleteAll
            | WriteOperation::DestroyAll
            | WriteOperation::Delete
            | WriteOperation::Destroy
            | WriteOperation::DeleteOrDestroy
            | WriteOperation::DeleteRecords => WriteEffect::Delete,
            WriteOperation::Writer
            | WriteOperation::IdsWriter
            | WriteOperation::Replace
            | WriteOperation::ReplaceRecords
            | WriteOperation::RemoveRecords => WriteEffect::Nullify,
            WriteOperation::SetOwnerAttributes
            | WriteOperation::AddToTarget
            | WriteOperation::SetNewRecord
            | WriteOperation::Build
            | WriteOperation::BuildRecord
            | WriteOperation::Create
            | WriteOperation::CreateBang
            | WriteOperation::Concat
            | WriteOperation::CreateRecord
            | WriteOperation::InsertRecord
            | WriteOperation::ConcatRecords => WriteEffect::Insert,
        }
    }
}

impl fmt::Display for WriteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteEffect {
    Delete,
    Nullify,
    Insert,
}

/// Strategy hooks the loading machinery calls for one association kind
pub trait AssociationResolver: Send + Sync {
    /// Query used for lazy resolution against one owner
    fn scope(&self, registry: &ModelRegistry, owner: &Record, reflection: &Reflection) -> ModelResult<QueryBuilder>;

    /// Extra join clauses emitted before the target table in an eager query
    fn join_to(&self, reflection: &Reflection, kind: JoinKind) -> Vec<JoinClause>;

    /// ON-clause constraint between `target_alias` and `parent_alias`
    fn build_constraint(
        &self,
        registry: &ModelRegistry,
        reflection: &Reflection,
        target_alias: &str,
        parent_alias: &str,
    ) -> ModelResult<Constraint>;

    /// Whether the association can be loaded with a batched `WHERE key IN (...)` query
    fn supports_preloading(&self) -> bool;

    fn supports_write(&self, operation: WriteOperation) -> bool;

    /// Statement the persistence engine would run for a write operation
    fn write_statement(
        &self,
        registry: &ModelRegistry,
        owner: &Record,
        reflection: &Reflection,
        operation: WriteOperation,
    ) -> ModelResult<QueryBuilder>;

    /// Whether the owner carries the key linking it to its target
    fn foreign_key_present(&self, owner: &Record, reflection: &Reflection) -> bool;
}

/// Resolver for ordinary foreign-key associations
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardResolver;

/// Resolver for custom join associations
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomResolver;

static STANDARD: StandardResolver = StandardResolver;
static CUSTOM: CustomResolver = CustomResolver;

/// Pick the resolver for a reflection's kind
pub fn resolver_for(reflection: &Reflection) -> &'static dyn AssociationResolver {
    if reflection.is_custom() {
        &CUSTOM
    } else {
        &STANDARD
    }
}

fn type_constraint(registry: &ModelRegistry, reflection: &Reflection, target_alias: &str) -> ModelResult<Option<WhereCondition>> {
    let target = reflection.target_class(registry)?;
    Ok(registry.type_condition(&target, target_alias))
}

fn missing_foreign_key(reflection: &Reflection) -> ModelError {
    ModelError::Configuration(format!("association '{}' has no foreign key", reflection.name()))
}

impl AssociationResolver for StandardResolver {
    fn scope(&self, registry: &ModelRegistry, owner: &Record, reflection: &Reflection) -> ModelResult<QueryBuilder> {
        standard_scope(registry, owner, reflection)
    }

    fn join_to(&self, _reflection: &Reflection, _kind: JoinKind) -> Vec<JoinClause> {
        Vec::new()
    }

    fn build_constraint(
        &self,
        registry: &ModelRegistry,
        reflection: &Reflection,
        target_alias: &str,
        parent_alias: &str,
    ) -> ModelResult<Constraint> {
        let foreign_key = reflection.foreign_key().ok_or_else(|| missing_foreign_key(reflection))?;
        let key_match = match reflection.macro_kind() {
            AssociationMacro::BelongsTo => {
                let target = reflection.target_class(registry)?;
                WhereCondition::eq_column(
                    &format!("{}.{}", target_alias, target.primary_key()),
                    &format!("{}.{}", parent_alias, foreign_key),
                )
            }
            _ => {
                let owner = registry.model(reflection.owner())?;
                WhereCondition::eq_column(
                    &format!("{}.{}", target_alias, foreign_key),
                    &format!("{}.{}", parent_alias, owner.primary_key()),
                )
            }
        };

        let mut conditions = vec![key_match];
        conditions.extend(type_constraint(registry, reflection, target_alias)?);
        Ok(Constraint::Conditions(conditions))
    }

    fn supports_preloading(&self) -> bool {
        true
    }

    fn supports_write(&self, _operation: WriteOperation) -> bool {
        true
    }

    fn write_statement(
        &self,
        registry: &ModelRegistry,
        owner: &Record,
        reflection: &Reflection,
        operation: WriteOperation,
    ) -> ModelResult<QueryBuilder> {
        let foreign_key = reflection.foreign_key().ok_or_else(|| missing_foreign_key(reflection))?;
        let target = reflection.target_class(registry)?;
        let table = reflection.target_table(registry)?;
        let owner_id = owner.id().cloned().unwrap_or_default();

        let statement = match (reflection.macro_kind(), operation.effect()) {
            (AssociationMacro::BelongsTo, WriteEffect::Delete) => QueryBuilder::new()
                .delete_from(&table)
                .where_eq(target.primary_key(), owner.attribute(foreign_key)),
            (AssociationMacro::BelongsTo, WriteEffect::Nullify) => {
                let owner_class = registry.model(reflection.owner())?;
                QueryBuilder::new()
                    .update(owner_class.table_name())
                    .set_null(foreign_key)
                    .where_eq(owner_class.primary_key(), owner_id)
            }
            (AssociationMacro::BelongsTo, WriteEffect::Insert) => QueryBuilder::new().insert_into(&table),
            (_, WriteEffect::Delete) => QueryBuilder::new()
                .delete_from(&table)
                .where_eq(foreign_key, owner_id),
            (_, WriteEffect::Nullify) => QueryBuilder::new()
                .update(&table)
                .set_null(foreign_key)
                .where_eq(foreign_key, owner_id),
            (_, WriteEffect::Insert) => QueryBuilder::new().insert_into(&table).set(foreign_key, owner_id),
        };
        Ok(statement)
    }

    fn foreign_key_present(&self, owner: &Record, reflection: &Reflection) -> bool {
        match (reflection.macro_kind(), reflection.foreign_key()) {
            (AssociationMacro::BelongsTo, Some(foreign_key)) => {
                owner.get(foreign_key).map_or(false, |value| !value.is_null())
            }
            _ => false,
        }
    }
}

impl AssociationResolver for CustomResolver {
    fn scope(&self, registry: &ModelRegistry, owner: &Record, reflection: &Reflection) -> ModelResult<QueryBuilder> {
        custom_scope(registry, owner, reflection)
    }

    fn join_to(&self, reflection: &Reflection, kind: JoinKind) -> Vec<JoinClause> {
        compile_joins(reflection.joins(), kind)
    }

    /// Type condition when the target needs one, never a key match
    fn build_constraint(
        &self,
        registry: &ModelRegistry,
        reflection: &Reflection,
        target_alias: &str,
        _parent_alias: &str,
    ) -> ModelResult<Constraint> {
        Ok(Constraint::from(type_constraint(registry, reflection, target_alias)?))
    }

    fn supports_preloading(&self) -> bool {
        false
    }

    fn supports_write(&self, _operation: WriteOperation) -> bool {
        false
    }

    fn write_statement(
        &self,
        _registry: &ModelRegistry,
        _owner: &Record,
        reflection: &Reflection,
        operation: WriteOperation,
    ) -> ModelResult<QueryBuilder> {
        Err(ModelError::unsupported(operation.method_name(), reflection.name()))
    }

    fn foreign_key_present(&self, _owner: &Record, _reflection: &Reflection) -> bool {
        true
    }
}
