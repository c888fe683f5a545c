//! Association objects - lazy readers bound to one owner

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::reflection::{Cardinality, Reflection};
use super::resolver::{resolver_for, AssociationResolver, WriteOperation};
use crate::error::{ModelError, ModelResult};
use crate::execution::QueryExecutor;
use crate::model::{ModelRegistry, Record, ResultRow};
use crate::query::QueryBuilder;

/// State shared by singular and collection associations
#[derive(Clone)]
struct AssociationCore<'r> {
    registry: &'r ModelRegistry,
    owner: Arc<Record>,
    reflection: Arc<Reflection>,
    resolver: &'static dyn AssociationResolver,
}

impl<'r> AssociationCore<'r> {
    fn scope(&self) -> ModelResult<QueryBuilder> {
        self.resolver.scope(self.registry, &self.owner, &self.reflection)
    }

    fn perform(&self, operation: WriteOperation) -> ModelResult<QueryBuilder> {
        self.resolver
            .write_statement(self.registry, &self.owner, &self.reflection, operation)
    }

    fn foreign_key_present(&self) -> bool {
        self.resolver.foreign_key_present(&self.owner, &self.reflection)
    }

    /// Apply an extension method to the scope; later modules shadow earlier ones
    fn extension(&self, method: &str) -> ModelResult<QueryBuilder> {
        let scope = self.scope()?;
        self.reflection
            .extensions()
            .iter()
            .rev()
            .find(|module| module.get(method).is_some())
            .and_then(|module| module.apply(method, scope))
            .ok_or_else(|| ModelError::unsupported(method, self.reflection.name()))
    }

    fn instantiate(&self, rows: &[ResultRow], readonly: bool) -> ModelResult<Vec<Arc<Record>>> {
        let target = self.reflection.target_class(self.registry)?;
        let readonly = readonly || self.reflection.is_readonly();
        let records: Vec<Arc<Record>> = rows
            .iter()
            .map(|row| target.instantiate_row(row, readonly))
            .collect();
        for record in &records {
            self.set_inverse_instance(record);
        }
        Ok(records)
    }

    fn set_inverse_instance(&self, record: &Arc<Record>) {
        if let Some(inverse) = self.reflection.inverse_of() {
            record.set_inverse(inverse, &self.owner);
        }
    }
}

/// An association object for one owner
pub enum Association<'r> {
    Singular(SingularAssociation<'r>),
    Collection(CollectionAssociation<'r>),
}

impl<'r> Association<'r> {
    pub(crate) fn new(registry: &'r ModelRegistry, owner: Arc<Record>, reflection: Arc<Reflection>) -> Self {
        let core = AssociationCore {
            registry,
            owner,
            resolver: resolver_for(&reflection),
            reflection,
        };
        match core.reflection.cardinality() {
            Cardinality::Single => Association::Singular(SingularAssociation { core }),
            Cardinality::Many => Association::Collection(CollectionAssociation { core }),
        }
    }

    fn core(&self) -> &AssociationCore<'r> {
        match self {
            Association::Singular(singular) => &singular.core,
            Association::Collection(collection) => &collection.core,
        }
    }

    pub fn reflection(&self) -> &Arc<Reflection> {
        &self.core().reflection
    }

    pub fn owner(&self) -> &Arc<Record> {
        &self.core().owner
    }

    pub fn scope(&self) -> ModelResult<QueryBuilder> {
        self.core().scope()
    }

    /// Run a write-path operation; custom associations reject every one
    pub fn perform(&self, operation: WriteOperation) -> ModelResult<QueryBuilder> {
        self.core().perform(operation)
    }

    pub fn foreign_key_present(&self) -> bool {
        self.core().foreign_key_present()
    }

    pub fn extension(&self, method: &str) -> ModelResult<QueryBuilder> {
        self.core().extension(method)
    }

    pub fn reset(&self) {
        let core = self.core();
        core.owner.reset_association(core.reflection.name());
    }

    pub fn into_singular(self) -> ModelResult<SingularAssociation<'r>> {
        match self {
            Association::Singular(singular) => Ok(singular),
            Association::Collection(collection) => Err(ModelError::Configuration(format!(
                "association '{}' is a collection",
                collection.core.reflection.name()
            ))),
        }
    }

    pub fn into_collection(self) -> ModelResult<CollectionAssociation<'r>> {
        match self {
            Association::Collection(collection) => Ok(collection),
            Association::Singular(singular) => Err(ModelError::Configuration(format!(
                "association '{}' is not a collection",
                singular.core.reflection.name()
            ))),
        }
    }
}

/// Association resolving to at most one target
pub struct SingularAssociation<'r> {
    core: AssociationCore<'r>,
}

impl<'r> SingularAssociation<'r> {
    pub fn reflection(&self) -> &Arc<Reflection> {
        &self.core.reflection
    }

    pub fn scope(&self) -> ModelResult<QueryBuilder> {
        self.core.scope()
    }

    /// Cached target, loading it on first access
    pub async fn reader(&self, executor: &dyn QueryExecutor) -> ModelResult<Option<Arc<Record>>> {
        let name = self.core.reflection.name();
        if self.core.owner.is_loaded(name) {
            return Ok(self.core.owner.loaded_target(name));
        }

        let scope = self.scope()?.limit(1);
        let sql = scope.to_sql();
        debug!("Loading {} for {}: {}", name, self.core.owner.model(), sql);

        let rows = executor.fetch_all(&sql).await?;
        let target = self
            .core
            .instantiate(&rows[..rows.len().min(1)], scope.is_readonly())?
            .into_iter()
            .next();
        self.core.owner.set_target(name, target.clone());
        Ok(target)
    }

    /// Forget the cached target and load it again
    pub async fn reload(&self, executor: &dyn QueryExecutor) -> ModelResult<Option<Arc<Record>>> {
        self.reset();
        self.reader(executor).await
    }

    pub fn reset(&self) {
        self.core.owner.reset_association(self.core.reflection.name());
    }

    pub fn perform(&self, operation: WriteOperation) -> ModelResult<QueryBuilder> {
        self.core.perform(operation)
    }

    pub fn foreign_key_present(&self) -> bool {
        self.core.foreign_key_present()
    }

    pub fn extension(&self, method: &str) -> ModelResult<QueryBuilder> {
        self.core.extension(method)
    }
}

/// Association resolving to an ordered, read-only collection
pub struct CollectionAssociation<'r> {
    core: AssociationCore<'r>,
}

impl<'r> CollectionAssociation<'r> {
    pub fn reflection(&self) -> &Arc<Reflection> {
        &self.core.reflection
    }

    pub fn scope(&self) -> ModelResult<QueryBuilder> {
        self.core.scope()
    }

    pub fn is_loaded(&self) -> bool {
        self.core.owner.is_loaded(self.core.reflection.name())
    }

    /// Cached records, loading them on first access
    pub async fn load(&self, executor: &dyn QueryExecutor) -> ModelResult<Vec<Arc<Record>>> {
        let name = self.core.reflection.name();
        if let Some(records) = self.core.owner.loaded_collection(name) {
            return Ok(records);
        }

        let (sql, readonly) = match self.core.reflection.finder_sql() {
            Some(finder) => (finder.interpolate(&self.core.owner), false),
            None => {
                let scope = self.scope()?;
                (scope.to_sql(), scope.is_readonly())
            }
        };
        debug!("Loading {} for {}: {}", name, self.core.owner.model(), sql);

        let rows = executor.fetch_all(&sql).await?;
        let records = self.core.instantiate(&rows, readonly)?;
        self.core.owner.set_collection(name, records.clone());
        Ok(records)
    }

    /// Primary keys of the targets, without instantiating them when not loaded
    pub async fn ids(&self, executor: &dyn QueryExecutor) -> ModelResult<Vec<Value>> {
        if self.is_loaded() || self.core.reflection.finder_sql().is_some() {
            let records = self.load(executor).await?;
            return Ok(records.iter().filter_map(|r| r.id().cloned()).collect());
        }

        let target = self.core.reflection.target_class(self.core.registry)?;
        let table = self.core.reflection.target_table(self.core.registry)?;
        let primary_key = target.primary_key();
        let sql = self.scope()?.to_pluck_sql(&format!("{}.{}", table, primary_key));
        debug!("Plucking {} ids: {}", self.core.reflection.name(), sql);

        let rows = executor.fetch_all(&sql).await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                row.non_null(primary_key)
                    .or_else(|| row.columns().next().map(|(_, value)| value))
                    .filter(|value| !value.is_null())
                    .cloned()
            })
            .collect())
    }

    /// Number of targets; a zero count also marks the collection loaded and empty
    pub async fn count(&self, executor: &dyn QueryExecutor) -> ModelResult<i64> {
        let reflection = &self.core.reflection;
        let sql = match (reflection.counter_sql(), reflection.finder_sql()) {
            (Some(counter), _) => counter.interpolate(&self.core.owner),
            (None, Some(finder)) => finder.count_template().interpolate(&self.core.owner),
            (None, None) => self.scope()?.to_count_sql(),
        };
        debug!("Counting {}: {}", reflection.name(), sql);

        let count = executor.fetch_count(&sql).await?;
        if count == 0 && !self.is_loaded() {
            self.core.owner.set_collection(reflection.name(), Vec::new());
        }

        Ok(match reflection.limit() {
            Some(limit) => count.min(limit),
            None => count,
        })
    }

    /// Length of the cached collection, or a count query when not loaded
    pub async fn size(&self, executor: &dyn QueryExecutor) -> ModelResult<i64> {
        match self.core.owner.loaded_collection(self.core.reflection.name()) {
            Some(records) => Ok(records.len() as i64),
            None => self.count(executor).await,
        }
    }

    pub async fn is_empty(&self, executor: &dyn QueryExecutor) -> ModelResult<bool> {
        Ok(self.size(executor).await? == 0)
    }

    /// Whether `record` is one of the targets
    pub async fn contains(&self, record: &Record, executor: &dyn QueryExecutor) -> ModelResult<bool> {
        let identity = match record.identity() {
            Some(identity) => identity,
            None => return Ok(false),
        };

        if self.is_loaded() || self.core.reflection.finder_sql().is_some() {
            let records = self.load(executor).await?;
            return Ok(records.iter().any(|r| r.identity().as_deref() == Some(identity.as_str())));
        }

        let target = self.core.reflection.target_class(self.core.registry)?;
        let table = self.core.reflection.target_table(self.core.registry)?;
        let sql = self
            .scope()?
            .where_eq(
                &format!("{}.{}", table, target.primary_key()),
                record.id().cloned().unwrap_or_default(),
            )
            .to_count_sql();
        Ok(executor.fetch_count(&sql).await? > 0)
    }

    pub fn reset(&self) {
        self.core.owner.reset_association(self.core.reflection.name());
    }

    pub fn perform(&self, operation: WriteOperation) -> ModelResult<QueryBuilder> {
        self.core.perform(operation)
    }

    pub fn foreign_key_present(&self) -> bool {
        self.core.foreign_key_present()
    }

    pub fn extension(&self, method: &str) -> ModelResult<QueryBuilder> {
        self.core.extension(method)
    }
}
