//! Preloader - batched `WHERE key IN (...)` loading for ordinary associations

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::include_graph::IncludeGraph;
use crate::associations::{resolver_for, AssociationMacro, Cardinality, FilterContext, Reflection};
use crate::error::{ModelError, ModelResult};
use crate::execution::QueryExecutor;
use crate::model::{identity_key, ModelRegistry, Record};
use crate::query::{QueryBuilder, WhereCondition};

/// Loads an include graph level by level, one query per association and filter
pub struct Preloader<'r> {
    registry: &'r ModelRegistry,
}

impl<'r> Preloader<'r> {
    pub fn new(registry: &'r ModelRegistry) -> Self {
        Self { registry }
    }

    pub async fn preload(
        &self,
        records: &[Arc<Record>],
        graph: &IncludeGraph,
        executor: &dyn QueryExecutor,
    ) -> ModelResult<()> {
        let mut queue = VecDeque::from([(records.to_vec(), graph.clone())]);

        while let Some((owners, graph)) = queue.pop_front() {
            let first = match owners.first() {
                Some(first) => first.clone(),
                None => continue,
            };

            for node in graph.nodes() {
                let reflection = self.registry.reflection(first.model(), &node.name)?;
                if !resolver_for(&reflection).supports_preloading() {
                    return Err(ModelError::Configuration(format!(
                        "association '{}' cannot be preloaded",
                        reflection.name()
                    )));
                }

                let targets = self.preload_association(&owners, &reflection, executor).await?;
                if !node.children.is_empty() {
                    queue.push_back((targets, node.children.clone()));
                }
            }
        }

        Ok(())
    }

    /// Load one association for `owners`, returning the distinct targets
    async fn preload_association(
        &self,
        owners: &[Arc<Record>],
        reflection: &Reflection,
        executor: &dyn QueryExecutor,
    ) -> ModelResult<Vec<Arc<Record>>> {
        let target = reflection.target_class(self.registry)?;
        let table = reflection.target_table(self.registry)?;
        let foreign_key = reflection.foreign_key().ok_or_else(|| {
            ModelError::Configuration(format!("association '{}' has no foreign key", reflection.name()))
        })?;

        let belongs_to = reflection.macro_kind() == AssociationMacro::BelongsTo;
        let key_column = if belongs_to { target.primary_key() } else { foreign_key };
        let owner_key = |owner: &Record| -> Option<Value> {
            if belongs_to {
                owner.get(foreign_key).filter(|v| !v.is_null()).cloned()
            } else {
                owner.id().cloned()
            }
        };

        // Owner-aware conditions split the owners into batches sharing one filter
        let mut batches: Vec<(Vec<WhereCondition>, Vec<Arc<Record>>)> = Vec::new();
        for owner in owners {
            let conditions = reflection
                .conditions()
                .map(|filter| filter.evaluate(&FilterContext::Owner(owner)))
                .unwrap_or_default();
            match batches.iter_mut().find(|(existing, _)| *existing == conditions) {
                Some((_, batch)) => batch.push(owner.clone()),
                None => batches.push((conditions, vec![owner.clone()])),
            }
        }

        let mut loaded = Vec::new();
        let mut seen = HashSet::new();

        for (conditions, batch) in batches {
            let mut key_set = HashSet::new();
            let keys: Vec<Value> = batch
                .iter()
                .filter_map(|owner| owner_key(&**owner))
                .filter(|key| identity_key(key).map_or(false, |k| key_set.insert(k)))
                .collect();

            let mut by_key: HashMap<String, Vec<Arc<Record>>> = HashMap::new();
            if !keys.is_empty() {
                let mut query = QueryBuilder::new()
                    .select(&format!("{}.*", table))
                    .from(&table)
                    .where_in(&format!("{}.{}", table, key_column), keys);
                if let Some(condition) = self.registry.type_condition(&target, &table) {
                    query = query.where_condition(condition);
                }
                for condition in conditions {
                    query = query.where_condition(condition);
                }
                if let Some(select) = reflection.select() {
                    query = query.reselect(select);
                }
                if let Some(order) = reflection.order() {
                    query = query.order_by_raw(order);
                }

                let sql = query.to_sql();
                debug!("Preloading {}: {}", reflection.name(), sql);
                for row in executor.fetch_all(&sql).await? {
                    let record = target.instantiate_row(&row, reflection.is_readonly());
                    if let Some(key) = record.get(key_column).and_then(identity_key) {
                        by_key.entry(key).or_default().push(record);
                    }
                }
            }

            for owner in &batch {
                let mut matches = owner_key(&**owner)
                    .and_then(|key| identity_key(&key))
                    .and_then(|key| by_key.get(&key).cloned())
                    .unwrap_or_default();
                if reflection.cardinality() == Cardinality::Single {
                    matches.truncate(1);
                }

                if let Some(inverse) = reflection.inverse_of() {
                    for record in &matches {
                        record.set_inverse(inverse, owner);
                    }
                }
                match reflection.cardinality() {
                    Cardinality::Single => owner.set_target(reflection.name(), matches.first().cloned()),
                    Cardinality::Many => owner.set_collection(reflection.name(), matches.clone()),
                }

                for record in matches {
                    if seen.insert(Arc::as_ptr(&record) as usize) {
                        loaded.push(record);
                    }
                }
            }
        }

        Ok(loaded)
    }
}
