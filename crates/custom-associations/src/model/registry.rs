//! Model Registry - caller-owned catalog of model classes

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::class::{GeneratedMethod, ModelClass};
use super::record::Record;
use crate::associations::{
    Association, DeclarationOptions, ExtensionBlock, Reflection, WriteOperation,
};
use crate::config::AssociationConfig;
use crate::error::{ModelError, ModelResult};
use crate::execution::QueryExecutor;
use crate::loading::{EagerLoadRequest, EagerLoader};
use crate::query::{QueryBuilder, WhereCondition};

/// Result of invoking a generated method through the registry
#[derive(Debug, Clone)]
pub enum MethodOutput {
    Record(Option<Arc<Record>>),
    Records(Vec<Arc<Record>>),
    Ids(Vec<Value>),
    Statement(QueryBuilder),
}

/// Catalog of model classes, resolved by name.
///
/// Declarations mutate through `model_mut`, which replaces the stored class
/// when it is shared, so handed-out `Arc<ModelClass>` snapshots never change.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<ModelClass>>,
    config: AssociationConfig,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AssociationConfig) -> Self {
        Self {
            models: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &AssociationConfig {
        &self.config
    }

    /// Define (or redefine) a model class
    pub fn define(&mut self, mut class: ModelClass) -> Arc<ModelClass> {
        class.set_config(self.config.clone());
        let class = Arc::new(class);
        debug!("Defined model {} on table {}", class.name(), class.table_name());
        self.models.insert(class.name().to_string(), class.clone());
        class
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    pub fn model(&self, name: &str) -> ModelResult<Arc<ModelClass>> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::ModelNotFound(name.to_string()))
    }

    pub fn model_mut(&mut self, name: &str) -> ModelResult<&mut ModelClass> {
        self.models
            .get_mut(name)
            .map(Arc::make_mut)
            .ok_or_else(|| ModelError::ModelNotFound(name.to_string()))
    }

    pub fn declare_singular(
        &mut self,
        owner: &str,
        name: &str,
        options: DeclarationOptions,
        block: Option<ExtensionBlock>,
    ) -> ModelResult<Arc<Reflection>> {
        self.model_mut(owner)?.declare_singular(name, options, block)
    }

    pub fn declare_many(
        &mut self,
        owner: &str,
        name: &str,
        options: DeclarationOptions,
        block: Option<ExtensionBlock>,
    ) -> ModelResult<Arc<Reflection>> {
        self.model_mut(owner)?.declare_many(name, options, block)
    }

    /// Classes in `model`'s inheritance chain, starting with `model` itself
    fn ancestry(&self, model: &str) -> Vec<Arc<ModelClass>> {
        let mut chain = Vec::new();
        let mut current = self.models.get(model).cloned();
        while let Some(class) = current {
            if chain.len() > self.models.len() {
                break;
            }
            current = class.parent().and_then(|parent| self.models.get(parent).cloned());
            chain.push(class);
        }
        chain
    }

    /// Reflection declared on `model` or inherited from an ancestor
    pub fn reflection(&self, model: &str, name: &str) -> ModelResult<Arc<Reflection>> {
        if !self.contains(model) {
            return Err(ModelError::ModelNotFound(model.to_string()));
        }
        self.ancestry(model)
            .iter()
            .find_map(|class| class.reflect_on_association(name))
            .ok_or_else(|| ModelError::association_not_found(model, name))
    }

    fn generated_method(&self, model: &str, method: &str) -> Option<GeneratedMethod> {
        self.ancestry(model)
            .iter()
            .find_map(|class| class.method(method).cloned())
    }

    /// All classes inheriting, directly or not, from `model`
    pub fn descendants(&self, model: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        let mut frontier = vec![model.to_string()];
        while let Some(current) = frontier.pop() {
            for class in self.models.values() {
                if class.parent() == Some(current.as_str()) && !found.iter().any(|n| n == class.name()) {
                    found.push(class.name().to_string());
                    frontier.push(class.name().to_string());
                }
            }
        }
        found.sort();
        found
    }

    /// Root of the inheritance chain; unknown models are their own base
    pub fn base_class_name(&self, model: &str) -> String {
        self.ancestry(model)
            .last()
            .map(|class| class.name().to_string())
            .unwrap_or_else(|| model.to_string())
    }

    /// `table.type IN (class, descendants...)` for inheriting classes
    pub fn type_condition(&self, class: &ModelClass, table: &str) -> Option<WhereCondition> {
        if !class.finder_needs_type_condition() {
            return None;
        }
        let mut names = vec![Value::from(class.name())];
        names.extend(self.descendants(class.name()).into_iter().map(Value::from));
        Some(WhereCondition::in_list(
            &format!("{}.{}", table, class.inheritance_column()),
            names,
        ))
    }

    /// Association object for `name` on `owner`
    pub fn association(&self, owner: &Arc<Record>, name: &str) -> ModelResult<Association<'_>> {
        let reflection = self.reflection(owner.model(), name)?;
        Ok(Association::new(self, owner.clone(), reflection))
    }

    /// Dispatch a generated method such as `address`, `address_ids` or `addresses=`
    pub async fn invoke(
        &self,
        owner: &Arc<Record>,
        method: &str,
        executor: &dyn QueryExecutor,
    ) -> ModelResult<MethodOutput> {
        let generated = self.generated_method(owner.model(), method).ok_or_else(|| {
            ModelError::unsupported(method, method.trim_end_matches('='))
        })?;
        let association = self.association(owner, generated.association())?;

        match generated {
            GeneratedMethod::Reader { .. } => match association {
                Association::Singular(singular) => Ok(MethodOutput::Record(singular.reader(executor).await?)),
                Association::Collection(collection) => Ok(MethodOutput::Records(collection.load(executor).await?)),
            },
            GeneratedMethod::IdsReader { .. } => {
                let collection = association.into_collection()?;
                Ok(MethodOutput::Ids(collection.ids(executor).await?))
            }
            GeneratedMethod::Writer { .. } => Ok(MethodOutput::Statement(association.perform(WriteOperation::Writer)?)),
            GeneratedMethod::IdsWriter { .. } => {
                Ok(MethodOutput::Statement(association.perform(WriteOperation::IdsWriter)?))
            }
        }
    }

    /// Load root records with their requested associations
    pub async fn load(
        &self,
        request: &EagerLoadRequest,
        executor: &dyn QueryExecutor,
    ) -> ModelResult<Vec<Arc<Record>>> {
        EagerLoader::new(self).load(request, executor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        registry.define(ModelClass::new("Address", "addresses"));
        registry.define(ModelClass::new("HomeAddress", "addresses").inherits_from("Address"));
        registry.define(ModelClass::new("Cottage", "addresses").inherits_from("HomeAddress"));
        registry.define(ModelClass::new("Customer", "customers"));
        registry
    }

    #[test]
    fn test_inheritance_queries() {
        let registry = registry();
        assert_eq!(registry.descendants("Address"), vec!["Cottage", "HomeAddress"]);
        assert_eq!(registry.base_class_name("Cottage"), "Address");
        assert_eq!(registry.base_class_name("Unknown"), "Unknown");

        let address = registry.model("Address").unwrap();
        assert!(registry.type_condition(&address, "addresses").is_none());

        let home = registry.model("HomeAddress").unwrap();
        assert_eq!(
            registry.type_condition(&home, "t1").map(|c| c.to_sql()).as_deref(),
            Some("t1.type IN ('HomeAddress', 'Cottage')")
        );
    }

    #[test]
    fn test_snapshots_survive_declarations() {
        let mut registry = registry();
        let before = registry.model("Customer").unwrap();
        registry
            .declare_singular("Customer", "address", DeclarationOptions::new().joins(["customer_addresses"]), None)
            .unwrap();

        assert!(before.reflect_on_association("address").is_none());
        assert!(registry.reflection("Customer", "address").is_ok());
    }

    #[test]
    fn test_reflections_are_inherited() {
        let mut registry = registry();
        registry
            .declare_many("Address", "residents", DeclarationOptions::new().joins(["residencies"]), None)
            .unwrap();
        assert!(registry.reflection("Cottage", "residents").is_ok());
        assert!(matches!(
            registry.reflection("Cottage", "owners"),
            Err(ModelError::AssociationNotFound { .. })
        ));
        assert!(matches!(
            registry.reflection("Nope", "owners"),
            Err(ModelError::ModelNotFound(_))
        ));
    }
}
