//! Capability bundles mixed into association objects

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::query::QueryBuilder;

/// A named method that refines the association scope
pub type ScopeMethod = Arc<dyn Fn(QueryBuilder) -> QueryBuilder + Send + Sync>;

/// Named set of scope methods exposed on an association
#[derive(Clone)]
pub struct ExtensionModule {
    name: String,
    methods: BTreeMap<String, ScopeMethod>,
}

impl ExtensionModule {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            methods: BTreeMap::new(),
        }
    }

    /// Add a method to the module
    pub fn method<F>(mut self, name: &str, method: F) -> Self
    where
        F: Fn(QueryBuilder) -> QueryBuilder + Send + Sync + 'static,
    {
        self.methods.insert(name.to_string(), Arc::new(method));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, method: &str) -> Option<&ScopeMethod> {
        self.methods.get(method)
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Apply `method` to a scope, `None` when the module does not define it
    pub fn apply(&self, method: &str, scope: QueryBuilder) -> Option<QueryBuilder> {
        self.methods.get(method).map(|m| m(scope))
    }
}

impl fmt::Debug for ExtensionModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionModule")
            .field("name", &self.name)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Inline extension block given at declaration time.
///
/// The declaration turns it into an `ExtensionModule` named after the owner
/// and the association.
#[derive(Clone, Default)]
pub struct ExtensionBlock {
    methods: BTreeMap<String, ScopeMethod>,
}

impl ExtensionBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method<F>(mut self, name: &str, method: F) -> Self
    where
        F: Fn(QueryBuilder) -> QueryBuilder + Send + Sync + 'static,
    {
        self.methods.insert(name.to_string(), Arc::new(method));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub(crate) fn into_module(self, name: &str) -> ExtensionModule {
        ExtensionModule {
            name: name.to_string(),
            methods: self.methods,
        }
    }
}

impl fmt::Debug for ExtensionBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionBlock")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_applies_method_to_scope() {
        let module = ExtensionModule::new("Sorting")
            .method("by_city", |scope| scope.order_by_raw("addresses.city"));

        let sql = module
            .apply("by_city", QueryBuilder::new().from("addresses"))
            .map(|q| q.to_sql());
        assert_eq!(sql.as_deref(), Some("SELECT * FROM addresses ORDER BY addresses.city"));
        assert!(module.apply("missing", QueryBuilder::new()).is_none());
    }

    #[test]
    fn test_block_becomes_named_module() {
        let module = ExtensionBlock::new()
            .method("florida", |scope| scope.where_eq("addresses.state", "FL"))
            .into_module("CustomerAddressesAssociationExtension");
        assert_eq!(module.name(), "CustomerAddressesAssociationExtension");
        assert_eq!(module.method_names().collect::<Vec<_>>(), vec!["florida"]);
    }
}
