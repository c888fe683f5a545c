//! Model classes - table metadata, association table and generated methods

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::record::Record;
use super::row::ResultRow;
use crate::associations::{
    AssociationBuilder, AssociationMacro, DeclarationOptions, ExtensionBlock, ExtensionModule,
    Reflection, ValidationWarning,
};
use crate::config::AssociationConfig;
use crate::error::ModelResult;

/// A method generated on the owner class by an association declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedMethod {
    /// `name` - the association reader
    Reader { association: String },
    /// `singular_ids` - target primary keys of a collection
    IdsReader { association: String },
    /// `name=` - only defined for ordinary associations
    Writer { association: String },
    /// `singular_ids=` - only defined for ordinary collections
    IdsWriter { association: String },
}

impl GeneratedMethod {
    pub fn association(&self) -> &str {
        match self {
            GeneratedMethod::Reader { association }
            | GeneratedMethod::IdsReader { association }
            | GeneratedMethod::Writer { association }
            | GeneratedMethod::IdsWriter { association } => association,
        }
    }
}

/// Metadata for one model class.
///
/// The association, method and extension tables are immutable snapshots;
/// a declaration builds a new map and swaps it in.
#[derive(Debug, Clone)]
pub struct ModelClass {
    name: String,
    table_name: String,
    primary_key: String,
    columns: Vec<String>,
    parent: Option<String>,
    inheritance_column: String,
    associations: Arc<BTreeMap<String, Arc<Reflection>>>,
    methods: Arc<BTreeMap<String, GeneratedMethod>>,
    extensions: Arc<BTreeMap<String, Arc<ExtensionModule>>>,
    config: AssociationConfig,
}

impl ModelClass {
    pub fn new(name: &str, table_name: &str) -> Self {
        Self {
            name: name.to_string(),
            table_name: table_name.to_string(),
            primary_key: "id".to_string(),
            columns: Vec::new(),
            parent: None,
            inheritance_column: "type".to_string(),
            associations: Arc::new(BTreeMap::new()),
            methods: Arc::new(BTreeMap::new()),
            extensions: Arc::new(BTreeMap::new()),
            config: AssociationConfig::default(),
        }
    }

    pub fn with_primary_key(mut self, primary_key: &str) -> Self {
        self.primary_key = primary_key.to_string();
        self
    }

    /// Column list, used to alias columns in eager-load queries
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Single-table inheritance: this class is stored in its parent's table
    pub fn inherits_from(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    pub fn with_inheritance_column(mut self, column: &str) -> Self {
        self.inheritance_column = column.to_string();
        self
    }

    pub fn with_config(mut self, config: AssociationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn inheritance_column(&self) -> &str {
        &self.inheritance_column
    }

    pub fn config(&self) -> &AssociationConfig {
        &self.config
    }

    pub(crate) fn set_config(&mut self, config: AssociationConfig) {
        self.config = config;
    }

    /// Subclasses in an inheritance hierarchy need a type condition on queries
    pub fn finder_needs_type_condition(&self) -> bool {
        self.parent.is_some()
    }

    pub fn reflect_on_association(&self, name: &str) -> Option<Arc<Reflection>> {
        self.associations.get(name).cloned()
    }

    /// Snapshot of the association table
    pub fn associations(&self) -> Arc<BTreeMap<String, Arc<Reflection>>> {
        self.associations.clone()
    }

    pub fn method(&self, name: &str) -> Option<&GeneratedMethod> {
        self.methods.get(name)
    }

    pub fn responds_to(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn extension_module(&self, name: &str) -> Option<Arc<ExtensionModule>> {
        self.extensions.get(name).cloned()
    }

    pub fn validation_warnings(&self) -> Vec<ValidationWarning> {
        self.associations
            .values()
            .flat_map(|reflection| reflection.validation_warnings())
            .collect()
    }

    /// Declare a custom singular association
    pub fn declare_singular(
        &mut self,
        name: &str,
        options: DeclarationOptions,
        block: Option<ExtensionBlock>,
    ) -> ModelResult<Arc<Reflection>> {
        AssociationBuilder::new(self, AssociationMacro::HasOneCustom, name, options)
            .with_block(block)
            .build()
    }

    /// Declare a custom collection association
    pub fn declare_many(
        &mut self,
        name: &str,
        options: DeclarationOptions,
        block: Option<ExtensionBlock>,
    ) -> ModelResult<Arc<Reflection>> {
        AssociationBuilder::new(self, AssociationMacro::HasManyCustom, name, options)
            .with_block(block)
            .build()
    }

    pub fn has_one(&mut self, name: &str, options: DeclarationOptions) -> ModelResult<Arc<Reflection>> {
        AssociationBuilder::new(self, AssociationMacro::HasOne, name, options).build()
    }

    pub fn has_many(&mut self, name: &str, options: DeclarationOptions) -> ModelResult<Arc<Reflection>> {
        AssociationBuilder::new(self, AssociationMacro::HasMany, name, options).build()
    }

    pub fn belongs_to(&mut self, name: &str, options: DeclarationOptions) -> ModelResult<Arc<Reflection>> {
        AssociationBuilder::new(self, AssociationMacro::BelongsTo, name, options).build()
    }

    pub(crate) fn insert_reflection(&mut self, reflection: Arc<Reflection>) {
        let mut associations = (*self.associations).clone();
        associations.insert(reflection.name().to_string(), reflection);
        self.associations = Arc::new(associations);
    }

    pub(crate) fn define_method(&mut self, name: &str, method: GeneratedMethod) {
        let mut methods = (*self.methods).clone();
        methods.insert(name.to_string(), method);
        self.methods = Arc::new(methods);
    }

    pub(crate) fn remove_method(&mut self, name: &str) {
        if self.methods.contains_key(name) {
            let mut methods = (*self.methods).clone();
            methods.remove(name);
            self.methods = Arc::new(methods);
        }
    }

    pub(crate) fn insert_extension(&mut self, module: Arc<ExtensionModule>) {
        let mut extensions = (*self.extensions).clone();
        extensions.insert(module.name().to_string(), module);
        self.extensions = Arc::new(extensions);
    }

    /// Build a record of this class from an attribute map.
    ///
    /// A non-empty inheritance column names the concrete class.
    pub fn instantiate(&self, attributes: Map<String, Value>, readonly: bool) -> Arc<Record> {
        let model = attributes
            .get(&self.inheritance_column)
            .and_then(Value::as_str)
            .filter(|model| !model.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.name.clone());
        Arc::new(Record::new(&model, &self.primary_key, attributes).with_readonly(readonly))
    }

    /// Build a record from a plain (unaliased) result row
    pub fn instantiate_row(&self, row: &ResultRow, readonly: bool) -> Arc<Record> {
        let attributes = row
            .columns()
            .map(|(column, value)| (column.clone(), value.clone()))
            .collect();
        self.instantiate(attributes, readonly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_declaration_swaps_association_table() {
        let mut customer = ModelClass::new("Customer", "customers");
        let before = customer.associations();

        customer
            .declare_singular(
                "address",
                DeclarationOptions::new().joins(["customer_addresses"]),
                None,
            )
            .unwrap();

        assert!(before.is_empty());
        assert!(customer.reflect_on_association("address").is_some());
    }

    #[test]
    fn test_redeclaration_replaces_reflection() {
        let mut customer = ModelClass::new("Customer", "customers");
        customer
            .declare_many("addresses", DeclarationOptions::new().limit(5), None)
            .unwrap();
        customer
            .declare_many("addresses", DeclarationOptions::new().limit(2), None)
            .unwrap();

        let reflection = customer.reflect_on_association("addresses").unwrap();
        assert_eq!(reflection.limit(), Some(2));
        assert_eq!(customer.associations().len(), 1);
    }

    #[test]
    fn test_instantiate_uses_inheritance_column() {
        let address = ModelClass::new("Address", "addresses");
        let attrs = json!({"id": 3, "type": "HomeAddress"}).as_object().cloned().unwrap();
        let record = address.instantiate(attrs, false);
        assert_eq!(record.model(), "HomeAddress");

        let plain = address.instantiate(json!({"id": 4}).as_object().cloned().unwrap(), true);
        assert_eq!(plain.model(), "Address");
        assert!(plain.is_readonly());
    }
}
