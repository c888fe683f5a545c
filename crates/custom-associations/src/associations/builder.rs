//! Association Declaration Builder
//!
//! Validates declaration options, freezes them into a `Reflection`, turns an
//! inline extension block into a named module and registers the generated
//! reader methods on the owner class.

use std::sync::Arc;

use tracing::{debug, warn};

use super::extension::{ExtensionBlock, ExtensionModule};
use super::options::{DeclarationOptions, OptionValue};
use super::reflection::{AssociationMacro, Cardinality, Reflection};
use crate::config::RedeclarationPolicy;
use crate::error::{ModelError, ModelResult};
use crate::inflection::{camelize, class_name_for, demodulize, foreign_key_for, parent_namespace, singularize};
use crate::model::{GeneratedMethod, ModelClass};

/// Builds and registers one association on an owner class
pub struct AssociationBuilder<'a> {
    owner: &'a mut ModelClass,
    macro_kind: AssociationMacro,
    name: String,
    options: DeclarationOptions,
    block: Option<ExtensionBlock>,
}

impl<'a> AssociationBuilder<'a> {
    pub fn new(
        owner: &'a mut ModelClass,
        macro_kind: AssociationMacro,
        name: &str,
        options: DeclarationOptions,
    ) -> Self {
        Self {
            owner,
            macro_kind,
            name: name.to_string(),
            options,
            block: None,
        }
    }

    /// Attach an inline extension block
    pub fn with_block(mut self, block: Option<ExtensionBlock>) -> Self {
        self.block = block;
        self
    }

    /// Validate, build and register the reflection
    pub fn build(mut self) -> ModelResult<Arc<Reflection>> {
        self.validate_options()?;

        let mut reflection = self.create_reflection()?;
        if let Some(block) = self.block.take() {
            let module = self.define_block_extension(block)?;
            reflection.extensions.push(module);
        }

        for warning in reflection.validation_warnings() {
            if self.owner.config().warn_on_unfiltered {
                warn!("{}", warning);
            }
        }

        let reflection = Arc::new(reflection);
        self.define_readers(&reflection);
        self.define_writers(&reflection);
        self.owner.insert_reflection(reflection.clone());

        debug!(
            "Declared {} :{} on {} (target {})",
            reflection.macro_kind(),
            reflection.name(),
            self.owner.name(),
            reflection.class_name()
        );

        Ok(reflection)
    }

    fn validate_options(&self) -> ModelResult<()> {
        let valid = self.macro_kind.valid_options();
        for key in self.options.keys() {
            if !valid.iter().any(|valid_key| *valid_key == key) {
                return Err(ModelError::InvalidOption {
                    key: key.to_string(),
                    association: self.name.clone(),
                    valid: valid.iter().map(|k| format!(":{}", k)).collect::<Vec<_>>().join(", "),
                });
            }
        }
        Ok(())
    }

    fn create_reflection(&self) -> ModelResult<Reflection> {
        let options = &self.options;

        let joins = match options.get("joins") {
            None => Vec::new(),
            Some(OptionValue::Joins(entries)) => entries.clone(),
            Some(OptionValue::Text(clause)) => vec![clause.as_str().into()],
            Some(other) => return Err(other.mismatch("joins", "join clauses")),
        };

        let conditions = match options.get("conditions") {
            None => None,
            Some(OptionValue::Filter(filter)) => Some(filter.clone()),
            Some(other) => return Err(other.mismatch("conditions", "a filter")),
        };

        let extensions = match options.get("extend") {
            None => Vec::new(),
            Some(OptionValue::Extend(modules)) => modules.clone(),
            Some(other) => return Err(other.mismatch("extend", "extension modules")),
        };

        let foreign_key = if self.macro_kind.is_custom() {
            None
        } else {
            Some(match options.text("foreign_key")? {
                Some(column) => column,
                None if self.macro_kind == AssociationMacro::BelongsTo => format!("{}_id", self.name),
                None => foreign_key_for(self.owner.name()),
            })
        };

        Ok(Reflection {
            macro_kind: self.macro_kind,
            name: self.name.clone(),
            owner: self.owner.name().to_string(),
            class_name: options
                .text("class_name")?
                .unwrap_or_else(|| class_name_for(&self.name)),
            table_name: options.text("table_name")?,
            foreign_key,
            select: options.text("select")?,
            joins,
            conditions,
            order: options.text("order")?,
            group: options.text("group")?,
            having: options.text("having")?,
            limit: options.integer("limit")?,
            offset: options.integer("offset")?,
            readonly: options.flag("readonly")?,
            polymorphic_as: options.text("as")?,
            inverse_of: options.text("inverse_of")?,
            extensions,
            finder_sql: options.sql("finder_sql")?,
            counter_sql: options.sql("counter_sql")?,
            options: options.clone(),
        })
    }

    /// `{Owner}{Name}AssociationExtension`, qualified with the owner's namespace
    fn extension_module_name(&self) -> String {
        let module = format!(
            "{}{}AssociationExtension",
            demodulize(self.owner.name()),
            camelize(&self.name)
        );
        match parent_namespace(self.owner.name()) {
            Some(namespace) => format!("{}::{}", namespace, module),
            None => module,
        }
    }

    fn define_block_extension(&mut self, block: ExtensionBlock) -> ModelResult<Arc<ExtensionModule>> {
        let module_name = self.extension_module_name();

        if self.owner.extension_module(&module_name).is_some() {
            match self.owner.config().redeclaration {
                RedeclarationPolicy::Reject => {
                    return Err(ModelError::Redeclaration { module: module_name });
                }
                RedeclarationPolicy::Overwrite => {
                    debug!("Redefining extension module {}", module_name);
                }
            }
        }

        let module = Arc::new(block.into_module(&module_name));
        self.owner.insert_extension(module.clone());
        Ok(module)
    }

    fn define_readers(&mut self, reflection: &Reflection) {
        let name = reflection.name().to_string();
        self.owner
            .define_method(&name, GeneratedMethod::Reader { association: name.clone() });

        let ids_reader = format!("{}_ids", singularize(&name));
        if reflection.cardinality() == Cardinality::Many {
            self.owner
                .define_method(&ids_reader, GeneratedMethod::IdsReader { association: name.clone() });
        } else if matches!(
            self.owner.method(&ids_reader),
            Some(GeneratedMethod::IdsReader { association }) if *association == name
        ) {
            // Left over from an earlier collection declaration of the same name
            self.owner.remove_method(&ids_reader);
        }
    }

    /// Custom associations are read-only: the writer is removed, never defined
    fn define_writers(&mut self, reflection: &Reflection) {
        let name = reflection.name();
        let writer = format!("{}=", name);
        let ids_writer = format!("{}_ids=", singularize(name));

        if reflection.is_custom() {
            self.owner.remove_method(&writer);
            self.owner.remove_method(&ids_writer);
            return;
        }

        self.owner
            .define_method(&writer, GeneratedMethod::Writer { association: name.to_string() });
        if reflection.cardinality() == Cardinality::Many {
            self.owner
                .define_method(&ids_writer, GeneratedMethod::IdsWriter { association: name.to_string() });
        }
    }
}
