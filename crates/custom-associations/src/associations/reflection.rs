//! Association Reflection - Frozen metadata for one declared association

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::extension::ExtensionModule;
use super::options::{DeclarationOptions, FilterSpec, JoinEntry, SqlTemplate};
use crate::error::ModelResult;
use crate::model::{ModelClass, ModelRegistry};

/// Option keys shared by every association macro
const BASE_OPTIONS: &[&str] = &[
    "class_name",
    "foreign_key",
    "select",
    "conditions",
    "readonly",
    "validate",
    "extend",
];

const HAS_ONE_OPTIONS: &[&str] = &["order", "inverse_of"];
const HAS_MANY_OPTIONS: &[&str] = &["order", "group", "having", "limit", "offset", "inverse_of"];
const BELONGS_TO_OPTIONS: &[&str] = &["inverse_of"];

/// Keys custom associations drop from the base set
const CUSTOM_EXCLUDED: &[&str] = &["foreign_key", "validate"];
const CUSTOM_OPTIONS: &[&str] = &[
    "as",
    "table_name",
    "joins",
    "order",
    "group",
    "having",
    "limit",
    "offset",
    "inverse_of",
];
const HAS_MANY_CUSTOM_OPTIONS: &[&str] = &["finder_sql", "counter_sql"];

/// The declaring macro of an association
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationMacro {
    HasOne,
    HasMany,
    BelongsTo,
    HasOneCustom,
    HasManyCustom,
}

impl AssociationMacro {
    /// Returns true for associations resolved through joins and filters
    pub fn is_custom(self) -> bool {
        matches!(self, Self::HasOneCustom | Self::HasManyCustom)
    }

    pub fn cardinality(self) -> Cardinality {
        match self {
            Self::HasMany | Self::HasManyCustom => Cardinality::Many,
            Self::HasOne | Self::BelongsTo | Self::HasOneCustom => Cardinality::Single,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::HasOne => "has_one",
            Self::HasMany => "has_many",
            Self::BelongsTo => "belongs_to",
            Self::HasOneCustom => "has_one_custom",
            Self::HasManyCustom => "has_many_custom",
        }
    }

    /// Option keys accepted by this macro, in reporting order
    pub fn valid_options(self) -> Vec<&'static str> {
        let base = BASE_OPTIONS.iter().copied();
        match self {
            Self::HasOne => base.chain(HAS_ONE_OPTIONS.iter().copied()).collect(),
            Self::HasMany => base.chain(HAS_MANY_OPTIONS.iter().copied()).collect(),
            Self::BelongsTo => base.chain(BELONGS_TO_OPTIONS.iter().copied()).collect(),
            Self::HasOneCustom | Self::HasManyCustom => {
                let mut keys: Vec<&'static str> = base
                    .filter(|key| !CUSTOM_EXCLUDED.contains(key))
                    .chain(CUSTOM_OPTIONS.iter().copied())
                    .collect();
                if self == Self::HasManyCustom {
                    keys.extend(HAS_MANY_CUSTOM_OPTIONS.iter().copied());
                }
                keys
            }
        }
    }
}

impl fmt::Display for AssociationMacro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of targets an association resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    Single,
    Many,
}

/// A non-fatal problem found in a declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    /// A custom association without any filter resolves to the whole target table
    Unfiltered {
        model: String,
        association: String,
        has_joins: bool,
    },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::Unfiltered { model, association, has_joins } => {
                write!(
                    f,
                    "{}#{} declares no conditions and resolves to the unfiltered target relation",
                    model, association
                )?;
                if *has_joins {
                    f.write_str(" unless its joins constrain it")?;
                }
                Ok(())
            }
        }
    }
}

/// Immutable description of one declared association
#[derive(Debug, Clone)]
pub struct Reflection {
    pub(crate) macro_kind: AssociationMacro,
    pub(crate) name: String,
    pub(crate) owner: String,
    pub(crate) class_name: String,
    pub(crate) table_name: Option<String>,
    pub(crate) foreign_key: Option<String>,
    pub(crate) select: Option<String>,
    pub(crate) joins: Vec<JoinEntry>,
    pub(crate) conditions: Option<FilterSpec>,
    pub(crate) order: Option<String>,
    pub(crate) group: Option<String>,
    pub(crate) having: Option<String>,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
    pub(crate) readonly: bool,
    pub(crate) polymorphic_as: Option<String>,
    pub(crate) inverse_of: Option<String>,
    pub(crate) extensions: Vec<Arc<ExtensionModule>>,
    pub(crate) finder_sql: Option<SqlTemplate>,
    pub(crate) counter_sql: Option<SqlTemplate>,
    pub(crate) options: DeclarationOptions,
}

impl Reflection {
    pub fn macro_kind(&self) -> AssociationMacro {
        self.macro_kind
    }

    pub fn cardinality(&self) -> Cardinality {
        self.macro_kind.cardinality()
    }

    pub fn is_collection(&self) -> bool {
        self.cardinality() == Cardinality::Many
    }

    pub fn is_custom(&self) -> bool {
        self.macro_kind.is_custom()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the declaring model
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn foreign_key(&self) -> Option<&str> {
        self.foreign_key.as_deref()
    }

    pub fn joins(&self) -> &[JoinEntry] {
        &self.joins
    }

    pub fn conditions(&self) -> Option<&FilterSpec> {
        self.conditions.as_ref()
    }

    pub fn select(&self) -> Option<&str> {
        self.select.as_deref()
    }

    pub fn order(&self) -> Option<&str> {
        self.order.as_deref()
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn having(&self) -> Option<&str> {
        self.having.as_deref()
    }

    pub fn limit(&self) -> Option<i64> {
        self.limit
    }

    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Polymorphic role name given with `as`
    pub fn polymorphic_as(&self) -> Option<&str> {
        self.polymorphic_as.as_deref()
    }

    /// Polymorphic type column, `<as>_type`
    pub fn type_column(&self) -> Option<String> {
        self.polymorphic_as.as_ref().map(|role| format!("{}_type", role))
    }

    pub fn inverse_of(&self) -> Option<&str> {
        self.inverse_of.as_deref()
    }

    pub fn extensions(&self) -> &[Arc<ExtensionModule>] {
        &self.extensions
    }

    pub fn finder_sql(&self) -> Option<&SqlTemplate> {
        self.finder_sql.as_ref()
    }

    pub fn counter_sql(&self) -> Option<&SqlTemplate> {
        self.counter_sql.as_ref()
    }

    /// Options as declared
    pub fn options(&self) -> &DeclarationOptions {
        &self.options
    }

    /// Resolve the target class; classes may be defined after the declaring model
    pub fn target_class(&self, registry: &ModelRegistry) -> ModelResult<Arc<ModelClass>> {
        registry.model(&self.class_name)
    }

    /// Table the association joins against: `table_name` or the target's table
    pub fn target_table(&self, registry: &ModelRegistry) -> ModelResult<String> {
        match &self.table_name {
            Some(table) => Ok(table.clone()),
            None => Ok(self.target_class(registry)?.table_name().to_string()),
        }
    }

    pub fn validation_warnings(&self) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        if self.is_custom() && self.conditions.is_none() && self.finder_sql.is_none() {
            warnings.push(ValidationWarning::Unfiltered {
                model: self.owner.clone(),
                association: self.name.clone(),
                has_joins: !self.joins.is_empty(),
            });
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_option_keys() {
        let keys = AssociationMacro::HasOneCustom.valid_options();
        assert!(keys.contains(&"joins"));
        assert!(keys.contains(&"conditions"));
        assert!(!keys.contains(&"foreign_key"));
        assert!(!keys.contains(&"validate"));
        assert!(!keys.contains(&"finder_sql"));

        let many = AssociationMacro::HasManyCustom.valid_options();
        assert!(many.contains(&"finder_sql"));
        assert!(many.contains(&"counter_sql"));
    }

    #[test]
    fn test_standard_option_keys() {
        let keys = AssociationMacro::HasMany.valid_options();
        assert!(keys.contains(&"foreign_key"));
        assert!(!keys.contains(&"joins"));
    }

    #[test]
    fn test_cardinality_follows_macro() {
        assert_eq!(AssociationMacro::HasOneCustom.cardinality(), Cardinality::Single);
        assert_eq!(AssociationMacro::HasManyCustom.cardinality(), Cardinality::Many);
        assert_eq!(AssociationMacro::BelongsTo.cardinality(), Cardinality::Single);
        assert!(AssociationMacro::HasManyCustom.is_custom());
        assert!(!AssociationMacro::HasMany.is_custom());
    }
}
