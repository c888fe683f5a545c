//! Associations - declaration, reflection and resolution of custom join associations
//!
//! A custom association links an owner to its targets through arbitrary join
//! fragments and an owner-aware filter instead of a foreign key. This module
//! provides:
//! - the declaration builder and option validation
//! - immutable reflections
//! - per-kind resolvers (`StandardResolver`, `CustomResolver`) with the
//!   scope, join, constraint, preloading and write hooks used by loading
//! - association objects exposing the read surface of one owner

pub mod association;
pub mod builder;
pub mod extension;
pub mod join;
pub mod options;
pub mod reflection;
pub mod resolver;
pub mod scope;

pub use association::{Association, CollectionAssociation, SingularAssociation};
pub use builder::AssociationBuilder;
pub use extension::{ExtensionBlock, ExtensionModule, ScopeMethod};
pub use join::{compile_join, compile_joins, Constraint};
pub use options::{DeclarationOptions, FilterContext, FilterSpec, JoinEntry, OptionValue, SqlTemplate};
pub use reflection::{AssociationMacro, Cardinality, Reflection, ValidationWarning};
pub use resolver::{resolver_for, AssociationResolver, CustomResolver, StandardResolver, WriteOperation};
pub use scope::{custom_scope, standard_scope};
