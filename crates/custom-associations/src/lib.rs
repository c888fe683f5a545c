//! # elif-custom-associations: Custom Join Associations for elif-orm
//!
//! Read-only associations whose targets are reached through arbitrary join
//! fragments and owner-aware filters rather than a foreign key column.
//!
//! A model declares `has_one_custom` / `has_many_custom` style associations
//! through [`ModelRegistry::declare_singular`] and
//! [`ModelRegistry::declare_many`]. The resulting associations can be read
//! lazily per owner, or eagerly through [`EagerLoadRequest`]; eager requests
//! that touch a custom association are executed as one joined query whose
//! rows are assembled back into the association caches.

pub mod associations;
pub mod config;
pub mod error;
pub mod execution;
pub mod inflection;
pub mod loading;
pub mod model;
pub mod query;

// Re-export the public surface
pub use associations::*;
pub use config::{AssociationConfig, RedeclarationPolicy};
pub use error::{ModelError, ModelResult};
pub use execution::QueryExecutor;
pub use loading::*;
pub use model::*;
pub use query::{JoinClause, JoinKind, JoinType, Operand, QueryBuilder, WhereCondition};
