//! Model System - The slice of the host ORM that associations resolve against
//!
//! - `class`: model class metadata and its association table
//! - `record`: model instances and their per-owner association cache
//! - `row`: result rows as returned by a query executor
//! - `registry`: caller-owned catalog used for lazy class resolution

pub mod class;
pub mod record;
pub mod registry;
pub mod row;

pub use class::{GeneratedMethod, ModelClass};
pub use record::{identity_key, AssociationState, Record};
pub use registry::{MethodOutput, ModelRegistry};
pub use row::ResultRow;
