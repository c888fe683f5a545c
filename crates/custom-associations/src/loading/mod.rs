/// Eager loading for association graphs
/// Chooses between batched preloading and a single joined query assembled row by row

pub mod assembler;
pub mod eager_loader;
pub mod include_graph;
pub mod join_dependency;
pub mod preloader;
pub mod strategy;

pub use assembler::assemble_row;
pub use eager_loader::{EagerLoadRequest, EagerLoader};
pub use include_graph::{IncludeGraph, IncludeNode};
pub use join_dependency::{JoinDependency, JoinPart};
pub use preloader::Preloader;
pub use strategy::{select_strategy, LoadStrategy};
