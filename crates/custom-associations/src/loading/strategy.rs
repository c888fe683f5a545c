//! Preload-safety guard - chooses between batched preloading and join + assemble

use std::fmt;

use tracing::debug;

use super::include_graph::IncludeGraph;
use crate::associations::resolver_for;
use crate::model::{ModelClass, ModelRegistry};

/// How an eager-load request is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStrategy {
    /// One `WHERE key IN (...)` query per association and level
    Preload,
    /// A single multi-table query whose rows are assembled into the graph
    JoinAndAssemble,
}

impl fmt::Display for LoadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStrategy::Preload => write!(f, "preload"),
            LoadStrategy::JoinAndAssemble => write!(f, "join and assemble"),
        }
    }
}

/// Decide the strategy for `graph` rooted at `owner`.
///
/// Any custom association at any depth, or any name that cannot be resolved,
/// puts the whole request in join mode.
pub fn select_strategy(registry: &ModelRegistry, owner: &ModelClass, graph: &IncludeGraph) -> LoadStrategy {
    let strategy = if supports_preloading(registry, owner, graph) {
        LoadStrategy::Preload
    } else {
        LoadStrategy::JoinAndAssemble
    };
    debug!("Eager load strategy for {}: {}", owner.name(), strategy);
    strategy
}

fn supports_preloading(registry: &ModelRegistry, owner: &ModelClass, graph: &IncludeGraph) -> bool {
    graph.nodes().iter().all(|node| {
        let reflection = match registry.reflection(owner.name(), &node.name) {
            Ok(reflection) => reflection,
            Err(_) => return false,
        };
        if !resolver_for(&reflection).supports_preloading() {
            return false;
        }
        if node.children.is_empty() {
            return true;
        }
        match reflection.target_class(registry) {
            Ok(target) => supports_preloading(registry, &target, &node.children),
            Err(_) => false,
        }
    })
}
