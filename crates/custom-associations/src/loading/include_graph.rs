//! Include graph - the tree of associations requested for eager loading

use serde_json::Value;

use crate::error::{ModelError, ModelResult};

/// One requested association and the associations to load beneath it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeNode {
    pub name: String,
    pub children: IncludeGraph,
}

/// Requested associations, in request order; a name appears once per level
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeGraph {
    nodes: Vec<IncludeNode>,
}

impl IncludeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from dotted paths: `["address", "orders.items"]`
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        paths.into_iter().fold(Self::new(), |graph, path| graph.include(path.as_ref()))
    }

    /// Parse an includes value: a name, a dotted path, a list, or `{name: nested}`
    pub fn from_json(value: &Value) -> ModelResult<Self> {
        let mut graph = Self::new();
        graph.merge_json(value)?;
        Ok(graph)
    }

    fn merge_json(&mut self, value: &Value) -> ModelResult<()> {
        match value {
            Value::Null => Ok(()),
            Value::String(path) => {
                self.add_path(path);
                Ok(())
            }
            Value::Array(items) => items.iter().try_for_each(|item| self.merge_json(item)),
            Value::Object(map) => {
                for (name, nested) in map {
                    self.node_mut(name).children.merge_json(nested)?;
                }
                Ok(())
            }
            other => Err(ModelError::Configuration(format!("invalid include: {}", other))),
        }
    }

    /// Add a dotted path; empty segments are ignored
    pub fn include(mut self, path: &str) -> Self {
        self.add_path(path);
        self
    }

    /// Add `name` with an explicit nested graph
    pub fn nest(mut self, name: &str, children: IncludeGraph) -> Self {
        let node = self.node_mut(name);
        for child in children.nodes {
            node.children.merge_node(child);
        }
        self
    }

    fn add_path(&mut self, path: &str) {
        let mut level = self;
        for segment in path.split('.').map(str::trim).filter(|s| !s.is_empty()) {
            level = &mut level.node_mut(segment).children;
        }
    }

    fn merge_node(&mut self, node: IncludeNode) {
        let existing = self.node_mut(&node.name);
        for child in node.children.nodes {
            existing.children.merge_node(child);
        }
    }

    fn node_mut(&mut self, name: &str) -> &mut IncludeNode {
        let index = match self.nodes.iter().position(|node| node.name == name) {
            Some(index) => index,
            None => {
                self.nodes.push(IncludeNode {
                    name: name.to_string(),
                    children: IncludeGraph::new(),
                });
                self.nodes.len() - 1
            }
        };
        &mut self.nodes[index]
    }

    pub fn nodes(&self) -> &[IncludeNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Longest path length; an empty graph has depth 0
    pub fn depth(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| 1 + node.children.depth())
            .max()
            .unwrap_or(0)
    }
}
