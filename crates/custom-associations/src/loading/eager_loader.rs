//! Eager Loader - entry point for loading root records with their associations

use std::sync::Arc;

use tracing::debug;

use super::include_graph::IncludeGraph;
use super::join_dependency::JoinDependency;
use super::preloader::Preloader;
use super::strategy::{select_strategy, LoadStrategy};
use crate::error::{ModelError, ModelResult};
use crate::execution::QueryExecutor;
use crate::model::{ModelRegistry, Record};
use crate::query::QueryBuilder;

/// A root model, an optional base query, and the associations to load with it
#[derive(Debug, Clone)]
pub struct EagerLoadRequest {
    root: String,
    query: Option<QueryBuilder>,
    includes: IncludeGraph,
    eager_load: bool,
}

impl EagerLoadRequest {
    pub fn new(root: &str) -> Self {
        Self {
            root: root.to_string(),
            query: None,
            includes: IncludeGraph::new(),
            eager_load: false,
        }
    }

    /// Add a dotted include path such as `"orders.items"`
    pub fn include(mut self, path: &str) -> Self {
        self.includes = self.includes.include(path);
        self
    }

    pub fn includes(mut self, graph: IncludeGraph) -> Self {
        self.includes = graph;
        self
    }

    /// Base query selecting the root records; defaults to the whole root table
    pub fn query(mut self, query: QueryBuilder) -> Self {
        self.query = Some(query);
        self
    }

    /// Force a single joined query even when every association could be preloaded
    pub fn eager_load(mut self, eager_load: bool) -> Self {
        self.eager_load = eager_load;
        self
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn include_graph(&self) -> &IncludeGraph {
        &self.includes
    }

    pub fn base_query(&self) -> Option<&QueryBuilder> {
        self.query.as_ref()
    }

    pub fn is_eager_load(&self) -> bool {
        self.eager_load
    }
}

/// Runs an [`EagerLoadRequest`] with the strategy its include graph allows
pub struct EagerLoader<'r> {
    registry: &'r ModelRegistry,
}

impl<'r> EagerLoader<'r> {
    pub fn new(registry: &'r ModelRegistry) -> Self {
        Self { registry }
    }

    /// Strategy `load` would use for `request`
    pub fn strategy_for(&self, request: &EagerLoadRequest) -> ModelResult<LoadStrategy> {
        let root = self.registry.model(request.root())?;
        if request.is_eager_load() {
            return Ok(LoadStrategy::JoinAndAssemble);
        }
        Ok(select_strategy(self.registry, &root, request.include_graph()))
    }

    pub async fn load(
        &self,
        request: &EagerLoadRequest,
        executor: &dyn QueryExecutor,
    ) -> ModelResult<Vec<Arc<Record>>> {
        let max_depth = self.registry.config().max_include_depth;
        let depth = request.include_graph().depth();
        if depth > max_depth {
            return Err(ModelError::Configuration(format!(
                "include depth {} exceeds the maximum of {}",
                depth, max_depth
            )));
        }

        let strategy = self.strategy_for(request)?;
        debug!("Loading {} with {} (depth {})", request.root(), strategy, depth);

        match strategy {
            LoadStrategy::Preload => self.preload(request, executor).await,
            LoadStrategy::JoinAndAssemble => self.join_and_assemble(request, executor).await,
        }
    }

    fn base_query(&self, request: &EagerLoadRequest) -> ModelResult<QueryBuilder> {
        if let Some(query) = request.base_query() {
            return Ok(query.clone());
        }
        let root = self.registry.model(request.root())?;
        let table = root.table_name();
        let mut query = QueryBuilder::new().select(&format!("{}.*", table)).from(table);
        if let Some(condition) = self.registry.type_condition(&root, table) {
            query = query.where_condition(condition);
        }
        Ok(query)
    }

    async fn preload(
        &self,
        request: &EagerLoadRequest,
        executor: &dyn QueryExecutor,
    ) -> ModelResult<Vec<Arc<Record>>> {
        let root = self.registry.model(request.root())?;
        let query = self.base_query(request)?;
        let readonly = query.is_readonly();

        let rows = executor.fetch_all(&query.to_sql()).await?;
        let records: Vec<Arc<Record>> = rows.iter().map(|row| root.instantiate_row(row, readonly)).collect();

        if !request.include_graph().is_empty() {
            Preloader::new(self.registry)
                .preload(&records, request.include_graph(), executor)
                .await?;
        }
        Ok(records)
    }

    async fn join_and_assemble(
        &self,
        request: &EagerLoadRequest,
        executor: &dyn QueryExecutor,
    ) -> ModelResult<Vec<Arc<Record>>> {
        let root = self.registry.model(request.root())?;
        let mut dependency = JoinDependency::build(self.registry, root, request.include_graph())?;
        let query = dependency.apply(self.base_query(request)?, self.registry)?;

        let sql = query.to_sql();
        debug!("Eager join for {}: {}", request.root(), sql);
        let rows = executor.fetch_all(&sql).await?;
        Ok(dependency.instantiate(&rows))
    }
}
