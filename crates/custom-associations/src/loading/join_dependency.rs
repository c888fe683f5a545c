//! Join Dependency - the multi-table eager-load query and its row walk
//!
//! Every table taking part in the query is a `JoinPart`. Columns are aliased
//! `t<part>_r<column>` so a row can be split back into one record per part;
//! the root part is `t0`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, trace};

use super::assembler::assemble_row;
use super::include_graph::IncludeGraph;
use crate::associations::{resolver_for, Cardinality, FilterContext, Reflection};
use crate::error::{ModelError, ModelResult};
use crate::model::{identity_key, ModelClass, ModelRegistry, Record, ResultRow};
use crate::query::{JoinClause, JoinKind, JoinType, QueryBuilder, WhereCondition};

/// One table of an eager-load query
#[derive(Debug)]
pub struct JoinPart {
    index: usize,
    parent: Option<usize>,
    children: Vec<usize>,
    reflection: Option<Arc<Reflection>>,
    model: Arc<ModelClass>,
    table: String,
    alias: String,
    columns: Vec<(String, String)>,
    aliased_primary_key: String,
    readonly: bool,
    instances: HashMap<String, Arc<Record>>,
}

impl JoinPart {
    pub(crate) fn new(
        index: usize,
        parent: Option<usize>,
        reflection: Option<Arc<Reflection>>,
        model: Arc<ModelClass>,
        table: &str,
        alias: &str,
        prefix: &str,
    ) -> ModelResult<Self> {
        if model.columns().is_empty() {
            return Err(ModelError::Configuration(format!(
                "model {} declares no columns and cannot be eager loaded",
                model.name()
            )));
        }

        let columns: Vec<(String, String)> = model
            .columns()
            .iter()
            .enumerate()
            .map(|(i, column)| (column.clone(), format!("{}{}_r{}", prefix, index, i)))
            .collect();

        let aliased_primary_key = columns
            .iter()
            .find(|(column, _)| column == model.primary_key())
            .map(|(_, alias)| alias.clone())
            .ok_or_else(|| {
                ModelError::Configuration(format!(
                    "primary key {} is not among the columns of {}",
                    model.primary_key(),
                    model.name()
                ))
            })?;

        let readonly = reflection.as_ref().map_or(false, |r| r.is_readonly());

        Ok(Self {
            index,
            parent,
            children: Vec::new(),
            reflection,
            model,
            table: table.to_string(),
            alias: alias.to_string(),
            columns,
            aliased_primary_key,
            readonly,
            instances: HashMap::new(),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// `None` for the root part
    pub fn reflection(&self) -> Option<&Arc<Reflection>> {
        self.reflection.as_ref()
    }

    pub fn model(&self) -> &Arc<ModelClass> {
        &self.model
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Name the table is referenced by in the query
    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn aliased_primary_key(&self) -> &str {
        &self.aliased_primary_key
    }

    /// `(column, column alias)` pairs in select order
    pub fn column_aliases(&self) -> &[(String, String)] {
        &self.columns
    }

    /// Primary key of this part's record in `row`
    pub fn record_id<'a>(&self, row: &'a ResultRow) -> Option<&'a Value> {
        row.non_null(&self.aliased_primary_key)
    }

    pub fn record_identity(&self, row: &ResultRow) -> Option<String> {
        self.record_id(row).and_then(identity_key)
    }

    /// Record for this part's columns of `row`, one instance per primary key
    pub fn instantiate(&mut self, row: &ResultRow) -> Option<Arc<Record>> {
        let identity = self.record_identity(row)?;
        if let Some(record) = self.instances.get(&identity) {
            return Some(record.clone());
        }

        let attributes: Map<String, Value> = self
            .columns
            .iter()
            .map(|(column, alias)| (column.clone(), row.get(alias).cloned().unwrap_or(Value::Null)))
            .collect();
        let record = self.model.instantiate(attributes, self.readonly);
        self.instances.insert(identity, record.clone());
        Some(record)
    }

    /// Records instantiated for this part so far
    pub fn instances(&self) -> impl Iterator<Item = &Arc<Record>> {
        self.instances.values()
    }
}

/// Eager-load plan for a root model and an include graph
#[derive(Debug)]
pub struct JoinDependency {
    parts: Vec<JoinPart>,
}

impl JoinDependency {
    pub fn build(registry: &ModelRegistry, root: Arc<ModelClass>, graph: &IncludeGraph) -> ModelResult<Self> {
        let prefix = registry.config().column_alias_prefix.clone();
        let table = root.table_name().to_string();

        let mut dependency = Self { parts: Vec::new() };
        dependency
            .parts
            .push(JoinPart::new(0, None, None, root, &table, &table, &prefix)?);

        let mut used_aliases = HashSet::from([table]);
        dependency.add_children(registry, 0, graph, &prefix, &mut used_aliases)?;
        Ok(dependency)
    }

    fn add_children(
        &mut self,
        registry: &ModelRegistry,
        parent: usize,
        graph: &IncludeGraph,
        prefix: &str,
        used_aliases: &mut HashSet<String>,
    ) -> ModelResult<()> {
        for node in graph.nodes() {
            let parent_part = &self.parts[parent];
            let reflection = registry.reflection(parent_part.model.name(), &node.name)?;
            let target = reflection.target_class(registry)?;
            let table = reflection.target_table(registry)?;

            let mut alias = table.clone();
            if used_aliases.contains(&alias) {
                alias = format!("{}_{}", reflection.name(), parent_part.table);
            }
            if used_aliases.contains(&alias) {
                alias = format!("{}_{}", alias, self.parts.len());
            }
            if reflection.is_custom() && alias != table {
                // Authored join fragments and filters name the bare target table
                return Err(ModelError::Configuration(format!(
                    "custom association '{}' needs table {} which is already joined in this eager load",
                    reflection.name(),
                    table
                )));
            }
            used_aliases.insert(alias.clone());

            let index = self.parts.len();
            let part = JoinPart::new(index, Some(parent), Some(reflection), target, &table, &alias, prefix)?;
            self.parts.push(part);
            self.parts[parent].children.push(index);

            self.add_children(registry, index, &node.children, prefix, used_aliases)?;
        }
        Ok(())
    }

    pub fn parts(&self) -> &[JoinPart] {
        &self.parts
    }

    /// `alias.column AS t<n>_r<i>` for every part
    pub fn select_list(&self) -> Vec<(String, String)> {
        self.parts
            .iter()
            .flat_map(|part| {
                part.columns
                    .iter()
                    .map(move |(column, alias)| (format!("{}.{}", part.alias, column), alias.clone()))
            })
            .collect()
    }

    /// Outer joins for every association part, in part order.
    ///
    /// Custom associations render as a parenthesized join tree so their own
    /// join fragments can reference the target table.
    pub fn join_clauses(&self, registry: &ModelRegistry) -> ModelResult<Vec<JoinClause>> {
        let mut clauses = Vec::with_capacity(self.parts.len().saturating_sub(1));

        for part in self.parts.iter().skip(1) {
            let reflection = match &part.reflection {
                Some(reflection) => reflection,
                None => continue,
            };
            let parent = match part.parent {
                Some(parent) => &self.parts[parent],
                None => continue,
            };
            let resolver = resolver_for(reflection);

            let mut conditions = Vec::new();
            if let Some(type_column) = reflection.type_column() {
                conditions.push(WhereCondition::eq(
                    &format!("{}.{}", part.alias, type_column),
                    registry.base_class_name(parent.model.name()),
                ));
            }
            if let Some(filter) = reflection.conditions() {
                conditions.extend(filter.evaluate(&FilterContext::Join {
                    owner_table: &parent.alias,
                }));
            }

            let mut on = resolver
                .build_constraint(registry, reflection, &part.alias, &parent.alias)?
                .and(conditions);
            if on.is_empty() {
                on.push(WhereCondition::raw("1=1"));
            }

            let alias = (part.alias != part.table).then(|| part.alias.clone());
            let joins = resolver.join_to(reflection, JoinKind::Outer);
            clauses.push(if joins.is_empty() {
                JoinClause::Table {
                    join_type: JoinType::LeftOuter,
                    table: part.table.clone(),
                    alias,
                    on,
                }
            } else {
                JoinClause::Nested {
                    join_type: JoinType::LeftOuter,
                    table: part.table.clone(),
                    alias,
                    joins,
                    on,
                }
            });
        }

        Ok(clauses)
    }

    /// Turn `base` into the eager-load query.
    ///
    /// LIMIT and OFFSET on `base` count root records, so when associations
    /// are joined they move into a `root.pk IN (...)` subquery.
    pub fn apply(&self, base: QueryBuilder, registry: &ModelRegistry) -> ModelResult<QueryBuilder> {
        let mut query = base.unselect();
        if query.table().is_none() {
            query = query.from(&self.parts[0].table);
        }
        if self.parts.len() > 1 {
            query = self.restrict_roots(query)?;
        }
        for (expression, alias) in self.select_list() {
            query = query.select_as(&expression, &alias);
        }
        query = query.join_clauses_from(self.join_clauses(registry)?);
        for part in self.parts.iter().skip(1) {
            if let Some(order) = part.reflection.as_ref().and_then(|r| r.order()) {
                query = query.order_by_raw(order);
            }
        }
        Ok(query)
    }

    fn restrict_roots(&self, query: QueryBuilder) -> ModelResult<QueryBuilder> {
        if query.limit_count.is_none() && query.offset_value.is_none() {
            return Ok(query);
        }
        if !query.group_by.is_empty() || query.is_distinct() {
            return Err(ModelError::Configuration(format!(
                "cannot paginate a grouped or distinct {} query while eager loading associations",
                self.parts[0].model.name()
            )));
        }

        let table = query.table().unwrap_or(&self.parts[0].table).to_string();
        let key = format!("{}.{}", table, self.parts[0].model.primary_key());
        let ids = query.clone().reselect(&key).to_sql();
        debug!("Restricting eager-loaded {} roots to {}", self.parts[0].model.name(), ids);
        Ok(query.unpaginate().where_raw(&format!("{} IN ({})", key, ids)))
    }

    /// Walk `rows` once, in order, and return the distinct root records
    pub fn instantiate(&mut self, rows: &[ResultRow]) -> Vec<Arc<Record>> {
        let mut roots = Vec::new();
        let mut seen = HashSet::new();

        for row in rows {
            let root = match self.parts[0].instantiate(row) {
                Some(root) => root,
                None => {
                    trace!("Skipping row without a {} primary key", self.parts[0].model.name());
                    continue;
                }
            };
            if seen.insert(Arc::as_ptr(&root)) {
                roots.push(root.clone());
            }
            self.construct(&root, 0, row);
        }

        self.finalize();
        debug!(
            "Assembled {} {} records from {} rows",
            roots.len(),
            self.parts[0].model.name(),
            rows.len()
        );
        roots
    }

    fn construct(&mut self, parent_record: &Arc<Record>, parent: usize, row: &ResultRow) {
        let parent_key = self.parts[parent].record_identity(row);
        let children = self.parts[parent].children.clone();
        for child in children {
            if let Some(target) = assemble_row(parent_record, parent_key.as_deref(), &mut self.parts[child], row) {
                self.construct(&target, child, row);
            }
        }
    }

    /// Owners that never saw a row for an association load it as absent or empty
    fn finalize(&self) {
        for part in self.parts.iter().skip(1) {
            let (reflection, parent) = match (&part.reflection, part.parent) {
                (Some(reflection), Some(parent)) => (reflection, parent),
                _ => continue,
            };
            for owner in self.parts[parent].instances() {
                if owner.is_loaded(reflection.name()) {
                    continue;
                }
                match reflection.cardinality() {
                    Cardinality::Single => owner.set_target(reflection.name(), None),
                    Cardinality::Many => owner.set_collection(reflection.name(), Vec::new()),
                }
            }
        }
    }
}
