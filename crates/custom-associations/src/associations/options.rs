//! Declaration options - the option set accepted by association declarations

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::extension::ExtensionModule;
use crate::error::{ModelError, ModelResult};
use crate::model::Record;
use crate::query::{quote_value, Operand, QueryOperator, WhereCondition};

/// One entry of the `joins` option
#[derive(Debug, Clone, PartialEq)]
pub enum JoinEntry {
    /// A join clause or bare table reference
    Clause(String),
    /// Anything that is not a string; skipped by the join compiler
    Other(Value),
}

impl From<&str> for JoinEntry {
    fn from(clause: &str) -> Self {
        JoinEntry::Clause(clause.to_string())
    }
}

impl From<String> for JoinEntry {
    fn from(clause: String) -> Self {
        JoinEntry::Clause(clause)
    }
}

impl From<Value> for JoinEntry {
    fn from(value: Value) -> Self {
        match value {
            Value::String(clause) => JoinEntry::Clause(clause),
            other => JoinEntry::Other(other),
        }
    }
}

/// Where a filter predicate is being evaluated
#[derive(Debug, Clone, Copy)]
pub enum FilterContext<'a> {
    /// Lazy resolution for one owner instance: attributes are literal values
    Owner(&'a Record),
    /// Eager join: attributes are columns of the owner's table (or its alias)
    Join { owner_table: &'a str },
}

impl<'a> FilterContext<'a> {
    /// The owner attribute `name` as a comparison operand
    pub fn attribute(&self, name: &str) -> Operand {
        match self {
            FilterContext::Owner(owner) => Operand::Value(owner.attribute(name)),
            FilterContext::Join { owner_table } => Operand::Column(format!("{}.{}", owner_table, name)),
        }
    }

    /// `column = owner.attribute`
    pub fn eq(&self, column: &str, attribute: &str) -> WhereCondition {
        WhereCondition::Compare {
            column: column.to_string(),
            operator: QueryOperator::Equal,
            operand: self.attribute(attribute),
        }
    }

    pub fn owner(&self) -> Option<&'a Record> {
        match self {
            FilterContext::Owner(owner) => Some(owner),
            FilterContext::Join { .. } => None,
        }
    }
}

type FilterFn = dyn for<'a> Fn(&FilterContext<'a>) -> Vec<WhereCondition> + Send + Sync;

/// Deferred filter predicate, evaluated fresh for every owner or join
#[derive(Clone)]
pub struct FilterSpec(Arc<FilterFn>);

impl FilterSpec {
    pub fn new<F>(filter: F) -> Self
    where
        F: for<'a> Fn(&FilterContext<'a>) -> Vec<WhereCondition> + Send + Sync + 'static,
    {
        Self(Arc::new(filter))
    }

    /// Owner-independent conditions
    pub fn constant(conditions: Vec<WhereCondition>) -> Self {
        Self::new(move |_| conditions.clone())
    }

    /// Build a filter from JSON.
    ///
    /// - `"sql fragment"` and `["fragment", ...]` become raw conditions
    /// - `{"column": value}` becomes equality, `{"column": [..]}` an IN list
    /// - `{"column": {"owner": "attribute"}}` compares against the owner's attribute
    pub fn from_json(value: &Value) -> ModelResult<Self> {
        let conditions = match value {
            Value::String(sql) => vec![JsonCondition::Raw(sql.clone())],
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(sql) => Ok(JsonCondition::Raw(sql.clone())),
                    other => Err(ModelError::Configuration(format!(
                        "conditions arrays may only hold SQL fragments, got {}",
                        other
                    ))),
                })
                .collect::<ModelResult<Vec<_>>>()?,
            Value::Object(map) => map
                .iter()
                .map(|(column, value)| match value {
                    Value::Object(inner) => match inner.get("owner") {
                        Some(Value::String(attribute)) if inner.len() == 1 => {
                            Ok(JsonCondition::Owner(column.clone(), attribute.clone()))
                        }
                        _ => Err(ModelError::Configuration(format!(
                            "condition on '{}' must be a value, a list or {{\"owner\": attribute}}",
                            column
                        ))),
                    },
                    Value::Array(values) => Ok(JsonCondition::In(column.clone(), values.clone())),
                    other => Ok(JsonCondition::Eq(column.clone(), other.clone())),
                })
                .collect::<ModelResult<Vec<_>>>()?,
            other => {
                return Err(ModelError::Configuration(format!(
                    "unsupported conditions value: {}",
                    other
                )))
            }
        };

        Ok(Self::new(move |ctx| {
            conditions.iter().map(|condition| condition.evaluate(ctx)).collect()
        }))
    }

    pub fn evaluate(&self, ctx: &FilterContext<'_>) -> Vec<WhereCondition> {
        (self.0)(ctx)
    }
}

impl fmt::Debug for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FilterSpec(..)")
    }
}

#[derive(Debug, Clone)]
enum JsonCondition {
    Raw(String),
    Eq(String, Value),
    In(String, Vec<Value>),
    Owner(String, String),
}

impl JsonCondition {
    fn evaluate(&self, ctx: &FilterContext<'_>) -> WhereCondition {
        match self {
            JsonCondition::Raw(sql) => WhereCondition::raw(sql),
            JsonCondition::Eq(column, value) => WhereCondition::eq(column, value.clone()),
            JsonCondition::In(column, values) => WhereCondition::in_list(column, values.clone()),
            JsonCondition::Owner(column, attribute) => ctx.eq(column, attribute),
        }
    }
}

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid placeholder pattern"));

static PROJECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*SELECT\s+(/\*.*?\*/\s+)?(.*?)\s*\bFROM\b").expect("valid projection pattern")
});

/// Raw SQL with `{attribute}` placeholders filled from the owner
#[derive(Debug, Clone, PartialEq)]
pub struct SqlTemplate(String);

impl SqlTemplate {
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substitute every `{attribute}` with the owner's quoted attribute value
    pub fn interpolate(&self, owner: &Record) -> String {
        PLACEHOLDER
            .replace_all(&self.0, |caps: &regex::Captures<'_>| quote_value(&owner.attribute(&caps[1])))
            .into_owned()
    }

    /// Derive a counting statement from the projection.
    ///
    /// A single expression is kept inside `COUNT(...)` so `DISTINCT` still
    /// applies; a column list or a plain `table.*` counts rows with `COUNT(*)`.
    pub fn count_template(&self) -> SqlTemplate {
        let counted = PROJECTION.replace(&self.0, |caps: &regex::Captures<'_>| {
            let hint = caps.get(1).map_or("", |hint| hint.as_str());
            let projection = caps.get(2).map_or("*", |p| p.as_str().trim());
            let expression = if is_single_expression(projection) && !is_star(projection) {
                projection
            } else {
                "*"
            };
            format!("SELECT {}COUNT({}) FROM", hint, expression)
        });
        SqlTemplate(counted.into_owned())
    }
}

/// No comma outside parentheses
fn is_single_expression(projection: &str) -> bool {
    let mut depth = 0i32;
    for c in projection.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => return false,
            _ => {}
        }
    }
    !projection.is_empty()
}

fn is_star(projection: &str) -> bool {
    projection == "*" || (projection.ends_with(".*") && !projection.contains(char::is_whitespace))
}

/// A single option value
#[derive(Debug, Clone)]
pub enum OptionValue {
    Text(String),
    Integer(i64),
    Bool(bool),
    Joins(Vec<JoinEntry>),
    Filter(FilterSpec),
    Extend(Vec<Arc<ExtensionModule>>),
    Sql(SqlTemplate),
    Json(Value),
}

impl OptionValue {
    fn kind(&self) -> &'static str {
        match self {
            OptionValue::Text(_) => "text",
            OptionValue::Integer(_) => "integer",
            OptionValue::Bool(_) => "boolean",
            OptionValue::Joins(_) => "joins",
            OptionValue::Filter(_) => "conditions",
            OptionValue::Extend(_) => "extension modules",
            OptionValue::Sql(_) => "sql",
            OptionValue::Json(_) => "json",
        }
    }

    pub(crate) fn mismatch(&self, key: &str, expected: &str) -> ModelError {
        ModelError::Configuration(format!(
            "option :{} expects {}, got {}",
            key,
            expected,
            self.kind()
        ))
    }
}

/// Options passed to an association declaration, in declaration order
#[derive(Debug, Clone, Default)]
pub struct DeclarationOptions {
    entries: Vec<(String, OptionValue)>,
}

impl DeclarationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an arbitrary option; later values replace earlier ones
    pub fn option(mut self, key: &str, value: OptionValue) -> Self {
        self.entries.retain(|(existing, _)| existing != key);
        self.entries.push((key.to_string(), value));
        self
    }

    pub fn class_name(self, class_name: &str) -> Self {
        self.option("class_name", OptionValue::Text(class_name.to_string()))
    }

    pub fn select(self, select: &str) -> Self {
        self.option("select", OptionValue::Text(select.to_string()))
    }

    pub fn conditions(self, filter: FilterSpec) -> Self {
        self.option("conditions", OptionValue::Filter(filter))
    }

    /// Owner-aware conditions from a closure
    pub fn conditions_fn<F>(self, filter: F) -> Self
    where
        F: for<'a> Fn(&FilterContext<'a>) -> Vec<WhereCondition> + Send + Sync + 'static,
    {
        self.conditions(FilterSpec::new(filter))
    }

    pub fn readonly(self, readonly: bool) -> Self {
        self.option("readonly", OptionValue::Bool(readonly))
    }

    /// Mix a capability module into the association
    pub fn extend(mut self, module: Arc<ExtensionModule>) -> Self {
        let mut modules = match self.take("extend") {
            Some(OptionValue::Extend(modules)) => modules,
            _ => Vec::new(),
        };
        modules.push(module);
        self.option("extend", OptionValue::Extend(modules))
    }

    /// Polymorphic role: constrains `<role>_type` to the owner's base class
    pub fn polymorphic_as(self, role: &str) -> Self {
        self.option("as", OptionValue::Text(role.to_string()))
    }

    pub fn table_name(self, table: &str) -> Self {
        self.option("table_name", OptionValue::Text(table.to_string()))
    }

    pub fn joins<I, J>(self, joins: I) -> Self
    where
        I: IntoIterator<Item = J>,
        J: Into<JoinEntry>,
    {
        self.option("joins", OptionValue::Joins(joins.into_iter().map(Into::into).collect()))
    }

    pub fn order(self, order: &str) -> Self {
        self.option("order", OptionValue::Text(order.to_string()))
    }

    pub fn group(self, group: &str) -> Self {
        self.option("group", OptionValue::Text(group.to_string()))
    }

    pub fn having(self, having: &str) -> Self {
        self.option("having", OptionValue::Text(having.to_string()))
    }

    pub fn limit(self, limit: i64) -> Self {
        self.option("limit", OptionValue::Integer(limit))
    }

    pub fn offset(self, offset: i64) -> Self {
        self.option("offset", OptionValue::Integer(offset))
    }

    pub fn inverse_of(self, name: &str) -> Self {
        self.option("inverse_of", OptionValue::Text(name.to_string()))
    }

    pub fn finder_sql(self, sql: &str) -> Self {
        self.option("finder_sql", OptionValue::Sql(SqlTemplate::new(sql)))
    }

    pub fn counter_sql(self, sql: &str) -> Self {
        self.option("counter_sql", OptionValue::Sql(SqlTemplate::new(sql)))
    }

    pub fn foreign_key(self, column: &str) -> Self {
        self.option("foreign_key", OptionValue::Text(column.to_string()))
    }

    pub fn validate(self, validate: bool) -> Self {
        self.option("validate", OptionValue::Bool(validate))
    }

    /// Parse options from a JSON object; key validation happens at declaration
    pub fn from_json(value: &Value) -> ModelResult<Self> {
        let map = value.as_object().ok_or_else(|| {
            ModelError::Configuration(format!("association options must be an object, got {}", value))
        })?;

        let mut options = Self::new();
        for (key, value) in map {
            let parsed = match (key.as_str(), value) {
                ("joins", Value::Array(items)) => {
                    OptionValue::Joins(items.iter().cloned().map(JoinEntry::from).collect())
                }
                ("joins", Value::String(clause)) => OptionValue::Joins(vec![JoinEntry::from(clause.as_str())]),
                ("conditions", conditions) => OptionValue::Filter(FilterSpec::from_json(conditions)?),
                ("finder_sql" | "counter_sql", Value::String(sql)) => OptionValue::Sql(SqlTemplate::new(sql.as_str())),
                (_, Value::String(text)) => OptionValue::Text(text.clone()),
                (_, Value::Bool(flag)) => OptionValue::Bool(*flag),
                (_, Value::Number(n)) if n.is_i64() => OptionValue::Integer(n.as_i64().unwrap_or_default()),
                (_, other) => OptionValue::Json(other.clone()),
            };
            options = options.option(key, parsed);
        }
        Ok(options)
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn take(&mut self, key: &str) -> Option<OptionValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub(crate) fn text(&self, key: &str) -> ModelResult<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(OptionValue::Text(text)) => Ok(Some(text.clone())),
            Some(other) => Err(other.mismatch(key, "text")),
        }
    }

    pub(crate) fn integer(&self, key: &str) -> ModelResult<Option<i64>> {
        match self.get(key) {
            None => Ok(None),
            Some(OptionValue::Integer(n)) => Ok(Some(*n)),
            Some(other) => Err(other.mismatch(key, "an integer")),
        }
    }

    pub(crate) fn flag(&self, key: &str) -> ModelResult<bool> {
        match self.get(key) {
            None => Ok(false),
            Some(OptionValue::Bool(flag)) => Ok(*flag),
            Some(other) => Err(other.mismatch(key, "a boolean")),
        }
    }

    pub(crate) fn sql(&self, key: &str) -> ModelResult<Option<SqlTemplate>> {
        match self.get(key) {
            None => Ok(None),
            Some(OptionValue::Sql(sql)) => Ok(Some(sql.clone())),
            Some(OptionValue::Text(sql)) => Ok(Some(SqlTemplate::new(sql.as_str()))),
            Some(other) => Err(other.mismatch(key, "an SQL string")),
        }
    }
}
