//! Result rows - column alias to value mapping for one row of a result set

use std::collections::BTreeMap;

use serde_json::Value;

/// One row of a result set, keyed by column name or alias
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    columns: BTreeMap<String, Value>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from `(column, value)` pairs
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            columns: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Add or replace a column value
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.columns.insert(column.into(), value);
    }

    /// Column value, `None` when the column is absent
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    /// Column value treating absence and SQL NULL alike
    pub fn non_null(&self, column: &str) -> Option<&Value> {
        self.columns.get(column).filter(|value| !value.is_null())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl From<serde_json::Map<String, Value>> for ResultRow {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        Self::from_pairs(map)
    }
}

impl TryFrom<Value> for ResultRow {
    type Error = crate::error::ModelError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(map.into()),
            other => Err(crate::error::ModelError::Serialization(format!(
                "expected a JSON object for a result row, got {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_null_treats_null_as_absent() {
        let row = ResultRow::try_from(json!({"t0_r0": 1, "t1_r0": null})).unwrap();
        assert_eq!(row.non_null("t0_r0"), Some(&json!(1)));
        assert_eq!(row.non_null("t1_r0"), None);
        assert_eq!(row.get("t1_r0"), Some(&Value::Null));
        assert_eq!(row.non_null("missing"), None);
    }

    #[test]
    fn test_row_from_non_object_fails() {
        assert!(ResultRow::try_from(json!([1, 2])).is_err());
    }
}
