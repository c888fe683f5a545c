//! Association Configuration - Declaration and eager loading settings

use serde::{Deserialize, Serialize};

/// What happens when an inline extension block is declared under a module
/// name that already exists on the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedeclarationPolicy {
    /// Replace the previous module; the collision is only logged at debug level
    Overwrite,
    /// Fail the declaration with `ModelError::Redeclaration`
    Reject,
}

/// Configuration shared by a model registry and the classes defined in it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationConfig {
    /// Policy for redeclared inline extension modules
    pub redeclaration: RedeclarationPolicy,
    /// Log a warning when a custom association has neither conditions nor joins
    pub warn_on_unfiltered: bool,
    /// Prefix used for eager-load table and column aliases (`t0_r0`, `t1_r0`, ...)
    pub column_alias_prefix: String,
    /// Maximum nesting depth accepted in an include graph
    pub max_include_depth: usize,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            redeclaration: RedeclarationPolicy::Overwrite,
            warn_on_unfiltered: true,
            column_alias_prefix: "t".to_string(),
            max_include_depth: 10,
        }
    }
}

impl AssociationConfig {
    /// Load configuration from a JSON document, falling back to defaults for missing keys
    pub fn from_json(json: &str) -> crate::error::ModelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the redeclaration policy
    pub fn with_redeclaration(mut self, policy: RedeclarationPolicy) -> Self {
        self.redeclaration = policy;
        self
    }

    /// Set the maximum include depth
    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AssociationConfig::default();
        assert_eq!(config.redeclaration, RedeclarationPolicy::Overwrite);
        assert!(config.warn_on_unfiltered);
        assert_eq!(config.column_alias_prefix, "t");
        assert_eq!(config.max_include_depth, 10);
    }

    #[test]
    fn test_partial_json_config() {
        let config = AssociationConfig::from_json(r#"{"redeclaration": "reject"}"#).unwrap();
        assert_eq!(config.redeclaration, RedeclarationPolicy::Reject);
        assert_eq!(config.max_include_depth, 10);
    }
}
