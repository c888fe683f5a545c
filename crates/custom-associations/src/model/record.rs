//! Records - Model instances and their in-memory association cache

use std::fmt;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use serde_json::{Map, Value};

/// Cache slot for one association on one owner
#[derive(Clone)]
enum Slot {
    /// Loaded, confirmed absence of a target
    Absent,
    /// Loaded singular target
    One(Arc<Record>),
    /// Loaded inverse back-reference; weak so bidirectional graphs do not leak
    Inverse(Weak<Record>),
    /// Loaded collection, in load order
    Many(Vec<Arc<Record>>),
}

/// Snapshot of an association cache entry
#[derive(Debug, Clone)]
pub enum AssociationState {
    Unloaded,
    Single(Option<Arc<Record>>),
    Many(Vec<Arc<Record>>),
}

impl AssociationState {
    pub fn is_loaded(&self) -> bool {
        !matches!(self, AssociationState::Unloaded)
    }
}

/// A model instance: attributes plus the per-owner association cache
pub struct Record {
    model: String,
    primary_key: String,
    attributes: Map<String, Value>,
    readonly: bool,
    associations: DashMap<String, Slot>,
}

impl Record {
    /// Create a record of `model` whose identity lives in `primary_key`
    pub fn new(model: &str, primary_key: &str, attributes: Map<String, Value>) -> Self {
        Self {
            model: model.to_string(),
            primary_key: primary_key.to_string(),
            attributes,
            readonly: false,
            associations: DashMap::new(),
        }
    }

    /// Mark the record as read-only
    pub fn with_readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn primary_key_name(&self) -> &str {
        &self.primary_key
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Attribute value, `None` when the attribute is not present
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    /// Attribute value, `Value::Null` when the attribute is not present
    pub fn attribute(&self, attribute: &str) -> Value {
        self.attributes.get(attribute).cloned().unwrap_or(Value::Null)
    }

    /// Primary key value, `None` for a missing or NULL key
    pub fn id(&self) -> Option<&Value> {
        self.attributes.get(&self.primary_key).filter(|v| !v.is_null())
    }

    /// Primary key in its string form, used to match rows to owners
    pub fn identity(&self) -> Option<String> {
        self.id().and_then(identity_key)
    }

    /// Whether the association has been loaded (possibly as an absence)
    pub fn is_loaded(&self, association: &str) -> bool {
        self.associations.contains_key(association)
    }

    /// Snapshot of the association cache entry
    pub fn association_state(&self, association: &str) -> AssociationState {
        let slot = match self.associations.get(association) {
            Some(entry) => entry.value().clone(),
            None => return AssociationState::Unloaded,
        };
        match slot {
            Slot::Absent => AssociationState::Single(None),
            Slot::One(record) => AssociationState::Single(Some(record)),
            Slot::Inverse(weak) => AssociationState::Single(weak.upgrade()),
            Slot::Many(records) => AssociationState::Many(records),
        }
    }

    /// Cached singular target; `None` when unloaded or loaded as absent
    pub fn loaded_target(&self, association: &str) -> Option<Arc<Record>> {
        match self.association_state(association) {
            AssociationState::Single(target) => target,
            _ => None,
        }
    }

    /// Cached collection; `None` when unloaded
    pub fn loaded_collection(&self, association: &str) -> Option<Vec<Arc<Record>>> {
        match self.association_state(association) {
            AssociationState::Many(records) => Some(records),
            _ => None,
        }
    }

    /// Store a singular target, or a confirmed absence
    pub fn set_target(&self, association: &str, target: Option<Arc<Record>>) {
        let slot = match target {
            Some(record) => Slot::One(record),
            None => Slot::Absent,
        };
        self.associations.insert(association.to_string(), slot);
    }

    /// Store a back-reference to `owner` under `association`
    pub fn set_inverse(&self, association: &str, owner: &Arc<Record>) {
        self.associations
            .insert(association.to_string(), Slot::Inverse(Arc::downgrade(owner)));
    }

    /// Store a whole collection
    pub fn set_collection(&self, association: &str, records: Vec<Arc<Record>>) {
        self.associations.insert(association.to_string(), Slot::Many(records));
    }

    /// Mark a collection as loaded; keeps anything already collected
    pub fn mark_collection_loaded(&self, association: &str) {
        let mut entry = self
            .associations
            .entry(association.to_string())
            .or_insert_with(|| Slot::Many(Vec::new()));
        if !matches!(*entry, Slot::Many(_)) {
            *entry = Slot::Many(Vec::new());
        }
    }

    /// Append to a loaded collection unless a record with the same identity is present.
    /// Returns whether the record was appended.
    pub fn append_to_collection(&self, association: &str, record: Arc<Record>) -> bool {
        let mut entry = self
            .associations
            .entry(association.to_string())
            .or_insert_with(|| Slot::Many(Vec::new()));
        match entry.value_mut() {
            Slot::Many(records) => {
                let identity = record.identity();
                let duplicate = records
                    .iter()
                    .any(|existing| Arc::ptr_eq(existing, &record) || (identity.is_some() && existing.identity() == identity));
                if duplicate {
                    false
                } else {
                    records.push(record);
                    true
                }
            }
            other => {
                *other = Slot::Many(vec![record]);
                true
            }
        }
    }

    /// Forget one association, returning it to the unloaded state
    pub fn reset_association(&self, association: &str) {
        self.associations.remove(association);
    }

    /// Owner-level reload: every association returns to the unloaded state
    pub fn reload(&self) {
        self.associations.clear();
    }

    /// Names of loaded associations
    pub fn loaded_associations(&self) -> Vec<String> {
        let mut names: Vec<String> = self.associations.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("model", &self.model)
            .field("attributes", &self.attributes)
            .field("readonly", &self.readonly)
            .field("loaded", &self.loaded_associations())
            .finish()
    }
}

/// String form of an identity value; NULL has no identity
pub fn identity_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
