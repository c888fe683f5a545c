//! Row Assembler - attaches the records of one eager-load row to their owner

use std::sync::Arc;

use tracing::trace;

use super::join_dependency::JoinPart;
use crate::associations::Cardinality;
use crate::model::{Record, ResultRow};

/// Attach `part`'s record in `row` to `owner`'s association cache.
///
/// `parent_key` is the identity of the part's parent record in this row; when
/// it is missing or names another record the row is skipped. Returns the
/// target now cached for the owner, which becomes the parent of nested parts.
pub fn assemble_row(
    owner: &Arc<Record>,
    parent_key: Option<&str>,
    part: &mut JoinPart,
    row: &ResultRow,
) -> Option<Arc<Record>> {
    let reflection = part.reflection()?.clone();

    let owner_key = owner.identity();
    if owner_key.is_none() || owner_key.as_deref() != parent_key {
        trace!(
            "Skipping {} row: owner {:?} does not match {:?}",
            reflection.name(),
            owner_key,
            parent_key
        );
        return None;
    }

    let name = reflection.name();
    match reflection.cardinality() {
        Cardinality::Single => {
            if owner.is_loaded(name) {
                return owner.loaded_target(name);
            }
            let target = part.instantiate(row);
            owner.set_target(name, target.clone());
            if let (Some(target), Some(inverse)) = (&target, reflection.inverse_of()) {
                target.set_inverse(inverse, owner);
            }
            target
        }
        Cardinality::Many => {
            owner.mark_collection_loaded(name);
            let target = part.instantiate(row)?;
            owner.append_to_collection(name, target.clone());
            if let Some(inverse) = reflection.inverse_of() {
                target.set_inverse(inverse, owner);
            }
            Some(target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::associations::DeclarationOptions;
    use crate::model::{ModelClass, ModelRegistry};
    use serde_json::{json, Value};

    fn registry() -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        registry.define(ModelClass::new("Customer", "customers").with_columns(["id"]));
        registry.define(ModelClass::new("Address", "addresses").with_columns(["id", "city"]));
        registry
            .declare_singular(
                "Customer",
                "address",
                DeclarationOptions::new().joins(["customer_addresses"]).inverse_of("customer"),
                None,
            )
            .unwrap();
        registry
            .declare_many("Customer", "addresses", DeclarationOptions::new().joins(["customer_addresses"]), None)
            .unwrap();
        registry
    }

    fn part(registry: &ModelRegistry, association: &str) -> JoinPart {
        let reflection = registry.reflection("Customer", association).unwrap();
        let target = registry.model("Address").unwrap();
        JoinPart::new(1, Some(0), Some(reflection), target, "addresses", "addresses", "t").unwrap()
    }

    fn owner(id: i64) -> Arc<Record> {
        Arc::new(Record::new("Customer", "id", json!({"id": id}).as_object().cloned().unwrap()))
    }

    fn row(address_id: Value, city: &str) -> ResultRow {
        ResultRow::from_pairs([("t0_r0", json!(1)), ("t1_r0", address_id), ("t1_r1", json!(city))])
    }

    #[test]
    fn test_singular_assembly_is_idempotent() {
        let registry = registry();
        let mut part = part(&registry, "address");
        let customer = owner(1);

        let first = assemble_row(&customer, Some("1"), &mut part, &row(json!(10), "Foobar")).unwrap();
        let second = assemble_row(&customer, Some("1"), &mut part, &row(json!(10), "Foobar")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first.loaded_target("customer").unwrap(), &customer));
    }

    #[test]
    fn test_singular_keeps_first_target() {
        let registry = registry();
        let mut part = part(&registry, "address");
        let customer = owner(1);

        assemble_row(&customer, Some("1"), &mut part, &row(json!(10), "Foobar"));
        assemble_row(&customer, Some("1"), &mut part, &row(json!(11), "Elsewhere"));
        assert_eq!(
            customer.loaded_target("address").map(|a| a.attribute("id")),
            Some(json!(10))
        );
    }

    #[test]
    fn test_null_target_records_absence() {
        let registry = registry();
        let mut part = part(&registry, "address");
        let customer = owner(1);

        assert!(assemble_row(&customer, Some("1"), &mut part, &row(Value::Null, "")).is_none());
        assert!(customer.is_loaded("address"));
        assert!(customer.loaded_target("address").is_none());
    }

    #[test]
    fn test_collection_preserves_row_order() {
        let registry = registry();
        let mut part = part(&registry, "addresses");
        let customer = owner(1);

        for (id, city) in [(12, "C"), (10, "A"), (11, "B"), (10, "A")] {
            assemble_row(&customer, Some("1"), &mut part, &row(json!(id), city));
        }
        assemble_row(&customer, Some("1"), &mut part, &row(Value::Null, ""));

        let ids: Vec<Value> = customer
            .loaded_collection("addresses")
            .unwrap()
            .iter()
            .map(|a| a.attribute("id"))
            .collect();
        assert_eq!(ids, vec![json!(12), json!(10), json!(11)]);
    }

    #[test]
    fn test_collection_members_point_back_to_owner() {
        let mut registry = ModelRegistry::new();
        registry.define(ModelClass::new("Customer", "customers").with_columns(["id"]));
        registry.define(ModelClass::new("Address", "addresses").with_columns(["id", "city"]));
        registry
            .declare_many(
                "Customer",
                "addresses",
                DeclarationOptions::new().joins(["customer_addresses"]).inverse_of("customer"),
                None,
            )
            .unwrap();
        let mut part = part(&registry, "addresses");
        let customer = owner(1);

        for (id, city) in [(10, "A"), (11, "B")] {
            assemble_row(&customer, Some("1"), &mut part, &row(json!(id), city)).unwrap();
        }

        let addresses = customer.loaded_collection("addresses").unwrap();
        assert_eq!(addresses.len(), 2);
        for address in &addresses {
            assert!(address.is_loaded("customer"));
            assert!(Arc::ptr_eq(&address.loaded_target("customer").unwrap(), &customer));
        }
    }

    #[test]
    fn test_mismatched_owner_is_skipped() {
        let registry = registry();
        let mut part = part(&registry, "addresses");
        let customer = owner(1);

        assert!(assemble_row(&customer, Some("2"), &mut part, &row(json!(10), "A")).is_none());
        assert!(assemble_row(&customer, None, &mut part, &row(json!(10), "A")).is_none());
        assert!(!customer.is_loaded("addresses"));
    }
}
