mod support;

use std::sync::Arc;

use elif_custom_associations::{
    AssociationConfig, DeclarationOptions, EagerLoadRequest, EagerLoader, ExtensionBlock, LoadStrategy,
    MethodOutput, ModelClass, ModelError, ModelRegistry, QueryBuilder, RedeclarationPolicy, ValidationWarning,
    WriteOperation,
};
use serde_json::{json, Value};
use support::{address, customer, registry, row, MemoryExecutor};

fn with_orders(mut registry: ModelRegistry) -> ModelRegistry {
    registry.define(ModelClass::new("Order", "orders").with_columns(["id", "customer_id"]));
    registry
        .model_mut("Customer")
        .unwrap()
        .has_many("orders", DeclarationOptions::new())
        .unwrap();
    registry
}

#[tokio::test]
async fn test_singular_reader_resolves_through_joins() {
    let registry = registry();
    let executor = MemoryExecutor::new().rows("FROM addresses", vec![address(10, "Foobar")]);
    let owner = customer(1, "1234");

    let association = registry.association(&owner, "address").unwrap().into_singular().unwrap();
    let target = association.reader(&executor).await.unwrap().unwrap();

    assert_eq!(target.model(), "Address");
    assert_eq!(target.attribute("city"), json!("Foobar"));
    assert!(Arc::ptr_eq(&target.loaded_target("customer").unwrap(), &owner));
    assert_eq!(
        executor.statements(),
        vec![
            "SELECT addresses.* FROM addresses \
             INNER JOIN customer_addresses ON customer_addresses.address_id = addresses.id \
             WHERE customer_addresses.customer_number = '1234' LIMIT 1"
                .to_string()
        ]
    );
}

#[tokio::test]
async fn test_singular_reader_caches_target_and_absence() {
    let registry = registry();
    let executor = MemoryExecutor::new().rows("FROM addresses", vec![address(10, "Foobar")]);
    let owner = customer(1, "1234");

    let association = registry.association(&owner, "address").unwrap().into_singular().unwrap();
    let first = association.reader(&executor).await.unwrap().unwrap();
    let second = association.reader(&executor).await.unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(executor.query_count(), 1);

    let reloaded = association.reload(&executor).await.unwrap().unwrap();
    assert!(!Arc::ptr_eq(&first, &reloaded));
    assert_eq!(executor.query_count(), 2);

    let empty = MemoryExecutor::new();
    let lonely = customer(2, "9999");
    let association = registry.association(&lonely, "address").unwrap().into_singular().unwrap();
    assert!(association.reader(&empty).await.unwrap().is_none());
    assert!(association.reader(&empty).await.unwrap().is_none());
    assert!(lonely.is_loaded("address"));
    assert_eq!(empty.query_count(), 1);
}

#[tokio::test]
async fn test_collection_ids_match_loaded_records() {
    let registry = registry();
    let executor = MemoryExecutor::new()
        .rows(
            "SELECT addresses.id FROM",
            vec![row(json!({"id": 10})), row(json!({"id": 11}))],
        )
        .rows("SELECT addresses.* FROM", vec![address(10, "Foobar"), address(11, "Elsewhere")]);
    let owner = customer(1, "1234");

    let collection = registry.association(&owner, "addresses").unwrap().into_collection().unwrap();
    let plucked = collection.ids(&executor).await.unwrap();
    assert!(!collection.is_loaded());

    let records = collection.load(&executor).await.unwrap();
    let loaded_ids: Vec<Value> = records.iter().map(|r| r.attribute("id")).collect();
    assert_eq!(plucked, loaded_ids);
    assert_eq!(collection.ids(&executor).await.unwrap(), loaded_ids);
    assert_eq!(executor.query_count(), 2);

    let statements = executor.statements();
    assert!(statements[0].starts_with("SELECT addresses.id FROM addresses INNER JOIN customer_addresses"));
    assert!(statements[1].ends_with("ORDER BY addresses.id"));
}

#[tokio::test]
async fn test_generated_methods_dispatch_through_registry() {
    let registry = registry();
    let executor = MemoryExecutor::new()
        .rows("SELECT addresses.id FROM", vec![row(json!({"id": 10}))])
        .rows("SELECT addresses.* FROM", vec![address(10, "Foobar")]);
    let owner = customer(1, "1234");

    match registry.invoke(&owner, "address_ids", &executor).await.unwrap() {
        MethodOutput::Ids(ids) => assert_eq!(ids, vec![json!(10)]),
        other => panic!("unexpected output: {:?}", other),
    }
    match registry.invoke(&owner, "addresses", &executor).await.unwrap() {
        MethodOutput::Records(records) => assert_eq!(records.len(), 1),
        other => panic!("unexpected output: {:?}", other),
    }
    match registry.invoke(&owner, "address", &executor).await.unwrap() {
        MethodOutput::Record(record) => assert!(record.is_some()),
        other => panic!("unexpected output: {:?}", other),
    }

    for method in ["address=", "addresses=", "address_ids="] {
        let error = registry.invoke(&owner, method, &executor).await.unwrap_err();
        assert!(
            matches!(&error, ModelError::UnsupportedOperation { method: m, .. } if m == method),
            "{} gave {:?}",
            method,
            error
        );
    }
}

#[test]
fn test_write_operations_are_unsupported() {
    let registry = with_orders(registry());
    let owner = customer(1, "1234");

    for name in ["address", "addresses"] {
        let association = registry.association(&owner, name).unwrap();
        assert!(association.foreign_key_present());
        for operation in WriteOperation::ALL {
            match association.perform(operation) {
                Err(ModelError::UnsupportedOperation { method, association }) => {
                    assert_eq!(method, operation.method_name());
                    assert_eq!(association, name);
                }
                other => panic!("{} on {} gave {:?}", operation, name, other),
            }
        }
    }

    let orders = registry.association(&owner, "orders").unwrap();
    assert!(orders.perform(WriteOperation::Destroy).is_ok());
}

#[test]
fn test_unsupported_options_are_rejected() {
    let mut registry = registry();

    for (key, options) in [
        ("foreign_key", DeclarationOptions::new().foreign_key("address_id")),
        ("validate", DeclarationOptions::new().validate(true)),
    ] {
        match registry.declare_singular("Customer", "billing_address", options, None) {
            Err(ModelError::InvalidOption { key: rejected, association, valid }) => {
                assert_eq!(rejected, key);
                assert_eq!(association, "billing_address");
                assert!(valid.contains(":joins"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    let finder = DeclarationOptions::new().finder_sql("SELECT * FROM addresses");
    assert!(matches!(
        registry.declare_singular("Customer", "billing_address", finder, None),
        Err(ModelError::InvalidOption { .. })
    ));
    assert!(registry
        .model("Customer")
        .unwrap()
        .reflect_on_association("billing_address")
        .is_none());
}

#[test]
fn test_redeclared_extension_block_follows_policy() {
    let declare = |registry: &mut ModelRegistry| {
        registry.declare_many(
            "Customer",
            "addresses",
            DeclarationOptions::new().joins(["customer_addresses"]),
            Some(ExtensionBlock::new().method("recent", |q| q.order_by_desc("addresses.id"))),
        )
    };

    let mut overwrite = registry();
    declare(&mut overwrite).unwrap();
    declare(&mut overwrite).unwrap();
    assert!(overwrite
        .model("Customer")
        .unwrap()
        .extension_module("CustomerAddressesAssociationExtension")
        .is_some());

    let mut reject = ModelRegistry::with_config(AssociationConfig::default().with_redeclaration(RedeclarationPolicy::Reject));
    reject.define(ModelClass::new("Customer", "customers"));
    reject.define(ModelClass::new("Address", "addresses"));
    declare(&mut reject).unwrap();
    assert_eq!(
        declare(&mut reject).unwrap_err(),
        ModelError::Redeclaration {
            module: "CustomerAddressesAssociationExtension".to_string()
        }
    );
}

#[test]
fn test_extension_methods_refine_scope() {
    let mut registry = registry();
    registry
        .declare_many(
            "Customer",
            "addresses",
            DeclarationOptions::new()
                .joins(["INNER JOIN customer_addresses ON customer_addresses.address_id = addresses.id"])
                .conditions_fn(|ctx| vec![ctx.eq("customer_addresses.customer_number", "customer_number")]),
            Some(ExtensionBlock::new().method("recent", |q| q.order_by_desc("addresses.id").limit(2))),
        )
        .unwrap();
    let owner = customer(1, "1234");
    let association = registry.association(&owner, "addresses").unwrap();

    let sql = association.extension("recent").unwrap().to_sql();
    assert!(sql.contains("WHERE customer_addresses.customer_number = '1234'"));
    assert!(sql.ends_with("ORDER BY addresses.id DESC LIMIT 2"));

    assert!(matches!(
        association.extension("oldest"),
        Err(ModelError::UnsupportedOperation { .. })
    ));
}

#[test]
fn test_unfiltered_association_reports_warning() {
    let mut registry = registry();
    registry
        .declare_many("Customer", "every_address", DeclarationOptions::new().class_name("Address"), None)
        .unwrap();

    let warnings = registry.model("Customer").unwrap().validation_warnings();
    assert_eq!(
        warnings,
        vec![ValidationWarning::Unfiltered {
            model: "Customer".to_string(),
            association: "every_address".to_string(),
            has_joins: false,
        }]
    );
}

#[tokio::test]
async fn test_finder_and_counter_sql() {
    let mut registry = registry();
    registry
        .declare_many(
            "Customer",
            "legacy_addresses",
            DeclarationOptions::new()
                .class_name("Address")
                .finder_sql("SELECT addresses.* FROM addresses WHERE addresses.customer_number = {customer_number}")
                .counter_sql("SELECT COUNT(*) FROM addresses WHERE addresses.customer_number = {customer_number}"),
            None,
        )
        .unwrap();
    registry
        .declare_many(
            "Customer",
            "derived_addresses",
            DeclarationOptions::new()
                .class_name("Address")
                .finder_sql("SELECT addresses.* FROM addresses WHERE addresses.customer_number = {customer_number}"),
            None,
        )
        .unwrap();

    let executor = MemoryExecutor::new()
        .count("SELECT COUNT(*) FROM addresses WHERE addresses.customer_number = '1234'", 2)
        .rows("SELECT addresses.* FROM addresses WHERE addresses.customer_number = '1234'", vec![
            address(10, "Foobar"),
            address(11, "Elsewhere"),
        ]);
    let owner = customer(1, "1234");

    for name in ["legacy_addresses", "derived_addresses"] {
        let collection = registry.association(&owner, name).unwrap().into_collection().unwrap();
        assert_eq!(collection.count(&executor).await.unwrap(), 2);
        assert_eq!(collection.load(&executor).await.unwrap().len(), 2);
        assert_eq!(collection.ids(&executor).await.unwrap(), vec![json!(10), json!(11)]);
    }
}

#[tokio::test]
async fn test_zero_count_marks_collection_loaded() {
    let registry = registry();
    let executor = MemoryExecutor::new().count("SELECT COUNT(*) FROM addresses", 0);
    let owner = customer(1, "1234");

    let collection = registry.association(&owner, "addresses").unwrap().into_collection().unwrap();
    assert_eq!(collection.count(&executor).await.unwrap(), 0);
    assert!(collection.is_loaded());
    assert!(collection.load(&executor).await.unwrap().is_empty());
    assert!(collection.is_empty(&executor).await.unwrap());
    assert_eq!(executor.query_count(), 1);
}

#[test]
fn test_strategy_guard() {
    let registry = with_orders(registry());
    let loader = EagerLoader::new(&registry);

    let strategy = |request: EagerLoadRequest| loader.strategy_for(&request).unwrap();
    assert_eq!(strategy(EagerLoadRequest::new("Customer").include("orders")), LoadStrategy::Preload);
    assert_eq!(
        strategy(EagerLoadRequest::new("Customer").include("address")),
        LoadStrategy::JoinAndAssemble
    );
    assert_eq!(
        strategy(EagerLoadRequest::new("Customer").include("orders").include("addresses")),
        LoadStrategy::JoinAndAssemble
    );
    assert_eq!(
        strategy(EagerLoadRequest::new("Customer").include("missing")),
        LoadStrategy::JoinAndAssemble
    );
}

#[tokio::test]
async fn test_preload_batches_ordinary_associations() {
    let registry = with_orders(registry());
    let executor = MemoryExecutor::new()
        .rows("FROM customers", vec![
            row(json!({"id": 1, "customer_number": "1234"})),
            row(json!({"id": 2, "customer_number": "9999"})),
        ])
        .rows("FROM orders", vec![
            row(json!({"id": 100, "customer_id": 1})),
            row(json!({"id": 101, "customer_id": 1})),
        ]);

    let customers = registry
        .load(&EagerLoadRequest::new("Customer").include("orders"), &executor)
        .await
        .unwrap();

    assert_eq!(customers.len(), 2);
    assert_eq!(customers[0].loaded_collection("orders").unwrap().len(), 2);
    assert!(customers[1].loaded_collection("orders").unwrap().is_empty());

    let statements = executor.statements();
    assert_eq!(statements.len(), 2);
    assert_eq!(statements[0], "SELECT customers.* FROM customers");
    assert!(statements[1].contains("orders.customer_id IN (1, 2)"));
}

#[tokio::test]
async fn test_eager_join_assembles_singular_association() {
    let registry = registry();
    let executor = MemoryExecutor::new().rows("LEFT OUTER JOIN (addresses", vec![
        row(json!({"t0_r0": 1, "t0_r1": "1234", "t1_r0": 10, "t1_r1": "Foobar"})),
        row(json!({"t0_r0": 2, "t0_r1": "9999", "t1_r0": null, "t1_r1": null})),
    ]);

    let customers = registry
        .load(&EagerLoadRequest::new("Customer").include("address"), &executor)
        .await
        .unwrap();

    assert_eq!(
        executor.statements(),
        vec![
            "SELECT customers.id AS t0_r0, customers.customer_number AS t0_r1, \
             addresses.id AS t1_r0, addresses.city AS t1_r1 FROM customers \
             LEFT OUTER JOIN (addresses LEFT OUTER JOIN customer_addresses ON customer_addresses.address_id = addresses.id) \
             ON customer_addresses.customer_number = customers.customer_number"
                .to_string()
        ]
    );

    assert_eq!(customers.len(), 2);
    let address = customers[0].loaded_target("address").unwrap();
    assert_eq!(address.attribute("city"), json!("Foobar"));
    assert!(Arc::ptr_eq(&address.loaded_target("customer").unwrap(), &customers[0]));
    assert!(customers[1].is_loaded("address"));
    assert!(customers[1].loaded_target("address").is_none());

    // Loaded targets are served from the cache
    let reader = registry
        .association(&customers[0], "address")
        .unwrap()
        .into_singular()
        .unwrap();
    assert!(Arc::ptr_eq(&reader.reader(&executor).await.unwrap().unwrap(), &address));
    assert_eq!(executor.query_count(), 1);
}

#[tokio::test]
async fn test_eager_join_assembles_collections_in_row_order() {
    let registry = registry();
    let executor = MemoryExecutor::new().rows("LEFT OUTER JOIN (addresses", vec![
        row(json!({"t0_r0": 1, "t0_r1": "1234", "t1_r0": 12, "t1_r1": "C"})),
        row(json!({"t0_r0": 1, "t0_r1": "1234", "t1_r0": 10, "t1_r1": "A"})),
        row(json!({"t0_r0": 1, "t0_r1": "1234", "t1_r0": 11, "t1_r1": "B"})),
        row(json!({"t0_r0": 2, "t0_r1": "9999", "t1_r0": null, "t1_r1": null})),
    ]);

    let customers = registry
        .load(
            &EagerLoadRequest::new("Customer").include("addresses").eager_load(true),
            &executor,
        )
        .await
        .unwrap();
    assert!(executor.statements()[0].ends_with("ORDER BY addresses.id"));

    let cities: Vec<Value> = customers[0]
        .loaded_collection("addresses")
        .unwrap()
        .iter()
        .map(|a| a.attribute("city"))
        .collect();
    assert_eq!(cities, vec![json!("C"), json!("A"), json!("B")]);
    assert!(customers[1].loaded_collection("addresses").unwrap().is_empty());

    let collection = registry
        .association(&customers[0], "addresses")
        .unwrap()
        .into_collection()
        .unwrap();
    assert_eq!(collection.size(&executor).await.unwrap(), 3);
    assert_eq!(executor.query_count(), 1);
}

#[tokio::test]
async fn test_eager_join_assembles_nested_custom_association() {
    let mut registry = with_orders(registry());
    registry
        .declare_singular(
            "Order",
            "address",
            DeclarationOptions::new()
                .joins(["INNER JOIN order_addresses ON order_addresses.address_id = addresses.id"])
                .conditions_fn(|ctx| vec![ctx.eq("order_addresses.order_id", "id")]),
            None,
        )
        .unwrap();
    let executor = MemoryExecutor::new().rows("LEFT OUTER JOIN orders", vec![
        row(json!({"t0_r0": 1, "t0_r1": "1234", "t1_r0": 100, "t1_r1": 1, "t2_r0": 10, "t2_r1": "Foobar"})),
        row(json!({"t0_r0": 1, "t0_r1": "1234", "t1_r0": 101, "t1_r1": 1, "t2_r0": null, "t2_r1": null})),
        row(json!({"t0_r0": 2, "t0_r1": "9999", "t1_r0": null, "t1_r1": null, "t2_r0": null, "t2_r1": null})),
    ]);

    let request = EagerLoadRequest::new("Customer").include("orders.address");
    assert_eq!(EagerLoader::new(&registry).strategy_for(&request).unwrap(), LoadStrategy::JoinAndAssemble);
    let customers = registry.load(&request, &executor).await.unwrap();

    let sql = &executor.statements()[0];
    assert!(sql.contains(
        "LEFT OUTER JOIN (addresses LEFT OUTER JOIN order_addresses ON order_addresses.address_id = addresses.id) \
         ON order_addresses.order_id = orders.id"
    ));

    assert_eq!(customers.len(), 2);
    let orders = customers[0].loaded_collection("orders").unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].attribute("id"), json!(100));
    assert_eq!(orders[0].loaded_target("address").unwrap().attribute("city"), json!("Foobar"));
    assert!(orders[1].is_loaded("address"));
    assert!(orders[1].loaded_target("address").is_none());
    assert!(customers[1].loaded_collection("orders").unwrap().is_empty());
    assert_eq!(executor.query_count(), 1);
}

#[tokio::test]
async fn test_paginated_eager_join_limits_customers_not_rows() {
    let registry = registry();
    let executor = MemoryExecutor::new().rows("LEFT OUTER JOIN (addresses", vec![
        row(json!({"t0_r0": 1, "t0_r1": "1234", "t1_r0": 10, "t1_r1": "A"})),
        row(json!({"t0_r0": 1, "t0_r1": "1234", "t1_r0": 11, "t1_r1": "B"})),
    ]);

    let customers = registry
        .load(
            &EagerLoadRequest::new("Customer")
                .query(QueryBuilder::new().from("customers").limit(1))
                .include("addresses"),
            &executor,
        )
        .await
        .unwrap();

    let sql = &executor.statements()[0];
    assert!(sql.contains("WHERE customers.id IN (SELECT customers.id FROM customers LIMIT 1)"));
    assert!(!sql.ends_with("LIMIT 1"));
    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0].loaded_collection("addresses").unwrap().len(), 2);
}

#[tokio::test]
async fn test_distinct_association_counts_through_subquery() {
    let mut registry = registry();
    registry
        .declare_many(
            "Customer",
            "cities",
            DeclarationOptions::new()
                .class_name("Address")
                .select("DISTINCT addresses.*")
                .joins(["INNER JOIN customer_addresses ON customer_addresses.address_id = addresses.id"])
                .conditions_fn(|ctx| vec![ctx.eq("customer_addresses.customer_number", "customer_number")]),
            None,
        )
        .unwrap();
    let executor = MemoryExecutor::new().count("SELECT COUNT(*) FROM (SELECT DISTINCT addresses.*", 3);
    let owner = customer(1, "1234");

    let collection = registry.association(&owner, "cities").unwrap().into_collection().unwrap();
    assert_eq!(collection.count(&executor).await.unwrap(), 3);
    let statement = &executor.statements()[0];
    assert!(statement.starts_with("SELECT COUNT(*) FROM (SELECT DISTINCT addresses.* FROM addresses"));
    assert!(statement.ends_with(") AS counted"));
}
