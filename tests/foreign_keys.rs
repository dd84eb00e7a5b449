use primerdb::{
    AlterTable, Changes, ColumnDef, ColumnType, ColumnValue, DbError, Engine, ErrorKind, NewRow, ReferentialAction,
    TableDefinition,
};

fn shop(on_delete: ReferentialAction) -> Engine {
    let engine = Engine::new();
    engine
        .define_table(
            TableDefinition::new("customers")
                .column(ColumnDef::new("customer_id", ColumnType::Integer).generated().primary_key())
                .column(ColumnDef::new("name", ColumnType::Text).not_null()),
        )
        .unwrap();
    engine
        .define_table(
            TableDefinition::new("orders")
                .column(ColumnDef::new("order_id", ColumnType::Integer).generated().primary_key())
                .column(
                    ColumnDef::new("customer_id", ColumnType::Integer)
                        .references("customers", "customer_id")
                        .on_delete(on_delete),
                )
                .column(ColumnDef::new("product", ColumnType::Text)),
        )
        .unwrap();
    engine.insert("customers", NewRow::new().set("name", "Asha")).unwrap();
    engine.insert("customers", NewRow::new().set("name", "Vikram")).unwrap();
    engine
}

fn order(customer: i32, product: &str) -> NewRow {
    NewRow::new().set("customer_id", customer).set("product", product)
}

#[test]
fn child_needs_existing_parent() {
    let engine = shop(ReferentialAction::NoAction);
    let err = engine.insert("orders", order(99, "Phone")).unwrap_err();
    match err {
        DbError::ForeignKeyViolation { table, constraint, detail } => {
            assert_eq!(table, "orders");
            assert_eq!(constraint, "orders_customer_id_fkey");
            assert!(detail.contains("99"));
        }
        other => panic!("unexpected {:?}", other),
    }
    engine.insert("orders", order(1, "Laptop")).unwrap();
    engine.insert("orders", NewRow::new().set("product", "Gift")).unwrap();
    assert_eq!(engine.row_count("orders").unwrap(), 2);
}

#[test]
fn delete_with_dependents_is_restricted() {
    let engine = shop(ReferentialAction::NoAction);
    engine.insert("orders", order(1, "Laptop")).unwrap();

    let err = engine.delete("customers", 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ForeignKeyViolation);
    assert!(engine.get("customers", 1).is_ok());

    engine.delete("customers", 2).unwrap();
    engine.delete("orders", 1).unwrap();
    engine.delete("customers", 1).unwrap();
    assert_eq!(engine.row_count("customers").unwrap(), 0);
}

#[test]
fn referenced_key_cannot_move() {
    let engine = shop(ReferentialAction::NoAction);
    engine.insert("orders", order(1, "Laptop")).unwrap();

    let err = engine.update("customers", 1, Changes::new().set("customer_id", 10)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ForeignKeyViolation);

    // unreferenced keys and non-key columns are free to change
    engine.update("customers", 2, Changes::new().set("customer_id", 20)).unwrap();
    engine.update("customers", 1, Changes::new().set("name", "Asha R")).unwrap();
}

#[test]
fn child_update_is_checked() {
    let engine = shop(ReferentialAction::NoAction);
    engine.insert("orders", order(1, "Laptop")).unwrap();
    let err = engine.update("orders", 1, Changes::new().set("customer_id", 42)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ForeignKeyViolation);
    engine.update("orders", 1, Changes::new().set("customer_id", 2)).unwrap();
}

#[test]
fn cascade_removes_dependents() {
    let engine = shop(ReferentialAction::Cascade);
    engine.insert("orders", order(1, "Laptop")).unwrap();
    engine.insert("orders", order(1, "Mouse")).unwrap();
    engine.insert("orders", order(2, "Desk")).unwrap();

    engine.delete("customers", 1).unwrap();
    let remaining: Vec<_> = engine.scan("orders").unwrap().collect();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].get("product"), Some(&ColumnValue::Text("Desk".into())));
}

#[test]
fn cascade_stops_at_restricting_grandchild() {
    let engine = shop(ReferentialAction::Cascade);
    engine
        .define_table(
            TableDefinition::new("shipments")
                .column(ColumnDef::new("id", ColumnType::Integer).generated().primary_key())
                .column(ColumnDef::new("order_id", ColumnType::Integer).references("orders", "order_id")),
        )
        .unwrap();
    engine.insert("orders", order(1, "Laptop")).unwrap();
    engine.insert("shipments", NewRow::new().set("order_id", 1)).unwrap();

    let err = engine.delete("customers", 1).unwrap_err();
    assert!(matches!(err, DbError::ForeignKeyViolation { ref table, .. } if table == "orders"));
    assert_eq!(engine.row_count("customers").unwrap(), 2);
    assert_eq!(engine.row_count("orders").unwrap(), 1);
}

#[test]
fn set_null_detaches_dependents() {
    let engine = shop(ReferentialAction::SetNull);
    engine.insert("orders", order(1, "Laptop")).unwrap();
    engine.delete("customers", 1).unwrap();
    assert_eq!(engine.get("orders", 1).unwrap().get("customer_id"), Some(&ColumnValue::Null));
}

#[test]
fn set_null_needs_nullable_column() {
    let engine = shop(ReferentialAction::NoAction);
    let err = engine
        .define_table(
            TableDefinition::new("notes").column(
                ColumnDef::new("customer_id", ColumnType::Integer)
                    .not_null()
                    .references("customers", "customer_id")
                    .on_delete(ReferentialAction::SetNull),
            ),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDefinition);
}

#[test]
fn self_reference() {
    let engine = Engine::new();
    engine
        .define_table(
            TableDefinition::new("staff")
                .column(ColumnDef::new("id", ColumnType::Integer).primary_key())
                .column(ColumnDef::new("manager_id", ColumnType::Integer).references("staff", "id")),
        )
        .unwrap();
    engine.insert("staff", NewRow::new().set("id", 1).set("manager_id", 1)).unwrap();
    engine.insert("staff", NewRow::new().set("id", 2).set("manager_id", 1)).unwrap();
    let err = engine.insert("staff", NewRow::new().set("id", 3).set("manager_id", 9)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ForeignKeyViolation);

    assert_eq!(engine.delete("staff", 1).unwrap_err().kind(), ErrorKind::ForeignKeyViolation);
    engine.delete("staff", 2).unwrap();
    engine.delete("staff", 1).unwrap();
}

#[test]
fn self_referencing_row_keeps_its_key() {
    let engine = Engine::new();
    engine
        .define_table(
            TableDefinition::new("staff")
                .column(ColumnDef::new("id", ColumnType::Integer).primary_key())
                .column(ColumnDef::new("manager_id", ColumnType::Integer).references("staff", "id")),
        )
        .unwrap();
    engine.insert("staff", NewRow::new().set("id", 1).set("manager_id", 1)).unwrap();

    let err = engine.update("staff", 1, Changes::new().set("id", 2)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ForeignKeyViolation);
    assert_eq!(engine.get("staff", 1).unwrap().get("manager_id"), Some(&ColumnValue::Integer(1)));

    // moving both together keeps the reference intact
    let row = engine.update("staff", 1, Changes::new().set("id", 2).set("manager_id", 2)).unwrap();
    assert_eq!(row.get("manager_id"), Some(&ColumnValue::Integer(2)));

    // and dropping the reference frees the key
    engine.update("staff", 2, Changes::new().set("manager_id", ColumnValue::Null)).unwrap();
    engine.update("staff", 2, Changes::new().set("id", 3)).unwrap();
    assert_eq!(engine.row_count("staff").unwrap(), 1);
}

#[test]
fn float_and_integer_keys_match() {
    let engine = Engine::new();
    engine
        .define_table(TableDefinition::new("gauges").column(ColumnDef::new("k", ColumnType::Double).primary_key()))
        .unwrap();
    engine
        .define_table(TableDefinition::new("readings").column(ColumnDef::new("k", ColumnType::Integer).references("gauges", "k")))
        .unwrap();
    engine.insert("gauges", NewRow::new().set("k", 1.0)).unwrap();
    engine.insert("gauges", NewRow::new().set("k", 2.5)).unwrap();

    engine.insert("readings", NewRow::new().set("k", 1)).unwrap();
    let err = engine.insert("readings", NewRow::new().set("k", 2)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ForeignKeyViolation);
    assert_eq!(engine.delete("gauges", 1).unwrap_err().kind(), ErrorKind::ForeignKeyViolation);

    // converting the child column keeps its rows resolvable
    engine.alter_table("readings", AlterTable::alter_type("k", ColumnType::Real)).unwrap();
    engine.insert("readings", NewRow::new().set("k", 2.5)).unwrap();
    assert_eq!(engine.delete("gauges", 2.5).unwrap_err().kind(), ErrorKind::ForeignKeyViolation);
}

#[test]
fn numeric_child_of_integer_parent() {
    let engine = Engine::new();
    engine
        .define_table(TableDefinition::new("bins").column(ColumnDef::new("id", ColumnType::BigInt).primary_key()))
        .unwrap();
    engine
        .define_table(
            TableDefinition::new("items").column(
                ColumnDef::new("bin", ColumnType::Numeric { precision: Some(6), scale: 2 }).references("bins", "id"),
            ),
        )
        .unwrap();
    engine.insert("bins", NewRow::new().set("id", 7)).unwrap();
    engine.insert("items", NewRow::new().set("bin", "7.00")).unwrap();
    let err = engine.insert("items", NewRow::new().set("bin", "7.5")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ForeignKeyViolation);
}

#[test]
fn definition_errors() {
    let engine = shop(ReferentialAction::NoAction);
    let missing_table = TableDefinition::new("a").column(ColumnDef::new("x", ColumnType::Integer).references("nope", "id"));
    assert_eq!(engine.define_table(missing_table).unwrap_err().kind(), ErrorKind::UnknownTable);

    let missing_column =
        TableDefinition::new("a").column(ColumnDef::new("x", ColumnType::Integer).references("customers", "nope"));
    assert_eq!(engine.define_table(missing_column).unwrap_err().kind(), ErrorKind::UnknownColumn);

    let not_unique =
        TableDefinition::new("a").column(ColumnDef::new("x", ColumnType::Text).references("customers", "name"));
    assert_eq!(engine.define_table(not_unique).unwrap_err().kind(), ErrorKind::InvalidDefinition);

    let wrong_type =
        TableDefinition::new("a").column(ColumnDef::new("x", ColumnType::Text).references("customers", "customer_id"));
    assert_eq!(engine.define_table(wrong_type).unwrap_err().kind(), ErrorKind::InvalidDefinition);
}

#[test]
fn unique_parent_column_can_be_referenced() {
    let engine = Engine::new();
    engine
        .define_table(
            TableDefinition::new("users")
                .column(ColumnDef::new("id", ColumnType::Integer).generated().primary_key())
                .column(ColumnDef::new("email", ColumnType::Text).unique()),
        )
        .unwrap();
    engine
        .define_table(
            TableDefinition::new("logins").column(ColumnDef::new("email", ColumnType::Varchar(Some(80))).references("users", "email")),
        )
        .unwrap();
    engine.insert("users", NewRow::new().set("email", "a@x")).unwrap();
    engine.insert("logins", NewRow::new().set("email", "a@x")).unwrap();
    assert_eq!(
        engine.insert("logins", NewRow::new().set("email", "b@x")).unwrap_err().kind(),
        ErrorKind::ForeignKeyViolation
    );
}

#[test]
fn referenced_table_cannot_be_dropped() {
    let engine = shop(ReferentialAction::NoAction);
    assert_eq!(engine.drop_table("customers").unwrap_err().kind(), ErrorKind::ConstraintViolation);
    engine.drop_table("orders").unwrap();
    engine.drop_table("customers").unwrap();
    assert!(engine.list_tables().is_empty());
}
