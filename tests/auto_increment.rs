use primerdb::{ColumnDef, ColumnType, ColumnValue, DbError, Engine, NewRow, TableDefinition};

fn items() -> Engine {
    let engine = Engine::new();
    engine
        .define_table(
            TableDefinition::new("items")
                .column(ColumnDef::new("id", ColumnType::Integer).generated().primary_key())
                .column(ColumnDef::new("label", ColumnType::Text)),
        )
        .unwrap();
    engine
}

fn id_of(row: &primerdb::Row) -> i64 {
    row.get("id").and_then(ColumnValue::as_integer).unwrap()
}

#[test]
fn generated_keys_strictly_increase() {
    let engine = items();
    let mut last = 0;
    for i in 0..10 {
        let row = engine.insert("items", NewRow::new().set("label", format!("item {}", i))).unwrap();
        assert!(id_of(&row) > last);
        last = id_of(&row);
    }
    assert_eq!(last, 10);
    assert_eq!(engine.current_value("items_id_seq").unwrap(), Some(10));
}

#[test]
fn explicit_value_does_not_advance_sequence() {
    let engine = items();
    let row = engine.insert("items", NewRow::new().set("id", 100).set("label", "manual")).unwrap();
    assert_eq!(id_of(&row), 100);
    assert_eq!(engine.current_value("items_id_seq").unwrap(), None);

    let row = engine.insert("items", NewRow::new().set("label", "auto")).unwrap();
    assert_eq!(id_of(&row), 1);
}

#[test]
fn default_marker_draws_from_sequence() {
    let engine = items();
    engine.insert("items", NewRow::new().set("label", "a")).unwrap();
    let row = engine.insert("items", NewRow::new().set_default("id").set("label", "b")).unwrap();
    assert_eq!(id_of(&row), 2);
}

#[test]
fn generated_column_rejects_explicit_null() {
    let engine = items();
    let err = engine.insert("items", NewRow::new().set("id", ColumnValue::Null)).unwrap_err();
    assert!(matches!(err, DbError::NullConstraintViolation { ref column, .. } if column == "id"));
}

#[test]
fn generated_column_must_be_integer() {
    let engine = Engine::new();
    let err = engine
        .define_table(TableDefinition::new("bad").column(ColumnDef::new("id", ColumnType::Text).generated()))
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidDefinition(_)));
    assert!(engine.list_tables().is_empty());
}

#[test]
fn sequences_are_per_column() {
    let engine = items();
    engine
        .define_table(
            TableDefinition::new("tags").column(ColumnDef::new("id", ColumnType::BigInt).generated().primary_key()),
        )
        .unwrap();
    engine.insert("items", NewRow::new()).unwrap();
    engine.insert("items", NewRow::new()).unwrap();
    let tag = engine.insert("tags", NewRow::new()).unwrap();
    assert_eq!(id_of(&tag), 1);
}
