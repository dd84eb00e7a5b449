use primerdb::{AlterTable, ColumnDef, ColumnType, ColumnValue, Changes, DbError, Engine, ErrorKind, NewRow, TableDefinition};

fn engine() -> Engine {
    let engine = Engine::new();
    engine
        .define_table(
            TableDefinition::new("person")
                .column(ColumnDef::new("id", ColumnType::Integer).generated().primary_key())
                .column(ColumnDef::new("name", ColumnType::Text).not_null())
                .column(ColumnDef::new("nickname", ColumnType::Text)),
        )
        .unwrap();
    engine
}

#[test]
fn omitted_not_null_column_fails() {
    let engine = engine();
    let err = engine.insert("person", NewRow::new().set("nickname", "bob")).unwrap_err();
    assert!(matches!(
        err,
        DbError::NullConstraintViolation { ref table, ref column } if table == "person" && column == "name"
    ));
    assert_eq!(engine.row_count("person").unwrap(), 0);
}

#[test]
fn explicit_null_fails() {
    let engine = engine();
    let err = engine.insert("person", NewRow::new().set("name", ColumnValue::Null)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NullConstraintViolation);
}

#[test]
fn default_marker_without_default_fails() {
    let engine = engine();
    let err = engine.insert("person", NewRow::new().set_default("name")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NullConstraintViolation);
}

#[test]
fn update_to_null_fails_and_keeps_row() {
    let engine = engine();
    engine.insert("person", NewRow::new().set("name", "Amit")).unwrap();
    let err = engine.update("person", 1, Changes::new().set("name", ColumnValue::Null)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NullConstraintViolation);
    assert_eq!(engine.get("person", 1).unwrap().get("name"), Some(&ColumnValue::Text("Amit".into())));
}

#[test]
fn nullable_columns_accept_null() {
    let engine = engine();
    let row = engine.insert("person", NewRow::new().set("name", "Amit").set("nickname", ColumnValue::Null)).unwrap();
    assert_eq!(row.get("nickname"), Some(&ColumnValue::Null));
}

#[test]
fn toggling_not_null() {
    let engine = engine();
    engine.insert("person", NewRow::new().set("name", "Amit")).unwrap();

    // existing NULL nickname blocks SET NOT NULL
    let err = engine.alter_table("person", AlterTable::SetNotNull("nickname".into())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NullConstraintViolation);
    assert!(!engine.get_table("person").unwrap().column("nickname").unwrap().not_null);

    engine.alter_table("person", AlterTable::DropNotNull("name".into())).unwrap();
    engine.insert("person", NewRow::new()).unwrap();
    assert_eq!(engine.row_count("person").unwrap(), 2);
}
