use primerdb::{
    AlterTable, ColumnDef, ColumnDefault, ColumnType, ColumnValue, DbError, Engine, NewRow, TableDefinition,
};
use rust_decimal::Decimal;

fn person(city_default: Option<&str>) -> TableDefinition {
    let mut city = ColumnDef::new("city", ColumnType::Varchar(Some(50)));
    if let Some(d) = city_default {
        city = city.default(d);
    }
    TableDefinition::new("person")
        .column(ColumnDef::new("id", ColumnType::Integer).generated().primary_key())
        .column(ColumnDef::new("name", ColumnType::Varchar(Some(50))).not_null())
        .column(city)
        .column(ColumnDef::new("age", ColumnType::Integer).default(18))
}

#[test]
fn omitted_column_without_default_is_null() {
    let engine = Engine::new();
    engine.define_table(person(None)).unwrap();
    let row = engine.insert("person", NewRow::new().set("name", "Amit").set("age", 22)).unwrap();
    assert_eq!(row.get("id"), Some(&ColumnValue::Integer(1)));
    assert_eq!(row.get("name"), Some(&ColumnValue::Text("Amit".into())));
    assert_eq!(row.get("city"), Some(&ColumnValue::Null));
    assert_eq!(row.get("age"), Some(&ColumnValue::Integer(22)));
}

#[test]
fn omitted_column_takes_declared_default() {
    let engine = Engine::new();
    engine.define_table(person(Some("Delhi"))).unwrap();
    let row = engine.insert("person", NewRow::new().set("name", "Amit").set("age", 22)).unwrap();
    assert_eq!(row.get("city"), Some(&ColumnValue::Text("Delhi".into())));

    let row = engine.insert("person", NewRow::new().set("name", "Sara")).unwrap();
    assert_eq!(row.get("age"), Some(&ColumnValue::Integer(18)));
}

#[test]
fn explicit_null_overrides_default() {
    let engine = Engine::new();
    engine.define_table(person(Some("Delhi"))).unwrap();
    let row = engine.insert("person", NewRow::new().set("name", "Amit").set("city", ColumnValue::Null)).unwrap();
    assert_eq!(row.get("city"), Some(&ColumnValue::Null));
}

#[test]
fn default_marker_applies_default() {
    let engine = Engine::new();
    engine.define_table(person(None)).unwrap();
    let row = engine
        .insert("person", NewRow::new().set("name", "Amit").set_default("age").set_default("city"))
        .unwrap();
    assert_eq!(row.get("age"), Some(&ColumnValue::Integer(18)));
    assert_eq!(row.get("city"), Some(&ColumnValue::Null));
}

#[test]
fn reread_matches_inserted_row() {
    let engine = Engine::new();
    engine.define_table(person(Some("Delhi"))).unwrap();
    let inserted = engine.insert("person", NewRow::new().set("name", "Amit")).unwrap();
    let fetched = engine.get("person", 1).unwrap();
    assert_eq!(inserted, fetched);
    assert_eq!(engine.get("person", 1).unwrap(), fetched);
}

#[test]
fn salary_defaults_to_30000() {
    let engine = Engine::new();
    engine
        .define_table(
            TableDefinition::new("employees")
                .column(ColumnDef::new("emp_id", ColumnType::Integer).generated().primary_key())
                .column(ColumnDef::new("name", ColumnType::Text).not_null())
                .column(ColumnDef::new("salary", ColumnType::Numeric { precision: Some(10), scale: 2 }).default(30000)),
        )
        .unwrap();
    let row = engine.insert("employees", NewRow::new().set("name", "Ravi")).unwrap();
    assert_eq!(row.get("salary"), Some(&ColumnValue::Numeric(Decimal::from(30000))));
}

#[test]
fn clock_defaults_are_typed() {
    let engine = Engine::new();
    engine
        .define_table(
            TableDefinition::new("events")
                .column(ColumnDef::new("id", ColumnType::Integer).generated().primary_key())
                .column(ColumnDef::new("on_day", ColumnType::Date).default_to(ColumnDefault::CurrentDate))
                .column(ColumnDef::new("at", ColumnType::Timestamp).default_to(ColumnDefault::CurrentTimestamp)),
        )
        .unwrap();
    let row = engine.insert("events", NewRow::new()).unwrap();
    assert!(matches!(row.get("on_day"), Some(ColumnValue::Date(_))));
    assert!(matches!(row.get("at"), Some(ColumnValue::Timestamp(_))));
}

#[test]
fn default_must_fit_column() {
    let engine = Engine::new();
    let err = engine
        .define_table(TableDefinition::new("t").column(ColumnDef::new("age", ColumnType::Integer).default("abc")))
        .unwrap_err();
    assert!(matches!(err, DbError::TypeMismatch { .. }));

    let err = engine
        .define_table(
            TableDefinition::new("t").column(ColumnDef::new("d", ColumnType::Date).default_to(ColumnDefault::CurrentTime)),
        )
        .unwrap_err();
    assert!(matches!(err, DbError::TypeMismatch { .. }));
}

#[test]
fn changing_default_affects_only_later_inserts() {
    let engine = Engine::new();
    engine.define_table(person(None)).unwrap();
    engine.insert("person", NewRow::new().set("name", "Amit")).unwrap();

    engine.alter_table("person", AlterTable::set_default("city", "Pune")).unwrap();
    let row = engine.insert("person", NewRow::new().set("name", "Sara")).unwrap();
    assert_eq!(row.get("city"), Some(&ColumnValue::Text("Pune".into())));
    assert_eq!(engine.get("person", 1).unwrap().get("city"), Some(&ColumnValue::Null));

    engine.alter_table("person", AlterTable::DropDefault("age".into())).unwrap();
    let row = engine.insert("person", NewRow::new().set("name", "Kiran")).unwrap();
    assert_eq!(row.get("age"), Some(&ColumnValue::Null));
}
