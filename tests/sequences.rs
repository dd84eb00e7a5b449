use primerdb::{AlterTable, ColumnDef, ColumnDefault, ColumnType, ColumnValue, Engine, ErrorKind, NewRow, TableDefinition};

#[test]
fn start_and_increment() {
    let engine = Engine::new();
    engine.create_sequence("ticket_seq", 100, 10).unwrap();
    assert_eq!(engine.current_value("ticket_seq").unwrap(), None);
    assert_eq!(engine.next_value("ticket_seq").unwrap(), 100);
    assert_eq!(engine.next_value("ticket_seq").unwrap(), 110);
    assert_eq!(engine.current_value("ticket_seq").unwrap(), Some(110));
}

#[test]
fn counting_down() {
    let engine = Engine::new();
    engine.create_sequence("countdown", 3, -1).unwrap();
    let values: Vec<_> = (0..3).map(|_| engine.next_value("countdown").unwrap()).collect();
    assert_eq!(values, vec![3, 2, 1]);

    let err = engine.create_sequence("stuck", 1, 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDefinition);
}

#[test]
fn names_are_checked() {
    let engine = Engine::new();
    engine.create_sequence("s", 1, 1).unwrap();
    assert_eq!(engine.create_sequence("s", 5, 1).unwrap_err().kind(), ErrorKind::DuplicateSequence);
    assert_eq!(engine.next_value("missing").unwrap_err().kind(), ErrorKind::UnknownSequence);
    assert_eq!(engine.current_value("missing").unwrap_err().kind(), ErrorKind::UnknownSequence);
    assert_eq!(engine.drop_sequence("missing").unwrap_err().kind(), ErrorKind::UnknownSequence);
    engine.drop_sequence("s").unwrap();
    engine.create_sequence("s", 5, 1).unwrap();
}

#[test]
fn column_default_draws_from_named_sequence() {
    let engine = Engine::new();
    engine.create_sequence("invoice_no", 1000, 1).unwrap();
    engine
        .define_table(
            TableDefinition::new("invoices")
                .column(
                    ColumnDef::new("number", ColumnType::BigInt)
                        .default_to(ColumnDefault::Sequence("invoice_no".into()))
                        .primary_key(),
                )
                .column(ColumnDef::new("total", ColumnType::Numeric { precision: Some(10), scale: 2 })),
        )
        .unwrap();

    let first = engine.insert("invoices", NewRow::new().set("total", 10)).unwrap();
    assert_eq!(first.get("number"), Some(&ColumnValue::Integer(1000)));
    // the sequence is shared with direct calls
    assert_eq!(engine.next_value("invoice_no").unwrap(), 1001);
    let second = engine.insert("invoices", NewRow::new().set("total", 20)).unwrap();
    assert_eq!(second.get("number"), Some(&ColumnValue::Integer(1002)));

    // now owned by invoices.number
    assert_eq!(engine.drop_sequence("invoice_no").unwrap_err().kind(), ErrorKind::ConstraintViolation);
}

#[test]
fn owned_sequences_go_with_their_table() {
    let engine = Engine::new();
    engine
        .define_table(TableDefinition::new("tickets").column(ColumnDef::new("id", ColumnType::Integer).generated()))
        .unwrap();
    engine.insert("tickets", NewRow::new()).unwrap();
    assert_eq!(engine.current_value("tickets_id_seq").unwrap(), Some(1));
    assert_eq!(engine.drop_sequence("tickets_id_seq").unwrap_err().kind(), ErrorKind::ConstraintViolation);

    engine.drop_table("tickets").unwrap();
    assert_eq!(engine.current_value("tickets_id_seq").unwrap_err().kind(), ErrorKind::UnknownSequence);

    // a fresh table of the same name starts over
    engine
        .define_table(TableDefinition::new("tickets").column(ColumnDef::new("id", ColumnType::Integer).generated()))
        .unwrap();
    let row = engine.insert("tickets", NewRow::new()).unwrap();
    assert_eq!(row.get("id"), Some(&ColumnValue::Integer(1)));
}

#[test]
fn dropping_the_default_keeps_the_sequence() {
    let engine = Engine::new();
    engine
        .define_table(TableDefinition::new("jobs").column(ColumnDef::new("id", ColumnType::Integer).generated()))
        .unwrap();
    engine.insert("jobs", NewRow::new()).unwrap();
    engine.alter_table("jobs", AlterTable::DropDefault("id".into())).unwrap();
    assert_eq!(engine.current_value("jobs_id_seq").unwrap(), Some(1));

    let err = engine.insert("jobs", NewRow::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NullConstraintViolation);

    engine
        .alter_table(
            "jobs",
            AlterTable::SetDefault { column: "id".into(), default: ColumnDefault::Sequence("jobs_id_seq".into()) },
        )
        .unwrap();
    let row = engine.insert("jobs", NewRow::new()).unwrap();
    assert_eq!(row.get("id"), Some(&ColumnValue::Integer(2)));
}

#[test]
fn sequence_default_needs_an_integer_column() {
    let engine = Engine::new();
    engine.create_sequence("s", 1, 1).unwrap();
    let err = engine
        .define_table(
            TableDefinition::new("t")
                .column(ColumnDef::new("code", ColumnType::Text).default_to(ColumnDefault::Sequence("s".into()))),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDefinition);

    let err = engine
        .define_table(
            TableDefinition::new("t")
                .column(ColumnDef::new("n", ColumnType::Integer).default_to(ColumnDefault::Sequence("nope".into()))),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownSequence);
}

#[test]
fn descending_sequence_as_a_key_default() {
    let engine = Engine::new();
    engine.create_sequence("countdown", 10, -5).unwrap();
    engine
        .define_table(
            TableDefinition::new("launches")
                .column(
                    ColumnDef::new("slot", ColumnType::Integer)
                        .default_to(ColumnDefault::Sequence("countdown".into()))
                        .primary_key(),
                )
                .column(ColumnDef::new("id", ColumnType::Integer).generated()),
        )
        .unwrap();
    let rows: Vec<_> = (0..3).map(|_| engine.insert("launches", NewRow::new()).unwrap()).collect();
    let slots: Vec<_> = rows.iter().map(|r| r.get("slot").cloned()).collect();
    let ids: Vec<_> = rows.iter().map(|r| r.get("id").cloned()).collect();
    assert_eq!(slots, vec![Some(ColumnValue::Integer(10)), Some(ColumnValue::Integer(5)), Some(ColumnValue::Integer(0))]);
    // generated columns always count up
    assert_eq!(ids, vec![Some(ColumnValue::Integer(1)), Some(ColumnValue::Integer(2)), Some(ColumnValue::Integer(3))]);
}
