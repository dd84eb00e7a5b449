// src/main.rs

use log::{info, warn};

use primerdb::execution::runtime::{format_header, format_row};
use primerdb::{
    AlterTable, ColumnDef, ColumnDefault, ColumnType, ConstraintDef, DbResult, Engine, NewRow, TableDefinition,
};

fn define_schema(engine: &Engine) -> DbResult<()> {
    engine.define_table(
        TableDefinition::new("person")
            .column(ColumnDef::new("id", ColumnType::Integer).generated().primary_key())
            .column(ColumnDef::new("name", ColumnType::Varchar(Some(50))).not_null())
            .column(ColumnDef::new("city", ColumnType::Varchar(Some(50))))
            .column(ColumnDef::new("age", ColumnType::Integer).default(18)),
    )?;
    engine.define_table(
        TableDefinition::new("employees")
            .column(ColumnDef::new("emp_id", ColumnType::Integer).generated().primary_key())
            .column(ColumnDef::new("name", ColumnType::Varchar(Some(100))).not_null())
            .column(ColumnDef::new("email", ColumnType::Varchar(Some(100))).unique())
            .column(ColumnDef::new("department", ColumnType::Varchar(Some(50))))
            .column(
                ColumnDef::new("salary", ColumnType::Numeric { precision: Some(10), scale: 2 })
                    .default(30000)
                    .check("salary > 0"),
            )
            .column(ColumnDef::new("joined_on", ColumnType::Date).default_to(ColumnDefault::CurrentDate)),
    )?;
    engine.define_table(
        TableDefinition::new("customers")
            .column(ColumnDef::new("customer_id", ColumnType::Integer).generated().primary_key())
            .column(ColumnDef::new("name", ColumnType::Varchar(Some(100))).not_null())
            .column(ColumnDef::new("city", ColumnType::Varchar(Some(50)))),
    )?;
    engine.define_table(
        TableDefinition::new("orders")
            .column(ColumnDef::new("order_id", ColumnType::Integer).generated().primary_key())
            .column(ColumnDef::new("customer_id", ColumnType::Integer).references("customers", "customer_id"))
            .column(ColumnDef::new("product", ColumnType::Varchar(Some(100))))
            .column(ColumnDef::new("quantity", ColumnType::Integer))
            .constraint(ConstraintDef::check("quantity > 0").named("positive_quantity")),
    )?;
    engine.define_table(
        TableDefinition::new("products")
            .column(ColumnDef::new("code", ColumnType::Char(5)).primary_key().check("LENGTH(code) = 5"))
            .column(ColumnDef::new("title", ColumnType::Text).not_null())
            .column(ColumnDef::new("price", ColumnType::Numeric { precision: Some(10), scale: 2 }))
            .column(ColumnDef::new("weight", ColumnType::Real)),
    )?;
    Ok(())
}

fn replay(engine: &Engine, table: &str, row: NewRow) {
    match engine.insert(table, row) {
        Ok(row) => println!("{}: {}", table, format_row(&row)),
        Err(e) => println!("{}: ERROR: {}", table, e),
    }
}

fn main() -> DbResult<()> {
    env_logger::init();
    info!("Starting primerdb demo");

    let engine = Engine::new();
    define_schema(&engine)?;

    replay(&engine, "person", NewRow::new().set("name", "Amit").set("age", 22));
    replay(&engine, "person", NewRow::new().set("name", "Sara").set("city", "Pune"));
    replay(&engine, "person", NewRow::new().set("city", "Delhi"));

    replay(&engine, "employees", NewRow::new().set("name", "Ravi").set("email", "ravi@example.com"));
    replay(
        &engine,
        "employees",
        NewRow::new().set("name", "Meena").set("email", "meena@example.com").set("salary", "45000.505"),
    );
    replay(&engine, "employees", NewRow::new().set("name", "Ravi K").set("email", "ravi@example.com"));
    replay(&engine, "employees", NewRow::new().set("name", "Zero").set("salary", 0));

    replay(&engine, "customers", NewRow::new().set("name", "Asha").set("city", "Mumbai"));
    replay(&engine, "customers", NewRow::new().set("name", "Vikram").set("city", "Chennai"));
    replay(
        &engine,
        "orders",
        NewRow::new().set("customer_id", 1).set("product", "Laptop").set("quantity", 1),
    );
    replay(
        &engine,
        "orders",
        NewRow::new().set("customer_id", 99).set("product", "Phone").set("quantity", 2),
    );
    replay(
        &engine,
        "orders",
        NewRow::new().set("customer_id", 2).set("product", "Desk").set("quantity", 0),
    );

    replay(&engine, "products", NewRow::new().set("code", "AB123").set("title", "Pen").set("price", "10.499"));
    replay(&engine, "products", NewRow::new().set("code", "XY1").set("title", "Ink"));

    if let Err(e) = engine.delete("customers", 1) {
        warn!("delete refused: {}", e);
        println!("customers: ERROR: {}", e);
    }

    engine.alter_table("person", AlterTable::set_default("city", "Delhi"))?;
    replay(&engine, "person", NewRow::new().set("name", "Kiran"));

    for table in engine.list_tables() {
        let schema = engine.get_table(&table)?;
        println!();
        println!("{}", table);
        println!("{}", format_header(&schema));
        for row in engine.scan(&table)? {
            println!("{}", format_row(&row));
        }
    }
    Ok(())
}
