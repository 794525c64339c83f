//! Validation actions and error policies.
//!
//! Run with: cargo run --example error_policy

use flatcell::{
    CellType, Error, ErrorPolicy, Line, ParseConfig, Parser, Schema, SchemaCell, SchemaLine,
    ValidationAction,
};

const INPUT: &str = "1;Jonas;42\n2;;37\nthree;Anna;x\n4;Lars\n5;Eva;29;extra";

fn schema() -> Result<Schema, Error> {
    Schema::delimited(";")
        .line(
            SchemaLine::new("Person")
                .cell(SchemaCell::new("id").cell_type(CellType::Integer))
                .cell(SchemaCell::new("name").mandatory())
                .cell(SchemaCell::new("age").cell_type(CellType::Integer)),
        )
        .build()
}

fn main() -> Result<(), Error> {
    let schema = schema()?;

    println!("Default policy stops at the first error:");
    let result: Result<Vec<Line>, Error> = Parser::new(&schema, INPUT.as_bytes()).collect();
    if let Err(err) = result {
        println!("  {}", err);
    }

    println!("\nAn error consumer collects and continues:");
    let mut records = 0;
    Parser::new(&schema, INPUT.as_bytes()).parse_with(
        |_| records += 1,
        |err| println!("  {}", err),
    )?;
    println!("  {} records delivered", records);

    println!("\nOmit bad lines, reject long ones:");
    let config = ParseConfig::new()
        .on_cell_error(ValidationAction::OmitLine)
        .on_line_insufficient(ValidationAction::Warn)
        .on_line_overflow(ValidationAction::Raise);
    for line in Parser::with_config(&schema, INPUT.as_bytes(), config) {
        match line {
            Ok(line) => println!("  kept line {:?}", line.number()),
            Err(err) => println!("  stopped: {}", err),
        }
    }

    println!("\nGive up after two errors:");
    let config = ParseConfig::new().with_error_policy(ErrorPolicy::CollectUpTo(2));
    let result: Result<Vec<Line>, Error> =
        Parser::with_config(&schema, INPUT.as_bytes(), config).collect();
    if let Err(Error::TooManyErrors(errors)) = result {
        for err in errors {
            println!("  {}", err);
        }
    }
    Ok(())
}
