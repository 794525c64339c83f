//! Reading and writing a semicolon-separated file.
//!
//! Run with: cargo run --example delimited

use flatcell::{
    record, CellType, ComposeConfig, Composer, Parser, QuoteBehavior, Schema, SchemaCell,
    SchemaLine,
};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let schema = Schema::delimited(";")
        .line_separator("\r\n")
        .quote_char('"')
        .line(
            SchemaLine::new("Person")
                .first_line_as_header()
                .cell(SchemaCell::new("First name").mandatory())
                .cell(SchemaCell::new("Last name").default_value("Svensson"))
                .cell(SchemaCell::new("Street"))
                .cell(SchemaCell::new("Born").cell_type(CellType::Date))
                .cell(SchemaCell::new("Note").quote(QuoteBehavior::Always)),
        )
        .build()?;

    let input = "First name;Last name;Street;Born;Note\r\n\
                 Jonas;Stenberg;\"Hemvägen ;19\";1971-03-25;\"two\r\nlines\"\r\n\
                 Anna;;Storgatan 1;1980-12-01;\r\n";

    println!("Parsed:");
    let mut lines = Vec::new();
    for line in Parser::new(&schema, input.as_bytes()) {
        let line = line?;
        println!(
            "  line {:?}: {} {} born {}",
            line.number(),
            line.get_str("First name").unwrap_or_default(),
            line.get_str("Last name").unwrap_or_default(),
            line.value("Born").map(ToString::to_string).unwrap_or_default(),
        );
        lines.push(line);
    }

    lines.push(record!("Person", { "First name" => "Lars", "Street" => "Kungsgatan 7" }));

    let config = ComposeConfig::new().with_trailing_line_separator(true);
    let mut composer = Composer::with_config(&schema, Vec::new(), config);
    composer.compose(lines)?;
    let output = String::from_utf8(composer.finish()?)?;

    println!("\nComposed:\n{}", output);
    Ok(())
}
