//! Fixed-width records selected by a control cell.
//!
//! Run with: cargo run --example fixed_width

use flatcell::{
    compose_to_string, parse_str, record, Alignment, CellType, Schema, SchemaCell, SchemaLine,
};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let schema = Schema::fixed()
        .line_separator("")
        .control_cell(1)
        .line(
            SchemaLine::new("Name")
                .control_value("N")
                .cell(SchemaCell::new("First").width(5))
                .cell(SchemaCell::new("Last").width(8)),
        )
        .line(
            SchemaLine::new("Address")
                .control_value("A")
                .cell(SchemaCell::new("Street").width(10))
                .cell(SchemaCell::new("Zip").width(6)),
        )
        .line(
            SchemaLine::new("Amount")
                .control_value("$")
                .cell(
                    SchemaCell::new("Sum")
                        .cell_type(CellType::Integer)
                        .width(7)
                        .pad_char('0')
                        .alignment(Alignment::Right),
                ),
        )
        .build()?;

    let input = "NJonasStenbergAStorgatan 123 45$0001250";
    let lines = parse_str(&schema, input)?;
    for line in &lines {
        let cells: Vec<String> = line
            .iter()
            .map(|c| format!("{}={:?}", c.name().unwrap_or("?"), c.value().to_string()))
            .collect();
        println!("{:<8} {}", line.line_type(), cells.join(", "));
    }

    let mut more = lines.clone();
    more.push(record!("Name", { "First" => "Anna-Karin", "Last" => "Ek" }));
    more.push(record!("Amount", { "Sum" => 42 }));

    // Anna-Karin is cut to the column width
    println!("\n{}", compose_to_string(&schema, more)?);
    Ok(())
}
