//! # flatcell
//!
//! A schema-driven codec for flat text files: delimiter-separated (CSV and
//! friends) and fixed-width column formats.
//!
//! A [`Schema`] describes which line types a file holds, which cells each
//! line has and how every cell is written: its type, width, padding,
//! quoting, default value and whether it is mandatory. The [`Parser`] turns
//! a character stream into typed [`Line`]s; the [`Composer`] turns lines
//! back into text.
//!
//! ## Key Features
//!
//! - **Quote-aware tokenizer**: multi-character separators, quoted cells
//!   spanning several lines, RFC 4180 or escape-character quoting
//! - **Fixed-width columns**: left, right or center alignment with any pad
//!   character, with or without line separators
//! - **Several line types per file**: chosen by position (`occurs`) or by a
//!   leading control cell
//! - **Typed cells**: integers, big integers, floats, decimals, booleans,
//!   dates and date-times through pluggable [`CellFormatter`]s
//! - **Validation policy**: per violation kind, raise, report, omit the
//!   line, warn or ignore; abort on the first error or collect them
//! - **Streaming**: one record at a time, with bounded memory per line
//!
//! ## Quick Start
//!
//! ```rust
//! use flatcell::{parse_str, compose_to_string, CellType, Schema, SchemaCell, SchemaLine};
//!
//! let schema = Schema::delimited(";")
//!     .quote_char('"')
//!     .line(
//!         SchemaLine::new("Person")
//!             .cell(SchemaCell::new("Name"))
//!             .cell(SchemaCell::new("Street"))
//!             .cell(SchemaCell::new("Age").cell_type(CellType::Integer)),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let lines = parse_str(&schema, "Jonas;\"Hemvägen ;19\";42\nAnna;Storgatan 1;37").unwrap();
//! assert_eq!(lines.len(), 2);
//! assert_eq!(lines[0].get_str("Street"), Some("Hemvägen ;19"));
//! assert_eq!(lines[1].value("Age").and_then(|v| v.as_i64()), Some(37));
//!
//! let text = compose_to_string(&schema, lines).unwrap();
//! assert_eq!(text, "Jonas;\"Hemvägen ;19\";42\nAnna;Storgatan 1;37");
//! ```
//!
//! ### Fixed-width files with control cells
//!
//! ```rust
//! use flatcell::{parse_str, Schema, SchemaCell, SchemaLine};
//!
//! let schema = Schema::fixed()
//!     .line_separator("")
//!     .control_cell(1)
//!     .line(
//!         SchemaLine::new("Name")
//!             .control_value("N")
//!             .cell(SchemaCell::new("First").width(5))
//!             .cell(SchemaCell::new("Last").width(8)),
//!     )
//!     .line(
//!         SchemaLine::new("Address")
//!             .control_value("A")
//!             .cell(SchemaCell::new("Street").width(10))
//!             .cell(SchemaCell::new("Zip").width(6)),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let lines = parse_str(&schema, "NJonasStenbergAStorgatan 123 45").unwrap();
//! assert_eq!(lines[0].line_type(), "Name");
//! assert_eq!(lines[1].get_str("Street"), Some("Storgatan "));
//! ```
//!
//! ### Collecting validation errors
//!
//! ```rust
//! use flatcell::{CellType, Parser, Schema, SchemaCell, SchemaLine};
//!
//! let schema = Schema::delimited(",")
//!     .line(SchemaLine::new("Row").cell(SchemaCell::new("n").cell_type(CellType::Integer)))
//!     .build()
//!     .unwrap();
//!
//! let mut good = 0;
//! let mut bad = Vec::new();
//! Parser::new(&schema, "1\nx\n3".as_bytes())
//!     .parse_with(|_| good += 1, |err| bad.push(err.line))
//!     .unwrap();
//! assert_eq!(good, 3);
//! assert_eq!(bad, vec![2]);
//! ```
//!
//! ## Logging
//!
//! The crate logs through [`tracing`]: lenient recoveries (an unterminated
//! quote at end of input, a mandatory cell filled from its default) at
//! `warn`, task summaries at `debug` and every record at `trace`. No
//! subscriber is installed.
//!
//! ## Examples
//!
//! See the `demos/` directory:
//!
//! - **`delimited.rs`** - reading and writing a semicolon-separated file
//! - **`fixed_width.rs`** - fixed columns with control cells
//! - **`error_policy.rs`** - the validation and error policies
//!
//! Run any example with: `cargo run --example <name>`

mod buffer;
pub mod cell;
pub mod compose;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod line;
pub mod macros;
pub mod options;
pub mod pad;
pub mod parse;
pub mod quote;
pub mod schema;
pub mod tokenizer;

pub use cell::{Cell, CellType, CellValue, Decimal};
pub use compose::Composer;
pub use dispatch::LineSelector;
pub use error::{CellError, Error, FormatError, Result};
pub use format::{formatter_for, CellFormatter, Locale};
pub use line::Line;
pub use options::{ComposeConfig, ErrorPolicy, ParseConfig, ValidationAction};
pub use pad::{fit, pad, trim_pad, Alignment};
pub use parse::Parser;
pub use quote::{QuoteBehavior, QuoteSyntax, Quoter, DEFAULT_REPLACEMENT};
pub use schema::{CellLayout, Dispatch, Layout, Occurs, Schema, SchemaBuilder, SchemaCell, SchemaLine};
pub use tokenizer::Tokenizer;

use std::io;

/// Parses every record of `text`.
///
/// Uses the default [`ParseConfig`], so the first validation error aborts
/// the parse.
///
/// # Examples
///
/// ```rust
/// use flatcell::{parse_str, Schema, SchemaCell, SchemaLine};
///
/// let schema = Schema::delimited(";")
///     .line(SchemaLine::new("Row").cell(SchemaCell::unnamed()).cell(SchemaCell::unnamed()))
///     .build()
///     .unwrap();
/// let lines = parse_str(&schema, "a;b\nc;d").unwrap();
/// assert_eq!(lines[1].cell_at(1).and_then(|c| c.value().as_str()), Some("d"));
/// ```
///
/// # Errors
///
/// Returns the first structural or validation error.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn parse_str(schema: &Schema, text: &str) -> Result<Vec<Line>> {
    Parser::new(schema, text.as_bytes()).collect()
}

/// Parses every record read from `reader`.
///
/// # Errors
///
/// Returns the first I/O, structural or validation error.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn parse_reader<R>(schema: &Schema, reader: R) -> Result<Vec<Line>>
where
    R: io::Read,
{
    Parser::new(schema, reader).collect()
}

/// Composes `lines` into a string.
///
/// # Errors
///
/// Returns an error if a cell value cannot be formatted.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn compose_to_string<I>(schema: &Schema, lines: I) -> Result<String>
where
    I: IntoIterator<Item = Line>,
{
    let mut composer = Composer::new(schema, Vec::new());
    composer.compose(lines)?;
    let bytes = composer.finish()?;
    String::from_utf8(bytes).map_err(|e| Error::custom(e.to_string()))
}

/// Composes `lines` to `writer`. Returns the number of lines written.
///
/// # Examples
///
/// ```rust
/// use flatcell::{compose_to_writer, record, Schema, SchemaCell, SchemaLine};
///
/// let schema = Schema::fixed()
///     .line(SchemaLine::new("Row").cell(SchemaCell::new("id").width(4)))
///     .build()
///     .unwrap();
/// let mut out = Vec::new();
/// let n = compose_to_writer(&schema, &mut out, vec![record!("Row", { "id" => "7" })]).unwrap();
/// assert_eq!(n, 1);
/// assert_eq!(out, b"7   ");
/// ```
///
/// # Errors
///
/// Returns an error if a cell value cannot be formatted or writing fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn compose_to_writer<W, I>(schema: &Schema, writer: W, lines: I) -> Result<usize>
where
    W: io::Write,
    I: IntoIterator<Item = Line>,
{
    let mut composer = Composer::new(schema, writer);
    let count = composer.compose(lines)?;
    composer.finish()?;
    Ok(count)
}
