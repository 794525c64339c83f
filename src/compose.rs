//! Writing records to a character sink.
//!
//! A [`Composer`] writes each [`Line`] with the schema line of the same
//! line type. Lines of unknown types are dropped, and so are lines whose
//! schema line is marked `ignore_write`. Cells are matched by name;
//! unnamed schema cells match unnamed line cells at the same position. A
//! schema cell without a matching line cell writes its default value, or
//! nothing.
//!
//! Lines are separated by the schema's line separator. The last line is
//! only terminated when [`ComposeConfig::trailing_line_separator`] is set.
//!
//! ## Examples
//!
//! ```rust
//! use flatcell::{compose_to_string, record, Schema, SchemaCell, SchemaLine};
//!
//! let schema = Schema::delimited(";")
//!     .line(
//!         SchemaLine::new("Person")
//!             .cell(SchemaCell::new("First name"))
//!             .cell(SchemaCell::new("Last name").default_value("Svensson")),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let out = compose_to_string(&schema, vec![record!("Person", { "First name" => "Jonas" })]).unwrap();
//! assert_eq!(out, "Jonas;Svensson");
//! ```

use crate::cell::{Cell, CellType, CellValue};
use crate::error::{Error, Result};
use crate::line::Line;
use crate::options::ComposeConfig;
use crate::pad::{pad, Alignment};
use crate::quote::{QuoteBehavior, Quoter};
use crate::schema::{CellLayout, Dispatch, Layout, Schema, SchemaCell, SchemaLine};
use std::collections::HashSet;
use std::io::Write;
use tracing::{debug, trace};

/// Writes [`Line`]s to `W` as described by a [`Schema`].
///
/// The writer is used as is; wrap it in a `BufWriter` for unbuffered sinks.
/// [`finish`](Self::finish) flushes it and hands it back.
pub struct Composer<'s, W> {
    schema: &'s Schema,
    config: ComposeConfig,
    writer: W,
    lines_written: usize,
    headers_written: HashSet<String>,
    buf: String,
}

impl<'s, W: Write> Composer<'s, W> {
    pub fn new(schema: &'s Schema, writer: W) -> Self {
        Self::with_config(schema, writer, ComposeConfig::default())
    }

    pub fn with_config(schema: &'s Schema, writer: W, config: ComposeConfig) -> Self {
        Composer {
            schema,
            config,
            writer,
            lines_written: 0,
            headers_written: HashSet::new(),
            buf: String::new(),
        }
    }

    /// Number of physical lines written, headers included.
    #[must_use]
    pub fn lines_written(&self) -> usize {
        self.lines_written
    }

    /// Writes one line. Returns `false` if the line was dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if a cell value cannot be formatted or the writer fails.
    pub fn compose_line(&mut self, line: &Line) -> Result<bool> {
        let schema = self.schema;
        let schema_line = match schema.line(line.line_type()) {
            Some(schema_line) if !schema_line.is_ignore_write() => schema_line,
            _ => {
                trace!(line_type = line.line_type(), "dropping line");
                return Ok(false);
            }
        };

        if schema_line.has_header() && !self.headers_written.contains(schema_line.line_type()) {
            self.buf.clear();
            self.write_header(schema_line);
            self.emit()?;
            self.headers_written.insert(schema_line.line_type().to_string());
        }

        self.buf.clear();
        match schema.layout() {
            Layout::Delimited {
                cell_separator,
                quote_syntax,
                replacement,
                ..
            } => {
                let quoter = Quoter::new(
                    cell_separator,
                    schema.line_separator(),
                    schema.quote_for(schema_line),
                    *quote_syntax,
                    replacement,
                );
                if let (Dispatch::ControlCell { write: true, .. }, Some(control)) =
                    (schema.dispatch(), schema_line.control())
                {
                    quoter.write(&mut self.buf, control, QuoteBehavior::Automatic, None);
                    self.buf.push_str(cell_separator);
                }
                for (i, cell) in schema_line.cells().iter().enumerate() {
                    if i > 0 {
                        self.buf.push_str(cell_separator);
                    }
                    let text = cell_text(schema, line, cell, i)?;
                    match cell.layout() {
                        CellLayout::Delimited { max_length, quote } => {
                            // Atomic text skips quoting unless it would break the line.
                            let behavior = if cell.get_type().is_atomic()
                                && !quoter.needs_quotes(&text)
                            {
                                QuoteBehavior::Never
                            } else {
                                *quote
                            };
                            quoter.write(&mut self.buf, &text, behavior, *max_length);
                        }
                        CellLayout::Fixed { .. } => self.buf.push_str(&text),
                    }
                }
            }
            Layout::Fixed { .. } => {
                if let (Dispatch::ControlCell { width, write: true }, Some(control)) =
                    (schema.dispatch(), schema_line.control())
                {
                    self.buf.push_str(&pad(control, *width, ' ', Alignment::Left));
                }
                for (i, cell) in schema_line.cells().iter().enumerate() {
                    let text = cell_text(schema, line, cell, i)?;
                    match cell.layout() {
                        CellLayout::Fixed {
                            width,
                            pad_char,
                            alignment,
                        } => self.buf.push_str(&pad(&text, *width, *pad_char, *alignment)),
                        CellLayout::Delimited { .. } => self.buf.push_str(&text),
                    }
                }
            }
        }
        self.emit()?;
        Ok(true)
    }

    /// Writes every line from `lines`. Returns the number of lines written.
    ///
    /// # Errors
    ///
    /// Stops at the first error; lines before it have been written.
    pub fn compose<I>(&mut self, lines: I) -> Result<usize>
    where
        I: IntoIterator<Item = Line>,
    {
        let mut count = 0;
        for line in lines {
            if self.compose_line(&line)? {
                count += 1;
            }
        }
        debug!(lines = count, "compose finished");
        Ok(count)
    }

    /// Terminates the last line if configured, flushes and returns the writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    pub fn finish(mut self) -> Result<W> {
        if self.config.trailing_line_separator && self.lines_written > 0 {
            self.writer.write_all(self.schema.line_separator().as_bytes())?;
        }
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn write_header(&mut self, schema_line: &SchemaLine) {
        if let Layout::Delimited {
            cell_separator,
            quote_syntax,
            replacement,
            ..
        } = self.schema.layout()
        {
            let quoter = Quoter::new(
                cell_separator,
                self.schema.line_separator(),
                self.schema.quote_for(schema_line),
                *quote_syntax,
                replacement,
            );
            for (i, cell) in schema_line.cells().iter().enumerate() {
                if i > 0 {
                    self.buf.push_str(cell_separator);
                }
                quoter.write(&mut self.buf, cell.name().unwrap_or_default(), QuoteBehavior::Automatic, None);
            }
        }
    }

    fn emit(&mut self) -> Result<()> {
        if self.lines_written > 0 {
            self.writer.write_all(self.schema.line_separator().as_bytes())?;
        }
        self.writer.write_all(self.buf.as_bytes())?;
        self.lines_written += 1;
        Ok(())
    }
}

fn cell_text(schema: &Schema, line: &Line, cell: &SchemaCell, pos: usize) -> Result<String> {
    if cell.is_ignore_write() {
        return Ok(String::new());
    }
    let found = match cell.name() {
        Some(name) => line.cell_hinted(name, pos),
        None => line.cell_at(pos).filter(|c| c.name().is_none()),
    };
    match found.map(Cell::value) {
        None | Some(CellValue::Empty) => Ok(cell.default_text().unwrap_or_default().to_string()),
        Some(CellValue::String(text))
            if !matches!(cell.get_type(), CellType::String | CellType::Character) =>
        {
            Ok(text.clone())
        }
        Some(value) => cell
            .cell_formatter()
            .format(value, schema.locale())
            .map_err(|source| Error::Format {
                cell: cell.label().to_string(),
                source,
            }),
    }
}
