//! The declarative description of a flat file.
//!
//! A [`Schema`] lists the [`SchemaLine`]s a file may contain, each an
//! ordered list of [`SchemaCell`]s. The schema also fixes the layout
//! (delimited or fixed-width), the line separator, the [`Locale`] and how
//! the line type of a physical line is determined ([`Dispatch`]).
//!
//! Schemas are built once and then shared read-only; every consistency
//! check happens in [`SchemaBuilder::build`], so a parse or compose task
//! never discovers a configuration problem half way through a file.
//!
//! ## Examples
//!
//! ```rust
//! use flatcell::{CellType, Occurs, Schema, SchemaCell, SchemaLine};
//!
//! let schema = Schema::delimited(";")
//!     .line_separator("\r\n")
//!     .quote_char('"')
//!     .line(
//!         SchemaLine::new("Person")
//!             .occurs(Occurs::Unbounded)
//!             .cell(SchemaCell::new("First name").mandatory())
//!             .cell(SchemaCell::new("Last name").default_value("Svensson"))
//!             .cell(SchemaCell::new("Born").cell_type(CellType::Date)),
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(schema.line("Person").map(|l| l.cells().len()), Some(3));
//! ```
//!
//! Schemas can also be read from any serde format:
//!
//! ```rust
//! use flatcell::Schema;
//!
//! let json = r#"{
//!     "layout": { "fixed": {} },
//!     "line_separator": "",
//!     "dispatch": { "control_cell": { "width": 1 } },
//!     "lines": [
//!         { "line_type": "Name", "control_value": "N",
//!           "cells": [ { "name": "First", "layout": { "fixed": { "width": 5 } } } ] }
//!     ]
//! }"#;
//! let schema: Schema = serde_json::from_str(json).unwrap();
//! assert!(schema.is_fixed());
//! assert_eq!(schema.line("Name").map(|l| l.total_width()), Some(5));
//! ```

use crate::buffer::is_universal_newline;
use crate::cell::{CellType, CellValue};
use crate::error::{Error, FormatError, Result};
use crate::format::{formatter_for, CellFormatter, Locale};
use crate::pad::Alignment;
use crate::quote::{QuoteBehavior, QuoteSyntax, DEFAULT_REPLACEMENT};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

fn default_pad_char() -> char {
    ' '
}

fn default_true() -> bool {
    true
}

fn default_line_separator() -> String {
    "\n".to_string()
}

fn default_replacement() -> String {
    DEFAULT_REPLACEMENT.to_string()
}

/// Layout-specific settings of one schema cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellLayout {
    Delimited {
        #[serde(default)]
        max_length: Option<usize>,
        #[serde(default)]
        quote: QuoteBehavior,
    },
    Fixed {
        width: usize,
        #[serde(default = "default_pad_char")]
        pad_char: char,
        #[serde(default)]
        alignment: Alignment,
    },
}

impl Default for CellLayout {
    fn default() -> Self {
        CellLayout::Delimited {
            max_length: None,
            quote: QuoteBehavior::Automatic,
        }
    }
}

impl CellLayout {
    fn fixed_default() -> Self {
        CellLayout::Fixed {
            width: 0,
            pad_char: default_pad_char(),
            alignment: Alignment::Left,
        }
    }
}

/// One column definition.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaCell {
    name: Option<String>,
    #[serde(rename = "type")]
    cell_type: CellType,
    pattern: Option<String>,
    layout: CellLayout,
    default_value: Option<String>,
    mandatory: bool,
    ignore_read: bool,
    ignore_write: bool,
    #[serde(skip)]
    formatter: Option<Arc<dyn CellFormatter>>,
    #[serde(skip)]
    default_cell: Option<CellValue>,
}

impl SchemaCell {
    /// Creates a named string cell.
    pub fn new(name: impl Into<String>) -> Self {
        SchemaCell {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Creates a positional string cell without a name.
    #[must_use]
    pub fn unnamed() -> Self {
        SchemaCell::default()
    }

    #[must_use]
    pub fn cell_type(mut self, cell_type: CellType) -> Self {
        self.cell_type = cell_type;
        self
    }

    /// Sets the formatter pattern, see [`format`](crate::format).
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Supplies the formatter used instead of the built-in one for the cell type.
    #[must_use]
    pub fn formatter(mut self, formatter: Arc<dyn CellFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Makes this a fixed-width cell of `width` characters.
    #[must_use]
    pub fn width(mut self, width: usize) -> Self {
        self.layout = match self.layout {
            CellLayout::Fixed {
                pad_char,
                alignment,
                ..
            } => CellLayout::Fixed {
                width,
                pad_char,
                alignment,
            },
            CellLayout::Delimited { .. } => CellLayout::Fixed {
                width,
                pad_char: default_pad_char(),
                alignment: Alignment::Left,
            },
        };
        self
    }

    #[must_use]
    pub fn pad_char(mut self, pad: char) -> Self {
        if !matches!(self.layout, CellLayout::Fixed { .. }) {
            self.layout = CellLayout::fixed_default();
        }
        if let CellLayout::Fixed { pad_char, .. } = &mut self.layout {
            *pad_char = pad;
        }
        self
    }

    #[must_use]
    pub fn alignment(mut self, align: Alignment) -> Self {
        if !matches!(self.layout, CellLayout::Fixed { .. }) {
            self.layout = CellLayout::fixed_default();
        }
        if let CellLayout::Fixed { alignment, .. } = &mut self.layout {
            *alignment = align;
        }
        self
    }

    /// Limits a delimited cell to `max` characters.
    #[must_use]
    pub fn max_length(mut self, max: usize) -> Self {
        if !matches!(self.layout, CellLayout::Delimited { .. }) {
            self.layout = CellLayout::default();
        }
        if let CellLayout::Delimited { max_length, .. } = &mut self.layout {
            *max_length = Some(max);
        }
        self
    }

    /// Sets when a delimited cell is quoted on output.
    #[must_use]
    pub fn quote(mut self, behavior: QuoteBehavior) -> Self {
        if !matches!(self.layout, CellLayout::Delimited { .. }) {
            self.layout = CellLayout::default();
        }
        if let CellLayout::Delimited { quote, .. } = &mut self.layout {
            *quote = behavior;
        }
        self
    }

    /// Sets the text used when the cell is missing or empty.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// The cell is skipped when reading.
    #[must_use]
    pub fn ignore_read(mut self) -> Self {
        self.ignore_read = true;
        self
    }

    /// The cell is written empty.
    #[must_use]
    pub fn ignore_write(mut self) -> Self {
        self.ignore_write = true;
        self
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn get_type(&self) -> &CellType {
        &self.cell_type
    }

    #[must_use]
    pub fn layout(&self) -> &CellLayout {
        &self.layout
    }

    /// Column width for fixed-width cells.
    #[must_use]
    pub fn fixed_width(&self) -> Option<usize> {
        match self.layout {
            CellLayout::Fixed { width, .. } => Some(width),
            CellLayout::Delimited { .. } => None,
        }
    }

    #[must_use]
    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    #[must_use]
    pub fn is_ignore_read(&self) -> bool {
        self.ignore_read
    }

    #[must_use]
    pub fn is_ignore_write(&self) -> bool {
        self.ignore_write
    }

    /// The default value as written in the schema.
    #[must_use]
    pub fn default_text(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// The default value parsed by the cell formatter.
    #[must_use]
    pub fn default_cell_value(&self) -> Option<&CellValue> {
        self.default_cell.as_ref()
    }

    pub(crate) fn cell_formatter(&self) -> &dyn CellFormatter {
        match &self.formatter {
            Some(formatter) => formatter.as_ref(),
            None => &FALLBACK_FORMATTER,
        }
    }

    pub(crate) fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    /// Resolves the formatter and parses the default value.
    pub(crate) fn resolve(&mut self, locale: &Locale) -> Result<()> {
        if self.formatter.is_none() {
            let formatter = formatter_for(&self.cell_type, self.pattern.as_deref())
                .map_err(|e| Error::schema(format!("cell '{}': {}", self.label(), e)))?;
            self.formatter = Some(formatter);
        }
        self.default_cell = match self.default_value.as_deref() {
            None => None,
            Some("") => Some(CellValue::Empty),
            Some(text) => Some(self.cell_formatter().parse(text, locale).map_err(|e| {
                Error::schema(format!(
                    "default value of cell '{}' does not parse: {}",
                    self.label(),
                    e
                ))
            })?),
        };
        Ok(())
    }
}

/// Used only by cells that never went through a schema build.
#[derive(Debug)]
struct FallbackFormatter;

static FALLBACK_FORMATTER: FallbackFormatter = FallbackFormatter;

impl CellFormatter for FallbackFormatter {
    fn format(
        &self,
        value: &CellValue,
        _locale: &Locale,
    ) -> std::result::Result<String, FormatError> {
        Ok(value.to_string())
    }

    fn parse(
        &self,
        text: &str,
        _locale: &Locale,
    ) -> std::result::Result<CellValue, FormatError> {
        Ok(CellValue::String(text.to_string()))
    }
}

/// How many consecutive physical lines a schema line applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occurs {
    #[default]
    Unbounded,
    Exactly(usize),
}

/// One line type: an ordered list of cells plus selection rules.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaLine {
    line_type: String,
    cells: Vec<SchemaCell>,
    control_value: Option<String>,
    occurs: Occurs,
    ignore_empty_lines: bool,
    first_line_as_header: bool,
    ignore_write: bool,
    quote_char: Option<char>,
}

impl Default for SchemaLine {
    fn default() -> Self {
        SchemaLine {
            line_type: String::new(),
            cells: Vec::new(),
            control_value: None,
            occurs: Occurs::Unbounded,
            ignore_empty_lines: true,
            first_line_as_header: false,
            ignore_write: false,
            quote_char: None,
        }
    }
}

impl SchemaLine {
    pub fn new(line_type: impl Into<String>) -> Self {
        SchemaLine {
            line_type: line_type.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn cell(mut self, cell: SchemaCell) -> Self {
        self.cells.push(cell);
        self
    }

    #[must_use]
    pub fn cells_from(mut self, cells: impl IntoIterator<Item = SchemaCell>) -> Self {
        self.cells.extend(cells);
        self
    }

    /// Sets the value of the control cell that selects this line.
    #[must_use]
    pub fn control_value(mut self, value: impl Into<String>) -> Self {
        self.control_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn occurs(mut self, occurs: Occurs) -> Self {
        self.occurs = occurs;
        self
    }

    /// Whether empty physical lines are skipped (the default) or produce empty lines.
    #[must_use]
    pub fn ignore_empty_lines(mut self, ignore: bool) -> Self {
        self.ignore_empty_lines = ignore;
        self
    }

    /// The first line of this type holds the cell names.
    #[must_use]
    pub fn first_line_as_header(mut self) -> Self {
        self.first_line_as_header = true;
        self
    }

    /// Lines of this type are never written.
    #[must_use]
    pub fn ignore_write(mut self) -> Self {
        self.ignore_write = true;
        self
    }

    /// Overrides the schema quote character for this line type.
    #[must_use]
    pub fn quote_char(mut self, quote: char) -> Self {
        self.quote_char = Some(quote);
        self
    }

    #[must_use]
    pub fn line_type(&self) -> &str {
        &self.line_type
    }

    #[must_use]
    pub fn cells(&self) -> &[SchemaCell] {
        &self.cells
    }

    #[must_use]
    pub fn control(&self) -> Option<&str> {
        self.control_value.as_deref()
    }

    #[must_use]
    pub fn get_occurs(&self) -> Occurs {
        self.occurs
    }

    #[must_use]
    pub fn is_ignore_empty_lines(&self) -> bool {
        self.ignore_empty_lines
    }

    #[must_use]
    pub fn has_header(&self) -> bool {
        self.first_line_as_header
    }

    #[must_use]
    pub fn is_ignore_write(&self) -> bool {
        self.ignore_write
    }

    pub(crate) fn quote_override(&self) -> Option<char> {
        self.quote_char
    }

    /// Sum of the cell widths of a fixed-width line.
    #[must_use]
    pub fn total_width(&self) -> usize {
        self.cells.iter().filter_map(SchemaCell::fixed_width).sum()
    }

    /// Finds a cell definition by name.
    #[must_use]
    pub fn find_cell(&self, name: &str) -> Option<&SchemaCell> {
        self.cells.iter().find(|c| c.name() == Some(name))
    }

    /// Derives the line read after a header: cells ordered by the header
    /// names, unknown names becoming string cells.
    pub(crate) fn with_header(&self, names: &[String], locale: &Locale) -> Result<SchemaLine> {
        let mut cells = Vec::with_capacity(names.len());
        for name in names {
            let cell = match self.find_cell(name) {
                Some(cell) => cell.clone(),
                None => {
                    let mut cell = SchemaCell::new(name.clone());
                    cell.resolve(locale)?;
                    cell
                }
            };
            cells.push(cell);
        }
        Ok(SchemaLine {
            cells,
            first_line_as_header: false,
            ..self.clone()
        })
    }
}

/// File-level layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    Delimited {
        cell_separator: String,
        #[serde(default)]
        quote_char: Option<char>,
        #[serde(default)]
        quote_syntax: QuoteSyntax,
        /// Substitute for separators in cells quoted with [`QuoteBehavior::Replace`].
        #[serde(default = "default_replacement")]
        replacement: String,
    },
    Fixed {
        /// Strip pad characters from cell text on read.
        #[serde(default)]
        trim_pad: bool,
    },
}

/// How the schema line of a physical line is chosen.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dispatch {
    /// Schema lines apply in declared order, each to `occurs` physical lines.
    #[default]
    Occurs,
    /// A leading control cell names the line type. Fixed layouts read the
    /// first `width` characters; delimited layouts read the first cell.
    ControlCell {
        #[serde(default)]
        width: usize,
        /// Write the control cell when composing.
        #[serde(default = "default_true")]
        write: bool,
    },
}

/// A schema definition that has not been validated yet.
///
/// Produced by [`Schema::delimited`] and [`Schema::fixed`], or deserialized.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchemaBuilder {
    pub layout: Layout,
    #[serde(default = "default_line_separator")]
    pub line_separator: String,
    #[serde(default)]
    pub locale: Locale,
    #[serde(default)]
    pub dispatch: Dispatch,
    #[serde(default)]
    pub lines: Vec<SchemaLine>,
}

impl SchemaBuilder {
    fn new(layout: Layout) -> Self {
        SchemaBuilder {
            layout,
            line_separator: default_line_separator(),
            locale: Locale::default(),
            dispatch: Dispatch::Occurs,
            lines: Vec::new(),
        }
    }

    #[must_use]
    pub fn line_separator(mut self, separator: impl Into<String>) -> Self {
        self.line_separator = separator.into();
        self
    }

    #[must_use]
    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Sets the default quote character of a delimited schema.
    #[must_use]
    pub fn quote_char(mut self, quote: char) -> Self {
        if let Layout::Delimited { quote_char, .. } = &mut self.layout {
            *quote_char = Some(quote);
        }
        self
    }

    #[must_use]
    pub fn quote_syntax(mut self, syntax: QuoteSyntax) -> Self {
        if let Layout::Delimited { quote_syntax, .. } = &mut self.layout {
            *quote_syntax = syntax;
        }
        self
    }

    #[must_use]
    pub fn replacement(mut self, text: impl Into<String>) -> Self {
        if let Layout::Delimited { replacement, .. } = &mut self.layout {
            *replacement = text.into();
        }
        self
    }

    /// Strips pad characters from fixed-width cells on read.
    #[must_use]
    pub fn trim_pad(mut self, trim: bool) -> Self {
        if let Layout::Fixed { trim_pad } = &mut self.layout {
            *trim_pad = trim;
        }
        self
    }

    /// Selects line types by a leading control cell of `width` characters
    /// (fixed layout) or by the first cell (delimited layout, width ignored).
    #[must_use]
    pub fn control_cell(mut self, width: usize) -> Self {
        self.dispatch = Dispatch::ControlCell { width, write: true };
        self
    }

    /// Whether the composer writes the control cell. Defaults to `true`.
    #[must_use]
    pub fn write_control_cell(mut self, write_it: bool) -> Self {
        if let Dispatch::ControlCell { write, .. } = &mut self.dispatch {
            *write = write_it;
        }
        self
    }

    #[must_use]
    pub fn line(mut self, line: SchemaLine) -> Self {
        self.lines.push(line);
        self
    }

    /// Validates the definition and resolves every cell formatter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] describing the first inconsistency found.
    pub fn build(self) -> Result<Schema> {
        let SchemaBuilder {
            layout,
            line_separator,
            locale,
            dispatch,
            lines,
        } = self;

        let fixed = matches!(layout, Layout::Fixed { .. });
        let control = matches!(dispatch, Dispatch::ControlCell { .. });

        if let Layout::Delimited {
            cell_separator,
            quote_char,
            quote_syntax,
            ..
        } = &layout
        {
            if cell_separator.is_empty() {
                return Err(Error::schema("cell separator must not be empty"));
            }
            if line_separator.is_empty() {
                return Err(Error::schema("a delimited schema needs a line separator"));
            }
            if let Some(quote) = quote_char {
                check_quote(*quote, cell_separator, &line_separator)?;
            }
            if let QuoteSyntax::Escape(escape) = quote_syntax {
                if Some(*escape) == *quote_char {
                    return Err(Error::schema(
                        "the escape character must differ from the quote character",
                    ));
                }
            }
        }
        if let Dispatch::ControlCell { width, .. } = dispatch {
            if fixed && width == 0 {
                return Err(Error::schema("a fixed-width control cell needs a width"));
            }
        }

        let mut by_type = IndexMap::with_capacity(lines.len());
        let mut control_values = HashSet::new();
        let mut unbounded = 0;
        for mut line in lines {
            if by_type.contains_key(&line.line_type) {
                return Err(Error::schema(format!("duplicate line type '{}'", line.line_type)));
            }
            if line.occurs == Occurs::Unbounded {
                unbounded += 1;
            }
            if control {
                let value = line.control_value.as_deref().ok_or_else(|| {
                    Error::schema(format!("line type '{}' has no control value", line.line_type))
                })?;
                if !control_values.insert(value.to_string()) {
                    return Err(Error::schema(format!("duplicate control value '{}'", value)));
                }
                if let Dispatch::ControlCell { width, .. } = dispatch {
                    if fixed && value.chars().count() > width {
                        return Err(Error::schema(format!(
                            "control value '{}' is wider than the control cell",
                            value
                        )));
                    }
                }
            }
            if line.first_line_as_header && (fixed || control) {
                return Err(Error::schema(format!(
                    "line type '{}': header lines need a delimited layout and occurs dispatch",
                    line.line_type
                )));
            }
            if let (Some(quote), Layout::Delimited { cell_separator, .. }) = (line.quote_char, &layout) {
                check_quote(quote, cell_separator, &line_separator)?;
            }
            let quote_available = line.quote_char.is_some()
                || matches!(layout, Layout::Delimited { quote_char: Some(_), .. });
            let number_clash = match &layout {
                Layout::Delimited {
                    cell_separator,
                    quote_char,
                    ..
                } => locale_clash(
                    &locale,
                    cell_separator,
                    &line_separator,
                    line.quote_char.or(*quote_char),
                ),
                Layout::Fixed { .. } => None,
            };

            let mut names = HashSet::new();
            for cell in &mut line.cells {
                if let Some(name) = &cell.name {
                    if !names.insert(name.clone()) {
                        return Err(Error::schema(format!(
                            "line type '{}' defines cell '{}' twice",
                            line.line_type, name
                        )));
                    }
                }
                match (&cell.layout, fixed) {
                    (CellLayout::Fixed { width: 0, .. }, true) => {
                        return Err(Error::schema(format!(
                            "fixed-width cell '{}' needs a width",
                            cell.label()
                        )))
                    }
                    (CellLayout::Fixed { .. }, true) => {}
                    (CellLayout::Delimited { quote, .. }, false) => {
                        if let (Some(c), true) = (number_clash, is_number(&cell.cell_type)) {
                            return Err(Error::schema(format!(
                                "number cell '{}': locale separator '{}' clashes with a separator or quote character",
                                cell.label(),
                                c
                            )));
                        }
                        if *quote == QuoteBehavior::Always && !quote_available {
                            return Err(Error::schema(format!(
                                "cell '{}' is always quoted but line type '{}' has no quote character",
                                cell.label(),
                                line.line_type
                            )));
                        }
                    }
                    (_, true) => {
                        return Err(Error::schema(format!(
                            "cell '{}' has no width in a fixed-width schema",
                            cell.label()
                        )))
                    }
                    (_, false) => {
                        return Err(Error::schema(format!(
                            "cell '{}' has a width in a delimited schema",
                            cell.label()
                        )))
                    }
                }
                cell.resolve(&locale)?;
            }
            if fixed && line_separator.is_empty() && line.total_width() == 0 {
                return Err(Error::schema(format!(
                    "line type '{}' has no width and there is no line separator",
                    line.line_type
                )));
            }
            by_type.insert(line.line_type.clone(), line);
        }
        if !control && unbounded > 1 {
            return Err(Error::schema("only one line type may occur an unbounded number of times"));
        }

        tracing::debug!(
            line_types = by_type.len(),
            fixed,
            control_cell = control,
            "schema built"
        );
        Ok(Schema {
            layout,
            line_separator,
            locale,
            dispatch,
            lines: by_type,
        })
    }
}

fn is_number(cell_type: &CellType) -> bool {
    matches!(
        cell_type,
        CellType::Integer | CellType::BigInteger | CellType::Float | CellType::Decimal
    )
}

/// The first locale separator that also delimits cells, lines or quoted text.
fn locale_clash(
    locale: &Locale,
    cell_separator: &str,
    line_separator: &str,
    quote: Option<char>,
) -> Option<char> {
    std::iter::once(locale.decimal_separator)
        .chain(locale.grouping_separator)
        .find(|c| {
            cell_separator.contains(*c)
                || line_separator.contains(*c)
                || Some(*c) == quote
                || (is_universal_newline(line_separator) && matches!(*c, '\n' | '\r'))
        })
}

fn check_quote(quote: char, cell_separator: &str, line_separator: &str) -> Result<()> {
    if cell_separator.contains(quote) || line_separator.contains(quote) {
        return Err(Error::schema(format!(
            "quote character '{}' is part of a separator",
            quote
        )));
    }
    Ok(())
}

/// A validated, immutable file description.
///
/// `Schema` is `Send + Sync`; one instance can serve any number of
/// concurrent parse and compose tasks.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "SchemaBuilder", into = "SchemaBuilder")]
pub struct Schema {
    layout: Layout,
    line_separator: String,
    locale: Locale,
    dispatch: Dispatch,
    lines: IndexMap<String, SchemaLine>,
}

impl Schema {
    /// Starts a delimited schema with the given cell separator.
    pub fn delimited(cell_separator: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(Layout::Delimited {
            cell_separator: cell_separator.into(),
            quote_char: None,
            quote_syntax: QuoteSyntax::Rfc4180,
            replacement: default_replacement(),
        })
    }

    /// Starts a fixed-width schema.
    #[must_use]
    pub fn fixed() -> SchemaBuilder {
        SchemaBuilder::new(Layout::Fixed { trim_pad: false })
    }

    /// Returns an editable copy, for clone-and-modify.
    #[must_use]
    pub fn to_builder(&self) -> SchemaBuilder {
        SchemaBuilder::from(self.clone())
    }

    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self.layout, Layout::Fixed { .. })
    }

    #[must_use]
    pub fn cell_separator(&self) -> Option<&str> {
        match &self.layout {
            Layout::Delimited { cell_separator, .. } => Some(cell_separator),
            Layout::Fixed { .. } => None,
        }
    }

    #[must_use]
    pub fn quote_char(&self) -> Option<char> {
        match &self.layout {
            Layout::Delimited { quote_char, .. } => *quote_char,
            Layout::Fixed { .. } => None,
        }
    }

    /// The quote character used for lines of `line`.
    #[must_use]
    pub fn quote_for(&self, line: &SchemaLine) -> Option<char> {
        line.quote_override().or_else(|| self.quote_char())
    }

    #[must_use]
    pub fn quote_syntax(&self) -> QuoteSyntax {
        match &self.layout {
            Layout::Delimited { quote_syntax, .. } => *quote_syntax,
            Layout::Fixed { .. } => QuoteSyntax::Rfc4180,
        }
    }

    #[must_use]
    pub fn line_separator(&self) -> &str {
        &self.line_separator
    }

    #[must_use]
    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    #[must_use]
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Schema lines in declared order.
    pub fn lines(&self) -> impl Iterator<Item = &SchemaLine> {
        self.lines.values()
    }

    /// Finds a schema line by its line type.
    #[must_use]
    pub fn line(&self, line_type: &str) -> Option<&SchemaLine> {
        self.lines.get(line_type)
    }
}

impl TryFrom<SchemaBuilder> for Schema {
    type Error = Error;

    fn try_from(builder: SchemaBuilder) -> Result<Self> {
        builder.build()
    }
}

impl From<Schema> for SchemaBuilder {
    fn from(schema: Schema) -> Self {
        SchemaBuilder {
            layout: schema.layout,
            line_separator: schema.line_separator,
            locale: schema.locale,
            dispatch: schema.dispatch,
            lines: schema.lines.into_values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> SchemaLine {
        SchemaLine::new("Person")
            .cell(SchemaCell::new("First name"))
            .cell(SchemaCell::new("Last name"))
    }

    #[test]
    fn test_build_delimited() {
        let schema = Schema::delimited(";").quote_char('"').line(person()).build().unwrap();
        assert_eq!(schema.cell_separator(), Some(";"));
        assert_eq!(schema.quote_char(), Some('"'));
        assert!(!schema.is_fixed());
        assert_eq!(schema.lines().count(), 1);
    }

    #[test]
    fn test_separator_validation() {
        assert!(Schema::delimited("").line(person()).build().is_err());
        assert!(Schema::delimited(";").line_separator("").line(person()).build().is_err());
        assert!(Schema::delimited(";").quote_char(';').line(person()).build().is_err());
        assert!(Schema::delimited(";")
            .quote_char('"')
            .quote_syntax(QuoteSyntax::Escape('"'))
            .line(person())
            .build()
            .is_err());
    }

    #[test]
    fn test_layout_mismatch() {
        let fixed_cell = SchemaLine::new("L").cell(SchemaCell::new("a").width(3));
        assert!(Schema::delimited(";").line(fixed_cell.clone()).build().is_err());
        assert!(Schema::fixed().line(person()).build().is_err());
        assert!(Schema::fixed().line(fixed_cell).build().is_ok());
        let zero = SchemaLine::new("L").cell(SchemaCell::new("a").width(0));
        assert!(Schema::fixed().line(zero).build().is_err());
    }

    #[test]
    fn test_occurs_validation() {
        let result = Schema::delimited(";")
            .line(SchemaLine::new("A"))
            .line(SchemaLine::new("B"))
            .build();
        assert!(matches!(result, Err(Error::Schema(ref m)) if m.contains("unbounded")));

        let ok = Schema::delimited(";")
            .line(SchemaLine::new("A").occurs(Occurs::Exactly(1)))
            .line(SchemaLine::new("B"))
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn test_duplicates() {
        let dup_line = Schema::delimited(";").line(person()).line(person()).build();
        assert!(dup_line.is_err());
        let dup_cell = Schema::delimited(";")
            .line(SchemaLine::new("P").cell(SchemaCell::new("a")).cell(SchemaCell::new("a")))
            .build();
        assert!(dup_cell.is_err());
        // unnamed cells may repeat
        let unnamed = Schema::delimited(";")
            .line(SchemaLine::new("P").cell(SchemaCell::unnamed()).cell(SchemaCell::unnamed()))
            .build();
        assert!(unnamed.is_ok());
    }

    #[test]
    fn test_control_cell_validation() {
        let line = |t: &str, v: &str| {
            SchemaLine::new(t)
                .control_value(v)
                .cell(SchemaCell::new("x").width(2))
        };
        assert!(Schema::fixed().control_cell(1).line(line("A", "A")).line(line("B", "B")).build().is_ok());
        assert!(Schema::fixed().control_cell(1).line(line("A", "A")).line(line("B", "A")).build().is_err());
        assert!(Schema::fixed().control_cell(1).line(line("A", "AB")).build().is_err());
        assert!(Schema::fixed().control_cell(0).line(line("A", "A")).build().is_err());
        let no_value = SchemaLine::new("A").cell(SchemaCell::new("x").width(2));
        assert!(Schema::fixed().control_cell(1).line(no_value).build().is_err());
    }

    #[test]
    fn test_default_values_are_parsed_eagerly() {
        let bad = Schema::delimited(";")
            .line(SchemaLine::new("P").cell(SchemaCell::new("n").cell_type(CellType::Integer).default_value("x")))
            .build();
        assert!(matches!(bad, Err(Error::Schema(ref m)) if m.contains("default value")));

        let good = Schema::delimited(";")
            .line(SchemaLine::new("P").cell(SchemaCell::new("n").cell_type(CellType::Integer).default_value("7")))
            .build()
            .unwrap();
        let cell = &good.line("P").unwrap().cells()[0];
        assert_eq!(cell.default_cell_value(), Some(&CellValue::Integer(7)));
    }

    #[test]
    fn test_always_quote_needs_quote_char() {
        let line = SchemaLine::new("P").cell(SchemaCell::new("a").quote(QuoteBehavior::Always));
        assert!(Schema::delimited(";").line(line.clone()).build().is_err());
        assert!(Schema::delimited(";").line(line.clone().quote_char('\'')).build().is_ok());
        assert!(Schema::delimited(";").quote_char('"').line(line).build().is_ok());
    }

    #[test]
    fn test_locale_separator_must_not_delimit_numbers() {
        let line = || {
            SchemaLine::new("P")
                .cell(SchemaCell::new("x").cell_type(CellType::Float))
                .cell(SchemaCell::new("y"))
        };
        let result = Schema::delimited(",")
            .quote_char('"')
            .locale(Locale::new(','))
            .line(line())
            .build();
        assert!(matches!(result, Err(Error::Schema(ref m)) if m.contains("'x'")));

        let result = Schema::delimited(";")
            .quote_char('\'')
            .locale(Locale::new(',').with_grouping('\''))
            .line(line())
            .build();
        assert!(result.is_err());

        assert!(Schema::delimited(";").locale(Locale::new(',')).line(line()).build().is_ok());
        // No number cells, nothing to clash with.
        assert!(Schema::delimited(",")
            .locale(Locale::new(','))
            .line(SchemaLine::new("P").cell(SchemaCell::new("y")))
            .build()
            .is_ok());
    }

    #[test]
    fn test_header_only_for_delimited_occurs() {
        let header = SchemaLine::new("P").first_line_as_header().control_value("P");
        assert!(Schema::delimited(";").line(header.clone()).build().is_ok());
        assert!(Schema::delimited(";").control_cell(0).line(header).build().is_err());
    }

    #[test]
    fn test_with_header_reorders_and_adds() {
        let schema = Schema::delimited(";")
            .line(
                SchemaLine::new("P")
                    .first_line_as_header()
                    .cell(SchemaCell::new("a").cell_type(CellType::Integer))
                    .cell(SchemaCell::new("b")),
            )
            .build()
            .unwrap();
        let line = schema.line("P").unwrap();
        let derived = line
            .with_header(&["b".to_string(), "c".to_string(), "a".to_string()], schema.locale())
            .unwrap();
        let names: Vec<_> = derived.cells().iter().map(|c| c.name().unwrap()).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
        assert_eq!(derived.cells()[2].get_type(), &CellType::Integer);
        assert!(!derived.has_header());
    }

    #[test]
    fn test_clone_and_modify() {
        let schema = Schema::delimited(";").line(person()).build().unwrap();
        let changed = schema.to_builder().line_separator("\r\n").build().unwrap();
        assert_eq!(schema.line_separator(), "\n");
        assert_eq!(changed.line_separator(), "\r\n");
    }

    #[test]
    fn test_schema_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Schema>();
    }
}
