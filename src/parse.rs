//! Reading records from a character stream.
//!
//! A [`Parser`] pulls one physical line at a time from the source, picks
//! its schema line, converts every cell through the cell's formatter and
//! hands out a [`Line`]. Validation problems are routed through the
//! [`ValidationAction`] configured for their kind and, when reported,
//! through the [`ErrorPolicy`].
//!
//! Missing and empty cells follow these rules:
//!
//! - a cell past the end of a line that has at least one cell gets its
//!   default value, or is left out;
//! - on a line without any cell, a cell gets its default value, raises a
//!   validation error if it is mandatory, or is left out;
//! - a cell that is present but empty gets its default value, raises a
//!   validation error if it is mandatory, or becomes [`CellValue::Empty`].
//!
//! ## Examples
//!
//! ```rust
//! use flatcell::{Parser, Schema, SchemaCell, SchemaLine};
//!
//! let schema = Schema::delimited(";")
//!     .quote_char('"')
//!     .line(SchemaLine::new("Person").cell(SchemaCell::new("Name")).cell(SchemaCell::new("City")))
//!     .build()
//!     .unwrap();
//!
//! let input = "Jonas;Stockholm\n\"Stenberg; Lars\";Uppsala\n";
//! let names: Vec<String> = Parser::new(&schema, input.as_bytes())
//!     .map(|line| line.unwrap().get_str("Name").unwrap_or_default().to_string())
//!     .collect();
//! assert_eq!(names, vec!["Jonas", "Stenberg; Lars"]);
//! ```

use crate::cell::{Cell, CellValue};
use crate::dispatch::LineSelector;
use crate::error::{CellError, Error, Result};
use crate::line::Line;
use crate::options::{ErrorPolicy, ParseConfig, ValidationAction};
use crate::pad::trim_pad;
use crate::schema::{CellLayout, Dispatch, Layout, Schema, SchemaCell, SchemaLine};
use crate::tokenizer::Tokenizer;
use std::collections::HashMap;
use std::io::Read;
use tracing::{debug, trace, warn};

/// Receives the validation errors reported during a parse.
pub(crate) struct ErrorSink {
    policy: ErrorPolicy,
    collected: Vec<CellError>,
    delivered: usize,
}

impl ErrorSink {
    fn new(policy: ErrorPolicy) -> Self {
        ErrorSink {
            policy,
            collected: Vec::new(),
            delivered: 0,
        }
    }

    fn report(&mut self, err: CellError) -> Result<()> {
        match self.policy {
            ErrorPolicy::Abort => Err(Error::Validation(err)),
            ErrorPolicy::Collect => {
                self.collected.push(err);
                Ok(())
            }
            ErrorPolicy::CollectUpTo(max) => {
                self.collected.push(err);
                if self.collected.len() > max {
                    Err(Error::TooManyErrors(self.collected.clone()))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Errors reported since the last call.
    fn take(&mut self) -> Vec<CellError> {
        match self.policy {
            // the bounded policy needs the whole history for TooManyErrors
            ErrorPolicy::CollectUpTo(_) => {
                let fresh = self.collected[self.delivered..].to_vec();
                self.delivered = self.collected.len();
                fresh
            }
            _ => std::mem::take(&mut self.collected),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Keep,
    Omit,
}

struct Policy {
    config: ParseConfig,
    sink: ErrorSink,
}

impl Policy {
    fn violation(&mut self, action: ValidationAction, err: CellError) -> Result<Verdict> {
        match action {
            ValidationAction::Raise => Err(Error::Validation(err)),
            ValidationAction::Report => {
                self.sink.report(err)?;
                Ok(Verdict::Keep)
            }
            ValidationAction::OmitLine => {
                debug!(line = err.line, "omitting line: {}", err.message);
                Ok(Verdict::Omit)
            }
            ValidationAction::Warn => {
                warn!("{}", err);
                Ok(Verdict::Keep)
            }
            ValidationAction::Ignore => Ok(Verdict::Keep),
        }
    }
}

/// Cell texts of one physical line, with the schema line chosen for it.
struct Record<'s> {
    number: usize,
    line: &'s SchemaLine,
    tokens: Vec<String>,
    /// Characters in the line body, for the fixed layout.
    chars: Option<usize>,
}

enum Step<'s> {
    Record(Record<'s>),
    Skip,
    End,
}

enum Outcome {
    Value(CellValue),
    Skip,
    OmitLine,
}

/// Reads [`Line`]s from `R` as described by a [`Schema`].
///
/// The parser is an iterator; it stops after the first fatal error. The
/// reader is only borrowed for the lifetime of the parser and never closed.
pub struct Parser<'s, R> {
    schema: &'s Schema,
    tokenizer: Tokenizer<R>,
    selector: LineSelector<'s>,
    policy: Policy,
    /// Schema lines rebuilt from header lines, by line type.
    headers: HashMap<String, SchemaLine>,
    number: usize,
    started: bool,
    done: bool,
}

impl<'s, R: Read> Parser<'s, R> {
    /// Creates a parser with the default (strict) [`ParseConfig`].
    pub fn new(schema: &'s Schema, reader: R) -> Self {
        Self::with_config(schema, reader, ParseConfig::default())
    }

    pub fn with_config(schema: &'s Schema, reader: R, config: ParseConfig) -> Self {
        let (cell_separator, syntax) = match schema.layout() {
            Layout::Delimited {
                cell_separator,
                quote_syntax,
                ..
            } => (cell_separator.as_str(), *quote_syntax),
            Layout::Fixed { .. } => ("", Default::default()),
        };
        let tokenizer = Tokenizer::new(
            reader,
            cell_separator,
            schema.line_separator(),
            syntax,
            config.read_buffer_size,
            config.max_line_length,
        );
        Parser {
            schema,
            tokenizer,
            selector: LineSelector::new(schema),
            policy: Policy {
                sink: ErrorSink::new(config.error_policy),
                config,
            },
            headers: HashMap::new(),
            number: 0,
            started: false,
            done: false,
        }
    }

    /// Validation errors collected since the last call.
    ///
    /// Only the collecting error policies ever return anything here.
    pub fn take_errors(&mut self) -> Vec<CellError> {
        self.policy.sink.take()
    }

    /// Number of physical lines read so far, including skipped ones.
    #[must_use]
    pub fn lines_read(&self) -> usize {
        self.number
    }

    /// Reads the next record. Returns `None` at the end of input.
    ///
    /// # Errors
    ///
    /// Returns structural errors, and validation errors the configuration
    /// says to raise or the error policy gives up on.
    pub fn next_line(&mut self) -> Result<Option<Line>> {
        if !self.started {
            self.started = true;
            if self.schema.lines().next().map_or(false, SchemaLine::has_header) {
                self.tokenizer.skip_bom()?;
            }
        }
        loop {
            let step = if self.schema.is_fixed() {
                self.read_fixed()?
            } else {
                self.read_delimited()?
            };
            let record = match step {
                Step::End => return Ok(None),
                Step::Skip => continue,
                Step::Record(record) => record,
            };
            let line = self.headers.get(record.line.line_type()).unwrap_or(record.line);
            if let Some(line) = build_line(&mut self.policy, self.schema, line, record)? {
                trace!(line = ?line.number(), line_type = line.line_type(), cells = line.len(), "parsed line");
                return Ok(Some(line));
            }
        }
    }

    /// Drives the whole parse, calling `on_line` for every record and
    /// `on_error` for every reported validation error.
    ///
    /// Supplying an error consumer turns [`ErrorPolicy::Abort`] into
    /// [`ErrorPolicy::Collect`]. Returns the number of records delivered.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; validation errors reported before it
    /// have been passed to `on_error`.
    pub fn parse_with<F, E>(mut self, mut on_line: F, mut on_error: E) -> Result<usize>
    where
        F: FnMut(Line),
        E: FnMut(CellError),
    {
        if self.policy.sink.policy == ErrorPolicy::Abort {
            self.policy.sink.policy = ErrorPolicy::Collect;
        }
        let mut count = 0;
        loop {
            let next = self.next_line();
            for err in self.take_errors() {
                on_error(err);
            }
            match next? {
                Some(line) => {
                    count += 1;
                    on_line(line);
                }
                None => break,
            }
        }
        debug!(records = count, lines = self.number, "parse finished");
        Ok(count)
    }

    fn read_delimited(&mut self) -> Result<Step<'s>> {
        let default_quote = self.schema.quote_char();
        if self.selector.uses_control_cell() {
            let tokens = match self.tokenizer.read_cells(default_quote)? {
                Some(tokens) => tokens,
                None => return Ok(Step::End),
            };
            self.number += 1;
            let control = match tokens.first() {
                Some(control) => control,
                None => return Ok(Step::Skip),
            };
            let line = match self.selector.peek(Some(control)) {
                Some(line) => line,
                None => {
                    let control = control.clone();
                    return self.undefined(Some(control));
                }
            };
            let quote = self.schema.quote_for(line);
            let mut tokens = if quote == default_quote {
                tokens
            } else {
                self.tokenizer.replay_cells(quote)?.unwrap_or_default()
            };
            if !tokens.is_empty() {
                tokens.remove(0);
            }
            self.selector.commit();
            return Ok(Step::Record(Record {
                number: self.number,
                line,
                tokens,
                chars: None,
            }));
        }

        let peeked = self.selector.peek(None);
        let quote = peeked.map_or(default_quote, |line| self.schema.quote_for(line));
        let tokens = match self.tokenizer.read_cells(quote)? {
            Some(tokens) => tokens,
            None => return Ok(Step::End),
        };
        self.number += 1;
        let line = match peeked {
            Some(line) => line,
            None if tokens.is_empty() => return Ok(Step::Skip),
            None => return self.undefined(None),
        };
        if tokens.is_empty() && line.is_ignore_empty_lines() {
            return Ok(Step::Skip);
        }
        if line.has_header() && !self.headers.contains_key(line.line_type()) {
            let derived = line.with_header(&tokens, self.schema.locale())?;
            debug!(line_type = line.line_type(), header = ?tokens, "read header line");
            self.headers.insert(line.line_type().to_string(), derived);
            return Ok(Step::Skip);
        }
        self.selector.commit();
        Ok(Step::Record(Record {
            number: self.number,
            line,
            tokens,
            chars: None,
        }))
    }

    fn read_fixed(&mut self) -> Result<Step<'s>> {
        let control_width = match self.schema.dispatch() {
            Dispatch::ControlCell { width, .. } => Some(*width),
            Dispatch::Occurs => None,
        };
        if self.schema.line_separator().is_empty() {
            return self.read_fixed_stream(control_width);
        }
        let text = match self.tokenizer.read_text_line()? {
            Some(text) => text,
            None => return Ok(Step::End),
        };
        self.number += 1;
        let (line, body) = match control_width {
            Some(width) => {
                if text.is_empty() {
                    return Ok(Step::Skip);
                }
                let (control, body) = text.split_at(char_offset(&text, width));
                match self.selector.peek(Some(control)) {
                    Some(line) => (line, body),
                    None => {
                        let control = control.to_string();
                        return self.undefined(Some(control));
                    }
                }
            }
            None => match self.selector.peek(None) {
                Some(line) if text.is_empty() && line.is_ignore_empty_lines() => {
                    return Ok(Step::Skip)
                }
                Some(line) => (line, text.as_str()),
                None if text.is_empty() => return Ok(Step::Skip),
                None => return self.undefined(None),
            },
        };
        self.selector.commit();
        Ok(Step::Record(slice_fixed(self.number, line, body)))
    }

    /// Fixed-width records without line separators. An undefined line type
    /// is always fatal here since the record width is unknown.
    fn read_fixed_stream(&mut self, control_width: Option<usize>) -> Result<Step<'s>> {
        let (line, body) = match control_width {
            Some(width) => {
                let control = match self.tokenizer.read_chars(width)? {
                    Some(control) => control,
                    None => return Ok(Step::End),
                };
                self.number += 1;
                match self.selector.peek(Some(&control)) {
                    Some(line) => (line, self.tokenizer.read_more_chars(line.total_width())?),
                    None => {
                        return Err(Error::UndefinedLineType {
                            line: self.number,
                            control_value: Some(control),
                        })
                    }
                }
            }
            None => match self.selector.peek(None) {
                Some(line) => match self.tokenizer.read_chars(line.total_width())? {
                    Some(body) => {
                        self.number += 1;
                        (line, body)
                    }
                    None => return Ok(Step::End),
                },
                None => {
                    if self.tokenizer.read_chars(1)?.is_none() {
                        return Ok(Step::End);
                    }
                    self.number += 1;
                    return Err(Error::UndefinedLineType {
                        line: self.number,
                        control_value: None,
                    });
                }
            },
        };
        self.selector.commit();
        Ok(Step::Record(slice_fixed(self.number, line, &body)))
    }

    fn undefined(&mut self, control: Option<String>) -> Result<Step<'s>> {
        match self.policy.config.on_undefined_line_type {
            ValidationAction::Raise => Err(Error::UndefinedLineType {
                line: self.number,
                control_value: control,
            }),
            action => {
                let mut err = CellError::new(self.number, "no line type matches this line");
                if let Some(control) = &control {
                    err = err.with_value(control);
                }
                self.policy.violation(action, err)?;
                Ok(Step::Skip)
            }
        }
    }
}

impl<'s, R: Read> Iterator for Parser<'s, R> {
    type Item = Result<Line>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_line() {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn char_offset(text: &str, n: usize) -> usize {
    text.char_indices().nth(n).map_or(text.len(), |(i, _)| i)
}

fn slice_fixed<'s>(number: usize, line: &'s SchemaLine, body: &str) -> Record<'s> {
    let mut chars = body.chars();
    let mut tokens = Vec::with_capacity(line.cells().len());
    for cell in line.cells() {
        let width = cell.fixed_width().unwrap_or(0);
        let piece: String = chars.by_ref().take(width).collect();
        if piece.is_empty() && width > 0 {
            break;
        }
        tokens.push(piece);
    }
    Record {
        number,
        line,
        tokens,
        chars: Some(body.chars().count()),
    }
}

fn build_line(
    policy: &mut Policy,
    schema: &Schema,
    line: &SchemaLine,
    record: Record<'_>,
) -> Result<Option<Line>> {
    let Record {
        number,
        tokens,
        chars,
        ..
    } = record;
    let cells = line.cells();
    let (found, expected, unit) = match chars {
        Some(n) => (n, line.total_width(), "characters"),
        None => (tokens.len(), cells.len(), "cells"),
    };
    if !tokens.is_empty() && found != expected {
        let (action, message) = if found < expected {
            (
                policy.config.on_line_insufficient,
                format!("line has {} {}, expected {}", found, unit, expected),
            )
        } else {
            (
                policy.config.on_line_overflow,
                format!("line has {} {}, expected at most {}", found, unit, expected),
            )
        };
        let err = CellError::new(number, message).with_line_type(line.line_type());
        if policy.violation(action, err)? == Verdict::Omit {
            return Ok(None);
        }
    }

    let trim = matches!(schema.layout(), Layout::Fixed { trim_pad: true });
    let any_data = !tokens.is_empty();
    let mut out = Line::new(line.line_type());
    out.set_number(number);
    for (i, cell) in cells.iter().enumerate() {
        let outcome = match tokens.get(i) {
            None => missing_cell(policy, line, cell, number, any_data)?,
            Some(text) => {
                if cell.is_ignore_read() {
                    continue;
                }
                present_cell(policy, schema, line, cell, number, text, trim)?
            }
        };
        match outcome {
            Outcome::Value(value) => {
                out.add_cell(Cell::with_optional_name(cell.name(), value));
            }
            Outcome::Skip => {}
            Outcome::OmitLine => return Ok(None),
        }
    }
    Ok(Some(out))
}

fn cell_error(number: usize, line: &SchemaLine, cell: &SchemaCell, message: impl Into<String>) -> CellError {
    CellError::new(number, message)
        .with_line_type(line.line_type())
        .with_cell(cell.name())
}

fn fallback_default(cell: &SchemaCell, number: usize) -> Option<CellValue> {
    let value = cell.default_cell_value()?.clone();
    if cell.is_mandatory() {
        warn!(line = number, cell = cell.label(), "mandatory cell filled from its default value");
    }
    Some(value)
}

fn missing_cell(
    policy: &mut Policy,
    line: &SchemaLine,
    cell: &SchemaCell,
    number: usize,
    any_data: bool,
) -> Result<Outcome> {
    if cell.is_ignore_read() {
        return Ok(Outcome::Skip);
    }
    if any_data {
        return Ok(fallback_default(cell, number).map_or(Outcome::Skip, Outcome::Value));
    }
    if let Some(value) = fallback_default(cell, number) {
        return Ok(Outcome::Value(value));
    }
    if cell.is_mandatory() {
        let err = cell_error(number, line, cell, "mandatory cell is missing");
        if policy.violation(policy.config.on_cell_error, err)? == Verdict::Omit {
            return Ok(Outcome::OmitLine);
        }
    }
    Ok(Outcome::Skip)
}

fn present_cell(
    policy: &mut Policy,
    schema: &Schema,
    line: &SchemaLine,
    cell: &SchemaCell,
    number: usize,
    text: &str,
    trim: bool,
) -> Result<Outcome> {
    let on_cell_error = policy.config.on_cell_error;
    let text = match cell.layout() {
        CellLayout::Fixed {
            pad_char,
            alignment,
            ..
        } if trim || cell.get_type().is_atomic() => {
            let trimmed = trim_pad(text, *pad_char, *alignment);
            if trimmed.is_empty()
                && !text.is_empty()
                && !pad_char.is_whitespace()
                && cell.get_type().is_atomic()
            {
                // "00000" in a zero-padded number is 0, not an empty cell.
                &text[text.len() - pad_char.len_utf8()..]
            } else {
                trimmed
            }
        }
        CellLayout::Delimited {
            max_length: Some(max),
            ..
        } if text.chars().count() > *max => {
            let err = cell_error(number, line, cell, format!("value is longer than {} characters", max))
                .with_value(text);
            if policy.violation(on_cell_error, err)? == Verdict::Omit {
                return Ok(Outcome::OmitLine);
            }
            &text[..char_offset(text, *max)]
        }
        _ => text,
    };

    if text.is_empty() {
        if let Some(value) = fallback_default(cell, number) {
            return Ok(Outcome::Value(value));
        }
        if cell.is_mandatory() {
            let err = cell_error(number, line, cell, "mandatory cell is empty");
            if policy.violation(on_cell_error, err)? == Verdict::Omit {
                return Ok(Outcome::OmitLine);
            }
        }
        return Ok(Outcome::Value(CellValue::Empty));
    }

    match cell.cell_formatter().parse(text, schema.locale()) {
        Ok(value) => Ok(Outcome::Value(value)),
        Err(e) => {
            let err = cell_error(number, line, cell, e.message).with_value(text);
            if policy.violation(on_cell_error, err)? == Verdict::Omit {
                return Ok(Outcome::OmitLine);
            }
            Ok(Outcome::Value(
                cell.default_cell_value().cloned().unwrap_or(CellValue::Empty),
            ))
        }
    }
}
