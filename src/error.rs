//! Error types for parsing and composing flat text records.
//!
//! Errors fall into three groups:
//!
//! - **Structural errors** abort the current task: I/O failures, invalid
//!   UTF-8, a line that never finds its separator, an undefined line type
//!   when the configuration says to raise.
//! - **Validation errors** concern a single cell or line. They are
//!   described by [`CellError`] and routed through the
//!   [`ErrorPolicy`](crate::ErrorPolicy), which either aborts with
//!   [`Error::Validation`], collects them, or gives up with
//!   [`Error::TooManyErrors`].
//! - **Schema errors** are raised while a [`Schema`](crate::Schema) is
//!   built, never later.
//!
//! ## Examples
//!
//! ```rust
//! use flatcell::{parse_str, Error, Schema, SchemaCell, SchemaLine, CellType};
//!
//! let schema = Schema::delimited(";")
//!     .line(SchemaLine::new("Row").cell(SchemaCell::new("Age").cell_type(CellType::Integer)))
//!     .build()
//!     .unwrap();
//!
//! match parse_str(&schema, "forty") {
//!     Err(Error::Validation(err)) => {
//!         assert_eq!(err.line, 1);
//!         assert_eq!(err.cell.as_deref(), Some("Age"));
//!     }
//!     other => panic!("expected a validation error, got {:?}", other),
//! }
//! ```

use std::fmt;
use thiserror::Error;

/// Represents all errors that can occur while building a schema, parsing or composing.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// IO error while reading or writing
    #[error("IO error: {0}")]
    Io(String),

    /// The character stream was not valid UTF-8
    #[error("Invalid UTF-8 in input after {offset} bytes")]
    Encoding { offset: usize },

    /// A physical line grew past the configured maximum without a line separator
    #[error("Line {line} exceeds {max} characters without a line separator\nHelp: check that the schema line separator matches the input")]
    LineTooLong { line: usize, max: usize },

    /// No schema line matches the physical line
    #[error("Undefined line type at line {line}{}", .control_value.as_ref().map(|v| format!(": no schema line with control value '{}'", v)).unwrap_or_default())]
    UndefinedLineType {
        line: usize,
        control_value: Option<String>,
    },

    /// A validation error raised by the error policy
    #[error("{0}")]
    Validation(CellError),

    /// The bounded error policy gave up
    #[error("Aborted after {} validation errors, last: {}", .0.len(), .0.last().map(|e| e.to_string()).unwrap_or_default())]
    TooManyErrors(Vec<CellError>),

    /// The schema is inconsistent or uses an unsupported combination
    #[error("Invalid schema: {0}")]
    Schema(String),

    /// A value could not be formatted on the compose side
    #[error("Format error in cell '{cell}': {source}")]
    Format {
        cell: String,
        #[source]
        source: FormatError,
    },

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),
}

impl Error {
    /// Creates a schema (configuration) error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flatcell::Error;
    ///
    /// let err = Error::schema("cell separator must not be empty");
    /// assert!(err.to_string().contains("Invalid schema"));
    /// ```
    pub fn schema<T: fmt::Display>(msg: T) -> Self {
        Error::Schema(msg.to_string())
    }

    /// Creates an I/O error for reading/writing failures.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }

    /// Creates a custom error with a display message.
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Returns `true` for errors produced by the validation policy rather than the stream.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::TooManyErrors(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::io(&err.to_string())
    }
}

/// A validation problem found in one line or cell.
///
/// Carries enough context to locate the offending input: the 1-based line
/// number, the line type (when one was selected), the cell name and the raw
/// text that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellError {
    pub line: usize,
    pub line_type: Option<String>,
    pub cell: Option<String>,
    pub value: Option<String>,
    pub message: String,
}

impl CellError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        CellError {
            line,
            line_type: None,
            cell: None,
            value: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_line_type(mut self, line_type: &str) -> Self {
        self.line_type = Some(line_type.to_string());
        self
    }

    #[must_use]
    pub fn with_cell(mut self, cell: Option<&str>) -> Self {
        self.cell = cell.map(str::to_string);
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}", self.line)?;
        if let Some(line_type) = &self.line_type {
            write!(f, " ({})", line_type)?;
        }
        if let Some(cell) = &self.cell {
            write!(f, ", cell '{}'", cell)?;
        }
        if let Some(value) = &self.value {
            write!(f, ", value '{}'", value)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for CellError {}

/// A cell formatter could not convert between text and a typed value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FormatError {
    pub message: String,
}

impl FormatError {
    pub fn new(message: impl Into<String>) -> Self {
        FormatError {
            message: message.into(),
        }
    }

    /// Shorthand for "expected a {kind}, found '{text}'".
    pub fn expected(kind: &str, text: &str) -> Self {
        FormatError::new(format!("expected {}, found '{}'", kind, text))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
