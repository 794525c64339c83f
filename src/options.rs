//! Configuration for parsing and composing.
//!
//! - [`ParseConfig`]: buffer sizes and the validation policy of a parse task
//! - [`ComposeConfig`]: output tweaks of a compose task
//! - [`ValidationAction`]: what to do with one kind of rule violation
//! - [`ErrorPolicy`]: what happens to violations that are reported
//!
//! ## Examples
//!
//! ```rust
//! use flatcell::{ErrorPolicy, ParseConfig, ValidationAction};
//!
//! // Collect up to 100 errors, drop lines that have too few cells
//! let config = ParseConfig::new()
//!     .with_error_policy(ErrorPolicy::CollectUpTo(100))
//!     .on_line_insufficient(ValidationAction::OmitLine);
//! assert_eq!(config.error_policy, ErrorPolicy::CollectUpTo(100));
//! ```

use serde::{Deserialize, Serialize};

/// The response to one kind of rule violation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationAction {
    /// Abort the task with a fatal error, whatever the error policy.
    Raise,
    /// Hand the violation to the [`ErrorPolicy`].
    Report,
    /// Drop the offending line without reporting anything.
    OmitLine,
    /// Log a warning and continue.
    Warn,
    /// Continue; a failing cell becomes its default or empty.
    Ignore,
}

/// How reported violations are handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// The first reported violation ends the task with [`Error::Validation`](crate::Error::Validation).
    #[default]
    Abort,
    /// Every violation is collected and the task continues.
    Collect,
    /// Like `Collect`, but the task ends with
    /// [`Error::TooManyErrors`](crate::Error::TooManyErrors) once more than
    /// this many violations have been seen.
    CollectUpTo(usize),
}

/// Options for a parse task.
///
/// The defaults are strict: cells that fail to parse or lack a mandatory
/// value abort the parse, and so does a line whose type cannot be
/// determined. Short and long lines are accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    pub on_line_insufficient: ValidationAction,
    pub on_line_overflow: ValidationAction,
    pub on_undefined_line_type: ValidationAction,
    pub on_cell_error: ValidationAction,
    pub error_policy: ErrorPolicy,
    /// Longest physical line, in characters, before the parse gives up.
    pub max_line_length: usize,
    /// Bytes requested from the reader per read call.
    pub read_buffer_size: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig {
            on_line_insufficient: ValidationAction::Ignore,
            on_line_overflow: ValidationAction::Ignore,
            on_undefined_line_type: ValidationAction::Raise,
            on_cell_error: ValidationAction::Report,
            error_policy: ErrorPolicy::Abort,
            max_line_length: 64 * 1024,
            read_buffer_size: 8 * 1024,
        }
    }
}

impl ParseConfig {
    /// Creates the default (strict) configuration.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flatcell::{ErrorPolicy, ParseConfig, ValidationAction};
    ///
    /// let config = ParseConfig::new();
    /// assert_eq!(config.error_policy, ErrorPolicy::Abort);
    /// assert_eq!(config.on_undefined_line_type, ValidationAction::Raise);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how reported violations are handled.
    #[must_use]
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Sets the action for lines with fewer cells (or characters) than the schema line.
    #[must_use]
    pub fn on_line_insufficient(mut self, action: ValidationAction) -> Self {
        self.on_line_insufficient = action;
        self
    }

    /// Sets the action for lines with more cells (or characters) than the schema line.
    #[must_use]
    pub fn on_line_overflow(mut self, action: ValidationAction) -> Self {
        self.on_line_overflow = action;
        self
    }

    /// Sets the action for lines no schema line matches.
    ///
    /// Anything but [`ValidationAction::Raise`] skips the line.
    #[must_use]
    pub fn on_undefined_line_type(mut self, action: ValidationAction) -> Self {
        self.on_undefined_line_type = action;
        self
    }

    /// Sets the action for cells that fail to parse, lack a mandatory value or are too long.
    #[must_use]
    pub fn on_cell_error(mut self, action: ValidationAction) -> Self {
        self.on_cell_error = action;
        self
    }

    /// Sets the longest accepted physical line in characters.
    #[must_use]
    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    /// Sets the number of bytes read from the source per call.
    #[must_use]
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }
}

/// Options for a compose task.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    /// Terminate the last line with the line separator too.
    pub trailing_line_separator: bool,
}

impl ComposeConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_trailing_line_separator(mut self, trailing: bool) -> Self {
        self.trailing_line_separator = trailing;
        self
    }
}
