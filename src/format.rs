//! Conversion between cell text and typed values.
//!
//! The parser and composer never interpret cell text themselves; they hand
//! it to a [`CellFormatter`]. A formatter must be referentially transparent:
//! the same text, pattern and [`Locale`] always give the same value.
//!
//! Built-in formatters are selected by [`CellType`] and an optional pattern:
//!
//! | Type | Pattern | Example |
//! |------|---------|---------|
//! | `Integer`, `BigInteger` | none | `-42` |
//! | `Float`, `Decimal` | `0.00` fixes the number of decimals | `3.50` |
//! | `Boolean` | `true-words;false-words`, words split by `\|` | `Y\|yes;N\|no` |
//! | `Date` | chrono format, default `%Y-%m-%d` | `%d.%m.%Y` |
//! | `DateTime` | chrono format, default `%Y-%m-%dT%H:%M:%S` | |
//!
//! ## Custom formatters
//!
//! ```rust
//! use flatcell::{CellFormatter, CellValue, FormatError, Locale};
//!
//! /// Amounts stored as integer cents.
//! #[derive(Debug)]
//! struct Cents;
//!
//! impl CellFormatter for Cents {
//!     fn format(&self, value: &CellValue, _locale: &Locale) -> Result<String, FormatError> {
//!         match value {
//!             CellValue::Integer(cents) => Ok(format!("{}.{:02}", cents / 100, cents % 100)),
//!             other => Ok(other.to_string()),
//!         }
//!     }
//!
//!     fn parse(&self, text: &str, _locale: &Locale) -> Result<CellValue, FormatError> {
//!         let (units, cents) = text.split_once('.').ok_or_else(|| FormatError::expected("amount", text))?;
//!         let units: i64 = units.parse().map_err(|_| FormatError::expected("amount", text))?;
//!         let cents: i64 = cents.parse().map_err(|_| FormatError::expected("amount", text))?;
//!         Ok(CellValue::Integer(units * 100 + cents))
//!     }
//! }
//!
//! let locale = Locale::default();
//! assert_eq!(Cents.parse("12.05", &locale).unwrap(), CellValue::Integer(1205));
//! ```

use crate::cell::{CellType, CellValue, Decimal};
use crate::error::{Error, FormatError, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::str::FromStr;
use std::sync::Arc;

/// Number formatting conventions threaded through every formatter call.
///
/// # Examples
///
/// ```rust
/// use flatcell::Locale;
///
/// let swedish = Locale::new(',').with_grouping(' ');
/// assert_eq!(swedish.decimal_separator, ',');
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Locale {
    pub decimal_separator: char,
    pub grouping_separator: Option<char>,
}

impl Default for Locale {
    fn default() -> Self {
        Locale {
            decimal_separator: '.',
            grouping_separator: None,
        }
    }
}

impl Locale {
    #[must_use]
    pub fn new(decimal_separator: char) -> Self {
        Locale {
            decimal_separator,
            grouping_separator: None,
        }
    }

    #[must_use]
    pub fn with_grouping(mut self, separator: char) -> Self {
        self.grouping_separator = Some(separator);
        self
    }

    /// Rewrites localized number text into the `.`-separated form Rust parses.
    fn normalize_number(&self, text: &str) -> String {
        text.chars()
            .filter(|c| Some(*c) != self.grouping_separator)
            .map(|c| if c == self.decimal_separator { '.' } else { c })
            .collect()
    }

    fn localize_number(&self, text: String) -> String {
        if self.decimal_separator == '.' {
            text
        } else {
            text.replace('.', &self.decimal_separator.to_string())
        }
    }
}

/// Converts between cell text and [`CellValue`].
pub trait CellFormatter: fmt::Debug + Send + Sync {
    /// Formats a value as cell text.
    ///
    /// # Errors
    ///
    /// Returns an error when the value cannot be represented.
    fn format(&self, value: &CellValue, locale: &Locale) -> std::result::Result<String, FormatError>;

    /// Parses cell text. The text is never empty; empty cells are handled by the parser.
    ///
    /// # Errors
    ///
    /// Returns an error when the text does not match the expected format.
    fn parse(&self, text: &str, locale: &Locale) -> std::result::Result<CellValue, FormatError>;
}

/// Builds the built-in formatter for a type and pattern.
///
/// # Errors
///
/// Returns [`Error::Schema`] for `Custom` types (those need an explicit
/// formatter) and for patterns the type does not understand.
pub fn formatter_for(cell_type: &CellType, pattern: Option<&str>) -> Result<Arc<dyn CellFormatter>> {
    let formatter: Arc<dyn CellFormatter> = match cell_type {
        CellType::String => {
            reject_pattern(cell_type, pattern)?;
            Arc::new(StringFormatter)
        }
        CellType::Character => {
            reject_pattern(cell_type, pattern)?;
            Arc::new(CharacterFormatter)
        }
        CellType::Integer => {
            reject_pattern(cell_type, pattern)?;
            Arc::new(IntegerFormatter)
        }
        CellType::BigInteger => {
            reject_pattern(cell_type, pattern)?;
            Arc::new(BigIntegerFormatter)
        }
        CellType::Float => Arc::new(FloatFormatter {
            decimals: decimals_from_pattern(pattern)?,
        }),
        CellType::Decimal => Arc::new(DecimalFormatter {
            decimals: decimals_from_pattern(pattern)?,
        }),
        CellType::Boolean => Arc::new(BooleanFormatter::from_pattern(pattern)?),
        CellType::Date => Arc::new(DateFormatter {
            pattern: chrono_pattern(pattern.unwrap_or("%Y-%m-%d"), |p, sample| {
                render(sample.date().format(p))
            })?,
        }),
        CellType::DateTime => Arc::new(DateTimeFormatter {
            pattern: chrono_pattern(pattern.unwrap_or("%Y-%m-%dT%H:%M:%S"), |p, sample| {
                render(sample.format(p))
            })?,
        }),
        CellType::Custom(name) => {
            return Err(Error::schema(format!(
                "custom cell type '{}' needs an explicit formatter",
                name
            )))
        }
    };
    Ok(formatter)
}

fn reject_pattern(cell_type: &CellType, pattern: Option<&str>) -> Result<()> {
    match pattern {
        Some(p) => Err(Error::schema(format!(
            "pattern '{}' is not supported for {:?} cells",
            p, cell_type
        ))),
        None => Ok(()),
    }
}

/// `0.00` and `#,##0.000` style patterns: count the digits after the point.
fn decimals_from_pattern(pattern: Option<&str>) -> Result<Option<usize>> {
    let Some(pattern) = pattern else {
        return Ok(None);
    };
    if !pattern.chars().all(|c| matches!(c, '0' | '#' | ',' | '.')) {
        return Err(Error::schema(format!("unsupported number pattern '{}'", pattern)));
    }
    Ok(Some(pattern.split_once('.').map_or(0, |(_, frac)| frac.len())))
}

/// Rejects patterns chrono cannot parse, and patterns with fields the
/// value type lacks (`%H` on a date, `%z` on a date-time).
fn chrono_pattern<F>(pattern: &str, try_format: F) -> Result<String>
where
    F: Fn(&str, NaiveDateTime) -> std::result::Result<String, fmt::Error>,
{
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(Error::schema(format!("invalid date pattern '{}'", pattern)));
    }
    let sample = NaiveDate::from_ymd_opt(2000, 1, 31)
        .and_then(|d| d.and_hms_opt(12, 30, 0))
        .ok_or(fmt::Error);
    sample.and_then(|sample| try_format(pattern, sample)).map_err(|_| {
        Error::schema(format!("date pattern '{}' has fields the cell type cannot format", pattern))
    })?;
    Ok(pattern.to_string())
}

fn render(value: impl fmt::Display) -> std::result::Result<String, fmt::Error> {
    let mut out = String::new();
    write!(out, "{}", value)?;
    Ok(out)
}

fn render_date(value: impl fmt::Display, pattern: &str) -> std::result::Result<String, FormatError> {
    render(value).map_err(|_| FormatError::new(format!("cannot format with '{}'", pattern)))
}

#[derive(Debug)]
struct StringFormatter;

impl CellFormatter for StringFormatter {
    fn format(&self, value: &CellValue, _locale: &Locale) -> std::result::Result<String, FormatError> {
        Ok(value.to_string())
    }

    fn parse(&self, text: &str, _locale: &Locale) -> std::result::Result<CellValue, FormatError> {
        Ok(CellValue::String(text.to_string()))
    }
}

#[derive(Debug)]
struct CharacterFormatter;

impl CellFormatter for CharacterFormatter {
    fn format(&self, value: &CellValue, _locale: &Locale) -> std::result::Result<String, FormatError> {
        Ok(value.to_string())
    }

    fn parse(&self, text: &str, _locale: &Locale) -> std::result::Result<CellValue, FormatError> {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(CellValue::Character(c)),
            _ => Err(FormatError::expected("a single character", text)),
        }
    }
}

#[derive(Debug)]
struct IntegerFormatter;

impl CellFormatter for IntegerFormatter {
    fn format(&self, value: &CellValue, _locale: &Locale) -> std::result::Result<String, FormatError> {
        Ok(value.to_string())
    }

    fn parse(&self, text: &str, locale: &Locale) -> std::result::Result<CellValue, FormatError> {
        locale
            .normalize_number(text.trim())
            .parse::<i64>()
            .map(CellValue::Integer)
            .map_err(|_| FormatError::expected("an integer", text))
    }
}

#[derive(Debug)]
struct BigIntegerFormatter;

impl CellFormatter for BigIntegerFormatter {
    fn format(&self, value: &CellValue, _locale: &Locale) -> std::result::Result<String, FormatError> {
        Ok(value.to_string())
    }

    fn parse(&self, text: &str, locale: &Locale) -> std::result::Result<CellValue, FormatError> {
        BigInt::from_str(&locale.normalize_number(text.trim()))
            .map(CellValue::BigInteger)
            .map_err(|_| FormatError::expected("an integer", text))
    }
}

#[derive(Debug)]
struct FloatFormatter {
    decimals: Option<usize>,
}

impl CellFormatter for FloatFormatter {
    fn format(&self, value: &CellValue, locale: &Locale) -> std::result::Result<String, FormatError> {
        let number = match value {
            CellValue::Float(n) => *n,
            CellValue::Integer(n) => *n as f64,
            other => return Ok(other.to_string()),
        };
        let text = match self.decimals {
            Some(decimals) => format!("{:.*}", decimals, number),
            None => number.to_string(),
        };
        Ok(locale.localize_number(text))
    }

    fn parse(&self, text: &str, locale: &Locale) -> std::result::Result<CellValue, FormatError> {
        locale
            .normalize_number(text.trim())
            .parse::<f64>()
            .map(CellValue::Float)
            .map_err(|_| FormatError::expected("a number", text))
    }
}

#[derive(Debug)]
struct DecimalFormatter {
    decimals: Option<usize>,
}

impl CellFormatter for DecimalFormatter {
    fn format(&self, value: &CellValue, locale: &Locale) -> std::result::Result<String, FormatError> {
        let decimal = match value {
            CellValue::Decimal(d) => d.clone(),
            CellValue::Integer(n) => Decimal::new(BigInt::from(*n), 0),
            CellValue::BigInteger(n) => Decimal::new(n.clone(), 0),
            other => return Ok(other.to_string()),
        };
        let decimal = match self.decimals {
            Some(decimals) => decimal.with_scale(decimals as u32),
            None => decimal,
        };
        Ok(locale.localize_number(decimal.to_string()))
    }

    fn parse(&self, text: &str, locale: &Locale) -> std::result::Result<CellValue, FormatError> {
        Decimal::from_str(&locale.normalize_number(text.trim()))
            .map(CellValue::Decimal)
            .map_err(|_| FormatError::expected("a decimal number", text))
    }
}

#[derive(Debug)]
struct BooleanFormatter {
    true_words: Vec<String>,
    false_words: Vec<String>,
}

impl BooleanFormatter {
    fn from_pattern(pattern: Option<&str>) -> Result<Self> {
        let Some(pattern) = pattern else {
            return Ok(BooleanFormatter {
                true_words: vec!["true".to_string()],
                false_words: vec!["false".to_string()],
            });
        };
        let (true_part, false_part) = pattern.split_once(';').ok_or_else(|| {
            Error::schema(format!(
                "boolean pattern '{}' must separate true and false words with ';'",
                pattern
            ))
        })?;
        let words = |part: &str| -> Vec<String> {
            part.split('|')
                .filter(|w| !w.is_empty())
                .map(str::to_string)
                .collect()
        };
        let (true_words, false_words) = (words(true_part), words(false_part));
        if true_words.is_empty() || false_words.is_empty() {
            return Err(Error::schema(format!(
                "boolean pattern '{}' needs at least one word for each value",
                pattern
            )));
        }
        Ok(BooleanFormatter {
            true_words,
            false_words,
        })
    }
}

impl CellFormatter for BooleanFormatter {
    fn format(&self, value: &CellValue, _locale: &Locale) -> std::result::Result<String, FormatError> {
        match value {
            CellValue::Boolean(true) => Ok(self.true_words[0].clone()),
            CellValue::Boolean(false) => Ok(self.false_words[0].clone()),
            other => Ok(other.to_string()),
        }
    }

    fn parse(&self, text: &str, _locale: &Locale) -> std::result::Result<CellValue, FormatError> {
        let text = text.trim();
        if self.true_words.iter().any(|w| w.eq_ignore_ascii_case(text)) {
            Ok(CellValue::Boolean(true))
        } else if self.false_words.iter().any(|w| w.eq_ignore_ascii_case(text)) {
            Ok(CellValue::Boolean(false))
        } else {
            Err(FormatError::expected(
                &format!("one of {:?} or {:?}", self.true_words, self.false_words),
                text,
            ))
        }
    }
}

#[derive(Debug)]
struct DateFormatter {
    pattern: String,
}

impl CellFormatter for DateFormatter {
    fn format(&self, value: &CellValue, _locale: &Locale) -> std::result::Result<String, FormatError> {
        match value {
            CellValue::Date(d) => render_date(d.format(&self.pattern), &self.pattern),
            CellValue::DateTime(dt) => render_date(dt.date().format(&self.pattern), &self.pattern),
            CellValue::String(s) => Ok(s.clone()),
            other => Err(FormatError::expected("a date", &other.to_string())),
        }
    }

    fn parse(&self, text: &str, _locale: &Locale) -> std::result::Result<CellValue, FormatError> {
        NaiveDate::parse_from_str(text.trim(), &self.pattern)
            .map(CellValue::Date)
            .map_err(|e| FormatError::new(format!("'{}' does not match '{}': {}", text, self.pattern, e)))
    }
}

#[derive(Debug)]
struct DateTimeFormatter {
    pattern: String,
}

impl CellFormatter for DateTimeFormatter {
    fn format(&self, value: &CellValue, _locale: &Locale) -> std::result::Result<String, FormatError> {
        match value {
            CellValue::DateTime(dt) => render_date(dt.format(&self.pattern), &self.pattern),
            CellValue::String(s) => Ok(s.clone()),
            other => Err(FormatError::expected("a date-time", &other.to_string())),
        }
    }

    fn parse(&self, text: &str, _locale: &Locale) -> std::result::Result<CellValue, FormatError> {
        NaiveDateTime::parse_from_str(text.trim(), &self.pattern)
            .map(CellValue::DateTime)
            .map_err(|e| FormatError::new(format!("'{}' does not match '{}': {}", text, self.pattern, e)))
    }
}
