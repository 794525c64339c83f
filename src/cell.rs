//! Typed cell values.
//!
//! A [`Cell`] is one named (or positional) value of a [`Line`](crate::Line).
//! Its [`CellValue`] is a tagged enum covering every type a schema cell can
//! declare through [`CellType`].
//!
//! ## Examples
//!
//! ```rust
//! use flatcell::{Cell, CellValue};
//!
//! let name = Cell::new("First name", "Jonas");
//! let age = Cell::new("Age", 42);
//!
//! assert_eq!(name.value().as_str(), Some("Jonas"));
//! assert_eq!(age.value().as_i64(), Some(42));
//!
//! // An empty cell is not the same thing as an empty string
//! assert_ne!(CellValue::Empty, CellValue::from(""));
//! ```

use chrono::{NaiveDate, NaiveDateTime};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The declared type of a schema cell.
///
/// The type selects the built-in [`CellFormatter`](crate::CellFormatter) used
/// to convert text to a [`CellValue`] and back. `Custom` cells carry a
/// user-supplied formatter instead.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    #[default]
    String,
    Character,
    Integer,
    BigInteger,
    Float,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Custom(String),
}

impl CellType {
    /// Returns `true` for types whose formatted text never needs quoting.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flatcell::CellType;
    ///
    /// assert!(CellType::Integer.is_atomic());
    /// assert!(!CellType::String.is_atomic());
    /// ```
    #[inline]
    #[must_use]
    pub fn is_atomic(&self) -> bool {
        matches!(
            self,
            CellType::Integer
                | CellType::BigInteger
                | CellType::Float
                | CellType::Decimal
                | CellType::Boolean
                | CellType::Date
                | CellType::DateTime
        )
    }
}

/// An arbitrary precision decimal number: `unscaled * 10^-scale`.
///
/// # Examples
///
/// ```rust
/// use flatcell::Decimal;
///
/// let price: Decimal = "-12.50".parse().unwrap();
/// assert_eq!(price.scale(), 2);
/// assert_eq!(price.to_string(), "-12.50");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Decimal {
    unscaled: BigInt,
    scale: u32,
}

impl Decimal {
    #[must_use]
    pub fn new(unscaled: BigInt, scale: u32) -> Self {
        Decimal { unscaled, scale }
    }

    #[must_use]
    pub fn unscaled(&self) -> &BigInt {
        &self.unscaled
    }

    #[must_use]
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Returns the value with exactly `scale` decimals, truncating extra digits.
    #[must_use]
    pub fn with_scale(&self, scale: u32) -> Decimal {
        use std::cmp::Ordering;
        let unscaled = match scale.cmp(&self.scale) {
            Ordering::Equal => self.unscaled.clone(),
            Ordering::Greater => &self.unscaled * BigInt::from(10u32).pow(scale - self.scale),
            Ordering::Less => &self.unscaled / BigInt::from(10u32).pow(self.scale - scale),
        };
        Decimal { unscaled, scale }
    }
}

impl FromStr for Decimal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, body) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty()
            || !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(format!("invalid decimal '{}'", s));
        }
        let digits = format!("{}{}", int_part, frac_part);
        let mut unscaled = BigInt::from_str(&digits).map_err(|e| e.to_string())?;
        if negative {
            unscaled = -unscaled;
        }
        Ok(Decimal {
            unscaled,
            scale: frac_part.len() as u32,
        })
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = self.unscaled.magnitude().to_string();
        let sign = if self.unscaled.sign() == num_bigint::Sign::Minus {
            "-"
        } else {
            ""
        };
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{}{}", sign, magnitude);
        }
        let padded = if magnitude.len() <= scale {
            format!("{}{}", "0".repeat(scale + 1 - magnitude.len()), magnitude)
        } else {
            magnitude
        };
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{}{}.{}", sign, int_part, frac_part)
    }
}

/// A dynamically-typed cell value.
///
/// `Empty` marks a cell that is present but carries no value; it is distinct
/// from `String(String::new())`.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    String(String),
    Character(char),
    Integer(i64),
    BigInteger(BigInt),
    Float(f64),
    Decimal(Decimal),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl CellValue {
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(n) => Some(*n),
            CellValue::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::DateTime(dt) => Some(dt.date()),
            _ => None,
        }
    }

    /// Returns the name of the variant, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::String(_) => "string",
            CellValue::Character(_) => "character",
            CellValue::Integer(_) => "integer",
            CellValue::BigInteger(_) => "big integer",
            CellValue::Float(_) => "float",
            CellValue::Decimal(_) => "decimal",
            CellValue::Boolean(_) => "boolean",
            CellValue::Date(_) => "date",
            CellValue::DateTime(_) => "date-time",
        }
    }
}

/// Locale-free text form, used when a value does not match its schema type.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::String(s) => f.write_str(s),
            CellValue::Character(c) => write!(f, "{}", c),
            CellValue::Integer(n) => write!(f, "{}", n),
            CellValue::BigInteger(n) => write!(f, "{}", n),
            CellValue::Float(n) => write!(f, "{}", n),
            CellValue::Decimal(d) => write!(f, "{}", d),
            CellValue::Boolean(b) => write!(f, "{}", b),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            CellValue::Empty => serializer.serialize_none(),
            CellValue::String(s) => serializer.serialize_str(s),
            CellValue::Character(c) => serializer.serialize_char(*c),
            CellValue::Integer(n) => serializer.serialize_i64(*n),
            CellValue::Float(n) => serializer.serialize_f64(*n),
            CellValue::Boolean(b) => serializer.serialize_bool(*b),
            CellValue::BigInteger(_)
            | CellValue::Decimal(_)
            | CellValue::Date(_)
            | CellValue::DateTime(_) => serializer.collect_str(self),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<char> for CellValue {
    fn from(c: char) -> Self {
        CellValue::Character(c)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Integer(i64::from(n))
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Integer(n)
    }
}

impl From<u32> for CellValue {
    fn from(n: u32) -> Self {
        CellValue::Integer(i64::from(n))
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Float(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<BigInt> for CellValue {
    fn from(n: BigInt) -> Self {
        CellValue::BigInteger(n)
    }
}

impl From<Decimal> for CellValue {
    fn from(d: Decimal) -> Self {
        CellValue::Decimal(d)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Date(d)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        CellValue::DateTime(dt)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Empty, Into::into)
    }
}

/// One value of a line, optionally named.
///
/// Cells are immutable: a line replaces a cell wholesale rather than
/// mutating its value.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Cell {
    name: Option<String>,
    value: CellValue,
}

impl Cell {
    /// Creates a named cell.
    pub fn new(name: impl Into<String>, value: impl Into<CellValue>) -> Self {
        Cell {
            name: Some(name.into()),
            value: value.into(),
        }
    }

    /// Creates a positional cell without a name.
    pub fn unnamed(value: impl Into<CellValue>) -> Self {
        Cell {
            name: None,
            value: value.into(),
        }
    }

    /// Creates a cell holding [`CellValue::Empty`].
    pub fn empty(name: Option<&str>) -> Self {
        Cell {
            name: name.map(str::to_string),
            value: CellValue::Empty,
        }
    }

    pub(crate) fn with_optional_name(name: Option<&str>, value: CellValue) -> Self {
        Cell {
            name: name.map(str::to_string),
            value,
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn value(&self) -> &CellValue {
        &self.value
    }

    #[must_use]
    pub fn into_value(self) -> CellValue {
        self.value
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}
