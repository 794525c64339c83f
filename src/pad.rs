//! Fixed-column padding and truncation.
//!
//! Widths count characters, not bytes, so `"Hemvägen"` occupies eight
//! columns.
//!
//! ```rust
//! use flatcell::{fit, pad, Alignment};
//!
//! assert_eq!(pad("42", 5, '0', Alignment::Right), "00042");
//! assert_eq!(fit("Stockholm", 5, Alignment::Left), "Stock");
//! assert_eq!(fit("Stockholm", 5, Alignment::Right), "kholm");
//! ```

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Where a value sits inside its fixed-width column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    Left,
    Right,
    Center,
}

/// Truncates `value` to at most `width` characters.
///
/// Left-aligned values keep their head, right-aligned values keep their
/// tail, centered values keep the middle with an odd leftover cut from the
/// right. Values that already fit are borrowed unchanged.
#[must_use]
pub fn fit(value: &str, width: usize, alignment: Alignment) -> Cow<'_, str> {
    let len = value.chars().count();
    if len <= width {
        return Cow::Borrowed(value);
    }
    let excess = len - width;
    let skip = match alignment {
        Alignment::Left => 0,
        Alignment::Right => excess,
        Alignment::Center => excess / 2,
    };
    Cow::Owned(value.chars().skip(skip).take(width).collect())
}

/// Returns exactly `width` characters: `value` fitted and filled with `pad_char`.
#[must_use]
pub fn pad(value: &str, width: usize, pad_char: char, alignment: Alignment) -> String {
    let fitted = fit(value, width, alignment);
    let missing = width - fitted.chars().count();
    let (before, after) = match alignment {
        Alignment::Left => (0, missing),
        Alignment::Right => (missing, 0),
        Alignment::Center => (missing / 2, missing - missing / 2),
    };
    let mut out = String::with_capacity(fitted.len() + missing * pad_char.len_utf8());
    out.extend(std::iter::repeat(pad_char).take(before));
    out.push_str(&fitted);
    out.extend(std::iter::repeat(pad_char).take(after));
    out
}

/// Strips `pad_char` from the side(s) padding was added to.
#[must_use]
pub fn trim_pad(value: &str, pad_char: char, alignment: Alignment) -> &str {
    match alignment {
        Alignment::Left => value.trim_end_matches(pad_char),
        Alignment::Right => value.trim_start_matches(pad_char),
        Alignment::Center => value.trim_matches(pad_char),
    }
}
