//! Output-side quoting of delimited cells.
//!
//! Every cell written to a delimited line passes through a [`Quoter`] which
//! applies the cell's [`QuoteBehavior`]:
//!
//! - **Always** wraps the value in quote characters and escapes embedded
//!   quotes according to the schema's [`QuoteSyntax`]
//! - **Never** writes the value verbatim
//! - **Automatic** quotes only values that contain the quote character or a
//!   separator, or whose tail would run into the following separator (a
//!   value ending in `:` before a `::` separator)
//! - **Replace** never quotes; separators inside the value are replaced
//!
//! ```rust
//! use flatcell::{QuoteBehavior, QuoteSyntax, Quoter};
//!
//! let quoter = Quoter::new(";", "\n", Some('"'), QuoteSyntax::Rfc4180, "\u{00A0}");
//! let mut out = String::new();
//! quoter.write(&mut out, "Hemvägen ;19", QuoteBehavior::Automatic, None);
//! assert_eq!(out, "\"Hemvägen ;19\"");
//! ```

use crate::buffer::is_universal_newline;
use serde::{Deserialize, Serialize};

/// When a delimited cell is wrapped in quote characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteBehavior {
    /// Quote only when the value would otherwise break the line structure.
    #[default]
    Automatic,
    /// Never quote; the value is written as is.
    Never,
    /// Always quote.
    Always,
    /// Never quote; separators in the value are replaced.
    Replace,
}

/// How a quote character inside quoted content is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSyntax {
    /// The quote character is doubled (`"a ""b"""`), as in RFC 4180.
    #[default]
    Rfc4180,
    /// The quote character, and the escape character itself, are preceded
    /// by the given escape character (`"a \"b\""`).
    Escape(char),
}

/// The character used by [`QuoteBehavior::Replace`] unless the schema says otherwise.
pub const DEFAULT_REPLACEMENT: &str = "\u{00A0}";

/// Writes delimited cell values under one schema's separators and quote settings.
#[derive(Clone, Debug)]
pub struct Quoter<'a> {
    cell_separator: &'a str,
    line_separator: &'a str,
    universal_newline: bool,
    quote: Option<char>,
    syntax: QuoteSyntax,
    replacement: &'a str,
}

impl<'a> Quoter<'a> {
    pub fn new(
        cell_separator: &'a str,
        line_separator: &'a str,
        quote: Option<char>,
        syntax: QuoteSyntax,
        replacement: &'a str,
    ) -> Self {
        Quoter {
            cell_separator,
            line_separator,
            universal_newline: is_universal_newline(line_separator),
            quote,
            syntax,
            replacement,
        }
    }

    /// Appends `value` to `out` under `behavior`, truncated to `max_length` characters first.
    pub fn write(
        &self,
        out: &mut String,
        value: &str,
        behavior: QuoteBehavior,
        max_length: Option<usize>,
    ) {
        let value = match max_length {
            Some(max) if value.chars().count() > max => {
                std::borrow::Cow::Owned(value.chars().take(max).collect::<String>())
            }
            _ => std::borrow::Cow::Borrowed(value),
        };
        match (behavior, self.quote) {
            (QuoteBehavior::Never, _) => out.push_str(&value),
            (QuoteBehavior::Always, Some(quote)) => self.write_quoted(out, &value, quote),
            (QuoteBehavior::Automatic, Some(quote)) => {
                if self.needs_quotes(&value) {
                    self.write_quoted(out, &value, quote);
                } else {
                    out.push_str(&value);
                }
            }
            // Without a quote character the only safe option is replacement.
            (QuoteBehavior::Replace, _) | (_, None) => self.write_replaced(out, &value),
        }
    }

    /// Single pass over the value. Multi-character separators are compared
    /// in full only after their first character is seen.
    #[must_use]
    pub fn needs_quotes(&self, value: &str) -> bool {
        let cell_first = self.cell_separator.chars().next();
        let line_first = self.line_separator.chars().next();
        for (i, c) in value.char_indices() {
            if Some(c) == self.quote {
                return true;
            }
            if self.universal_newline {
                if c == '\n' || c == '\r' {
                    return true;
                }
            } else if Some(c) == line_first && value[i..].starts_with(self.line_separator) {
                return true;
            }
            if Some(c) == cell_first && value[i..].starts_with(self.cell_separator) {
                return true;
            }
        }
        let separators = [self.cell_separator, self.line_separator];
        separators
            .iter()
            .any(|next| separators.iter().any(|sep| runs_into(value, next, sep)))
    }

    fn write_quoted(&self, out: &mut String, value: &str, quote: char) {
        out.reserve(value.len() + 2);
        out.push(quote);
        for c in value.chars() {
            match self.syntax {
                QuoteSyntax::Rfc4180 if c == quote => {
                    out.push(quote);
                }
                QuoteSyntax::Escape(escape) if c == quote || c == escape => {
                    out.push(escape);
                }
                _ => {}
            }
            out.push(c);
        }
        out.push(quote);
    }

    fn write_replaced(&self, out: &mut String, value: &str) {
        let mut replaced = value.replace(self.cell_separator, self.replacement);
        if self.universal_newline {
            for newline in ["\r\n", "\n", "\r"] {
                if replaced.contains(newline) {
                    replaced = replaced.replace(newline, self.replacement);
                }
            }
        } else if !self.line_separator.is_empty() {
            replaced = replaced.replace(self.line_separator, self.replacement);
        }
        out.push_str(&replaced);
    }
}

/// `true` when a tail of `value` followed by `next` reads as `separator`.
fn runs_into(value: &str, next: &str, separator: &str) -> bool {
    value
        .char_indices()
        .rev()
        .map(|(i, _)| &value[i..])
        .take_while(|tail| tail.len() < separator.len())
        .any(|tail| separator.starts_with(tail) && next.starts_with(&separator[tail.len()..]))
}
