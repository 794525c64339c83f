//! Quote-aware splitting of delimited lines, and raw line reads for the fixed layout.
//!
//! The delimited tokenizer is a character state machine:
//!
//! ```text
//!              quote                 quote               quote + separator
//! BeginCell ─────────▶ QuotedCell ─────────▶ FoundEndQuote ─────────▶ (cell ends)
//!     │                    ▲                   │     │
//!     │ other              └──── quote ────────┘     │ other
//!     ▼                    (escaped quote)           ▼
//! UnquotedCell                              FoundEndQuoteWithin
//! ```
//!
//! `FoundEndQuoteWithin` is entered when a quote inside quoted content turns
//! out not to be terminal. From there on the quote characters already seen
//! are literal text and the cell only ends at a quote that is directly
//! followed by a separator or by the end of input.
//!
//! Separators may be several characters long. When a cell separator and
//! the line separator both match at the same position the line separator
//! wins.

use crate::buffer::{CharBuffer, LineTerminator};
use crate::error::Result;
use crate::quote::QuoteSyntax;
use std::io::Read;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    BeginCell,
    UnquotedCell,
    QuotedCell,
    FoundEndQuote,
    FoundEndQuoteWithin,
}

/// Reads physical lines from a character source.
pub struct Tokenizer<R> {
    buffer: CharBuffer<R>,
    cell_separator: Vec<char>,
    terminator: LineTerminator,
    syntax: QuoteSyntax,
}

impl<R: Read> Tokenizer<R> {
    /// Creates a tokenizer over `reader`.
    ///
    /// `cell_separator` may be empty for the fixed layout, where only
    /// [`read_text_line`](Self::read_text_line) and
    /// [`read_chars`](Self::read_chars) are used.
    pub fn new(
        reader: R,
        cell_separator: &str,
        line_separator: &str,
        syntax: QuoteSyntax,
        read_buffer_size: usize,
        max_line_length: usize,
    ) -> Self {
        Tokenizer {
            buffer: CharBuffer::new(reader, read_buffer_size, max_line_length),
            cell_separator: cell_separator.chars().collect(),
            terminator: LineTerminator::new(line_separator),
            syntax,
        }
    }

    /// Skips a byte order mark if the stream starts with one.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read.
    pub fn skip_bom(&mut self) -> Result<()> {
        self.buffer.skip_bom()
    }

    /// Splits the next physical line into cells.
    ///
    /// Returns `None` at the end of input and an empty vector for an empty
    /// line. Quoted cells may span several physical lines.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, invalid UTF-8 or an oversized line.
    pub fn read_cells(&mut self, quote: Option<char>) -> Result<Option<Vec<String>>> {
        self.buffer.begin_line();
        self.tokenize(quote)
    }

    /// Splits the line returned by the last [`read_cells`](Self::read_cells)
    /// again, this time with another quote character.
    ///
    /// # Errors
    ///
    /// Same as [`read_cells`](Self::read_cells).
    pub fn replay_cells(&mut self, quote: Option<char>) -> Result<Option<Vec<String>>> {
        self.buffer.rewind_line();
        self.tokenize(quote)
    }

    /// Reads the next physical line as raw text, without the line separator.
    ///
    /// # Errors
    ///
    /// Same as [`read_cells`](Self::read_cells).
    pub fn read_text_line(&mut self) -> Result<Option<String>> {
        self.buffer.begin_line();
        let start = self.buffer.position();
        loop {
            if self.buffer.peek()?.is_none() {
                if self.buffer.line_len() == 0 {
                    return Ok(None);
                }
                return Ok(Some(self.buffer.text(start, self.buffer.position())));
            }
            if let Some(len) = self.buffer.terminator_at(0, &self.terminator)? {
                let text = self.buffer.text(start, self.buffer.position());
                self.buffer.advance(len);
                return Ok(Some(text));
            }
            self.buffer.advance(1);
        }
    }

    /// Starts a new record and reads up to `n` characters of it.
    ///
    /// Returns `None` when the input is exhausted before the first character.
    ///
    /// # Errors
    ///
    /// Same as [`read_cells`](Self::read_cells).
    pub fn read_chars(&mut self, n: usize) -> Result<Option<String>> {
        self.buffer.begin_line();
        if self.buffer.peek()?.is_none() {
            return Ok(None);
        }
        self.buffer.take(n).map(Some)
    }

    /// Reads up to `n` more characters of the current record.
    ///
    /// # Errors
    ///
    /// Same as [`read_cells`](Self::read_cells).
    pub fn read_more_chars(&mut self, n: usize) -> Result<String> {
        self.buffer.take(n)
    }

    fn cell_separator_at(&mut self, offset: usize) -> Result<bool> {
        if self.cell_separator.is_empty() {
            return Ok(false);
        }
        self.buffer.starts_with_at(offset, &self.cell_separator)
    }

    fn line_separator_at(&mut self, offset: usize) -> Result<Option<usize>> {
        self.buffer.terminator_at(offset, &self.terminator)
    }

    fn tokenize(&mut self, quote: Option<char>) -> Result<Option<Vec<String>>> {
        let escape = match self.syntax {
            QuoteSyntax::Escape(c) => Some(c),
            QuoteSyntax::Rfc4180 => None,
        };
        let mut cells = Vec::new();
        let mut state = State::BeginCell;
        let mut cell_start = self.buffer.position();
        let mut quoted = String::new();

        loop {
            let Some(c) = self.buffer.peek()? else {
                return Ok(self.finish(state, cells, cell_start, quoted));
            };

            match state {
                State::BeginCell => {
                    if Some(c) == quote {
                        self.buffer.advance(1);
                        quoted.clear();
                        state = State::QuotedCell;
                    } else if let Some(len) = self.line_separator_at(0)? {
                        self.buffer.advance(len);
                        // A separator right before the line end leaves one more empty cell.
                        if !cells.is_empty() {
                            cells.push(String::new());
                        }
                        return Ok(Some(cells));
                    } else if self.cell_separator_at(0)? {
                        self.buffer.advance(self.cell_separator.len());
                        cells.push(String::new());
                    } else {
                        cell_start = self.buffer.position();
                        state = State::UnquotedCell;
                    }
                }
                State::UnquotedCell => {
                    if let Some(len) = self.line_separator_at(0)? {
                        cells.push(self.buffer.text(cell_start, self.buffer.position()));
                        self.buffer.advance(len);
                        return Ok(Some(cells));
                    } else if self.cell_separator_at(0)? {
                        cells.push(self.buffer.text(cell_start, self.buffer.position()));
                        self.buffer.advance(self.cell_separator.len());
                        state = State::BeginCell;
                    } else {
                        self.buffer.advance(1);
                    }
                }
                State::QuotedCell => {
                    if escape == Some(c) {
                        self.push_escaped(&mut quoted)?;
                    } else if Some(c) == quote {
                        self.buffer.advance(1);
                        state = State::FoundEndQuote;
                    } else {
                        quoted.push(c);
                        self.buffer.advance(1);
                    }
                }
                State::FoundEndQuote => {
                    if let Some(len) = self.line_separator_at(0)? {
                        cells.push(std::mem::take(&mut quoted));
                        self.buffer.advance(len);
                        return Ok(Some(cells));
                    } else if self.cell_separator_at(0)? {
                        cells.push(std::mem::take(&mut quoted));
                        self.buffer.advance(self.cell_separator.len());
                        state = State::BeginCell;
                    } else if Some(c) == quote && escape.is_none() {
                        quoted.push(c);
                        self.buffer.advance(1);
                        state = State::QuotedCell;
                    } else {
                        // The quote was not terminal after all; keep it and
                        // look at this character again as content.
                        quoted.extend(quote);
                        state = State::FoundEndQuoteWithin;
                    }
                }
                State::FoundEndQuoteWithin => {
                    if escape == Some(c) {
                        self.push_escaped(&mut quoted)?;
                    } else if Some(c) == quote {
                        let terminal = match self.buffer.peek_at(1)? {
                            None => true,
                            Some(_) => {
                                self.line_separator_at(1)?.is_some() || self.cell_separator_at(1)?
                            }
                        };
                        self.buffer.advance(1);
                        if terminal {
                            state = State::FoundEndQuote;
                        } else {
                            quoted.push(c);
                        }
                    } else {
                        quoted.push(c);
                        self.buffer.advance(1);
                    }
                }
            }
        }
    }

    /// Consumes an escape character and appends the character it protects.
    fn push_escaped(&mut self, quoted: &mut String) -> Result<()> {
        self.buffer.advance(1);
        if let Some(next) = self.buffer.peek()? {
            quoted.push(next);
            self.buffer.advance(1);
        }
        Ok(())
    }

    /// Closes the line when the input ends in `state`.
    fn finish(
        &self,
        state: State,
        mut cells: Vec<String>,
        cell_start: usize,
        quoted: String,
    ) -> Option<Vec<String>> {
        match state {
            State::BeginCell => {
                if cells.is_empty() && self.buffer.line_len() == 0 {
                    return None;
                }
                cells.push(String::new());
            }
            State::UnquotedCell => cells.push(self.buffer.text(cell_start, self.buffer.position())),
            State::FoundEndQuote => cells.push(quoted),
            State::QuotedCell | State::FoundEndQuoteWithin => {
                tracing::warn!(
                    cell = cells.len() + 1,
                    "input ended inside a quoted cell; keeping the {} characters read",
                    quoted.chars().count()
                );
                cells.push(quoted);
            }
        }
        Some(cells)
    }
}
