//! Character working buffer shared by the tokenizer and the fixed-width slicer.
//!
//! Bytes are read from the source in chunks and decoded into characters as
//! they arrive; a multi-byte sequence split across two chunks is carried
//! over. The buffer keeps a *line mark* at the start of the current
//! physical line so that the line can be replayed, and only compacts the
//! previous line away when the next one begins.

use crate::error::{Error, Result};
use std::io::Read;

/// Returns `true` for the separators read as "any newline".
pub(crate) fn is_universal_newline(separator: &str) -> bool {
    matches!(separator, "\n" | "\r\n" | "\r")
}

/// How the end of a physical line is recognized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum LineTerminator {
    /// `\r\n`, `\n` or a lone `\r`.
    Universal,
    Exact(Vec<char>),
    /// Records are not separated; only fixed-width reads make sense.
    Nothing,
}

impl LineTerminator {
    pub(crate) fn new(separator: &str) -> Self {
        if separator.is_empty() {
            LineTerminator::Nothing
        } else if is_universal_newline(separator) {
            LineTerminator::Universal
        } else {
            LineTerminator::Exact(separator.chars().collect())
        }
    }
}

pub(crate) struct CharBuffer<R> {
    reader: R,
    chunk: Vec<u8>,
    /// Undecoded tail of the last chunk (an incomplete UTF-8 sequence).
    pending: Vec<u8>,
    chars: Vec<char>,
    pos: usize,
    line_mark: usize,
    eof: bool,
    bytes_read: usize,
    max_line_length: usize,
    lines_started: usize,
}

impl<R: Read> CharBuffer<R> {
    pub(crate) fn new(reader: R, chunk_size: usize, max_line_length: usize) -> Self {
        CharBuffer {
            reader,
            chunk: vec![0; chunk_size.max(1)],
            pending: Vec::new(),
            chars: Vec::with_capacity(chunk_size.max(1)),
            pos: 0,
            line_mark: 0,
            eof: false,
            bytes_read: 0,
            max_line_length,
            lines_started: 0,
        }
    }

    /// Marks the cursor as the start of a new line. Consumed lines are
    /// compacted away once the cursor passes half the buffer.
    pub(crate) fn begin_line(&mut self) {
        if self.pos > self.chars.len() / 2 {
            self.chars.drain(..self.pos);
            self.pos = 0;
        }
        self.line_mark = self.pos;
        self.lines_started += 1;
    }

    /// Moves the cursor back to the start of the current line.
    pub(crate) fn rewind_line(&mut self) {
        self.pos = self.line_mark;
    }

    /// Characters consumed since the line mark.
    pub(crate) fn line_len(&self) -> usize {
        self.pos - self.line_mark
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.chars.len());
    }

    /// Looks `offset` characters ahead of the cursor, reading more input if needed.
    pub(crate) fn peek_at(&mut self, offset: usize) -> Result<Option<char>> {
        while self.pos + offset >= self.chars.len() {
            if !self.fill()? {
                return Ok(None);
            }
        }
        Ok(Some(self.chars[self.pos + offset]))
    }

    #[inline]
    pub(crate) fn peek(&mut self) -> Result<Option<char>> {
        self.peek_at(0)
    }

    /// Returns `true` if the input at `offset` starts with `pattern`.
    pub(crate) fn starts_with_at(&mut self, offset: usize, pattern: &[char]) -> Result<bool> {
        for (i, expected) in pattern.iter().enumerate() {
            if self.peek_at(offset + i)? != Some(*expected) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Length of the line terminator at `offset`, if there is one.
    pub(crate) fn terminator_at(
        &mut self,
        offset: usize,
        terminator: &LineTerminator,
    ) -> Result<Option<usize>> {
        match terminator {
            LineTerminator::Nothing => Ok(None),
            LineTerminator::Universal => match self.peek_at(offset)? {
                Some('\n') => Ok(Some(1)),
                Some('\r') => {
                    if self.peek_at(offset + 1)? == Some('\n') {
                        Ok(Some(2))
                    } else {
                        Ok(Some(1))
                    }
                }
                _ => Ok(None),
            },
            LineTerminator::Exact(pattern) => {
                if self.starts_with_at(offset, pattern)? {
                    Ok(Some(pattern.len()))
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Copies the characters in `start..end` out of the buffer.
    pub(crate) fn text(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }

    /// Consumes up to `n` characters, fewer only at end of input.
    pub(crate) fn take(&mut self, n: usize) -> Result<String> {
        let start = self.pos;
        let available = match self.peek_at(n.saturating_sub(1))? {
            Some(_) => n,
            None => self.chars.len() - start,
        };
        self.advance(available);
        Ok(self.text(start, start + available))
    }

    /// Skips a byte order mark at the very start of the stream.
    pub(crate) fn skip_bom(&mut self) -> Result<()> {
        if self.lines_started == 0 && self.pos == 0 && self.peek()? == Some('\u{FEFF}') {
            self.chars.remove(0);
        }
        Ok(())
    }

    /// Reads one more chunk. Returns `false` at end of input.
    fn fill(&mut self) -> Result<bool> {
        if self.eof {
            return Ok(false);
        }
        if self.line_len() > self.max_line_length {
            return Err(Error::LineTooLong {
                line: self.lines_started.max(1),
                max: self.max_line_length,
            });
        }
        loop {
            let read = match self.reader.read(&mut self.chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if read == 0 {
                self.eof = true;
                if !self.pending.is_empty() {
                    return Err(Error::Encoding {
                        offset: self.bytes_read - self.pending.len(),
                    });
                }
                return Ok(false);
            }
            self.bytes_read += read;
            self.pending.extend_from_slice(&self.chunk[..read]);
            let before = self.chars.len();
            self.decode_pending()?;
            if self.chars.len() > before {
                return Ok(true);
            }
        }
    }

    fn decode_pending(&mut self) -> Result<()> {
        let valid = match std::str::from_utf8(&self.pending) {
            Ok(s) => {
                self.chars.extend(s.chars());
                self.pending.len()
            }
            Err(e) => {
                if e.error_len().is_some() {
                    let offset = self.bytes_read - self.pending.len() + e.valid_up_to();
                    return Err(Error::Encoding { offset });
                }
                let valid = e.valid_up_to();
                // The prefix was just validated by from_utf8.
                if let Ok(s) = std::str::from_utf8(&self.pending[..valid]) {
                    self.chars.extend(s.chars());
                }
                valid
            }
        };
        self.pending.drain(..valid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn buffer(input: &str, chunk: usize) -> CharBuffer<Cursor<Vec<u8>>> {
        CharBuffer::new(Cursor::new(input.as_bytes().to_vec()), chunk, 1024)
    }

    #[test]
    fn test_multibyte_split_across_chunks() {
        // 'ä' is two bytes; a chunk size of one splits every multi-byte char.
        let mut buf = buffer("Hemvägen", 1);
        buf.begin_line();
        assert_eq!(buf.take(8).unwrap(), "Hemvägen");
        assert_eq!(buf.peek().unwrap(), None);
    }

    #[test]
    fn test_invalid_utf8_is_reported() {
        let mut buf = CharBuffer::new(Cursor::new(vec![b'a', 0xff, b'b']), 8, 1024);
        buf.begin_line();
        assert!(matches!(buf.peek(), Err(Error::Encoding { offset: 1 })));
    }

    #[test]
    fn test_truncated_sequence_at_eof() {
        let mut buf = CharBuffer::new(Cursor::new(vec![b'a', 0xc3]), 8, 1024);
        buf.begin_line();
        assert_eq!(buf.peek().unwrap(), Some('a'));
        buf.advance(1);
        assert!(matches!(buf.peek(), Err(Error::Encoding { .. })));
    }

    #[test]
    fn test_rewind_replays_the_line() {
        let mut buf = buffer("abc\ndef", 2);
        buf.begin_line();
        assert_eq!(buf.take(3).unwrap(), "abc");
        buf.rewind_line();
        assert_eq!(buf.take(2).unwrap(), "ab");
    }

    #[test]
    fn test_terminators() {
        let mut buf = buffer("a\r\nb\rc\n", 4);
        buf.begin_line();
        assert_eq!(buf.terminator_at(1, &LineTerminator::Universal).unwrap(), Some(2));
        assert_eq!(buf.terminator_at(4, &LineTerminator::Universal).unwrap(), Some(1));
        assert_eq!(buf.terminator_at(0, &LineTerminator::Universal).unwrap(), None);
        let exact = LineTerminator::new("\rc");
        assert_eq!(buf.terminator_at(4, &exact).unwrap(), Some(2));
        assert_eq!(buf.terminator_at(0, &LineTerminator::Nothing).unwrap(), None);
    }

    #[test]
    fn test_line_too_long() {
        let mut buf = CharBuffer::new(Cursor::new(vec![b'x'; 64]), 4, 10);
        buf.begin_line();
        let result = (|| -> Result<()> {
            while buf.peek()?.is_some() {
                buf.advance(1);
            }
            Ok(())
        })();
        assert!(matches!(result, Err(Error::LineTooLong { max: 10, .. })));
    }

    #[test]
    fn test_short_lines_share_one_chunk() {
        let mut buf = buffer("ab\ncd\nef\ngh", 64);
        buf.begin_line();
        assert_eq!(buf.take(3).unwrap(), "ab\n");
        buf.begin_line();
        // Less than half the buffer is consumed, so nothing is compacted yet.
        assert_eq!(buf.position(), 3);
        assert_eq!(buf.take(2).unwrap(), "cd");
        buf.rewind_line();
        assert_eq!(buf.take(3).unwrap(), "cd\n");

        buf.begin_line();
        assert_eq!(buf.take(3).unwrap(), "ef\n");
        buf.begin_line();
        assert_eq!(buf.position(), 0);
        assert_eq!(buf.line_len(), 0);
        assert_eq!(buf.take(2).unwrap(), "gh");
        buf.rewind_line();
        assert_eq!(buf.take(2).unwrap(), "gh");
    }

    #[test]
    fn test_bom_is_skipped_once() {
        let mut buf = buffer("\u{FEFF}id", 16);
        buf.skip_bom().unwrap();
        buf.begin_line();
        assert_eq!(buf.take(2).unwrap(), "id");
    }
}
