//! Byte sources the scanner reads from.

use std::io::{BufRead, BufReader, Read};

use crate::error::Result;

/// A source of bytes with a single byte of pushback.
///
/// Sources keep track of the current line. The line count is signed: a
/// negative value means that the last byte consumed was a carriage return,
/// so an immediately following line feed must not be counted again.
pub trait ByteSource {
    /// Read the next byte, or `None` at the end of the input.
    fn next_byte(&mut self) -> Result<Option<u8>>;

    /// Un-read `byte`, which must be the byte last returned by
    /// [`ByteSource::next_byte`].
    fn push_back(&mut self, byte: u8);

    /// The current line count, in its signed encoding.
    fn current_line(&self) -> i64;
}

/// Line accounting that counts CR, LF and CR-LF exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineCount {
    line: i64,
    prev: i64,
}

impl LineCount {
    /// Start counting at `line` (in the signed encoding).
    pub fn new(line: i64) -> Self {
        Self { line, prev: line }
    }

    /// The line number, with the pending carriage-return state stripped.
    pub fn line(&self) -> i64 {
        self.line.abs()
    }

    /// The raw, signed line count.
    pub fn raw(&self) -> i64 {
        self.line
    }

    pub(crate) fn advance(&mut self, byte: u8) {
        self.prev = self.line;

        self.line = match byte {
            b'\r' => -(self.line.abs() + 1),
            // A line feed that directly follows a carriage return is
            // part of the same line break.
            b'\n' if self.line < 0 => -self.line,
            b'\n' => self.line + 1,
            _ => self.line.abs(),
        };
    }

    pub(crate) fn retreat(&mut self) {
        self.line = self.prev;
    }
}

impl Default for LineCount {
    fn default() -> Self {
        Self::new(1)
    }
}

/// A byte source over an in-memory buffer.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
    lines: LineCount,
}

impl<'a> Reader<'a> {
    /// Create a new reader at the start of `data`.
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self::new_at(data, 0, 1)
    }

    /// Create a new reader at `offset`, with the line count `line`.
    #[inline]
    pub fn new_at(data: &'a [u8], offset: usize, line: i64) -> Self {
        Self {
            data,
            offset,
            lines: LineCount::new(line),
        }
    }

    /// The current byte offset.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether all data has been consumed.
    #[inline]
    pub fn at_end(&self) -> bool {
        self.offset >= self.data.len()
    }

    #[inline]
    pub(crate) fn read_byte(&mut self) -> Option<u8> {
        let b = self.data.get(self.offset).copied()?;
        self.offset += 1;
        self.lines.advance(b);
        Some(b)
    }
}

impl ByteSource for Reader<'_> {
    #[inline]
    fn next_byte(&mut self) -> Result<Option<u8>> {
        Ok(self.read_byte())
    }

    #[inline]
    fn push_back(&mut self, byte: u8) {
        debug_assert!(self.offset > 0, "push back at start of data");
        debug_assert_eq!(self.data.get(self.offset - 1), Some(&byte));

        self.offset -= 1;
        self.lines.retreat();
    }

    fn current_line(&self) -> i64 {
        self.lines.raw()
    }
}

/// A byte source over anything implementing [`Read`], such as a file.
#[derive(Debug)]
pub struct IoSource<R> {
    inner: BufReader<R>,
    pushed: Option<u8>,
    lines: LineCount,
}

impl<R: Read> IoSource<R> {
    /// Wrap `inner` in a buffered byte source.
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            pushed: None,
            lines: LineCount::default(),
        }
    }

    /// Unwrap the underlying reader. Buffered bytes are lost.
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

impl<R: Read> ByteSource for IoSource<R> {
    fn next_byte(&mut self) -> Result<Option<u8>> {
        let b = match self.pushed.take() {
            Some(b) => b,
            None => {
                let buf = self.inner.fill_buf()?;
                let Some(&b) = buf.first() else {
                    return Ok(None);
                };
                self.inner.consume(1);
                b
            }
        };

        self.lines.advance(b);
        Ok(Some(b))
    }

    fn push_back(&mut self, byte: u8) {
        debug_assert!(self.pushed.is_none(), "only one byte of push back");

        self.pushed = Some(byte);
        self.lines.retreat();
    }

    fn current_line(&self) -> i64 {
        self.lines.raw()
    }
}

#[inline(always)]
pub(crate) fn is_whitespace(b: u8) -> bool {
    matches!(b, 0x00 | 0x09 | 0x0a | 0x0c | 0x0d | 0x20)
}

#[inline(always)]
pub(crate) fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

#[inline(always)]
pub(crate) fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

#[inline(always)]
pub(crate) fn is_eol(b: u8) -> bool {
    matches!(b, 0x0a | 0x0d)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(src: &mut impl ByteSource) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(b) = src.next_byte().unwrap() {
            out.push(b);
        }
        out
    }

    #[test]
    fn counts_each_line_break_once() {
        let mut r = Reader::new(b"a\nb\rc\r\nd");
        drain(&mut r);
        assert_eq!(r.current_line(), 4);
    }

    #[test]
    fn carriage_return_is_provisional() {
        let mut r = Reader::new(b"a\r\n");
        r.next_byte().unwrap();
        r.next_byte().unwrap();
        assert_eq!(r.current_line(), -2);
        r.next_byte().unwrap();
        assert_eq!(r.current_line(), 2);
    }

    #[test]
    fn push_back_restores_line() {
        let mut r = Reader::new(b"\nx");
        assert_eq!(r.next_byte().unwrap(), Some(b'\n'));
        assert_eq!(r.current_line(), 2);
        r.push_back(b'\n');
        assert_eq!(r.current_line(), 1);
        assert_eq!(r.offset(), 0);
    }

    #[test]
    fn resume_after_carriage_return() {
        let data = b"a\r\nb";
        let mut r = Reader::new(data);
        r.next_byte().unwrap();
        r.next_byte().unwrap();

        let mut resumed = Reader::new_at(data, r.offset(), r.current_line());
        drain(&mut resumed);
        assert_eq!(resumed.current_line(), 2);
    }

    #[test]
    fn io_source() {
        let mut src = IoSource::new(&b"ab\ncd"[..]);
        assert_eq!(src.next_byte().unwrap(), Some(b'a'));
        src.push_back(b'a');
        assert_eq!(drain(&mut src), b"ab\ncd");
        assert_eq!(src.current_line(), 2);
    }

    #[test]
    fn character_classes() {
        assert!(is_whitespace(b'\t'));
        assert!(is_delimiter(b'{'));
        assert!(is_regular(b'a'));
        assert!(!is_regular(b'%'));
        assert!(is_eol(b'\r'));
    }
}
