//! The text scanner.
//!
//! [`Scanner`] turns PostScript program text into objects, one token at a
//! time. Bytes 128 to 159 start binary tokens, which are handed to the
//! binary decoder.

use bitflags::bitflags;
use log::{debug, trace};
use smallvec::SmallVec;

use crate::array;
use crate::binary;
use crate::env::Environment;
use crate::error::{Error, ErrorKind, Result};
use crate::name::NameCache;
use crate::number;
use crate::object::{Attributes, Object};
use crate::reader::{ByteSource, Reader, is_eol, is_regular, is_whitespace};
use crate::string;

const INITIAL_BUFFER: usize = 128;

/// The buffer tokens are accumulated in.
pub(crate) type TokenBuffer = SmallVec<[u8; INITIAL_BUFFER]>;

bitflags! {
    /// Switches for optional scanner behaviour.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ScanFlags: u8 {
        /// Byte 0x04 (Control-D) ends the input.
        const CTRL_D_EOF = 1 << 0;
        /// Bytes 128 to 159 start binary tokens.
        const BINARY_TOKENS = 1 << 1;
        /// `<<` and `>>` are names regardless of the language level.
        const DICT_NAMES = 1 << 2;
    }
}

/// Settings for a [`Scanner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    /// The PostScript language level. Base-85 strings and the `<<` and `>>`
    /// names need level 2.
    pub language_level: u8,
    /// Optional behaviour.
    pub flags: ScanFlags,
    /// The deepest nesting of procedures.
    pub max_proc_depth: usize,
    /// The most elements a procedure may have.
    pub max_array_length: usize,
    /// The longest string and the longest token.
    pub max_string_length: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            language_level: 3,
            flags: ScanFlags::BINARY_TOKENS,
            max_proc_depth: 256,
            max_array_length: array::MAX_ARRAY_LENGTH,
            max_string_length: 0xffff,
        }
    }
}

enum Token {
    Object(Object),
    /// A `}` closing the procedure being scanned.
    ProcEnd,
    Eof,
}

/// A PostScript scanner.
///
/// The scanner itself only holds settings and a scratch buffer. Names are
/// interned into the [`NameCache`] passed to each call, and the
/// [`Environment`] provides dictionary lookups and allocation state.
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    settings: ScanSettings,
    buf: TokenBuffer,
}

impl Scanner {
    /// Create a new scanner.
    pub fn new(settings: ScanSettings) -> Self {
        Self {
            settings,
            buf: TokenBuffer::new(),
        }
    }

    /// The settings of the scanner.
    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Scan one object from `src`. Returns `None` at the end of the input.
    ///
    /// On success the source is positioned directly after the token. A
    /// whitespace byte ending the token is consumed, any other delimiter is
    /// left for the next call.
    pub fn scan<S: ByteSource + ?Sized>(
        &mut self,
        src: &mut S,
        names: &mut NameCache,
        env: &mut dyn Environment,
    ) -> Result<Option<Object>> {
        self.buf.clear();

        let result = match self.token(src, names, env, 0) {
            Ok(Token::Object(object)) => Ok(Some(object)),
            Ok(Token::Eof) => Ok(None),
            Ok(Token::ProcEnd) => Err(ErrorKind::SyntaxError.into()),
            Err(mut e) => {
                e.attach_token(&self.buf);
                Err(e)
            }
        };

        self.release();

        result
    }

    /// Scan one object from `data`, starting at `offset` with the line count
    /// `line`.
    ///
    /// Returns the object along with the offset and line count to continue
    /// from, or `None` at the end of the data.
    pub fn scan_bytes(
        &mut self,
        data: &[u8],
        offset: usize,
        line: i64,
        names: &mut NameCache,
        env: &mut dyn Environment,
    ) -> Result<Option<(Object, usize, i64)>> {
        let mut r = Reader::new_at(data, offset, line);
        let object = self.scan(&mut r, names, env)?;

        Ok(object.map(|object| (object, r.offset(), r.current_line())))
    }

    /// Iterate over the objects in `src`.
    pub fn tokens<'a, S: ByteSource + ?Sized>(
        &'a mut self,
        src: &'a mut S,
        names: &'a mut NameCache,
        env: &'a mut dyn Environment,
    ) -> Tokens<'a, S> {
        Tokens {
            scanner: self,
            src,
            names,
            env,
            done: false,
        }
    }

    fn release(&mut self) {
        self.buf.clear();

        if self.buf.spilled() {
            self.buf.shrink_to_fit();
        }
    }

    fn token<S: ByteSource + ?Sized>(
        &mut self,
        src: &mut S,
        names: &mut NameCache,
        env: &mut dyn Environment,
        depth: usize,
    ) -> Result<Token> {
        let Some(first) = self.skip_blanks(src, env)? else {
            return Ok(Token::Eof);
        };

        self.buf.clear();
        let limit = self.settings.max_string_length;

        let object = match first {
            b'(' => {
                trace!("literal string");
                string::scan_literal(src, &mut self.buf, limit)?;
                self.string_object(&*env)
            }
            b'<' => match src.next_byte()? {
                Some(b'<') if self.dict_names() => Object::name(names.intern(b"<<")?, true),
                Some(b'~') if self.settings.language_level >= 2 => {
                    trace!("base-85 string");
                    let data = string::scan_ascii85(src, &mut self.buf, limit)?;
                    Object::string(data, allocation(&*env))
                }
                Some(b) => {
                    trace!("hex string");
                    src.push_back(b);
                    string::scan_hex(src, &mut self.buf, limit)?;
                    self.string_object(&*env)
                }
                None => return Err(self.unexpected(first)),
            },
            b'>' => match src.next_byte()? {
                Some(b'>') if self.dict_names() => Object::name(names.intern(b">>")?, true),
                _ => return Err(self.unexpected(first)),
            },
            b'[' => Object::name(names.intern(b"[")?, true),
            b']' => Object::name(names.intern(b"]")?, true),
            b'{' => return self.procedure(src, names, env, depth + 1),
            b'}' if depth > 0 => return Ok(Token::ProcEnd),
            b'}' | b')' => return Err(self.unexpected(first)),
            b'/' => self.literal_name(src, names, &*env)?,
            0x80..=0x9f if self.settings.flags.contains(ScanFlags::BINARY_TOKENS) => {
                binary::read_token(first, src, names, &*env)?
            }
            _ => self.regular(first, src, names)?,
        };

        Ok(Token::Object(object))
    }

    /// Skip whitespace and comments. Returns the first byte of the next
    /// token.
    fn skip_blanks<S: ByteSource + ?Sized>(
        &mut self,
        src: &mut S,
        env: &mut dyn Environment,
    ) -> Result<Option<u8>> {
        loop {
            match src.next_byte()? {
                None => return Ok(None),
                Some(b'%') => self.comment(src, env)?,
                Some(0x04) if self.settings.flags.contains(ScanFlags::CTRL_D_EOF) => {
                    return Ok(None);
                }
                Some(b) if is_whitespace(b) => {}
                Some(b) => return Ok(Some(b)),
            }
        }
    }

    fn comment<S: ByteSource + ?Sized>(
        &mut self,
        src: &mut S,
        env: &mut dyn Environment,
    ) -> Result<()> {
        self.buf.clear();

        loop {
            match src.next_byte()? {
                None => break,
                Some(b) if is_eol(b) || b == 0x0c => break,
                Some(b) => {
                    // Overlong comments are passed on truncated.
                    if self.buf.len() < self.settings.max_string_length {
                        self.buf.push(b);
                    }
                }
            }
        }

        env.comment(&self.buf);
        self.buf.clear();

        Ok(())
    }

    fn procedure<S: ByteSource + ?Sized>(
        &mut self,
        src: &mut S,
        names: &mut NameCache,
        env: &mut dyn Environment,
        depth: usize,
    ) -> Result<Token> {
        if depth > self.settings.max_proc_depth {
            return Err(Error::with_message(
                ErrorKind::RangeCheck,
                "procedures nested too deeply",
            ));
        }

        trace!("procedure at depth {depth}");

        let mut elements = Vec::new();

        loop {
            match self.token(src, names, env, depth)? {
                Token::Object(object) => {
                    if elements.len() >= self.settings.max_array_length {
                        return Err(Error::with_message(
                            ErrorKind::RangeCheck,
                            "procedure has too many elements",
                        ));
                    }

                    elements.push(object);
                }
                Token::ProcEnd => break,
                Token::Eof => return Err(ErrorKind::SyntaxError.into()),
            }
        }

        self.buf.clear();

        array::build(elements, &*env, true).map(Token::Object)
    }

    fn literal_name<S: ByteSource + ?Sized>(
        &mut self,
        src: &mut S,
        names: &mut NameCache,
        env: &dyn Environment,
    ) -> Result<Object> {
        let immediate = match src.next_byte()? {
            Some(b'/') => true,
            Some(b) => {
                src.push_back(b);
                false
            }
            None => false,
        };

        self.read_regular(src)?;
        let name = names.intern(&self.buf)?;

        if immediate {
            trace!("immediately evaluated name {name:?}");
            return env.load(&name).ok_or_else(|| ErrorKind::Undefined.into());
        }

        Ok(Object::name(name, false))
    }

    fn regular<S: ByteSource + ?Sized>(
        &mut self,
        first: u8,
        src: &mut S,
        names: &mut NameCache,
    ) -> Result<Object> {
        self.buf.push(first);
        self.read_regular(src)?;

        if let Some(number) = number::parse(&self.buf)? {
            trace!("number {number:?}");
            return Ok(Object::from(number));
        }

        if matches!(first, b'0'..=b'9' | b'+' | b'-' | b'.') {
            debug!(
                "{} is not a number, scanning it as a name",
                String::from_utf8_lossy(&self.buf)
            );
        }

        Ok(Object::name(names.intern(&self.buf)?, true))
    }

    /// Append regular characters to the buffer until the token ends.
    fn read_regular<S: ByteSource + ?Sized>(&mut self, src: &mut S) -> Result<()> {
        loop {
            match src.next_byte()? {
                None => return Ok(()),
                Some(b) if is_regular(b) => {
                    if self.buf.len() >= self.settings.max_string_length {
                        return Err(ErrorKind::LimitCheck.into());
                    }

                    self.buf.push(b);
                }
                Some(b) if is_whitespace(b) => return Ok(()),
                Some(b) => {
                    src.push_back(b);
                    return Ok(());
                }
            }
        }
    }

    fn string_object(&self, env: &dyn Environment) -> Object {
        Object::string(&self.buf[..], allocation(env))
    }

    fn dict_names(&self) -> bool {
        self.settings.language_level >= 2 || self.settings.flags.contains(ScanFlags::DICT_NAMES)
    }

    fn unexpected(&mut self, byte: u8) -> Error {
        self.buf.clear();
        self.buf.push(byte);
        ErrorKind::SyntaxError.into()
    }
}

fn allocation(env: &dyn Environment) -> Attributes {
    Attributes::allocated(env.allocation(), env.save_level())
}

/// An iterator over the objects of a source, created by
/// [`Scanner::tokens`].
///
/// Iteration stops after the first error.
pub struct Tokens<'a, S: ?Sized> {
    scanner: &'a mut Scanner,
    src: &'a mut S,
    names: &'a mut NameCache,
    env: &'a mut dyn Environment,
    done: bool,
}

impl<S: ByteSource + ?Sized> Iterator for Tokens<'_, S> {
    type Item = Result<Object>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.scanner.scan(self.src, self.names, self.env) {
            Ok(Some(object)) => Some(Ok(object)),
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
