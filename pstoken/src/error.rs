//! Error types for the scanner and the binary object codec.

use core::fmt;

/// A specialized [`Result`] type for scanner and codec operations.
pub type Result<T> = core::result::Result<T, Error>;

/// The number of bytes of a partially scanned token kept for diagnostics.
pub const TOKEN_DETAIL_LENGTH: usize = 128;

/// The PostScript error class of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed token, premature end of input or a misplaced delimiter.
    SyntaxError,
    /// A name, string or array was too long, or a numeric literal
    /// exceeded what can be represented.
    LimitCheck,
    /// A structural violation, mostly in binary encodings.
    RangeCheck,
    /// A NaN or infinity was encountered where it is not allowed.
    UndefinedResult,
    /// A name could not be resolved.
    Undefined,
    /// A local composite was about to be stored in a global one, or a
    /// composite without read access was about to be serialized.
    InvalidAccess,
    /// An allocation failed.
    VmError,
    /// The byte source reported an error.
    IoError,
    /// An object of the wrong type was supplied.
    TypeCheck,
}

impl ErrorKind {
    /// The PostScript name of the error.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SyntaxError => "syntaxerror",
            Self::LimitCheck => "limitcheck",
            Self::RangeCheck => "rangecheck",
            Self::UndefinedResult => "undefinedresult",
            Self::Undefined => "undefined",
            Self::InvalidAccess => "invalidaccess",
            Self::VmError => "VMerror",
            Self::IoError => "ioerror",
            Self::TypeCheck => "typecheck",
        }
    }
}

/// Additional diagnostic information attached to an [`Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detail {
    /// The leading bytes of the token that was being scanned.
    Token(Vec<u8>),
    /// Describes the binary object record that failed to decode.
    Binary {
        /// The type tag of the offending record.
        type_code: u8,
        /// The element count or length field of the record.
        count: u32,
        /// The total size of the payload that was being decoded.
        size: u32,
        /// What was wrong with the record.
        reason: &'static str,
    },
    /// A free-form message.
    Message(String),
}

/// An error encountered while scanning text or decoding binary objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    detail: Option<Detail>,
}

impl Error {
    /// Create a new error without detail.
    pub const fn new(kind: ErrorKind) -> Self {
        Self { kind, detail: None }
    }

    /// Create a new error carrying some detail.
    pub fn with_detail(kind: ErrorKind, detail: Detail) -> Self {
        Self {
            kind,
            detail: Some(detail),
        }
    }

    /// Create an error carrying a message.
    pub fn with_message(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self::with_detail(kind, Detail::Message(msg.into()))
    }

    /// Create an error describing a malformed binary object record.
    pub(crate) fn binary(
        kind: ErrorKind,
        type_code: u8,
        count: u32,
        size: usize,
        reason: &'static str,
    ) -> Self {
        Self::with_detail(
            kind,
            Detail::Binary {
                type_code,
                count,
                size: u32::try_from(size).unwrap_or(u32::MAX),
                reason,
            },
        )
    }

    /// The class of the error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The attached diagnostic detail, if any.
    pub fn detail(&self) -> Option<&Detail> {
        self.detail.as_ref()
    }

    /// Attach the leading bytes of a partially scanned token, unless some
    /// more specific detail is already present.
    pub(crate) fn attach_token(&mut self, token: &[u8]) {
        if self.detail.is_none() && !token.is_empty() {
            let len = token.len().min(TOKEN_DETAIL_LENGTH);
            self.detail = Some(Detail::Token(token[..len].to_vec()));
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::with_detail(ErrorKind::IoError, Detail::Message(err.to_string()))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.as_str())?;

        match &self.detail {
            None => Ok(()),
            Some(Detail::Token(token)) => {
                write!(f, " in --{}--", String::from_utf8_lossy(token))
            }
            Some(Detail::Binary {
                type_code,
                count,
                size,
                reason,
            }) => write!(
                f,
                " in binary object (type {type_code}, count {count}, size {size}): {reason}"
            ),
            Some(Detail::Message(msg)) => write!(f, ": {msg}"),
        }
    }
}

impl core::error::Error for Error {}
