//! The binary encoding of PostScript objects.
//!
//! A binary object sequence starts with one of the tokens 128 to 131,
//! which also selects the byte order and the representation of reals.
//! It is followed by a header, a block of fixed size object records and a
//! string area at the end of the sequence:
//!
//! ```text
//! +--------+------------------------+---------------+----------------+
//! | header | top level records      | nested arrays | string data    |
//! +--------+------------------------+---------------+----------------+
//!          ^ offset 0 of the payload                                 ^
//! ```
//!
//! Offsets inside records are relative to the start of the payload, i.e.
//! the first byte after the header. Nested array records grow upwards from
//! the top level records, string data grows downwards from the end.
//!
//! Tokens 132 to 149 encode single numbers, strings and names, as well as
//! homogeneous number arrays. See [`decode_token`].

mod decode;
mod encode;
mod header;
mod number_array;
mod token;

pub use decode::decode_sequence;
pub use encode::Encoder;
pub use header::Header;
pub use number_array::{NumberFormat, NumberRepresentation, decode_number_array, encode_number_array};
pub use token::decode_token;

pub(crate) use token::read_token;

use crate::error::{Error, ErrorKind, Result};

/// The deepest nesting of arrays a binary object sequence may have.
pub const MAX_NESTING_DEPTH: usize = 256;

/// The size of one object record.
pub(crate) const RECORD_SIZE: usize = 8;

/// The byte order of multi-byte values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Most significant byte first.
    BigEndian,
    /// Least significant byte first.
    LittleEndian,
}

impl ByteOrder {
    /// The byte order of the machine.
    pub const NATIVE: Self = if cfg!(target_endian = "big") {
        Self::BigEndian
    } else {
        Self::LittleEndian
    };

    pub(crate) fn u16(self, bytes: [u8; 2]) -> u16 {
        match self {
            Self::BigEndian => u16::from_be_bytes(bytes),
            Self::LittleEndian => u16::from_le_bytes(bytes),
        }
    }

    pub(crate) fn u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            Self::BigEndian => u32::from_be_bytes(bytes),
            Self::LittleEndian => u32::from_le_bytes(bytes),
        }
    }

    pub(crate) fn u16_bytes(self, v: u16) -> [u8; 2] {
        match self {
            Self::BigEndian => v.to_be_bytes(),
            Self::LittleEndian => v.to_le_bytes(),
        }
    }

    pub(crate) fn u32_bytes(self, v: u32) -> [u8; 4] {
        match self {
            Self::BigEndian => v.to_be_bytes(),
            Self::LittleEndian => v.to_le_bytes(),
        }
    }
}

/// How reals are represented in a binary object sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RealFormat {
    /// IEEE 754 single precision.
    Ieee,
    /// The machine's native representation. When encoding, reals that can
    /// be represented exactly as a fixed point number are written that way.
    Native,
}

/// The format of a binary object sequence, as selected by its token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BinaryFormat {
    /// The byte order of numbers and record fields.
    pub byte_order: ByteOrder,
    /// The representation of reals.
    pub reals: RealFormat,
}

impl BinaryFormat {
    /// Big-endian IEEE reals, token 128.
    pub const BIG_ENDIAN_IEEE: Self = Self::new(ByteOrder::BigEndian, RealFormat::Ieee);
    /// Little-endian IEEE reals, token 129.
    pub const LITTLE_ENDIAN_IEEE: Self = Self::new(ByteOrder::LittleEndian, RealFormat::Ieee);
    /// Big-endian native reals, token 130.
    pub const BIG_ENDIAN_NATIVE: Self = Self::new(ByteOrder::BigEndian, RealFormat::Native);
    /// Little-endian native reals, token 131.
    pub const LITTLE_ENDIAN_NATIVE: Self = Self::new(ByteOrder::LittleEndian, RealFormat::Native);

    /// Create a new format.
    pub const fn new(byte_order: ByteOrder, reals: RealFormat) -> Self {
        Self { byte_order, reals }
    }

    /// The format selected by a binary object sequence token.
    pub fn from_token(token: u8) -> Option<Self> {
        match token {
            128 => Some(Self::BIG_ENDIAN_IEEE),
            129 => Some(Self::LITTLE_ENDIAN_IEEE),
            130 => Some(Self::BIG_ENDIAN_NATIVE),
            131 => Some(Self::LITTLE_ENDIAN_NATIVE),
            _ => None,
        }
    }

    /// The token that introduces a sequence in this format.
    pub fn token(self) -> u8 {
        let order = match self.byte_order {
            ByteOrder::BigEndian => 0,
            ByteOrder::LittleEndian => 1,
        };

        let reals = match self.reals {
            RealFormat::Ieee => 0,
            RealFormat::Native => 2,
        };

        128 + order + reals
    }
}

/// The type tag of an object record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum RecordType {
    Null = 0,
    Integer = 1,
    Real = 2,
    Name = 3,
    Boolean = 4,
    String = 5,
    ImmediateName = 6,
    Array = 9,
    Mark = 10,
}

impl TryFrom<u8> for RecordType {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self> {
        Ok(match tag {
            0 => Self::Null,
            1 => Self::Integer,
            2 => Self::Real,
            3 => Self::Name,
            4 => Self::Boolean,
            5 => Self::String,
            6 => Self::ImmediateName,
            9 => Self::Array,
            10 => Self::Mark,
            _ => {
                return Err(Error::binary(
                    ErrorKind::SyntaxError,
                    tag,
                    0,
                    0,
                    "unknown object type",
                ));
            }
        })
    }
}

/// Set in the type byte of executable objects.
pub(crate) const EXECUTABLE_BIT: u8 = 0x80;

/// Name records with this length refer to the system name table.
pub(crate) const SYSTEM_NAME_LENGTH: u16 = 0xffff;

/// The scale of a fixed point number, or `None` for the format's real
/// representation.
pub(crate) fn fixed_point_scale(len: u16) -> Result<Option<u32>> {
    match len {
        0 => Ok(None),
        1..=31 => Ok(Some(u32::from(len))),
        _ => Err(Error::binary(
            ErrorKind::RangeCheck,
            RecordType::Real as u8,
            u32::from(len),
            0,
            "bad fixed point scale",
        )),
    }
}

/// Convert a fixed point number with the given scale.
pub(crate) fn from_fixed(mantissa: i32, scale: u32) -> f64 {
    f64::from(mantissa) / f64::from(1_u32 << scale)
}

/// Find the smallest scale at which `v` is an exact 32-bit fixed point
/// number.
pub(crate) fn to_fixed(v: f32) -> Option<(i32, u32)> {
    if v == 0.0 || !v.is_finite() {
        return None;
    }

    for scale in 1..=31 {
        let scaled = f64::from(v) * f64::from(1_u32 << scale);

        if scaled.abs() > f64::from(i32::MAX) {
            return None;
        }

        if scaled.fract() == 0.0 {
            return Some((scaled as i32, scale));
        }
    }

    None
}

/// Check that a decoded real is a number.
pub(crate) fn finite(v: f32) -> Result<f32> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(ErrorKind::UndefinedResult.into())
    }
}
