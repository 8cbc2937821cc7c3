use crate::binary::{ByteOrder, finite, from_fixed};
use crate::error::{Error, ErrorKind, Result};
use crate::number::{Number, Real};

/// The token of a homogeneous number array with a 16-bit element count.
pub(crate) const NUMBER_ARRAY: u8 = 149;
/// The token of a homogeneous number array with a 32-bit byte length.
pub(crate) const LONG_NUMBER_ARRAY: u8 = 150;

/// How each element of a homogeneous number array is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberRepresentation {
    /// A 32-bit fixed point number with the given scale. A scale of zero
    /// denotes integers.
    Fixed32(u8),
    /// A 16-bit fixed point number with the given scale.
    Fixed16(u8),
    /// An IEEE single precision real.
    Ieee,
    /// A native real.
    Native,
}

/// The representation byte of a number array: element encoding plus byte
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat {
    /// The element encoding.
    pub representation: NumberRepresentation,
    /// The byte order of elements and of the array header.
    pub byte_order: ByteOrder,
}

impl NumberFormat {
    /// Create a new format.
    pub const fn new(representation: NumberRepresentation, byte_order: ByteOrder) -> Self {
        Self {
            representation,
            byte_order,
        }
    }

    /// Interpret a representation byte.
    pub fn from_byte(r: u8) -> Option<Self> {
        let byte_order = if r & 0x80 != 0 {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        };

        let representation = match r & 0x7f {
            scale @ 0..=31 => NumberRepresentation::Fixed32(scale),
            r @ 32..=47 => NumberRepresentation::Fixed16(r - 32),
            48 => NumberRepresentation::Ieee,
            49 => NumberRepresentation::Native,
            _ => return None,
        };

        Some(Self::new(representation, byte_order))
    }

    /// The representation byte.
    pub fn to_byte(self) -> u8 {
        let r = match self.representation {
            NumberRepresentation::Fixed32(scale) => scale.min(31),
            NumberRepresentation::Fixed16(scale) => 32 + scale.min(15),
            NumberRepresentation::Ieee => 48,
            NumberRepresentation::Native => 49,
        };

        match self.byte_order {
            ByteOrder::BigEndian => r,
            ByteOrder::LittleEndian => r | 0x80,
        }
    }

    /// The size of one element in bytes.
    pub fn element_size(self) -> usize {
        match self.representation {
            NumberRepresentation::Fixed16(_) => 2,
            _ => 4,
        }
    }

    /// Decode one element from exactly [`element_size`](Self::element_size)
    /// bytes.
    pub(crate) fn read(self, bytes: &[u8]) -> Result<Number> {
        let order = self.byte_order;

        let fixed = |mantissa: i32, scale: u8| {
            if scale == 0 {
                Number::Integer(mantissa)
            } else {
                Number::Real(Real::new(from_fixed(mantissa, u32::from(scale)) as f32))
            }
        };

        Ok(match (self.representation, bytes) {
            (NumberRepresentation::Fixed16(scale), &[b0, b1]) => {
                fixed(i32::from(order.u16([b0, b1]) as i16), scale)
            }
            (NumberRepresentation::Fixed32(scale), &[b0, b1, b2, b3]) => {
                fixed(order.u32([b0, b1, b2, b3]) as i32, scale)
            }
            (
                NumberRepresentation::Ieee | NumberRepresentation::Native,
                &[b0, b1, b2, b3],
            ) => {
                let v = f32::from_bits(order.u32([b0, b1, b2, b3]));
                Number::Real(Real::new(finite(v)?))
            }
            _ => return Err(ErrorKind::SyntaxError.into()),
        })
    }

    /// Append the encoding of `n` to `out`.
    fn write(self, n: Number, out: &mut Vec<u8>) -> Result<()> {
        let order = self.byte_order;

        match self.representation {
            NumberRepresentation::Fixed32(scale) => {
                let mantissa = scaled(n, scale, f64::from(i32::MIN), f64::from(i32::MAX))?;
                out.extend_from_slice(&order.u32_bytes(mantissa as i32 as u32));
            }
            NumberRepresentation::Fixed16(scale) => {
                let mantissa = scaled(n, scale, f64::from(i16::MIN), f64::from(i16::MAX))?;
                out.extend_from_slice(&order.u16_bytes(mantissa as i16 as u16));
            }
            NumberRepresentation::Ieee | NumberRepresentation::Native => {
                let v = finite(n.as_f32())?;
                out.extend_from_slice(&order.u32_bytes(v.to_bits()));
            }
        }

        Ok(())
    }
}

fn scaled(n: Number, scale: u8, min: f64, max: f64) -> Result<f64> {
    let v = (n.as_f64() * f64::from(1_u32 << scale.min(31))).round();

    if v.is_nan() {
        return Err(ErrorKind::UndefinedResult.into());
    }

    if v < min || v > max {
        return Err(Error::with_message(
            ErrorKind::RangeCheck,
            "number does not fit the fixed point representation",
        ));
    }

    Ok(v)
}

/// Decode the elements of a homogeneous number array.
///
/// `data` must hold a whole number of elements.
pub fn decode_number_array(format: NumberFormat, data: &[u8]) -> Result<Vec<Number>> {
    let size = format.element_size();

    if data.len() % size != 0 {
        return Err(Error::with_message(
            ErrorKind::RangeCheck,
            "number array length is not a multiple of the element size",
        ));
    }

    data.chunks_exact(size).map(|b| format.read(b)).collect()
}

/// Encode `values` as a complete homogeneous number array token.
///
/// Arrays of up to 65535 elements use the short form, longer ones the form
/// with a 32-bit byte length.
pub fn encode_number_array(values: &[Number], format: NumberFormat) -> Result<Vec<u8>> {
    let order = format.byte_order;
    let byte_len = values.len() * format.element_size();
    let mut out = Vec::with_capacity(byte_len + 6);

    match u16::try_from(values.len()) {
        Ok(count) => {
            out.extend_from_slice(&[NUMBER_ARRAY, format.to_byte()]);
            out.extend_from_slice(&order.u16_bytes(count));
        }
        Err(_) => {
            let byte_len = u32::try_from(byte_len)
                .map_err(|_| Error::with_message(ErrorKind::LimitCheck, "number array too long"))?;
            out.extend_from_slice(&[LONG_NUMBER_ARRAY, format.to_byte()]);
            out.extend_from_slice(&order.u32_bytes(byte_len));
        }
    }

    for &v in values {
        format.write(v, &mut out)?;
    }

    Ok(out)
}
