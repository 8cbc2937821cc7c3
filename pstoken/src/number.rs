//! Numbers and the numeric literal grammar.

use log::debug;

use crate::error::{ErrorKind, Result};

/// A real number with an optional precision extension.
///
/// `value` is the nearest 32-bit float. `extension` holds the remaining
/// difference to an exact value in units of 2^-16 of the float's unit in
/// the last place. It is zero when the difference cannot be represented
/// that way.
///
/// The scanner and the binary decoders produce reals without extension,
/// since the binary encoding can only carry the 32-bit value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Real {
    value: f32,
    extension: i16,
}

impl Real {
    /// A real without extension.
    pub const fn new(value: f32) -> Self {
        Self {
            value,
            extension: 0,
        }
    }

    /// A real with an explicit extension.
    pub const fn with_extension(value: f32, extension: i16) -> Self {
        Self { value, extension }
    }

    /// The closest 32-bit real to `value`, extended by the rounding error.
    pub fn from_f64(value: f64) -> Self {
        let rounded = value as f32;

        let extension = match ulp(rounded) {
            Some(ulp) => {
                let scaled = ((value - rounded as f64) / ulp * 65536.0).round();
                // Fall back to the plain float when the correction does not
                // fit into 16 bits.
                if scaled >= i16::MIN as f64 && scaled <= i16::MAX as f64 {
                    scaled as i16
                } else {
                    0
                }
            }
            None => 0,
        };

        Self {
            value: rounded,
            extension,
        }
    }

    /// The 32-bit value.
    pub fn value(self) -> f32 {
        self.value
    }

    /// The precision extension.
    pub fn extension(self) -> i16 {
        self.extension
    }

    /// The value including the extension.
    pub fn as_f64(self) -> f64 {
        match ulp(self.value) {
            Some(ulp) if self.extension != 0 => {
                self.value as f64 + self.extension as f64 * ulp / 65536.0
            }
            _ => self.value as f64,
        }
    }
}

/// The unit in the last place of a normal, finite, non-zero `f32`.
fn ulp(v: f32) -> Option<f64> {
    let exponent = (v.to_bits() >> 23) & 0xff;

    if exponent == 0 || exponent == 0xff {
        return None;
    }

    // 2^(exponent - 127 - 23), built directly as an f64.
    let biased = u64::from(exponent) + 1023 - 150;
    Some(f64::from_bits(biased << 52))
}

/// A PostScript number object (integer or real).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// An integer.
    Integer(i32),
    /// A real.
    Real(Real),
}

impl Number {
    /// Return the value as an `i32`. Reals are truncated.
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Integer(v) => v,
            Self::Real(v) => v.value as i32,
        }
    }

    /// Return the value as an `f32`.
    pub fn as_f32(self) -> f32 {
        match self {
            Self::Integer(v) => v as f32,
            Self::Real(v) => v.value,
        }
    }

    /// Return the value as an `f64`.
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Integer(v) => v as f64,
            Self::Real(v) => v.as_f64(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Start,
    Sign,
    Integer,
    /// A `.` with no digits before it.
    Dot,
    Fraction,
    Exponent,
    ExponentSign,
    ExponentDigits,
    Radix,
}

/// Interpret a complete regular token as a number.
///
/// Returns `Ok(None)` if the token is not a number, in which case it is a
/// name.
pub(crate) fn parse(token: &[u8]) -> Result<Option<Number>> {
    let mut state = State::Start;
    let mut negative = false;
    // Magnitude of the integer part, saturating just past the i32 range.
    let mut int_value = 0_i64;
    let mut overflow = false;
    let mut radix_start = 0;

    for (i, &b) in token.iter().enumerate() {
        state = match (state, b) {
            (State::Start, b'+' | b'-') => {
                negative = b == b'-';
                State::Sign
            }
            (State::Start | State::Sign | State::Integer, b'0'..=b'9') => {
                if !overflow {
                    int_value = int_value * 10 + i64::from(b - b'0');
                    overflow = int_value > i64::from(i32::MAX) + 1;
                }
                State::Integer
            }
            (State::Start | State::Sign, b'.') => State::Dot,
            (State::Integer, b'.') => State::Fraction,
            (State::Dot | State::Fraction, b'0'..=b'9') => State::Fraction,
            (State::Integer | State::Fraction, b'e' | b'E') => State::Exponent,
            (State::Exponent, b'+' | b'-') => State::ExponentSign,
            (State::Exponent | State::ExponentSign | State::ExponentDigits, b'0'..=b'9') => {
                State::ExponentDigits
            }
            // The base may not carry a sign.
            (State::Integer, b'#') if token[0] != b'+' && token[0] != b'-' => {
                radix_start = i + 1;
                State::Radix
            }
            (State::Radix, _) => break,
            _ => {
                debug!(
                    "token {:?} is not a number",
                    String::from_utf8_lossy(token)
                );
                return Ok(None);
            }
        };
    }

    match state {
        State::Integer if !overflow => {
            let v = if negative { -int_value } else { int_value };

            match i32::try_from(v) {
                Ok(v) => Ok(Some(Number::Integer(v))),
                // +2147483648
                Err(_) => real(token).map(Some),
            }
        }
        State::Integer | State::Fraction | State::ExponentDigits => real(token).map(Some),
        State::Radix if !overflow => radix(int_value, &token[radix_start..]),
        _ => Ok(None),
    }
}

fn real(token: &[u8]) -> Result<Number> {
    // The token only contains ASCII at this point.
    let text = core::str::from_utf8(token).map_err(|_| ErrorKind::SyntaxError)?;
    let value = text.parse::<f64>().map_err(|_| ErrorKind::SyntaxError)?;

    // Beyond the 32-bit range the scanned value is infinite.
    if !(value as f32).is_finite() {
        debug!("real {text} is out of range");
        return Ok(Number::Real(Real::new(value.signum() as f32 * f32::INFINITY)));
    }

    Ok(Number::Real(Real::new(value as f32)))
}

fn radix(base: i64, digits: &[u8]) -> Result<Option<Number>> {
    if !(2..=36).contains(&base) || digits.is_empty() {
        return Ok(None);
    }

    let mut value = 0_u64;

    for &b in digits {
        let Some(d) = char::from(b).to_digit(base as u32) else {
            return Ok(None);
        };

        value = value * base as u64 + u64::from(d);

        if value > u64::from(u32::MAX) {
            return Err(ErrorKind::LimitCheck.into());
        }
    }

    Ok(Some(Number::Integer(value as u32 as i32)))
}
