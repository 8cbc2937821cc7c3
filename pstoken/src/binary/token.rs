use log::trace;

use crate::array;
use crate::binary::decode::decode_payload;
use crate::binary::number_array::{LONG_NUMBER_ARRAY, NUMBER_ARRAY};
use crate::binary::{Header, NumberFormat, decode_number_array, finite};
use crate::env::Environment;
use crate::error::{Error, ErrorKind, Result};
use crate::name::NameCache;
use crate::number::Real;
use crate::object::{Attributes, Object};
use crate::reader::{ByteSource, Reader};

/// Decode one binary token from the start of `data`.
///
/// Returns the object and the number of bytes the token occupied. Binary
/// object sequences decode to an executable array of their top level
/// objects.
pub fn decode_token(
    data: &[u8],
    names: &mut NameCache,
    env: &dyn Environment,
) -> Result<(Object, usize)> {
    let mut r = Reader::new(data);
    let token = r.next_byte()?.ok_or(ErrorKind::SyntaxError)?;

    if !(128..=159).contains(&token) {
        return Err(ErrorKind::SyntaxError.into());
    }

    let object = read_token(token, &mut r, names, env)?;

    Ok((object, r.offset()))
}

/// Read the rest of the binary token introduced by `token`.
pub(crate) fn read_token<S: ByteSource + ?Sized>(
    token: u8,
    src: &mut S,
    names: &mut NameCache,
    env: &dyn Environment,
) -> Result<Object> {
    trace!("binary token {token}");

    Ok(match token {
        128..=131 => return read_sequence(token, src, names, env),
        132 => Object::integer(i32::from_be_bytes(take(src)?)),
        133 => Object::integer(i32::from_le_bytes(take(src)?)),
        134 => Object::integer(i32::from(i16::from_be_bytes(take(src)?))),
        135 => Object::integer(i32::from(i16::from_le_bytes(take(src)?))),
        136 => Object::integer(i32::from(byte(src)? as i8)),
        137 => {
            let r = byte(src)?;
            let format = representation(r)?;
            let bytes = take_vec(src, format.element_size())?;
            Object::from(format.read(&bytes)?)
        }
        138 => real(f32::from_be_bytes(take(src)?))?,
        139 => real(f32::from_le_bytes(take(src)?))?,
        140 => real(f32::from_ne_bytes(take(src)?))?,
        141 => match byte(src)? {
            0 => Object::boolean(false),
            1 => Object::boolean(true),
            _ => return Err(Error::with_message(ErrorKind::RangeCheck, "bad boolean")),
        },
        142 => {
            let len = byte(src)?;
            string(src, usize::from(len), env)?
        }
        143 => {
            let len = u16::from_be_bytes(take(src)?);
            string(src, usize::from(len), env)?
        }
        144 => {
            let len = u16::from_le_bytes(take(src)?);
            string(src, usize::from(len), env)?
        }
        145 | 146 => {
            let index = byte(src)?;
            let name = names.system_name(usize::from(index)).ok_or_else(|| {
                Error::with_message(ErrorKind::Undefined, format!("system name {index}"))
            })?;

            Object::name(name, token == 146)
        }
        147 | 148 => {
            let index = byte(src)?;

            return Err(Error::with_message(
                ErrorKind::Undefined,
                format!("user name {index}"),
            ));
        }
        NUMBER_ARRAY => {
            let r = byte(src)?;
            let format = representation(r)?;
            let count = usize::from(format.byte_order.u16(take(src)?));
            number_array(src, format, count * format.element_size(), env)?
        }
        LONG_NUMBER_ARRAY => {
            let r = byte(src)?;
            let format = representation(r)?;
            let len = format.byte_order.u32(take(src)?) as usize;
            number_array(src, format, len, env)?
        }
        _ => return Err(ErrorKind::SyntaxError.into()),
    })
}

fn read_sequence<S: ByteSource + ?Sized>(
    token: u8,
    src: &mut S,
    names: &mut NameCache,
    env: &dyn Environment,
) -> Result<Object> {
    let count = byte(src)?;

    let mut raw = vec![token, count];
    if count == 0 {
        raw.extend_from_slice(&take::<_, 6>(src)?);
    } else {
        raw.extend_from_slice(&take::<_, 2>(src)?);
    }

    let header = Header::parse(&raw)?;
    let payload = take_vec(src, header.payload_len())?;

    decode_payload(&header, &payload, names, env)
}

fn representation(r: u8) -> Result<NumberFormat> {
    NumberFormat::from_byte(r)
        .ok_or_else(|| Error::with_message(ErrorKind::RangeCheck, "bad number representation"))
}

fn real(v: f32) -> Result<Object> {
    Ok(Object::real(Real::new(finite(v)?)))
}

fn string<S: ByteSource + ?Sized>(
    src: &mut S,
    len: usize,
    env: &dyn Environment,
) -> Result<Object> {
    let data = take_vec(src, len)?;
    let attrs = Attributes::allocated(env.allocation(), env.save_level());

    Ok(Object::string(data, attrs))
}

fn number_array<S: ByteSource + ?Sized>(
    src: &mut S,
    format: NumberFormat,
    len: usize,
    env: &dyn Environment,
) -> Result<Object> {
    if len % format.element_size() != 0 {
        return Err(Error::with_message(
            ErrorKind::RangeCheck,
            "number array length is not a multiple of the element size",
        ));
    }

    let data = take_vec(src, len)?;
    let numbers = decode_number_array(format, &data)?;

    array::build(numbers.into_iter().map(Object::from), env, false)
}

fn byte<S: ByteSource + ?Sized>(src: &mut S) -> Result<u8> {
    src.next_byte()?
        .ok_or_else(|| ErrorKind::SyntaxError.into())
}

fn take<S: ByteSource + ?Sized, const N: usize>(src: &mut S) -> Result<[u8; N]> {
    let mut out = [0; N];

    for b in &mut out {
        *b = byte(src)?;
    }

    Ok(out)
}

fn take_vec<S: ByteSource + ?Sized>(src: &mut S, len: usize) -> Result<Vec<u8>> {
    // Lengths come from the input, so don't trust them for the allocation.
    let mut out = Vec::with_capacity(len.min(1 << 16));

    for _ in 0..len {
        out.push(byte(src)?);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::{BinaryFormat, ByteOrder, Encoder, NumberRepresentation, encode_number_array};
    use crate::number::Number;
    use crate::object::Value;

    fn decode(data: &[u8]) -> Result<(Object, usize)> {
        let mut names = NameCache::new();
        decode_token(data, &mut names, &())
    }

    fn decode_object(data: &[u8]) -> Object {
        let (object, used) = decode(data).unwrap();
        assert_eq!(used, data.len());
        object
    }

    #[test]
    fn integers() {
        assert_eq!(decode_object(&[132, 0, 0, 1, 0]), Object::integer(256));
        assert_eq!(decode_object(&[133, 0, 1, 0, 0]), Object::integer(256));
        assert_eq!(decode_object(&[134, 0xff, 0xfe]), Object::integer(-2));
        assert_eq!(decode_object(&[135, 0xfe, 0xff]), Object::integer(-2));
        assert_eq!(decode_object(&[136, 0x80]), Object::integer(-128));
    }

    #[test]
    fn fixed_point() {
        assert_eq!(
            decode_object(&[137, 1, 0, 0, 0, 3]),
            Object::real(Real::new(1.5))
        );
        assert_eq!(decode_object(&[137, 32, 0, 7]), Object::integer(7));
    }

    #[test]
    fn reals() {
        let mut data = vec![138];
        data.extend_from_slice(&0.5_f32.to_be_bytes());
        assert_eq!(decode_object(&data), Object::real(Real::new(0.5)));

        let mut data = vec![139];
        data.extend_from_slice(&0.5_f32.to_le_bytes());
        assert_eq!(decode_object(&data), Object::real(Real::new(0.5)));

        let mut data = vec![140];
        data.extend_from_slice(&0.5_f32.to_ne_bytes());
        assert_eq!(decode_object(&data), Object::real(Real::new(0.5)));

        let mut data = vec![138];
        data.extend_from_slice(&f32::INFINITY.to_be_bytes());
        assert_eq!(decode(&data).unwrap_err().kind(), ErrorKind::UndefinedResult);
    }

    #[test]
    fn booleans() {
        assert_eq!(decode_object(&[141, 1]), Object::boolean(true));
        assert_eq!(decode_object(&[141, 0]), Object::boolean(false));
        assert_eq!(decode(&[141, 2]).unwrap_err().kind(), ErrorKind::RangeCheck);
    }

    #[test]
    fn strings() {
        let object = decode_object(&[142, 2, b'h', b'i']);
        assert_eq!(object.as_string(), Some(&b"hi"[..]));

        let object = decode_object(&[143, 0, 1, b'x']);
        assert_eq!(object.as_string(), Some(&b"x"[..]));

        let object = decode_object(&[144, 1, 0, b'y']);
        assert_eq!(object.as_string(), Some(&b"y"[..]));
    }

    #[test]
    fn truncated() {
        assert_eq!(decode(&[142, 5, b'a']).unwrap_err().kind(), ErrorKind::SyntaxError);
        assert_eq!(decode(&[132, 0]).unwrap_err().kind(), ErrorKind::SyntaxError);
    }

    #[test]
    fn system_names() {
        let literal = decode_object(&[145, 53]);
        assert_eq!(literal.as_name().unwrap().as_bytes(), b"def");
        assert!(!literal.is_executable());

        let exec = decode_object(&[146, 0]);
        assert_eq!(exec.as_name().unwrap().as_bytes(), b"abs");
        assert!(exec.is_executable());

        assert_eq!(decode(&[145, 255]).unwrap_err().kind(), ErrorKind::Undefined);
    }

    #[test]
    fn user_names() {
        assert_eq!(decode(&[147, 0]).unwrap_err().kind(), ErrorKind::Undefined);
        assert_eq!(decode(&[148, 3]).unwrap_err().kind(), ErrorKind::Undefined);
    }

    #[test]
    fn reserved_tokens() {
        for token in 151..=159 {
            assert_eq!(decode(&[token]).unwrap_err().kind(), ErrorKind::SyntaxError);
        }

        assert_eq!(decode(&[b'1']).unwrap_err().kind(), ErrorKind::SyntaxError);
    }

    #[test]
    fn number_arrays() {
        let format = NumberFormat::new(NumberRepresentation::Fixed32(0), ByteOrder::LittleEndian);
        let data = encode_number_array(&[Number::Integer(1), Number::Integer(2)], format).unwrap();

        let object = decode_object(&data);
        assert!(!object.is_executable());
        assert_eq!(
            object.as_array().unwrap(),
            &[Object::integer(1), Object::integer(2)]
        );
    }

    #[test]
    fn long_number_array() {
        let data = [150, 48, 0, 0, 0, 4, 0x3f, 0x80, 0, 0];
        let object = decode_object(&data);
        assert_eq!(
            object.as_array().unwrap(),
            &[Object::real(Real::new(1.0))]
        );

        let data = [150, 48, 0, 0, 0, 3, 0x3f, 0x80, 0];
        assert_eq!(decode(&data).unwrap_err().kind(), ErrorKind::RangeCheck);
    }

    #[test]
    fn bad_representation() {
        assert_eq!(decode(&[149, 60, 0, 0]).unwrap_err().kind(), ErrorKind::RangeCheck);
    }

    #[test]
    fn sequence_token() {
        let data = Encoder::new(BinaryFormat::LITTLE_ENDIAN_IEEE)
            .encode(&Object::integer(9))
            .unwrap();
        let mut padded = data.clone();
        padded.extend_from_slice(b" trailing");

        let (object, used) = decode(&padded).unwrap();
        assert_eq!(used, data.len());
        assert!(matches!(object.value(), Value::Array(_)));
        assert_eq!(object.as_array().unwrap(), &[Object::integer(9)]);
    }
}
