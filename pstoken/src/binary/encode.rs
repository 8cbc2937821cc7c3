use log::trace;

use crate::binary::{
    BinaryFormat, EXECUTABLE_BIT, Header, MAX_NESTING_DEPTH, RECORD_SIZE, RealFormat, RecordType,
    SYSTEM_NAME_LENGTH, to_fixed,
};
use crate::error::{Error, ErrorKind, Result};
use crate::name::MAX_LONG_NAME_LENGTH;
use crate::object::{Object, Value};

/// The largest string or array a single record can describe.
const MAX_RECORD_LENGTH: usize = 0xffff;

/// Writes objects as binary object sequences.
///
/// Reals are written as their 32-bit value. A precision extension is not
/// part of the encoding and is dropped.
#[derive(Debug, Clone, Copy)]
pub struct Encoder {
    format: BinaryFormat,
    system_names: bool,
}

impl Encoder {
    /// Create an encoder for the given format. Names from the system name
    /// table are written by index.
    pub fn new(format: BinaryFormat) -> Self {
        Self {
            format,
            system_names: true,
        }
    }

    /// Whether names from the system name table are written by index
    /// instead of as text.
    pub fn use_system_names(mut self, enabled: bool) -> Self {
        self.system_names = enabled;
        self
    }

    /// Encode a single object.
    ///
    /// The elements of an array become the top level objects of the
    /// sequence, any other object becomes a sequence of one.
    pub fn encode(&self, object: &Object) -> Result<Vec<u8>> {
        match object.value() {
            Value::Array(elements) => {
                readable(object)?;
                self.encode_all(elements)
            }
            _ => self.encode_all(core::slice::from_ref(object)),
        }
    }

    /// Encode `objects` as the top level objects of a sequence.
    pub fn encode_all(&self, objects: &[Object]) -> Result<Vec<u8>> {
        let mut size = Size::default();
        self.measure(objects, 0, &mut size)?;

        let payload = size.records * RECORD_SIZE + size.strings;
        let header = Header::for_payload(self.format, objects.len(), payload)?;

        trace!(
            "encoding {} records and {} bytes of strings",
            size.records, size.strings
        );

        let mut arena = Arena {
            data: vec![0; payload],
            bottom: objects.len() * RECORD_SIZE,
            top: payload,
        };
        self.write_block(&mut arena, 0, objects)?;

        if arena.bottom != arena.top {
            return Err(Error::with_message(
                ErrorKind::VmError,
                "binary object sequence layout mismatch",
            ));
        }

        let mut out = Vec::with_capacity(header.length());
        header.write(&mut out);
        out.extend_from_slice(&arena.data);

        Ok(out)
    }

    /// Check that everything can be encoded and add up the space it needs.
    fn measure(&self, objects: &[Object], depth: usize, size: &mut Size) -> Result<()> {
        if depth > MAX_NESTING_DEPTH {
            return Err(Error::with_message(
                ErrorKind::RangeCheck,
                "arrays nested too deeply",
            ));
        }

        if objects.len() > MAX_RECORD_LENGTH {
            return Err(Error::with_message(ErrorKind::LimitCheck, "array too long"));
        }

        size.records += objects.len();

        for object in objects {
            match object.value() {
                Value::Null
                | Value::Integer(_)
                | Value::Boolean(_)
                | Value::Mark => {}
                Value::Real(real) => {
                    if !real.value().is_finite() {
                        return Err(ErrorKind::UndefinedResult.into());
                    }
                }
                Value::Infinity => return Err(ErrorKind::UndefinedResult.into()),
                Value::Name(name) => {
                    if !(self.system_names && name.system_index().is_some()) {
                        let len = name.as_bytes().len();

                        if len == 0 {
                            return Err(Error::with_message(
                                ErrorKind::RangeCheck,
                                "empty names can't be encoded",
                            ));
                        }

                        if len > MAX_LONG_NAME_LENGTH {
                            return Err(Error::with_message(ErrorKind::LimitCheck, "name too long"));
                        }

                        size.strings += len;
                    }
                }
                Value::String(data) => {
                    readable(object)?;

                    if data.len() > MAX_RECORD_LENGTH {
                        return Err(Error::with_message(ErrorKind::LimitCheck, "string too long"));
                    }

                    size.strings += data.len();
                }
                Value::Array(elements) => {
                    readable(object)?;
                    self.measure(elements, depth + 1, size)?;
                }
            }
        }

        Ok(())
    }

    fn write_block(&self, arena: &mut Arena, offset: usize, objects: &[Object]) -> Result<()> {
        for (i, object) in objects.iter().enumerate() {
            self.write_object(arena, offset + i * RECORD_SIZE, object)?;
        }

        Ok(())
    }

    fn write_object(&self, arena: &mut Arena, offset: usize, object: &Object) -> Result<()> {
        let exec = object.is_executable();

        match object.value() {
            Value::Null => self.record(arena, offset, RecordType::Null, exec, 0, 0),
            Value::Mark => self.record(arena, offset, RecordType::Mark, exec, 0, 0),
            Value::Integer(v) => self.record(arena, offset, RecordType::Integer, exec, 0, *v as u32),
            Value::Boolean(v) => {
                self.record(arena, offset, RecordType::Boolean, exec, 0, u32::from(*v));
            }
            Value::Real(real) => {
                let fixed = match self.format.reals {
                    RealFormat::Native => to_fixed(real.value()),
                    RealFormat::Ieee => None,
                };

                match fixed {
                    Some((mantissa, scale)) => self.record(
                        arena,
                        offset,
                        RecordType::Real,
                        exec,
                        scale as u16,
                        mantissa as u32,
                    ),
                    None => self.record(
                        arena,
                        offset,
                        RecordType::Real,
                        exec,
                        0,
                        real.value().to_bits(),
                    ),
                }
            }
            Value::Infinity => return Err(ErrorKind::UndefinedResult.into()),
            Value::Name(name) => match name.system_index() {
                Some(index) if self.system_names => self.record(
                    arena,
                    offset,
                    RecordType::Name,
                    exec,
                    SYSTEM_NAME_LENGTH,
                    u32::from(index),
                ),
                _ => {
                    let at = arena.strings(name.as_bytes())?;
                    self.record(
                        arena,
                        offset,
                        RecordType::Name,
                        exec,
                        name.as_bytes().len() as u16,
                        at,
                    );
                }
            },
            Value::String(data) => {
                let at = arena.strings(data)?;
                self.record(arena, offset, RecordType::String, exec, data.len() as u16, at);
            }
            Value::Array(elements) => {
                let at = arena.records(elements.len())?;
                self.record(
                    arena,
                    offset,
                    RecordType::Array,
                    exec,
                    elements.len() as u16,
                    at as u32,
                );
                self.write_block(arena, at, elements)?;
            }
        }

        Ok(())
    }

    fn record(
        &self,
        arena: &mut Arena,
        offset: usize,
        ty: RecordType,
        executable: bool,
        len: u16,
        value: u32,
    ) {
        let order = self.format.byte_order;
        let tag = ty as u8 | if executable { EXECUTABLE_BIT } else { 0 };
        let [l0, l1] = order.u16_bytes(len);
        let [v0, v1, v2, v3] = order.u32_bytes(value);

        arena.data[offset..offset + RECORD_SIZE].copy_from_slice(&[tag, 0, l0, l1, v0, v1, v2, v3]);
    }
}

fn readable(object: &Object) -> Result<()> {
    if object.access().can_read() {
        Ok(())
    } else {
        Err(ErrorKind::InvalidAccess.into())
    }
}

#[derive(Default)]
struct Size {
    records: usize,
    strings: usize,
}

/// The payload being written. Nested array records are allocated upwards
/// from `bottom`, string data downwards from `top`.
struct Arena {
    data: Vec<u8>,
    bottom: usize,
    top: usize,
}

impl Arena {
    fn records(&mut self, count: usize) -> Result<usize> {
        let at = self.bottom;
        let end = at + count * RECORD_SIZE;

        if end > self.top {
            return Err(overflow());
        }

        self.bottom = end;
        Ok(at)
    }

    fn strings(&mut self, bytes: &[u8]) -> Result<u32> {
        if bytes.is_empty() {
            return Ok(0);
        }

        let at = self
            .top
            .checked_sub(bytes.len())
            .filter(|at| *at >= self.bottom)
            .ok_or_else(overflow)?;

        self.data[at..self.top].copy_from_slice(bytes);
        self.top = at;

        u32::try_from(at).map_err(|_| overflow())
    }
}

fn overflow() -> Error {
    Error::with_message(ErrorKind::VmError, "binary object sequence layout overflow")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::{ByteOrder, decode_sequence};
    use crate::name::NameCache;
    use crate::number::Real;
    use crate::object::{Access, Attributes};
    use crate::reader::Reader;
    use crate::scan::Scanner;

    const FORMATS: [BinaryFormat; 4] = [
        BinaryFormat::BIG_ENDIAN_IEEE,
        BinaryFormat::LITTLE_ENDIAN_IEEE,
        BinaryFormat::BIG_ENDIAN_NATIVE,
        BinaryFormat::LITTLE_ENDIAN_NATIVE,
    ];

    fn sample(names: &mut NameCache) -> Vec<Object> {
        let inner = Object::array(
            vec![
                Object::integer(-1),
                Object::string(&b"inner"[..], Attributes::default()),
                Object::array(Vec::new(), Attributes::default()),
            ],
            Attributes::default(),
        );

        vec![
            Object::integer(42),
            Object::real(Real::new(2.5)),
            Object::real(Real::new(0.1)),
            Object::boolean(true),
            Object::null(),
            Object::mark(),
            Object::name(names.intern(b"moveto").unwrap(), true),
            Object::name(names.intern(b"custom").unwrap(), false),
            Object::string(&b"hello"[..], Attributes::default()),
            Object::string(&b""[..], Attributes::default()),
            inner.with_executable(true),
        ]
    }

    #[test]
    fn round_trip_all_formats() {
        let mut names = NameCache::new();
        let objects = sample(&mut names);

        for format in FORMATS {
            let data = Encoder::new(format).encode_all(&objects).unwrap();
            assert_eq!(data[0], format.token());

            let (decoded, used) = decode_sequence(&data, &mut names, &()).unwrap();
            assert_eq!(used, data.len());
            assert!(decoded.is_executable());
            assert_eq!(decoded.as_array().unwrap(), &objects[..]);
        }
    }

    #[test]
    fn round_trip_without_system_names() {
        let mut names = NameCache::new();
        let objects = sample(&mut names);

        let indexed = Encoder::new(BinaryFormat::BIG_ENDIAN_IEEE)
            .encode_all(&objects)
            .unwrap();
        let textual = Encoder::new(BinaryFormat::BIG_ENDIAN_IEEE)
            .use_system_names(false)
            .encode_all(&objects)
            .unwrap();
        assert_eq!(textual.len(), indexed.len() + b"moveto".len());

        let (decoded, _) = decode_sequence(&textual, &mut names, &()).unwrap();
        assert_eq!(decoded.as_array().unwrap(), &objects[..]);
    }

    #[test]
    fn layout() {
        let mut names = NameCache::new();
        let objects = [
            Object::integer(1),
            Object::string(&b"ab"[..], Attributes::default()),
        ];

        let data = Encoder::new(BinaryFormat::BIG_ENDIAN_IEEE)
            .encode_all(&objects)
            .unwrap();

        assert_eq!(
            data,
            [
                128, 2, 0, 22, //
                1, 0, 0, 0, 0, 0, 0, 1, //
                5, 0, 0, 2, 0, 0, 0, 16, //
                b'a', b'b',
            ]
        );

        let (decoded, _) = decode_sequence(&data, &mut names, &()).unwrap();
        assert_eq!(decoded.as_array().unwrap(), &objects[..]);
    }

    #[test]
    fn native_reals_use_fixed_point() {
        let data = Encoder::new(BinaryFormat::BIG_ENDIAN_NATIVE)
            .encode(&Object::real(Real::new(1.5)))
            .unwrap();

        // Scale 1, mantissa 3.
        assert_eq!(&data[4..], [2, 0, 0, 1, 0, 0, 0, 3]);

        let data = Encoder::new(BinaryFormat::BIG_ENDIAN_IEEE)
            .encode(&Object::real(Real::new(1.5)))
            .unwrap();
        assert_eq!(&data[4..8], [2, 0, 0, 0]);
        assert_eq!(&data[8..], 1.5_f32.to_bits().to_be_bytes());
    }

    #[test]
    fn scanned_reals_round_trip() {
        let mut names = NameCache::new();
        let mut src = Reader::new(b"0.1 123.456 -1e-7 3.4e38 1e-40 0.333333333");
        let objects = Scanner::default()
            .tokens(&mut src, &mut names, &mut ())
            .collect::<Result<Vec<_>>>()
            .unwrap();

        for format in FORMATS {
            let data = Encoder::new(format).encode_all(&objects).unwrap();
            let (decoded, _) = decode_sequence(&data, &mut names, &()).unwrap();
            assert_eq!(decoded.as_array().unwrap(), &objects[..]);
        }
    }

    #[test]
    fn extension_is_dropped() {
        let mut names = NameCache::new();
        let data = Encoder::new(BinaryFormat::BIG_ENDIAN_IEEE)
            .encode(&Object::real(Real::with_extension(0.1, 100)))
            .unwrap();

        let (decoded, _) = decode_sequence(&data, &mut names, &()).unwrap();
        assert_eq!(decoded.as_array().unwrap()[0], Object::real(Real::new(0.1)));
    }

    #[test]
    fn fixed_point_reals_round_trip() {
        let mut names = NameCache::new();
        // Scale 1 with the largest mantissa, which is not exact as an f32.
        let data = [128, 1, 0, 12, 2, 0, 0, 1, 0x7f, 0xff, 0xff, 0xff];
        let (decoded, _) = decode_sequence(&data, &mut names, &()).unwrap();
        let objects = decoded.as_array().unwrap();

        for format in FORMATS {
            let data = Encoder::new(format).encode_all(objects).unwrap();
            let (again, _) = decode_sequence(&data, &mut names, &()).unwrap();
            assert_eq!(again.as_array().unwrap(), objects);
        }
    }

    #[test]
    fn encode_array_unwraps() {
        let array = Object::array(
            vec![Object::integer(1), Object::integer(2)],
            Attributes::default(),
        );
        let data = Encoder::new(BinaryFormat::BIG_ENDIAN_IEEE)
            .encode(&array)
            .unwrap();

        assert_eq!(data[1], 2);
    }

    #[test]
    fn large_sequences_use_extended_header() {
        let mut names = NameCache::new();
        let objects = vec![Object::integer(7); 300];

        let data = Encoder::new(BinaryFormat::LITTLE_ENDIAN_IEEE)
            .encode_all(&objects)
            .unwrap();
        assert_eq!(data[1], 0);
        assert_eq!(ByteOrder::LittleEndian.u16([data[2], data[3]]), 300);

        let (decoded, _) = decode_sequence(&data, &mut names, &()).unwrap();
        assert_eq!(decoded.as_array().unwrap().len(), 300);
    }

    #[test]
    fn non_finite_reals() {
        let encoder = Encoder::new(BinaryFormat::BIG_ENDIAN_IEEE);

        let err = encoder.encode(&Object::real(Real::new(f32::NAN))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UndefinedResult);

        let infinity = Object::new(Value::Infinity, Attributes::default());
        let err = encoder.encode(&infinity).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UndefinedResult);
    }

    #[test]
    fn unreadable_composites() {
        let encoder = Encoder::new(BinaryFormat::BIG_ENDIAN_IEEE);
        let hidden = Object::string(&b"secret"[..], Attributes::default())
            .with_access(Access::ExecuteOnly);

        let err = encoder.encode(&hidden).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAccess);

        let nested = Object::array(vec![hidden], Attributes::default());
        let err = encoder.encode_all(&[nested]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAccess);
    }

    #[test]
    fn oversized_string() {
        let encoder = Encoder::new(BinaryFormat::BIG_ENDIAN_IEEE);
        let big = Object::string(vec![0; MAX_RECORD_LENGTH + 1], Attributes::default());

        let err = encoder.encode(&big).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LimitCheck);
    }

    #[test]
    fn empty_name() {
        let mut names = NameCache::new();
        let empty = Object::name(names.intern(b"").unwrap(), false);

        let err = Encoder::new(BinaryFormat::BIG_ENDIAN_IEEE)
            .encode(&empty)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeCheck);
    }

    #[test]
    fn too_deep() {
        let mut object = Object::integer(0);
        for _ in 0..=MAX_NESTING_DEPTH + 1 {
            object = Object::array(vec![object], Attributes::default());
        }

        let err = Encoder::new(BinaryFormat::BIG_ENDIAN_IEEE)
            .encode_all(&[object])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeCheck);
    }

    #[test]
    fn deepest_allowed_nesting_round_trips() {
        let mut names = NameCache::new();
        let mut object = Object::integer(0);
        for _ in 0..MAX_NESTING_DEPTH {
            object = Object::array(vec![object], Attributes::default());
        }

        let data = Encoder::new(BinaryFormat::BIG_ENDIAN_IEEE)
            .encode_all(core::slice::from_ref(&object))
            .unwrap();
        let (decoded, _) = decode_sequence(&data, &mut names, &()).unwrap();
        assert_eq!(decoded.as_array().unwrap()[0], object);
    }
}
