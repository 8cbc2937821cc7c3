use log::trace;

use crate::array;
use crate::binary::{
    ByteOrder, EXECUTABLE_BIT, Header, MAX_NESTING_DEPTH, RECORD_SIZE, RecordType,
    SYSTEM_NAME_LENGTH, finite, fixed_point_scale, from_fixed,
};
use crate::env::Environment;
use crate::error::{Error, ErrorKind, Result};
use crate::name::{Name, NameCache};
use crate::number::Real;
use crate::object::{Attributes, Object};

/// Decode a complete binary object sequence from the start of `data`.
///
/// The top level objects are returned as an executable array. Also returns
/// the number of bytes the sequence occupied.
pub fn decode_sequence(
    data: &[u8],
    names: &mut NameCache,
    env: &dyn Environment,
) -> Result<(Object, usize)> {
    let header = Header::parse(data)?;
    let payload = data
        .get(header.header_len()..header.length())
        .ok_or_else(|| {
            Error::binary(
                ErrorKind::SyntaxError,
                0,
                0,
                header.length(),
                "sequence is truncated",
            )
        })?;

    let object = decode_payload(&header, payload, names, env)?;

    Ok((object, header.length()))
}

/// Decode the records following an already parsed header.
pub(crate) fn decode_payload(
    header: &Header,
    payload: &[u8],
    names: &mut NameCache,
    env: &dyn Environment,
) -> Result<Object> {
    let count = header.count();

    trace!(
        "decoding binary object sequence with {count} objects in {} bytes",
        payload.len()
    );

    if count * RECORD_SIZE > payload.len() {
        return Err(Error::binary(
            ErrorKind::RangeCheck,
            0,
            count as u32,
            payload.len(),
            "top level records exceed the sequence",
        ));
    }

    let mut decoder = Decoder {
        data: payload,
        order: header.format().byte_order,
        end_of_objects: count * RECORD_SIZE,
        beg_of_strings: payload.len(),
        budget: payload.len() / RECORD_SIZE,
        names,
        env,
    };

    let objects = decoder.block(0, count, 0)?;

    array::build(objects, env, true)
}

/// Decodes records while tracking where record blocks end and where string
/// data begins. The two areas must never overlap.
struct Decoder<'a, 'b> {
    data: &'a [u8],
    order: ByteOrder,
    end_of_objects: usize,
    beg_of_strings: usize,
    /// Records that can still be decoded. Bounded by the number of records
    /// that fit into the sequence, so shared array blocks can't multiply.
    budget: usize,
    names: &'b mut NameCache,
    env: &'b dyn Environment,
}

struct Record {
    tag: u8,
    executable: bool,
    len: u16,
    value: u32,
}

impl Decoder<'_, '_> {
    fn error(&self, kind: ErrorKind, tag: u8, count: u32, reason: &'static str) -> Error {
        Error::binary(kind, tag, count, self.data.len(), reason)
    }

    fn block(&mut self, offset: usize, count: usize, depth: usize) -> Result<Vec<Object>> {
        if depth > MAX_NESTING_DEPTH {
            return Err(self.error(
                ErrorKind::RangeCheck,
                RecordType::Array as u8,
                count as u32,
                "arrays nested too deeply",
            ));
        }

        (0..count)
            .map(|i| self.object(offset + i * RECORD_SIZE, depth))
            .collect()
    }

    fn record(&mut self, offset: usize) -> Result<Record> {
        if self.budget == 0 {
            return Err(self.error(ErrorKind::RangeCheck, 0, 0, "too many objects"));
        }
        self.budget -= 1;

        let b = self
            .data
            .get(offset..offset + RECORD_SIZE)
            .ok_or_else(|| self.error(ErrorKind::RangeCheck, 0, 0, "record out of bounds"))?;

        if b[1] != 0 {
            return Err(self.error(ErrorKind::RangeCheck, b[0], 0, "reserved byte is not zero"));
        }

        Ok(Record {
            tag: b[0] & !EXECUTABLE_BIT,
            executable: b[0] & EXECUTABLE_BIT != 0,
            len: self.order.u16([b[2], b[3]]),
            value: self.order.u32([b[4], b[5], b[6], b[7]]),
        })
    }

    fn object(&mut self, offset: usize, depth: usize) -> Result<Object> {
        let rec = self.record(offset)?;
        let ty = RecordType::try_from(rec.tag)
            .map_err(|_| self.error(ErrorKind::SyntaxError, rec.tag, 0, "unknown object type"))?;

        let object = match ty {
            RecordType::Null => {
                self.expect_unused(&rec, true)?;
                Object::null()
            }
            RecordType::Mark => {
                self.expect_unused(&rec, true)?;
                Object::mark()
            }
            RecordType::Integer => {
                self.expect_unused(&rec, false)?;
                Object::integer(rec.value as i32)
            }
            RecordType::Boolean => {
                self.expect_unused(&rec, false)?;

                match rec.value {
                    0 => Object::boolean(false),
                    1 => Object::boolean(true),
                    _ => {
                        return Err(self.error(ErrorKind::RangeCheck, rec.tag, 0, "bad boolean"));
                    }
                }
            }
            RecordType::Real => {
                let real = match fixed_point_scale(rec.len)? {
                    None => Real::new(finite(f32::from_bits(rec.value))?),
                    Some(scale) => Real::new(from_fixed(rec.value as i32, scale) as f32),
                };

                Object::real(real)
            }
            RecordType::String => {
                let bytes = self.string_data(&rec, u32::from(rec.len))?;
                let attrs = Attributes::allocated(self.env.allocation(), self.env.save_level());
                Object::string(bytes, attrs)
            }
            RecordType::Name | RecordType::ImmediateName => {
                let name = self.name(&rec)?;

                if ty == RecordType::ImmediateName {
                    return self.env.load(&name).ok_or_else(|| {
                        Error::with_message(
                            ErrorKind::Undefined,
                            format!("{name:?} is not defined"),
                        )
                    });
                }

                Object::name(name, rec.executable)
            }
            RecordType::Array => {
                let count = usize::from(rec.len);
                let start = rec.value as usize;

                if count > 0 {
                    if start % RECORD_SIZE != 0 {
                        return Err(self.error(
                            ErrorKind::RangeCheck,
                            rec.tag,
                            u32::from(rec.len),
                            "misaligned array",
                        ));
                    }

                    let end = start.saturating_add(count * RECORD_SIZE);
                    if end > self.beg_of_strings {
                        return Err(self.error(
                            ErrorKind::RangeCheck,
                            rec.tag,
                            u32::from(rec.len),
                            "array overlaps string data",
                        ));
                    }

                    self.end_of_objects = self.end_of_objects.max(end);
                }

                let elements = self.block(start, count, depth + 1)?;

                return array::build(elements, self.env, rec.executable);
            }
        };

        Ok(object.with_executable(rec.executable))
    }

    fn name(&mut self, rec: &Record) -> Result<Name> {
        match rec.len {
            SYSTEM_NAME_LENGTH => self
                .names
                .system_name(rec.value as usize)
                .ok_or_else(|| {
                    self.error(ErrorKind::Undefined, rec.tag, rec.value, "unknown system name")
                }),
            0 => Err(self.error(
                ErrorKind::Undefined,
                rec.tag,
                rec.value,
                "user name tables are not supported",
            )),
            len => {
                // Lengths above 0x7fff are negative in the signed reading.
                if len > 0x7fff {
                    return Err(self.error(
                        ErrorKind::RangeCheck,
                        rec.tag,
                        u32::from(len),
                        "bad name length",
                    ));
                }

                let bytes = self.string_data(rec, u32::from(len))?;
                self.names.intern_long(&bytes)
            }
        }
    }

    /// The string data referenced by a string or name record.
    fn string_data(&mut self, rec: &Record, len: u32) -> Result<Vec<u8>> {
        if len == 0 {
            return Ok(Vec::new());
        }

        let start = rec.value as usize;
        let end = start.saturating_add(len as usize);

        if start < self.end_of_objects || end > self.data.len() {
            return Err(self.error(ErrorKind::RangeCheck, rec.tag, len, "string out of bounds"));
        }

        self.beg_of_strings = self.beg_of_strings.min(start);

        Ok(self.data[start..end].to_vec())
    }

    fn expect_unused(&self, rec: &Record, value_too: bool) -> Result<()> {
        if rec.len != 0 || (value_too && rec.value != 0) {
            return Err(self.error(
                ErrorKind::RangeCheck,
                rec.tag,
                u32::from(rec.len),
                "unused field is not zero",
            ));
        }

        Ok(())
    }
}
