use log::warn;

use crate::binary::BinaryFormat;
use crate::error::{Error, ErrorKind, Result};

const SHORT_LEN: usize = 4;
const EXTENDED_LEN: usize = 8;

/// The header of a binary object sequence.
///
/// A short header holds a one byte object count and a 16-bit length. The
/// extended form, marked by a zero count byte, holds a 16-bit count and a
/// 32-bit length. The length always covers the whole sequence including
/// the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    format: BinaryFormat,
    count: u16,
    length: u32,
    extended: bool,
}

impl Header {
    /// Choose the smallest header for a sequence with `count` top level
    /// objects and `payload` bytes after the header.
    pub fn for_payload(format: BinaryFormat, count: usize, payload: usize) -> Result<Self> {
        let count = u16::try_from(count)
            .map_err(|_| Error::with_message(ErrorKind::LimitCheck, "too many top level objects"))?;

        if (1..=255).contains(&count)
            && let Ok(length) = u16::try_from(payload + SHORT_LEN)
        {
            return Ok(Self {
                format,
                count,
                length: u32::from(length),
                extended: false,
            });
        }

        let length = u32::try_from(payload + EXTENDED_LEN)
            .map_err(|_| Error::with_message(ErrorKind::LimitCheck, "sequence too long"))?;

        Ok(Self {
            format,
            count,
            length,
            extended: true,
        })
    }

    /// Parse a header from the start of `data`, which begins with the
    /// token byte.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let bad = |reason| Error::binary(ErrorKind::SyntaxError, 0, 0, data.len(), reason);

        let token = *data.first().ok_or_else(|| bad("missing header"))?;
        let format = BinaryFormat::from_token(token).ok_or_else(|| bad("not a sequence token"))?;
        let order = format.byte_order;

        let header = match data.get(1) {
            None => return Err(bad("truncated header")),
            Some(0) => {
                let b = data.get(..EXTENDED_LEN).ok_or_else(|| bad("truncated header"))?;

                Self {
                    format,
                    count: order.u16([b[2], b[3]]),
                    length: order.u32([b[4], b[5], b[6], b[7]]),
                    extended: true,
                }
            }
            Some(&count) => {
                let b = data.get(..SHORT_LEN).ok_or_else(|| bad("truncated header"))?;

                Self {
                    format,
                    count: u16::from(count),
                    length: u32::from(order.u16([b[2], b[3]])),
                    extended: false,
                }
            }
        };

        if (header.length as usize) < header.header_len() {
            warn!("binary object sequence length {} is shorter than its header", header.length);
            return Err(bad("length shorter than header"));
        }

        Ok(header)
    }

    /// The format of the sequence.
    pub fn format(&self) -> BinaryFormat {
        self.format
    }

    /// The number of top level objects.
    pub fn count(&self) -> usize {
        usize::from(self.count)
    }

    /// The length of the whole sequence, including the header.
    pub fn length(&self) -> usize {
        self.length as usize
    }

    /// Whether this is the extended header form.
    pub fn is_extended(&self) -> bool {
        self.extended
    }

    /// The size of the header itself.
    pub fn header_len(&self) -> usize {
        if self.extended { EXTENDED_LEN } else { SHORT_LEN }
    }

    /// The number of bytes following the header.
    pub fn payload_len(&self) -> usize {
        self.length() - self.header_len()
    }

    /// Append the encoded header to `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        let order = self.format.byte_order;
        out.push(self.format.token());

        if self.extended {
            out.push(0);
            out.extend_from_slice(&order.u16_bytes(self.count));
            out.extend_from_slice(&order.u32_bytes(self.length));
        } else {
            // Short headers only exist for counts and lengths that fit.
            out.push(self.count as u8);
            out.extend_from_slice(&order.u16_bytes(self.length as u16));
        }
    }
}
