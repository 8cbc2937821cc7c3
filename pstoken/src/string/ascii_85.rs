use crate::error::{ErrorKind, Result};
use crate::reader::{ByteSource, is_whitespace};
use crate::scan::TokenBuffer;

use super::{next, push};

/// Scan the body of a `<~...~>` string. The opening `<~` has already been
/// consumed. The encoded text is collected in `raw` and the decoded bytes
/// are returned.
pub(crate) fn scan<S: ByteSource + ?Sized>(
    src: &mut S,
    raw: &mut TokenBuffer,
    limit: usize,
) -> Result<Vec<u8>> {
    // Five encoded characters per four decoded bytes.
    let raw_limit = limit.saturating_mul(5) / 4 + 5;

    loop {
        match next(src)? {
            b'~' => {
                if next(src)? != b'>' {
                    return Err(ErrorKind::SyntaxError.into());
                }

                break;
            }
            b if is_whitespace(b) => {}
            b => push(raw, b, raw_limit)?,
        }
    }

    let mut out = Vec::with_capacity(raw.len() * 4 / 5 + 4);
    decode_into(raw, &mut out).ok_or(ErrorKind::SyntaxError)?;

    if out.len() > limit {
        return Err(ErrorKind::LimitCheck.into());
    }

    Ok(out)
}

fn decode_into(data: &[u8], out: &mut Vec<u8>) -> Option<()> {
    let mut group = [0_u8; 5];
    let mut len = 0;

    for &b in data {
        match b {
            b'!'..=b'u' => {
                group[len] = b - b'!';
                len += 1;

                if len == 5 {
                    flush_group(&group, 5, out)?;
                    len = 0;
                }
            }
            // Only valid between groups.
            b'z' if len == 0 => out.extend_from_slice(&[0, 0, 0, 0]),
            _ => return None,
        }
    }

    match len {
        0 => Some(()),
        // A single character is not valid.
        1 => None,
        _ => {
            for digit in &mut group[len..] {
                *digit = b'u' - b'!';
            }

            flush_group(&group, len, out)
        }
    }
}

fn flush_group(digits: &[u8; 5], len: usize, out: &mut Vec<u8>) -> Option<()> {
    const POW_85: [u32; 5] = [52200625, 614125, 7225, 85, 1];

    let mut value = 0_u32;

    for (digit, pow) in digits.iter().zip(POW_85) {
        value = value.checked_add(u32::from(*digit).checked_mul(pow)?)?;
    }

    out.extend_from_slice(&value.to_be_bytes()[..len - 1]);
    Some(())
}
