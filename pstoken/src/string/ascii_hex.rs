use crate::error::{ErrorKind, Result};
use crate::reader::{ByteSource, is_whitespace};
use crate::scan::TokenBuffer;

use super::{next, push};

/// Scan the body of a `<...>` hex string. The opening `<` has already been
/// consumed. An odd final digit is padded with zero.
pub(crate) fn scan<S: ByteSource + ?Sized>(
    src: &mut S,
    out: &mut TokenBuffer,
    limit: usize,
) -> Result<()> {
    let mut high = None;

    loop {
        match next(src)? {
            b'>' => {
                if let Some(hi) = high {
                    push(out, hi << 4, limit)?;
                }

                return Ok(());
            }
            b if is_whitespace(b) => {}
            b => {
                let digit = decode_hex_digit(b).ok_or(ErrorKind::SyntaxError)?;

                match high.take() {
                    Some(hi) => push(out, hi << 4 | digit, limit)?,
                    None => high = Some(digit),
                }
            }
        }
    }
}

#[inline(always)]
fn decode_hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}
