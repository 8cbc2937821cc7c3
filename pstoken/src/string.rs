mod ascii_85;
mod ascii_hex;
mod literal;

use crate::error::{ErrorKind, Result};
use crate::reader::ByteSource;
use crate::scan::TokenBuffer;

pub(crate) use ascii_85::scan as scan_ascii85;
pub(crate) use ascii_hex::scan as scan_hex;
pub(crate) use literal::scan as scan_literal;

/// Read the next byte of a string body, where the end of the input is an
/// error.
#[inline]
fn next<S: ByteSource + ?Sized>(src: &mut S) -> Result<u8> {
    src.next_byte()?.ok_or_else(|| ErrorKind::SyntaxError.into())
}

#[inline]
fn push(out: &mut TokenBuffer, byte: u8, limit: usize) -> Result<()> {
    if out.len() >= limit {
        return Err(ErrorKind::LimitCheck.into());
    }

    out.push(byte);
    Ok(())
}
