use log::warn;

use crate::error::Result;
use crate::reader::ByteSource;
use crate::scan::TokenBuffer;

use super::{next, push};

/// Scan the body of a `(...)` string. The opening parenthesis has already
/// been consumed. Returns once the balancing `)` is read.
pub(crate) fn scan<S: ByteSource + ?Sized>(
    src: &mut S,
    out: &mut TokenBuffer,
    limit: usize,
) -> Result<()> {
    let mut depth = 1_u32;

    loop {
        let byte = next(src)?;

        match byte {
            b'\\' => {
                let escaped = next(src)?;

                match escaped {
                    b'0'..=b'7' => {
                        let mut value = u32::from(escaped - b'0');

                        for _ in 0..2 {
                            match src.next_byte()? {
                                Some(digit @ b'0'..=b'7') => {
                                    value = value * 8 + u32::from(digit - b'0');
                                }
                                Some(other) => {
                                    src.push_back(other);
                                    break;
                                }
                                None => break,
                            }
                        }

                        // Codes above 0o377 keep their low eight bits.
                        if value > 0o377 {
                            warn!("octal escape \\{value:o} is out of range");
                        }

                        push(out, value as u8, limit)?;
                    }
                    b'n' => push(out, 0x0A, limit)?,
                    b'r' => push(out, 0x0D, limit)?,
                    b't' => push(out, 0x09, limit)?,
                    b'b' => push(out, 0x08, limit)?,
                    b'f' => push(out, 0x0C, limit)?,
                    // A backslash before a line break joins the lines.
                    b'\r' => skip_lf(src)?,
                    b'\n' => {}
                    other => push(out, other, limit)?,
                }
            }
            b'(' => {
                depth += 1;
                push(out, byte, limit)?;
            }
            b')' => {
                depth -= 1;

                if depth == 0 {
                    return Ok(());
                }

                push(out, byte, limit)?;
            }
            // Any unescaped line break reads as a single `\n`.
            b'\r' => {
                push(out, b'\n', limit)?;
                skip_lf(src)?;
            }
            other => push(out, other, limit)?,
        }
    }
}

fn skip_lf<S: ByteSource + ?Sized>(src: &mut S) -> Result<()> {
    match src.next_byte()? {
        Some(b'\n') | None => {}
        Some(other) => src.push_back(other),
    }

    Ok(())
}
