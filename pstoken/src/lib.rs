/*!
The input front end of a PostScript interpreter.

This crate turns bytes into PostScript objects. It has three parts:

- A [`Scanner`] for the textual syntax. It handles numbers, names, the three
  string syntaxes and procedures. Binary tokens embedded in the stream are
  also handled.
- A codec for binary tokens and binary object sequences, see
  [`decode_token`], [`decode_sequence`] and [`Encoder`].
- A [`NameCache`] that interns names, so that equal names share a single
  handle. The cache knows about save levels and can be purged on restore and
  swept after a garbage collection.

Operators that act on the scanned objects are out of scope. The interpreter
state the scanner needs (allocation mode, save level and name lookup for
immediately evaluated names) is supplied through the [`Environment`] trait.

```
use pstoken::{NameCache, Reader, Scanner};

let mut names = NameCache::new();
let mut scanner = Scanner::default();
let mut src = Reader::new(b"/x 1 {add}");

let objects = scanner
    .tokens(&mut src, &mut names, &mut ())
    .collect::<Result<Vec<_>, _>>()
    .unwrap();

assert_eq!(objects.len(), 3);
assert!(objects[2].is_executable());
```

## Safety
This crate forbids unsafe code via a crate-level attribute.
*/

#![forbid(unsafe_code)]

mod array;
mod binary;
mod dict;
mod env;
mod error;
mod name;
mod number;
mod object;
mod reader;
mod scan;
mod string;

pub use array::MAX_ARRAY_LENGTH;
pub use binary::{
    BinaryFormat, ByteOrder, Encoder, Header, MAX_NESTING_DEPTH, NumberFormat,
    NumberRepresentation, RealFormat, decode_number_array, decode_sequence, decode_token,
    encode_number_array,
};
pub use dict::{DictStack, Dictionary, Slot};
pub use env::Environment;
pub use error::{Detail, Error, ErrorKind, Result, TOKEN_DETAIL_LENGTH};
pub use name::{MAX_LONG_NAME_LENGTH, MAX_NAME_LENGTH, Name, NameCache};
pub use number::{Number, Real};
pub use object::{Access, Attributes, Flags, Object, Value, VmClass};
pub use reader::{ByteSource, IoSource, LineCount, Reader};
pub use scan::{ScanFlags, ScanSettings, Scanner, Tokens};
