#![no_main]

use libfuzzer_sys::fuzz_target;
use pstoken::{NameCache, Reader, ScanFlags, ScanSettings, Scanner};

// Header layout (2 bytes):
// [0]     language level (1 to 3)
// [1]     scan flags
// [2..]   program text

const HEADER_SIZE: usize = 2;

fuzz_target!(|data: &[u8]| {
    if data.len() < HEADER_SIZE {
        return;
    }

    let settings = ScanSettings {
        language_level: data[0] % 3 + 1,
        flags: ScanFlags::from_bits_truncate(data[1]),
        ..ScanSettings::default()
    };

    let mut names = NameCache::new();
    let mut scanner = Scanner::new(settings);
    let mut src = Reader::new(&data[HEADER_SIZE..]);

    for object in scanner.tokens(&mut src, &mut names, &mut ()) {
        if object.is_err() {
            break;
        }
    }

    names.purge(0);
    names.collect();
});
