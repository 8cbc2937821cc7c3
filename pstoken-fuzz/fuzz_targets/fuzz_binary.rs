#![no_main]

use libfuzzer_sys::fuzz_target;
use pstoken::{BinaryFormat, Encoder, NameCache, decode_token};

fuzz_target!(|data: &[u8]| {
    let mut names = NameCache::new();

    let Ok((object, _)) = decode_token(data, &mut names, &()) else {
        return;
    };

    // Whatever decodes must encode again, and decode to the same object.
    for format in [
        BinaryFormat::BIG_ENDIAN_IEEE,
        BinaryFormat::LITTLE_ENDIAN_NATIVE,
    ] {
        let Ok(encoded) = Encoder::new(format).encode(&object) else {
            continue;
        };

        let (decoded, used) = decode_token(&encoded, &mut names, &()).unwrap();
        assert_eq!(used, encoded.len());

        if object.as_array().is_some() {
            assert_eq!(decoded.as_array(), object.as_array());
        }
    }
});
