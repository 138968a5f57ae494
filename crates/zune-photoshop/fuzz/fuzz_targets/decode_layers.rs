#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    use zune_photoshop::zune_core::bytestream::ZCursor;
    use zune_photoshop::{PSDDecoder, PSDOptions};

    // small limits keep allocations claimed by corrupt lengths cheap
    let options = PSDOptions::new()
        .set_max_channel_bytes(1 << 24)
        .set_max_width(4096)
        .set_max_height(4096);

    let mut decoder = PSDDecoder::new_with_options(ZCursor::new(data), options);

    if decoder.decode_headers().is_err() {
        return;
    }
    for subimage in 0..decoder.subimage_count() {
        if decoder.seek_subimage(subimage).is_ok() {
            let _ = decoder.decode();
        }
    }
});
