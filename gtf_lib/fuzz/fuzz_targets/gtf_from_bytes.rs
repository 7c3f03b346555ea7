#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Check for panics.
    let _ = gtf_lib::Gtf::from_bytes(data);
});
