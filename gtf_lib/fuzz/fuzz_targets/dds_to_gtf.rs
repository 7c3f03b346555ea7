#![no_main]

use libfuzzer_sys::fuzz_target;

#[derive(Debug, arbitrary::Arbitrary)]
struct Input {
    dds: gtf_lib::Dds,
    linearize: bool,
    unnormalize: bool,
}

fuzz_target!(|input: Input| {
    // Check for panics.
    let options = gtf_lib::ConvertOptions {
        linearize: input.linearize,
        unnormalize: input.unnormalize,
    };
    let _ = gtf_lib::dds_to_gtf(&input.dds, &options);
});
