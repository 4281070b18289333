#![no_main]
use fixelcfe::FixelHeader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = FixelHeader::from_reader(data) {
        let _ = header.dim();
        let _ = header.value_type();
        let _ = header.affine();
    }
});
