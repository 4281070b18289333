#![no_main]
use fixelcfe::{FixelImage, FixelIndex};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(image) = FixelImage::from_reader(data) {
        let _ = image.num_fixels();
        let _ = FixelIndex::new(&image);
    }
});
