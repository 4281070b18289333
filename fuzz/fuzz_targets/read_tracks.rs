#![no_main]
use fixelcfe::{TckReader, TrackSource};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(mut reader) = TckReader::from_reader(data) {
        let _ = reader.declared_count();
        while let Ok(Some(_)) = reader.next_streamline() {}
    }
});
