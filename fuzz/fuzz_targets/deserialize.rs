#![no_main]

use libfuzzer_sys::fuzz_target;
use rad::scanner::{MAX_SERIALIZED_DEPTH, Scanner};

fuzz_target!(|data: &[u8]| {
    let mut scanner = Scanner::new();
    scanner.deserialize(data);
    let levels = scanner.indents().levels();
    assert_eq!(levels.first(), Some(&0));
    assert!(levels.windows(2).all(|w| w[0] < w[1]));

    // Whatever the lenient decoder recovers must survive a strict round trip while it fits the depth cap.
    if levels.len() <= MAX_SERIALIZED_DEPTH {
        assert_eq!(Scanner::restore(&scanner.to_bytes()), Ok(scanner));
    }
});
