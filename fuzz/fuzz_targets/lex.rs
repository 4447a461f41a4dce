#![no_main]

use libfuzzer_sys::fuzz_target;
use rad::config::LexConfig;
use rad::driver::lex_with_config;

fuzz_target!(|data: &[u8]| {
    // Convert bytes to UTF-8 string (ignore invalid UTF-8)
    if let Ok(s) = std::str::from_utf8(data) {
        let plain = lex_with_config(s, &LexConfig::default());
        for token in &plain {
            assert_eq!(token.levels.first(), Some(&0));
            assert!(token.levels.windows(2).all(|w| w[0] < w[1]));
        }

        // Persisting state before every call must not change the stream while the stack fits the buffer.
        if plain.iter().all(|t| t.levels.len() < 100) {
            let checkpointed = lex_with_config(s, &LexConfig::default().with_checkpoint(true));
            assert_eq!(plain, checkpointed);
        }
    }
});
