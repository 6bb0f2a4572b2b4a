//! Fuzz target for coin list parsing.
//!
//! # Running
//!
//! ```bash
//! cargo +nightly fuzz run coins
//! ```

#![no_main]

use keyserver_core::types::Coins;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(coins) = Coins::parse(input) {
        // The canonical rendering is a fixed point.
        let rendered = coins.to_string();
        let reparsed = Coins::parse(&rendered).expect("canonical coins parse");
        assert_eq!(reparsed.to_string(), rendered);
    }
});
