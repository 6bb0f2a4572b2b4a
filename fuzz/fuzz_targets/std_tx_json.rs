//! Fuzz target for amino JSON transactions.
//!
//! Feeds arbitrary bytes through the path a `/tx/sign` body takes: parse,
//! build the sign document, then encode the transaction for the wire.
//!
//! # Running
//!
//! ```bash
//! cargo +nightly fuzz run std_tx_json
//! ```

#![no_main]

use keyserver_chain::amino::encode_std_tx;
use keyserver_chain::SignDocument;
use keyserver_core::types::{SignContext, StdTx};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(context) = SignContext::parse("fuzz-chain", "1", "2") else {
        return;
    };

    let _ = SignDocument::build(data, &context);

    if let Ok(tx) = StdTx::from_json(data) {
        // Anything that parsed must serialize and parse again.
        let json = tx.to_json().expect("parsed transaction re-encodes");
        let again = StdTx::from_json(&json).expect("re-encoded transaction parses");
        assert_eq!(tx, again);

        let _ = encode_std_tx(&tx);
    }
});
