//! Fuzz target for decoding node simulation results.
//!
//! The bytes come straight from the node, so the decoder must reject
//! anything malformed without panicking.
//!
//! # Running
//!
//! ```bash
//! cargo +nightly fuzz run simulation_result
//! ```

#![no_main]

use keyserver_chain::amino::decode_gas_used;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = decode_gas_used(data);
});
