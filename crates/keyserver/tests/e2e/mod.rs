//! End-to-end tests against a gateway listening on a real port.

pub mod cli_client_test;
pub mod keys_flow_test;
pub mod tx_flow_test;
