//! # Server Module
//!
//! REST façade of the key gateway.
//!
//! ## Submodules
//!
//! - [`state`] - Shared handler state and the keystore/node timeouts
//! - [`handlers`] - Route handlers
//! - [`error`] - Mapping of failures onto HTTP responses
//! - [`http`] - Router, middleware and server lifecycle
//!
//! ## API Endpoints
//!
//! - `GET /version` - Build information
//! - `GET /keys` - List keys
//! - `POST /keys` - Create a key
//! - `GET /keys/:name?bech=acc|val|cons` - Show a key
//! - `PUT /keys/:name` - Change a key's password
//! - `DELETE /keys/:name` - Delete a key
//! - `POST /tx/sign` - Sign a transaction
//! - `POST /tx/broadcast` - Relay a signed transaction to the node
//! - `POST /tx/bank/send` - Build a send with simulated gas

pub mod error;
pub mod handlers;
pub mod http;
pub mod state;

pub use error::{ApiError, ErrorBody};
pub use handlers::VersionInfo;
pub use http::{build_router, KeyServer, ServerError};
pub use state::AppState;
