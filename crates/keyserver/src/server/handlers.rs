//! Route handlers.
//!
//! Bodies are taken as raw bytes and decoded with [`parse_body`] so that a
//! malformed body gets the same `{"error"}` response as every other failure,
//! whatever its content type.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use keyserver_chain::gas::bank_send_tx;
use keyserver_chain::{broadcast as relay, estimate_and_finalize};
use keyserver_core::address::{AccAddress, AddressVariant};
use keyserver_core::error::GatewayError;
use keyserver_core::types::{BroadcastResult, Coins};
use keyserver_crypto::{format_key, format_keys, KeyOutput};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::{parse_body, ApiResult};
use super::state::AppState;
use crate::logging::log_security_event;
use crate::signing::{self, SignRequest};
use crate::validate::{self, DeleteKeyRequest, NewKeyRequest, UpdateKeyRequest};

// ============================================================================
// Version
// ============================================================================

/// Body of `GET /version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Crate version.
    pub version: String,
    /// Commit the binary was built from.
    pub commit: String,
    /// Branch the binary was built from.
    pub branch: String,
}

impl VersionInfo {
    /// Build information of the running binary.
    #[must_use]
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            commit: option_env!("KEYSERVER_COMMIT")
                .unwrap_or("undefined")
                .to_string(),
            branch: option_env!("KEYSERVER_BRANCH")
                .unwrap_or("undefined")
                .to_string(),
        }
    }
}

/// `GET /version`
pub async fn version() -> Json<VersionInfo> {
    Json(VersionInfo::current())
}

// ============================================================================
// Keys
// ============================================================================

/// Query of `GET /keys/:name`.
#[derive(Debug, Default, Deserialize)]
pub struct KeyQuery {
    /// Address variant tag; absent or empty means `acc`.
    #[serde(default)]
    pub bech: Option<String>,
}

/// `GET /keys`
pub async fn list_keys(State(state): State<AppState>) -> ApiResult<Json<Vec<KeyOutput>>> {
    let keys = state
        .with_keystore(|keystore| {
            let infos = keystore.list()?;
            Ok(format_keys(&infos)?)
        })
        .await?;

    Ok(Json(keys))
}

/// `POST /keys`
pub async fn create_key(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<KeyOutput>> {
    let request: NewKeyRequest = parse_body(&body)?;
    let name = request.name.clone();

    let output = state
        .with_keystore(move |keystore| validate::create_key(request, keystore))
        .await?;

    log_security_event("key_created", &name, &output.address);
    info!(key_name = %name, address = %output.address, "key created");

    Ok(Json(output))
}

/// `GET /keys/:name?bech=acc|val|cons`
///
/// The variant is checked before the lookup, so an unknown tag is a 400 even
/// for a missing key.
pub async fn get_key(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<KeyQuery>,
) -> ApiResult<Json<KeyOutput>> {
    let variant = AddressVariant::from_optional(query.bech.as_deref())
        .map_err(|e| GatewayError::validation(e.to_string()))?;

    let output = state
        .with_keystore(move |keystore| {
            let info = keystore.get(&name)?;
            Ok(format_key(&info, variant)?)
        })
        .await?;

    Ok(Json(output))
}

/// `PUT /keys/:name`
///
/// Answers 204 with an empty body on success.
pub async fn update_key(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let request: UpdateKeyRequest = parse_body(&body)?;
    validate::validate_update(&request)?;

    let key_name = name.clone();
    let result = state
        .with_keystore(move |keystore| {
            keystore.update(&key_name, &request.old_password, &request.new_password)?;
            Ok(())
        })
        .await;

    audit("key_updated", &name, result)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /keys/:name`
pub async fn delete_key(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let request: DeleteKeyRequest = parse_body(&body)?;
    validate::validate_delete(&request)?;

    let key_name = name.clone();
    let result = state
        .with_keystore(move |keystore| {
            keystore.delete(&key_name, &request.password)?;
            Ok(())
        })
        .await;

    audit("key_deleted", &name, result)?;
    Ok(StatusCode::OK)
}

fn audit(
    event: &str,
    key_name: &str,
    result: Result<(), GatewayError>,
) -> Result<(), GatewayError> {
    match &result {
        Ok(()) => log_security_event(event, key_name, "ok"),
        Err(GatewayError::Unauthorized { .. }) => {
            log_security_event("wrong_password", key_name, event);
        }
        Err(_) => {}
    }
    result
}

// ============================================================================
// Transactions
// ============================================================================

/// Body of `POST /tx/bank/send`.
///
/// The receiver field keeps its historical spelling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BankSendRequest {
    /// Sender account address.
    #[serde(default)]
    pub sender: String,
    /// Receiver account address.
    #[serde(default)]
    pub reciever: String,
    /// Coins to send, e.g. `10stake`.
    #[serde(default)]
    pub amount: String,
    /// Chain id. Logged only; the unsigned transaction does not embed it.
    #[serde(default, rename = "chain-id")]
    pub chain_id: String,
    /// Transaction memo.
    #[serde(default)]
    pub memo: String,
    /// Fee coins; empty means none.
    #[serde(default)]
    pub fees: String,
    /// Multiplier applied to the simulated gas.
    #[serde(default)]
    pub gas_adjustment: Option<String>,
}

/// `POST /tx/sign`
pub async fn sign(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let request: SignRequest = parse_body(&body)?;
    let prepared = signing::prepare(&request)?;

    let SignRequest {
        name,
        passphrase,
        chain_id,
        ..
    } = request;
    let key_name = name.clone();

    let signed = state
        .with_keystore(move |keystore| {
            signing::sign_prepared(keystore, &name, &passphrase, prepared)
        })
        .await?;

    info!(
        key_name = %key_name,
        chain_id = %chain_id,
        signatures = signed.signatures.len(),
        "transaction signed"
    );

    Ok(json_response(signed.to_json()?))
}

/// `POST /tx/broadcast`
pub async fn broadcast(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<BroadcastResult>> {
    let result = state
        .with_node_timeout(relay(state.node(), &body))
        .await?;

    Ok(Json(result))
}

/// `POST /tx/bank/send`
///
/// Builds an unsigned send, simulates it and returns it with the adjusted gas.
pub async fn bank_send(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let request: BankSendRequest = parse_body(&body)?;

    let sender: AccAddress = request.sender.parse()?;
    let receiver: AccAddress = request.reciever.parse()?;
    let amount = Coins::parse_field("amount", &request.amount)?;
    let fees = Coins::parse_field("fees", &request.fees)?;

    let tx = bank_send_tx(sender, receiver, amount, fees, request.memo);
    let (finalized, estimate) = state
        .with_node_timeout(estimate_and_finalize(
            state.node(),
            &tx,
            request.gas_adjustment.as_deref(),
        ))
        .await?;

    info!(
        chain_id = %request.chain_id,
        gas_used = estimate.gas_used,
        gas = finalized.fee.gas,
        "bank send prepared"
    );

    Ok(json_response(finalized.to_json()?))
}

fn json_response(body: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}
