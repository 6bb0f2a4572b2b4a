//! Transaction flow over HTTP: build a send with simulated gas, sign it with
//! a stored key and relay it to the node.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]

use keyserver_chain::{MockNode, MockNodeError};
use keyserver_core::types::StdTx;
use proptest::prelude::*;
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::common::{self, TestServer};

async fn post(server: &TestServer, path: &str, body: &Value) -> (StatusCode, Value) {
    let response = server
        .http
        .post(server.url(path))
        .json(body)
        .send()
        .await
        .unwrap();
    let status = response.status();
    let text = response.text().await.unwrap();
    (status, serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

async fn create_jack(server: &TestServer) {
    let fixture = common::load_fixture("keys/jack.json").unwrap();
    let (status, _) = post(
        server,
        "/keys",
        &json!({
            "name": fixture["name"],
            "password": fixture["password"],
            "mnemonic": fixture["mnemonic"],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_send_sign_broadcast() {
    let fixture = common::load_fixture("tx/bank_send.json").unwrap();
    let server = TestServer::start(fixture["gas_used"].as_u64().unwrap()).await;
    create_jack(&server).await;

    // Build.
    let (status, unsigned) = post(&server, "/tx/bank/send", &fixture["request"]).await;
    assert_eq!(status, StatusCode::OK, "{unsigned}");
    assert_eq!(unsigned["type"], "auth/StdTx");
    let value = &unsigned["value"];
    assert_eq!(value["fee"]["gas"], fixture["expected_gas"]);
    assert_eq!(value["fee"]["amount"], json!([{"denom": "stake", "amount": "5"}]));
    assert_eq!(value["memo"], "integration");
    assert_eq!(value["msg"][0]["type"], "cosmos-sdk/MsgSend");
    assert_eq!(
        value["msg"][0]["value"]["amount"],
        json!([{"denom": "stake", "amount": "10"}])
    );
    assert!(value["signatures"].as_array().map_or(true, Vec::is_empty));

    // Sign.
    let (status, signed) = post(
        &server,
        "/tx/sign",
        &json!({
            "tx": unsigned,
            "name": "jack",
            "passphrase": "123456789",
            "chain_id": "test-chain",
            "account_number": "0",
            "sequence": "0",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{signed}");
    let signatures = signed["value"]["signatures"].as_array().unwrap();
    assert_eq!(signatures.len(), 1);
    assert_eq!(
        signatures[0]["pub_key"]["value"],
        "A5PmYMYRPhtX6EXBkgGsq117vuu1OWhYA/BieKz8aJtk"
    );

    let parsed = StdTx::from_json(signed.to_string().as_bytes()).unwrap();
    assert_eq!(parsed.signatures[0].signature.len(), 64);

    // Broadcast.
    let (status, ack) = post(&server, "/tx/broadcast", &signed).await;
    assert_eq!(status, StatusCode::OK, "{ack}");
    assert_eq!(ack["height"], "0");
    assert!(ack.get("code").is_none());

    // One simulation, one broadcast.
    assert_eq!(server.node.submitted().len(), 2);

    server.stop().await;
}

#[tokio::test]
async fn test_bad_gas_adjustment_never_reaches_node() {
    let server = TestServer::start(100_000).await;
    let mut request = common::load_fixture("tx/bank_send.json").unwrap()["request"].clone();
    request["gas_adjustment"] = json!("lots");

    let (status, body) = post(&server, "/tx/bank/send", &request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("lots"));
    assert!(server.node.submitted().is_empty());
}

#[tokio::test]
async fn test_bad_addresses_and_amounts() {
    let server = TestServer::start(100_000).await;
    let base = common::load_fixture("tx/bank_send.json").unwrap()["request"].clone();

    for (field, value) in [
        ("sender", "cosmos1invalid"),
        ("reciever", ""),
        ("amount", "10"),
        ("fees", "5STAKE"),
    ] {
        let mut request = base.clone();
        request[field] = json!(value);
        let (status, body) = post(&server, "/tx/bank/send", &request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{field}: {body}");
    }
    assert!(server.node.submitted().is_empty());
}

#[tokio::test]
async fn test_node_failures() {
    let request = common::load_fixture("tx/bank_send.json").unwrap()["request"].clone();

    let rejecting = TestServer::with_node(MockNode {
        simulate_error: Some(MockNodeError::Rejected("out of gas".into())),
        ..MockNode::default()
    })
    .await;
    let (status, body) = post(&rejecting, "/tx/bank/send", &request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "out of gas");

    let unreachable = TestServer::with_node(MockNode {
        simulate_error: Some(MockNodeError::Unreachable),
        ..MockNode::default()
    })
    .await;
    let (status, _) = post(&unreachable, "/tx/bank/send", &request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_slow_node_times_out() {
    let server = TestServer::with_node(MockNode {
        gas_used: 1,
        delay: Some(std::time::Duration::from_secs(4)),
        ..MockNode::default()
    })
    .await;
    let request = common::load_fixture("tx/bank_send.json").unwrap()["request"].clone();

    let (status, body) = post(&server, "/tx/bank/send", &request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_sign_errors() {
    let server = TestServer::start(0).await;
    create_jack(&server).await;

    let tx = json!({"type": "auth/StdTx", "value": {"msg": [], "fee": {"amount": [], "gas": "0"}, "signatures": null, "memo": ""}});
    let base = json!({
        "tx": tx,
        "name": "jack",
        "passphrase": "123456789",
        "chain_id": "c",
        "account_number": "0",
        "sequence": "0",
    });

    let mut missing = base.clone();
    missing["name"] = json!("jill");
    assert_eq!(post(&server, "/tx/sign", &missing).await.0, StatusCode::NOT_FOUND);

    let mut wrong = base.clone();
    wrong["passphrase"] = json!("nope");
    assert_eq!(post(&server, "/tx/sign", &wrong).await.0, StatusCode::UNAUTHORIZED);

    let mut bad_sequence = base.clone();
    bad_sequence["sequence"] = json!("x");
    assert_eq!(post(&server, "/tx/sign", &bad_sequence).await.0, StatusCode::BAD_REQUEST);

    assert_eq!(post(&server, "/tx/sign", &base).await.0, StatusCode::OK);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_any_valid_coin_is_accepted(amount in common::coin_amount()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let status = runtime.block_on(async {
            let server = TestServer::start(10).await;
            let mut request = common::load_fixture("tx/bank_send.json").unwrap()["request"].clone();
            request["amount"] = json!(amount);
            request["gas_adjustment"] = json!("");
            post(&server, "/tx/bank/send", &request).await.0
        });
        prop_assert_eq!(status, StatusCode::OK);
    }
}
