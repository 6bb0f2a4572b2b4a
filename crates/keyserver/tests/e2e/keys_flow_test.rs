//! Key lifecycle over HTTP: list, create, show under every variant, change
//! the password and delete.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]

use proptest::prelude::*;
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::common::{self, TestServer};

async fn get(server: &TestServer, path: &str) -> (StatusCode, Value) {
    let response = server.http.get(server.url(path)).send().await.unwrap();
    let status = response.status();
    let text = response.text().await.unwrap();
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap()
    };
    (status, body)
}

async fn send(
    server: &TestServer,
    method: reqwest::Method,
    path: &str,
    body: &Value,
) -> (StatusCode, String) {
    let response = server
        .http
        .request(method, server.url(path))
        .json(body)
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.text().await.unwrap())
}

fn error_of(body: &str) -> String {
    let value: Value = serde_json::from_str(body).unwrap();
    value["error"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_full_key_lifecycle() {
    let fixture = common::load_fixture("keys/jack.json").unwrap();
    let name = fixture["name"].as_str().unwrap();
    let password = fixture["password"].as_str().unwrap();
    let new_password = fixture["new_password"].as_str().unwrap();
    let expected = &fixture["expected"];

    let server = TestServer::start(0).await;

    // Empty keystore lists as an empty array.
    let (status, keys) = get(&server, "/keys").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(keys, json!([]));

    // Recover from the fixture mnemonic.
    let (status, body) = send(
        &server,
        reqwest::Method::POST,
        "/keys",
        &json!({"name": name, "password": password, "mnemonic": fixture["mnemonic"]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let created: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(created["name"], name);
    assert_eq!(created["address"], expected["acc"]["address"]);
    assert_eq!(created["pub_key"], expected["acc"]["pub_key"]);
    assert_eq!(created["mnemonic"], fixture["mnemonic"]);

    // Unknown variant is rejected before the name is looked up.
    let (status, _) = get(&server, "/keys/foo?bech=foo").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&server, "/keys/foo?bech=acc").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    for variant in ["acc", "val", "cons"] {
        let (status, key) = get(&server, &format!("/keys/{name}?bech={variant}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(key["address"], expected[variant]["address"], "{variant}");
        assert_eq!(key["pub_key"], expected[variant]["pub_key"], "{variant}");
        assert!(key.get("mnemonic").is_none());
    }

    let (_, keys) = get(&server, "/keys").await;
    assert_eq!(keys.as_array().unwrap().len(), 1);

    // Wrong old password.
    let (status, body) = send(
        &server,
        reqwest::Method::PUT,
        &format!("/keys/{name}"),
        &json!({"old_password": name, "new_password": new_password}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(!error_of(&body).is_empty());

    let (status, body) = send(
        &server,
        reqwest::Method::PUT,
        &format!("/keys/{name}"),
        &json!({"old_password": password, "new_password": new_password}),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());

    // The superseded password no longer works.
    let (status, body) = send(
        &server,
        reqwest::Method::DELETE,
        &format!("/keys/{name}"),
        &json!({"password": password}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(!error_of(&body).is_empty());

    let (status, body) = send(
        &server,
        reqwest::Method::DELETE,
        &format!("/keys/{name}"),
        &json!({"password": new_password}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());

    let (_, keys) = get(&server, "/keys").await;
    assert_eq!(keys, json!([]));

    server.stop().await;
}

#[tokio::test]
async fn test_generated_mnemonic_is_returned_once() {
    let server = TestServer::start(0).await;

    let (status, body) = send(
        &server,
        reqwest::Method::POST,
        "/keys",
        &json!({"name": "fresh", "password": "pw"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let created: Value = serde_json::from_str(&body).unwrap();
    let mnemonic = created["mnemonic"].as_str().unwrap();
    assert_eq!(mnemonic.split_whitespace().count(), 24);

    let (_, shown) = get(&server, "/keys/fresh").await;
    assert_eq!(shown["address"], created["address"]);
    assert!(shown.get("mnemonic").is_none());

    // The same phrase recovers the same key under another name.
    let (status, body) = send(
        &server,
        reqwest::Method::POST,
        "/keys",
        &json!({"name": "again", "password": "pw", "mnemonic": mnemonic}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let again: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(again["address"], created["address"]);
}

#[tokio::test]
async fn test_account_and_index_select_distinct_keys() {
    let fixture = common::load_fixture("keys/jack.json").unwrap();
    let server = TestServer::start(0).await;

    let mut addresses = Vec::new();
    let paths = [
        ("a00", json!(0), json!(0)),
        ("a01", json!("0"), json!("1")),
        ("a10", json!(1), json!(0)),
    ];
    for (name, account, index) in paths {
        let (status, body) = send(
            &server,
            reqwest::Method::POST,
            "/keys",
            &json!({
                "name": name,
                "password": "pw",
                "mnemonic": fixture["mnemonic"],
                "account": account,
                "index": index,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let created: Value = serde_json::from_str(&body).unwrap();
        addresses.push(created["address"].as_str().unwrap().to_string());
    }

    assert_eq!(addresses[0], fixture["expected"]["acc"]["address"]);
    assert_ne!(addresses[0], addresses[1]);
    assert_ne!(addresses[0], addresses[2]);
    assert_ne!(addresses[1], addresses[2]);
}

#[tokio::test]
async fn test_validation_failures() {
    let server = TestServer::start(0).await;

    let cases = [
        (json!({"password": "pw"}), "must include both password and name"),
        (json!({"name": "x"}), "must include both password and name"),
        (json!({"name": "x", "password": "pw", "mnemonic": "not a phrase"}), "invalid mnemonic"),
        (json!({"name": "x", "password": "pw", "account": "abc"}), "invalid account number"),
        (json!({"name": "x", "password": "pw", "index": -1}), "invalid index number"),
    ];

    for (body, message) in cases {
        let (status, text) = send(&server, reqwest::Method::POST, "/keys", &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert!(error_of(&text).contains(message), "{body}: {text}");
    }

    let (status, text) = send(
        &server,
        reqwest::Method::PUT,
        "/keys/x",
        &json!({"old_password": "a"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_of(&text).contains("old_password and new_password"));

    let (_, keys) = get(&server, "/keys").await;
    assert_eq!(keys, json!([]));
}

#[tokio::test]
async fn test_concurrent_creates_have_one_winner() {
    let fixture = common::load_fixture("keys/jack.json").unwrap();
    let server = TestServer::start(0).await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let http = server.http.clone();
        let url = server.url("/keys");
        let body = json!({"name": "race", "password": "pw", "mnemonic": fixture["mnemonic"]});
        tasks.push(tokio::spawn(async move {
            http.post(url).json(&body).send().await.unwrap().status()
        }));
    }

    let mut ok = 0;
    for task in tasks {
        match task.await.unwrap() {
            StatusCode::OK => ok += 1,
            StatusCode::BAD_REQUEST => {}
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(ok, 1);

    let (_, keys) = get(&server, "/keys").await;
    assert_eq!(keys.as_array().unwrap().len(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn test_any_valid_name_round_trips(name in common::key_name()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (created, shown) = runtime.block_on(async {
            let server = TestServer::start(0).await;
            let (status, body) = send(
                &server,
                reqwest::Method::POST,
                "/keys",
                &json!({"name": name, "password": "pw"}),
            )
            .await;
            assert_eq!(status, StatusCode::OK, "{body}");
            let created: Value = serde_json::from_str(&body).unwrap();
            let (status, shown) = get(&server, &format!("/keys/{name}")).await;
            assert_eq!(status, StatusCode::OK);
            (created, shown)
        });
        prop_assert_eq!(&shown["name"], &created["name"]);
        prop_assert_eq!(&shown["address"], &created["address"]);
    }
}
