//! The `keys` and `tx` client commands against a running gateway.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]

use keyserver::cli::commands::{ApiClient, ClientError, KeysCommand, TxCommand};
use keyserver::cli::{KeysCommands, TxCommands};
use serde_json::Value;

use crate::common::{self, TestServer};

fn keys(server: &TestServer, command: KeysCommands) -> KeysCommand {
    KeysCommand::new(ApiClient::new(&server.base_url), command)
}

fn tx(server: &TestServer, command: TxCommands) -> TxCommand {
    TxCommand::new(ApiClient::new(&server.base_url), command)
}

fn json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn test_keys_commands() {
    let fixture = common::load_fixture("keys/jack.json").unwrap();
    let server = TestServer::start(0).await;

    let add = KeysCommands::Add {
        name: "jack".into(),
        password: "123456789".into(),
        mnemonic: Some(fixture["mnemonic"].as_str().unwrap().into()),
        account: 0,
        index: 0,
    };
    let created = json(&keys(&server, add).execute().await.unwrap());
    assert_eq!(created["address"], fixture["expected"]["acc"]["address"]);

    let show = KeysCommands::Show {
        name: "jack".into(),
        bech: "val".into(),
    };
    let shown = json(&keys(&server, show).execute().await.unwrap());
    assert_eq!(shown["address"], fixture["expected"]["val"]["address"]);

    let listed = json(&keys(&server, KeysCommands::List).execute().await.unwrap());
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let update = KeysCommands::Update {
        name: "jack".into(),
        old_password: "123456789".into(),
        new_password: "foobarbaz".into(),
    };
    assert!(keys(&server, update).execute().await.unwrap().is_empty());

    let stale_delete = KeysCommands::Delete {
        name: "jack".into(),
        password: "123456789".into(),
    };
    match keys(&server, stale_delete).execute().await {
        Err(ClientError::Status { status, message }) => {
            assert_eq!(status, 401);
            assert!(!message.is_empty());
        }
        other => panic!("expected 401, got {other:?}"),
    }

    let delete = KeysCommands::Delete {
        name: "jack".into(),
        password: "foobarbaz".into(),
    };
    assert!(keys(&server, delete).execute().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_tx_commands_through_files() {
    let fixture = common::load_fixture("keys/jack.json").unwrap();
    let server = TestServer::start(80_000).await;
    let address = fixture["expected"]["acc"]["address"].as_str().unwrap();

    keys(
        &server,
        KeysCommands::Add {
            name: "jack".into(),
            password: "123456789".into(),
            mnemonic: Some(fixture["mnemonic"].as_str().unwrap().into()),
            account: 0,
            index: 0,
        },
    )
    .execute()
    .await
    .unwrap();

    let send = TxCommands::Send {
        sender: address.into(),
        receiver: address.into(),
        amount: "3stake".into(),
        chain_id: "test-chain".into(),
        memo: String::new(),
        fees: String::new(),
        gas_adjustment: Some("1.25".into()),
    };
    let unsigned = tx(&server, send).execute().await.unwrap();
    assert_eq!(json(&unsigned)["value"]["fee"]["gas"], "100000");

    let files = common::temp_data_dir();
    let unsigned_path = files.path().join("unsigned.json");
    std::fs::write(&unsigned_path, &unsigned).unwrap();

    let sign = TxCommands::Sign {
        name: "jack".into(),
        password: "123456789".into(),
        chain_id: "test-chain".into(),
        account_number: "0".into(),
        sequence: "0".into(),
        tx_file: unsigned_path,
    };
    let signed = tx(&server, sign).execute().await.unwrap();
    let signed_path = files.path().join("signed.json");
    std::fs::write(&signed_path, &signed).unwrap();

    let ack = tx(&server, TxCommands::Broadcast { tx_file: signed_path })
        .execute()
        .await
        .unwrap();
    assert_eq!(json(&ack)["txhash"].as_str().unwrap().len(), 64);

    let missing = TxCommands::Broadcast {
        tx_file: files.path().join("absent.json"),
    };
    assert!(matches!(
        tx(&server, missing).execute().await,
        Err(ClientError::ReadFile { .. })
    ));
}
