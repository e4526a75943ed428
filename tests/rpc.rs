use base64::engine::general_purpose::STANDARD as BASE64_STD;
use base64::Engine;
use bridge::rpc::RpcClient;
use mockito::{Matcher, Server};
use serde_json::{json, Value};
use std::time::Duration;

fn client(url: String) -> RpcClient {
    RpcClient::new(url, Duration::from_secs(2)).expect("client")
}

fn view_result(value: &Value) -> String {
    let bytes = serde_json::to_vec(value).unwrap();
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": { "result": bytes, "logs": [], "block_height": 10, "block_hash": "abc" }
    })
    .to_string()
}

#[tokio::test]
async fn status_reports_chain_and_height() {
    let mut server = Server::new_async().await;
    let m = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({ "jsonrpc": "2.0", "method": "status" })))
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "chain_id": "testnet",
                    "sync_info": { "latest_block_height": 98765, "syncing": false }
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let status = client(server.url()).status().await.unwrap();
    assert_eq!(status.chain_id, "testnet");
    assert_eq!(status.latest_block_height, 98765);
    m.assert_async().await;
}

#[tokio::test]
async fn view_call_encodes_args_and_decodes_result() {
    let mut server = Server::new_async().await;
    let args = json!({ "account_id": "alice.testnet" });
    let m = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({
            "method": "query",
            "params": {
                "request_type": "call_function",
                "finality": "final",
                "account_id": "wnear.testnet",
                "method_name": "ft_balance_of",
                "args_base64": BASE64_STD.encode(serde_json::to_vec(&args).unwrap()),
            }
        })))
        .with_header("content-type", "application/json")
        .with_body(view_result(&json!("1000000000000000000000000")))
        .create_async()
        .await;

    let out = client(server.url())
        .view_call("wnear.testnet", "ft_balance_of", &args)
        .await
        .unwrap();
    assert_eq!(out, json!("1000000000000000000000000"));
    m.assert_async().await;
}

#[tokio::test]
async fn contract_panic_is_an_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "error": "wasm execution failed with error: MethodNotFound",
                    "logs": [],
                    "block_height": 10,
                    "block_hash": "abc"
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let err = client(server.url())
        .view_call("wnear.testnet", "nope", &json!({}))
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("MethodNotFound"));
}

#[tokio::test]
async fn rpc_error_object_is_an_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {
                    "code": -32000,
                    "message": "Server error",
                    "name": "HANDLER_ERROR",
                    "data": "account unknown.testnet does not exist"
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let err = client(server.url()).status().await.unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("-32000"));
    assert!(msg.contains("does not exist"));
}

#[tokio::test]
async fn http_failure_is_an_error() {
    let mut server = Server::new_async().await;
    server.mock("POST", "/").with_status(503).create_async().await;

    assert!(client(server.url()).status().await.is_err());
}

#[tokio::test]
async fn empty_result_bytes_decode_to_null() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "jsonrpc": "2.0", "id": 1, "result": { "result": [], "logs": [] } }).to_string(),
        )
        .create_async()
        .await;

    let out = client(server.url())
        .view_call("c.testnet", "m", &json!({}))
        .await
        .unwrap();
    assert_eq!(out, Value::Null);
}
