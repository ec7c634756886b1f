use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tally_core::engine::types::{Destination, PaymentId, PublicKey, SubaddressIndex};
use tally_core::engine::{HttpEngineClient, NetworkType, WalletEngine};
use tally_core::{CoreError, EngineError};

/// In-process JSON-RPC wallet engine. Records every request body it sees.
#[derive(Default)]
struct StubEngine {
    requests: Mutex<Vec<Value>>,
    reverse_batches: bool,
    drop_last_batch_item: bool,
    reject_batches: bool,
    fail_status: Option<StatusCode>,
}

impl StubEngine {
    fn requests(&self) -> Vec<Value> {
        self.requests.lock().expect("stub lock poisoned").clone()
    }

    fn batch_sizes(&self) -> Vec<usize> {
        let mut sizes: Vec<usize> = self
            .requests()
            .iter()
            .filter_map(|body| body.as_array().map(Vec::len))
            .collect();
        sizes.sort_unstable();
        sizes
    }

    fn single_methods(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|body| body["method"].as_str().map(str::to_owned))
            .collect()
    }
}

fn answer(request: &Value) -> Value {
    let id = request["id"].clone();
    let params = &request["params"];
    let result = match request["method"].as_str().unwrap_or_default() {
        "get_height" => json!({ "height": 1234 }),
        "get_network_type" => json!({ "nettype": "testnet" }),
        "get_payments" => json!({
            "payments": [[
                "ab".repeat(8) + &"0".repeat(48),
                {
                    "tx_hash": "01".repeat(32),
                    "amount": 700,
                    "subaddr_index": { "major": 0, "minor": 3 },
                    "block_height": 1200,
                    "timestamp": 1_700_000_000u64,
                    "pay_type": "in"
                }
            ]]
        }),
        "get_subaddress_label" => json!({
            "label": format!("acct{}/{}", params[0], params[1])
        }),
        "get_destination_address" => json!({
            "address": format!(
                "{}-{}",
                params[1].as_str().unwrap_or_default(),
                params[0]["amount"]
            )
        }),
        _ => {
            return json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": "Method not found" }
            });
        }
    };
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

async fn rpc(State(stub): State<Arc<StubEngine>>, Json(body): Json<Value>) -> Response {
    stub.requests
        .lock()
        .expect("stub lock poisoned")
        .push(body.clone());

    if let Some(status) = stub.fail_status {
        return (status, "upstream wallet is not running").into_response();
    }

    match body.as_array() {
        Some(_) if stub.reject_batches => {
            (StatusCode::INTERNAL_SERVER_ERROR, "batch requests disabled").into_response()
        }
        Some(calls) => {
            let mut replies: Vec<Value> = calls.iter().map(answer).collect();
            if stub.reverse_batches {
                replies.reverse();
            }
            if stub.drop_last_batch_item {
                replies.pop();
            }
            Json(Value::Array(replies)).into_response()
        }
        None => Json(answer(&body)).into_response(),
    }
}

async fn spawn_stub(stub: Arc<StubEngine>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("stub listener must bind");
    let addr = listener.local_addr().expect("stub must have an address");
    let app = Router::new().route("/json_rpc", post(rpc)).with_state(stub);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}/json_rpc")
}

async fn client_for(stub: &Arc<StubEngine>, batch_chunk_size: usize) -> HttpEngineClient {
    let url = spawn_stub(Arc::clone(stub)).await;
    HttpEngineClient::new(&url, None, None, None, None, batch_chunk_size)
        .expect("client must build")
}

fn destination(amount: u64) -> (Destination, PaymentId) {
    let dest = Destination {
        amount,
        spend_public_key: PublicKey::from([amount as u8; 32]),
        view_public_key: PublicKey::from([0xee; 32]),
        is_subaddress: false,
        is_integrated: false,
        original: None,
    };
    (dest, PaymentId::default())
}

#[tokio::test]
async fn single_calls_decode_typed_results() {
    let stub = Arc::new(StubEngine::default());
    let client = client_for(&stub, 50).await;

    assert_eq!(client.blockchain_height().await.unwrap(), 1234);
    assert_eq!(client.network_type().await.unwrap(), NetworkType::Testnet);

    let incoming = client.incoming_payments(10, 2000).await.unwrap();
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].1.amount, 700);
    assert_eq!(incoming[0].1.subaddr_index, SubaddressIndex::new(0, 3));

    let requests = stub.requests();
    assert_eq!(requests[2]["method"], json!("get_payments"));
    assert_eq!(requests[2]["params"], json!([10, 2000]));
}

#[tokio::test]
async fn unknown_method_surfaces_server_error() {
    let stub = Arc::new(StubEngine::default());
    let client = client_for(&stub, 50).await;

    let err = client.pool_payments().await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Engine(EngineError::ServerError { code: -32601, .. })
    ));
}

#[tokio::test]
async fn batched_labels_follow_request_order_across_reordered_chunks() {
    let stub = Arc::new(StubEngine {
        reverse_batches: true,
        ..Default::default()
    });
    let client = client_for(&stub, 2).await;

    let indices: Vec<SubaddressIndex> = (0..5).map(|minor| SubaddressIndex::new(1, minor)).collect();
    let labels = client.subaddress_labels(&indices).await.unwrap();

    let expected: Vec<String> = (0..5).map(|minor| format!("acct1/{minor}")).collect();
    assert_eq!(labels, expected);
    assert_eq!(stub.batch_sizes(), vec![1, 2, 2]);
    assert!(stub.single_methods().is_empty());
}

#[tokio::test]
async fn missing_batch_item_is_reported() {
    let stub = Arc::new(StubEngine {
        drop_last_batch_item: true,
        ..Default::default()
    });
    let client = client_for(&stub, 50).await;

    let err = client
        .destination_addresses(&[destination(1), destination(2)], NetworkType::Mainnet)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Engine(EngineError::MissingBatchItem { .. })
    ));
}

#[tokio::test]
async fn rejected_label_batch_falls_back_to_sequential_calls() {
    let stub = Arc::new(StubEngine {
        reject_batches: true,
        ..Default::default()
    });
    let client = client_for(&stub, 50).await;

    let indices = [
        SubaddressIndex::new(0, 4),
        SubaddressIndex::new(2, 0),
        SubaddressIndex::new(0, 1),
    ];
    let labels = client.subaddress_labels(&indices).await.unwrap();

    assert_eq!(labels, vec!["acct0/4", "acct2/0", "acct0/1"]);
    assert_eq!(stub.batch_sizes(), vec![3]);
    assert_eq!(stub.single_methods(), vec!["get_subaddress_label"; 3]);
}

#[tokio::test]
async fn cached_destination_addresses_skip_the_engine() {
    let stub = Arc::new(StubEngine::default());
    let client = client_for(&stub, 50).await;

    let first = client
        .destination_addresses(&[destination(1), destination(2)], NetworkType::Testnet)
        .await
        .unwrap();
    assert_eq!(first, vec!["testnet-1", "testnet-2"]);

    let second = client
        .destination_addresses(
            &[destination(2), destination(3), destination(1)],
            NetworkType::Testnet,
        )
        .await
        .unwrap();
    assert_eq!(second, vec!["testnet-2", "testnet-3", "testnet-1"]);

    // Only the unseen destination went out in the second batch.
    let requests = stub.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].as_array().map(Vec::len), Some(1));
    assert_eq!(requests[1][0]["params"][0]["amount"], json!(3));

    let single = client
        .destination_address(&destination(3).0, NetworkType::Testnet, &PaymentId::default())
        .await
        .unwrap();
    assert_eq!(single, "testnet-3");
    assert_eq!(stub.requests().len(), 2);
}

#[tokio::test]
async fn error_status_without_rpc_body_is_unavailable() {
    let stub = Arc::new(StubEngine {
        fail_status: Some(StatusCode::SERVICE_UNAVAILABLE),
        ..Default::default()
    });
    let client = client_for(&stub, 50).await;

    let err = client.blockchain_height().await.unwrap_err();
    assert!(matches!(err, CoreError::Engine(EngineError::Unavailable(_))));
}
