use std::collections::HashMap;
use std::num::{NonZeroU32, NonZeroUsize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use futures::future::try_join_all;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use lru::LruCache;
use reqwest::header;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use crate::error::{CoreError, EngineError};

use super::super::types::{
    Destination, IncomingLedger, OutgoingLedger, PaymentId, PendingLedger, PoolLedger,
    SubaddressIndex,
};
use super::super::{NetworkType, WalletEngine};
use super::connection::{parse_connection, resolve_auth};
use super::protocol::{decode_result, parse_batch_id, JsonRpcRequest, JsonRpcResponse};

/// Maximum number of rendered destination addresses cached in memory.
const ADDRESS_CACHE_CAP: usize = 10_000;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;
type AddressKey = (Destination, NetworkType, PaymentId);

// ==============================================================================
// Result Shapes
// ==============================================================================

#[derive(Deserialize)]
struct HeightResult {
    height: u64,
}

#[derive(Deserialize)]
struct NetworkResult {
    nettype: NetworkType,
}

#[derive(Deserialize)]
struct PaymentsResult<T> {
    #[serde(default = "Vec::new")]
    payments: Vec<T>,
}

#[derive(Deserialize)]
struct TransfersResult<T> {
    #[serde(default = "Vec::new")]
    transfers: Vec<T>,
}

#[derive(Deserialize)]
struct LabelResult {
    #[serde(default)]
    label: String,
}

#[derive(Deserialize)]
struct AddressResult {
    address: String,
}

// ==============================================================================
// Client
// ==============================================================================

/// Wallet engine JSON-RPC client over HTTP(S).
///
/// Label and address lookups for a refresh are sent as chunked batch calls.
/// Rendered addresses are a pure function of destination, network and
/// payment id, so they are kept in a bounded LRU cache and never invalidated.
pub struct HttpEngineClient {
    client: reqwest::Client,
    url: String,
    auth: Option<(String, String)>,
    limiter: Option<DirectRateLimiter>,
    batch_chunk_size: usize,
    next_id: AtomicU64,
    address_cache: Mutex<LruCache<AddressKey, String>>,
}

impl HttpEngineClient {
    /// Create a client for an `http://` or `https://` engine endpoint.
    ///
    /// Authentication precedence:
    /// 1. explicit `user` + `pass`
    /// 2. cookie file (`username:password`) from `cookie_file`
    /// 3. no auth
    ///
    /// If `requests_per_second` is set, outbound HTTP requests are
    /// rate-limited (a batch counts as one request).
    pub fn new(
        connection: &str,
        user: Option<&str>,
        pass: Option<&str>,
        cookie_file: Option<&Path>,
        requests_per_second: Option<u32>,
        batch_chunk_size: usize,
    ) -> Result<Self, CoreError> {
        if batch_chunk_size == 0 {
            return Err(CoreError::InvalidData(
                "engine batch chunk size must be at least 1".to_owned(),
            ));
        }
        let auth = resolve_auth(user, pass, cookie_file)?;
        let url = parse_connection(connection)?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(8)
            .tcp_nodelay(true)
            .build()
            .map_err(EngineError::Transport)?;

        let limiter = match requests_per_second {
            None => None,
            Some(limit) => {
                let limit = NonZeroU32::new(limit).ok_or_else(|| {
                    CoreError::InvalidData("requests_per_second must be at least 1".to_owned())
                })?;
                Some(RateLimiter::direct(Quota::per_second(limit)))
            }
        };

        let cache_cap = NonZeroUsize::new(ADDRESS_CACHE_CAP)
            .ok_or_else(|| CoreError::InvalidData("address cache capacity is zero".to_owned()))?;

        Ok(Self {
            client,
            url,
            auth,
            limiter,
            batch_chunk_size,
            next_id: AtomicU64::new(initial_request_id()),
            address_cache: Mutex::new(LruCache::new(cache_cap)),
        })
    }

    /// Atomically reserve `count` consecutive request ids.
    fn reserve_request_ids(&self, count: u64) -> u64 {
        self.next_id.fetch_add(count, Ordering::Relaxed)
    }

    async fn wait_for_rate_limit(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        payload: &T,
    ) -> Result<(reqwest::StatusCode, String), CoreError> {
        let mut builder = self
            .client
            .post(&self.url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(payload);
        if let Some((ref user, ref pass)) = self.auth {
            builder = builder.basic_auth(user, Some(pass));
        }

        let response = builder.send().await.map_err(EngineError::Transport)?;
        let status = response.status();
        let body = response.text().await.map_err(EngineError::Transport)?;
        Ok((status, body))
    }

    async fn rpc_call(&self, method: &str, params: Vec<Value>) -> Result<Value, CoreError> {
        self.wait_for_rate_limit().await;
        let id = self.reserve_request_ids(1);
        debug!(rpc.id = id, rpc.method = method, rpc.params = params.len(), "engine call");

        let req = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params: &params,
        };
        let (status, body) = self.post_json(&req).await?;
        debug!(rpc.id = id, rpc.method = method, %status, body_len = body.len(), "engine response");
        trace!(rpc.id = id, rpc.method = method, body = %body, "engine response body");

        let decoded: JsonRpcResponse = decode_body(status, &body, "JSON-RPC response")?;
        decoded.into_result()
    }

    async fn rpc_batch(&self, calls: &[(&str, Vec<Value>)]) -> Result<Vec<Value>, CoreError> {
        self.wait_for_rate_limit().await;
        let start_id = self.reserve_request_ids(calls.len() as u64);
        debug!(
            rpc.batch_start_id = start_id,
            rpc.batch_size = calls.len(),
            "engine batch call"
        );
        let requests: Vec<JsonRpcRequest<'_>> = calls
            .iter()
            .enumerate()
            .map(|(offset, (method, params))| JsonRpcRequest {
                jsonrpc: "2.0",
                id: start_id + offset as u64,
                method,
                params,
            })
            .collect();

        let (status, body) = self.post_json(&requests).await?;
        debug!(
            rpc.batch_start_id = start_id,
            rpc.batch_size = calls.len(),
            %status,
            body_len = body.len(),
            "engine batch response"
        );
        trace!(rpc.batch_start_id = start_id, body = %body, "engine batch response body");

        let decoded: Vec<JsonRpcResponse> =
            decode_body(status, &body, "JSON-RPC batch response")?;

        let mut by_id: HashMap<u64, JsonRpcResponse> = HashMap::with_capacity(decoded.len());
        for item in decoded {
            by_id.insert(parse_batch_id(&item.id)?, item);
        }

        (start_id..start_id + calls.len() as u64)
            .map(|id| {
                by_id
                    .remove(&id)
                    .ok_or(EngineError::MissingBatchItem { id })?
                    .into_result()
            })
            .collect()
    }

    async fn rpc_batch_chunked(
        &self,
        calls: &[(&str, Vec<Value>)],
    ) -> Result<Vec<Value>, CoreError> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        // Chunks go out concurrently; each stays small enough for proxy
        // body limits.
        let chunk_futures: Vec<_> = calls
            .chunks(self.batch_chunk_size)
            .map(|chunk| self.rpc_batch(chunk))
            .collect();
        let chunked = try_join_all(chunk_futures).await?;
        Ok(chunked.into_iter().flatten().collect())
    }

    async fn call_typed<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, CoreError> {
        let raw = self.rpc_call(method, params).await?;
        decode_result(method, raw)
    }
}

/// A body that is not JSON-RPC is a protocol fault on a 2xx reply, and an
/// unreachable engine behind a failing proxy or server otherwise.
fn decode_body<T: serde::de::DeserializeOwned>(
    status: reqwest::StatusCode,
    body: &str,
    what: &str,
) -> Result<T, CoreError> {
    serde_json::from_str(body).map_err(|e| {
        let err = if status.is_success() {
            EngineError::InvalidResponse(format!("decode {what}: {e}; status={status}"))
        } else {
            EngineError::Unavailable(format!("HTTP {status} without a {what}"))
        };
        CoreError::from(err)
    })
}

fn label_params(index: &SubaddressIndex) -> Vec<Value> {
    vec![json!(index.major), json!(index.minor)]
}

fn address_params(
    destination: &Destination,
    network: NetworkType,
    payment_id: &PaymentId,
) -> Vec<Value> {
    vec![json!(destination), json!(network), json!(payment_id)]
}

#[async_trait]
impl WalletEngine for HttpEngineClient {
    async fn blockchain_height(&self) -> Result<u64, CoreError> {
        let result: HeightResult = self.call_typed("get_height", Vec::new()).await?;
        Ok(result.height)
    }

    async fn network_type(&self) -> Result<NetworkType, CoreError> {
        let result: NetworkResult = self.call_typed("get_network_type", Vec::new()).await?;
        Ok(result.nettype)
    }

    async fn incoming_payments(
        &self,
        min_height: u64,
        max_height: u64,
    ) -> Result<IncomingLedger, CoreError> {
        let result: PaymentsResult<_> = self
            .call_typed("get_payments", vec![json!(min_height), json!(max_height)])
            .await?;
        Ok(result.payments)
    }

    async fn outgoing_transfers(
        &self,
        min_height: u64,
        max_height: u64,
    ) -> Result<OutgoingLedger, CoreError> {
        let result: TransfersResult<_> = self
            .call_typed(
                "get_payments_out",
                vec![json!(min_height), json!(max_height)],
            )
            .await?;
        Ok(result.transfers)
    }

    async fn unconfirmed_outgoing_transfers(&self) -> Result<PendingLedger, CoreError> {
        let result: TransfersResult<_> = self
            .call_typed("get_unconfirmed_payments_out", Vec::new())
            .await?;
        Ok(result.transfers)
    }

    async fn pool_payments(&self) -> Result<PoolLedger, CoreError> {
        let result: PaymentsResult<_> = self
            .call_typed("get_unconfirmed_payments", Vec::new())
            .await?;
        Ok(result.payments)
    }

    async fn subaddress_label(&self, index: SubaddressIndex) -> Result<String, CoreError> {
        let result: LabelResult = self
            .call_typed("get_subaddress_label", label_params(&index))
            .await?;
        Ok(result.label)
    }

    async fn subaddress_labels(
        &self,
        indices: &[SubaddressIndex],
    ) -> Result<Vec<String>, CoreError> {
        let calls: Vec<(&str, Vec<Value>)> = indices
            .iter()
            .map(|index| ("get_subaddress_label", label_params(index)))
            .collect();

        let raw_results = match self.rpc_batch_chunked(&calls).await {
            Ok(results) => results,
            Err(batch_error) => {
                warn!(
                    label_count = indices.len(),
                    error = %batch_error,
                    "batch get_subaddress_label failed; falling back to sequential requests"
                );
                let mut sequential = Vec::with_capacity(indices.len());
                for index in indices {
                    sequential.push(self.subaddress_label(*index).await?);
                }
                return Ok(sequential);
            }
        };

        raw_results
            .into_iter()
            .map(|raw| decode_result::<LabelResult>("get_subaddress_label", raw).map(|r| r.label))
            .collect()
    }

    async fn destination_address(
        &self,
        destination: &Destination,
        network: NetworkType,
        payment_id: &PaymentId,
    ) -> Result<String, CoreError> {
        let key = (destination.clone(), network, *payment_id);
        if let Some(address) = self.address_cache.lock().await.get(&key).cloned() {
            return Ok(address);
        }

        let result: AddressResult = self
            .call_typed(
                "get_destination_address",
                address_params(destination, network, payment_id),
            )
            .await?;
        self.address_cache
            .lock()
            .await
            .put(key, result.address.clone());
        Ok(result.address)
    }

    async fn destination_addresses(
        &self,
        requests: &[(Destination, PaymentId)],
        network: NetworkType,
    ) -> Result<Vec<String>, CoreError> {
        // Serve what the cache already knows and batch the rest.
        let mut resolved: Vec<Option<String>> = {
            let mut cache = self.address_cache.lock().await;
            requests
                .iter()
                .map(|(dest, pid)| cache.get(&(dest.clone(), network, *pid)).cloned())
                .collect()
        };

        let missing: Vec<usize> = resolved
            .iter()
            .enumerate()
            .filter_map(|(i, address)| address.is_none().then_some(i))
            .collect();
        if missing.is_empty() {
            return Ok(resolved.into_iter().flatten().collect());
        }

        let calls: Vec<(&str, Vec<Value>)> = missing
            .iter()
            .map(|&i| {
                let (dest, pid) = &requests[i];
                ("get_destination_address", address_params(dest, network, pid))
            })
            .collect();
        let raw_results = self.rpc_batch_chunked(&calls).await?;

        let mut cache = self.address_cache.lock().await;
        for (&i, raw) in missing.iter().zip(raw_results) {
            let result: AddressResult = decode_result("get_destination_address", raw)?;
            let (dest, pid) = &requests[i];
            cache.put((dest.clone(), network, *pid), result.address.clone());
            resolved[i] = Some(result.address);
        }

        Ok(resolved.into_iter().flatten().collect())
    }
}

fn initial_request_id() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(1)
}
