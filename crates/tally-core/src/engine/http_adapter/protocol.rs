use crate::error::{CoreError, EngineError};

#[derive(serde::Serialize)]
pub(super) struct JsonRpcRequest<'a> {
    pub(super) jsonrpc: &'static str,
    pub(super) id: u64,
    pub(super) method: &'a str,
    pub(super) params: &'a [serde_json::Value],
}

/// A response object. `id` is only inspected for batch replies, which may
/// arrive in any order.
#[derive(serde::Deserialize)]
pub(super) struct JsonRpcResponse {
    #[serde(default)]
    pub(super) id: serde_json::Value,
    pub(super) result: Option<serde_json::Value>,
    pub(super) error: Option<serde_json::Value>,
}

impl JsonRpcResponse {
    pub(super) fn into_result(self) -> Result<serde_json::Value, CoreError> {
        if let Some(err) = self.error {
            return Err(parse_jsonrpc_error(err));
        }
        Ok(self.result.unwrap_or(serde_json::Value::Null))
    }
}

/// Map a JSON-RPC `{"code", "message"}` error object to a `ServerError`,
/// falling back to `InvalidResponse` for anything non-standard.
pub(super) fn parse_jsonrpc_error(err: serde_json::Value) -> CoreError {
    #[derive(serde::Deserialize)]
    struct JsonRpcError {
        code: i64,
        message: String,
    }

    match serde_json::from_value::<JsonRpcError>(err.clone()) {
        Ok(parsed) => EngineError::ServerError {
            code: parsed.code,
            message: parsed.message,
        }
        .into(),
        Err(_) => {
            EngineError::InvalidResponse(format!("non-standard JSON-RPC error: {err}")).into()
        }
    }
}

pub(super) fn parse_batch_id(id: &serde_json::Value) -> Result<u64, CoreError> {
    if let Some(n) = id.as_u64() {
        return Ok(n);
    }

    if let Some(s) = id.as_str() {
        return s.parse::<u64>().map_err(|e| {
            EngineError::InvalidResponse(format!("invalid batch response id string: {e}")).into()
        });
    }

    Err(EngineError::InvalidResponse(format!("invalid batch response id: {id}")).into())
}

/// Decode a typed result object, naming the method in the error.
pub(super) fn decode_result<T: serde::de::DeserializeOwned>(
    method: &str,
    raw: serde_json::Value,
) -> Result<T, CoreError> {
    serde_json::from_value(raw).map_err(|e| {
        EngineError::InvalidResponse(format!("invalid {method} result: {e}")).into()
    })
}
