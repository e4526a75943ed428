use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64_STD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::metrics::{inc_rpc_errors, inc_rpc_requests};

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rpc error {}: {}", self.code, self.message)?;
        if let Some(name) = &self.name {
            write!(f, " ({name})")?;
        }
        match &self.data {
            Some(Value::String(s)) => write!(f, ": {s}"),
            Some(other) => write!(f, ": {other}"),
            None => Ok(()),
        }
    }
}

/// Node identity returned by the `status` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatus {
    pub chain_id: String,
    pub latest_block_height: u64,
}

#[derive(Debug, Deserialize)]
struct StatusResult {
    chain_id: String,
    sync_info: SyncInfo,
}

#[derive(Debug, Deserialize)]
struct SyncInfo {
    latest_block_height: u64,
}

// `query` answers with either raw result bytes or a contract-side error string.
#[derive(Debug, Deserialize)]
struct CallFunctionResult {
    #[serde(default)]
    result: Option<Vec<u8>>,
    #[serde(default)]
    error: Option<String>,
}

/// JSON-RPC client for a NEAR node. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RpcClient {
    url: String,
    http: reqwest::Client,
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            url: url.into(),
            http,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Raw JSON-RPC call returning the `result` member.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        inc_rpc_requests(method);
        let res = self.call_inner(method, params).await;
        if let Err(e) = &res {
            inc_rpc_errors(method);
            tracing::warn!(target = "rpc", "{method} against {} failed: {e:#}", self.url);
        }
        res
    }

    async fn call_inner(&self, method: &str, params: Value) -> Result<Value> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        let resp = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("send {method}"))?
            .error_for_status()
            .with_context(|| format!("{method} http status"))?;
        let body: RpcResponse = resp
            .json()
            .await
            .with_context(|| format!("decode {method} response"))?;

        if let Some(err) = body.error {
            return Err(anyhow!("{err}"));
        }
        body.result
            .ok_or_else(|| anyhow!("{method} response carried neither result nor error"))
    }

    /// Connectivity check.
    pub async fn status(&self) -> Result<NodeStatus> {
        let raw = self.call("status", json!([])).await?;
        let status: StatusResult = serde_json::from_value(raw).context("decode node status")?;
        Ok(NodeStatus {
            chain_id: status.chain_id,
            latest_block_height: status.sync_info.latest_block_height,
        })
    }

    /// Read-only contract call at final finality; the returned bytes are
    /// decoded as JSON.
    pub async fn view_call(&self, contract: &str, method: &str, args: &Value) -> Result<Value> {
        let args = serde_json::to_vec(args).context("encode view args")?;
        let params = json!({
            "request_type": "call_function",
            "finality": "final",
            "account_id": contract,
            "method_name": method,
            "args_base64": BASE64_STD.encode(args),
        });
        let raw = self.call("query", params).await?;
        let out: CallFunctionResult =
            serde_json::from_value(raw).context("decode call_function result")?;

        if let Some(err) = out.error {
            return Err(anyhow!("{contract}.{method} failed: {err}"));
        }
        let bytes = out
            .result
            .ok_or_else(|| anyhow!("{contract}.{method} returned no result"))?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes)
            .with_context(|| format!("{contract}.{method} returned non-JSON bytes"))
    }
}
