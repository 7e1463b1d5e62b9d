use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// EIP-1193 code for "the user rejected the request".
pub const USER_REJECTED: i64 = 4001;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("{message} (code {code})")]
    Rpc { code: i64, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RpcError {
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, RpcError::Rpc { code, .. } if *code == USER_REJECTED)
    }
}

/// Anything that answers Ethereum JSON-RPC: a node over HTTP or the
/// browser wallet's `request` function.
#[async_trait(?Send)]
pub trait JsonRpcTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError>;

    /// Waits between receipt polls.
    async fn pause(&self, duration: Duration);

    fn is_available(&self) -> bool {
        true
    }
}

#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcErrorObject>,
}

impl JsonRpcResponse {
    pub fn into_result(self) -> Result<Value, RpcError> {
        if let Some(error) = self.error {
            return Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

#[cfg(feature = "http")]
pub use http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use super::*;
    use anyhow::Context;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tracing::debug;

    /// JSON-RPC over HTTP to a node.
    pub struct HttpTransport {
        endpoint: String,
        http: reqwest::Client,
        next_id: AtomicU64,
    }

    impl HttpTransport {
        pub fn new(endpoint: &str) -> Self {
            Self {
                endpoint: endpoint.trim_end_matches('/').to_owned(),
                http: reqwest::Client::new(),
                next_id: AtomicU64::new(1),
            }
        }

        async fn post(&self, body: &JsonRpcRequest<'_>) -> anyhow::Result<JsonRpcResponse> {
            let response = self
                .http
                .post(&self.endpoint)
                .json(body)
                .send()
                .await
                .with_context(|| format!("{} transport", body.method))?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                anyhow::bail!("{} HTTP {status}: {text}", body.method);
            }

            response
                .json()
                .await
                .with_context(|| format!("{} parse", body.method))
        }
    }

    #[async_trait(?Send)]
    impl JsonRpcTransport for HttpTransport {
        async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
            let body = JsonRpcRequest {
                jsonrpc: "2.0",
                id: self.next_id.fetch_add(1, Ordering::Relaxed),
                method,
                params,
            };
            debug!(method, id = body.id, "json-rpc request");
            self.post(&body)
                .await
                .map_err(|err| RpcError::Transport(format!("{err:#}")))?
                .into_result()
        }

        async fn pause(&self, duration: Duration) {
            tokio::time::sleep(duration).await;
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn trailing_slash_is_dropped() {
            assert_eq!(HttpTransport::new("http://127.0.0.1:7545/").endpoint, "http://127.0.0.1:7545");
        }

        #[tokio::test]
        async fn unreachable_node_is_a_transport_error() -> anyhow::Result<()> {
            let transport = HttpTransport::new("http://127.0.0.1:1");
            let err = transport
                .request("eth_chainId", Value::Array(Vec::new()))
                .await
                .err()
                .context("request to a closed port succeeded")?;
            assert!(matches!(err, RpcError::Transport(message) if message.contains("eth_chainId")));
            Ok(())
        }
    }
}
