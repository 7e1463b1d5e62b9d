//! Bridge to the injected browser wallet (`window.ethereum`).
//!
//! Every JSON-RPC call, reads included, goes through the wallet's
//! `request` function so the dApp talks to whatever network the user picked.

use async_trait::async_trait;
use ee_chain_evm::wallet::parse_accounts;
use ee_chain_evm::{JsonRpcTransport, RpcError, RpcWallet};
use gloo_timers::future::TimeoutFuture;
use js_sys::{Function, Promise, Reflect};
use serde::Serialize;
use serde_json::{Value, json};
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

#[wasm_bindgen]
extern "C" {
    /// EIP-1193 provider object.
    #[derive(Debug, Clone)]
    pub type EthereumProvider;

    #[wasm_bindgen(method, catch)]
    fn request(this: &EthereumProvider, args: &JsValue) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method)]
    fn on(this: &EthereumProvider, event: &str, listener: &Function);
}

/// `window.ethereum`, if an extension injected one.
pub fn detect() -> Option<EthereumProvider> {
    let window = web_sys::window()?;
    let provider = Reflect::get(&window, &JsValue::from_str("ethereum")).ok()?;
    if provider.is_undefined() || provider.is_null() {
        None
    } else {
        Some(provider.unchecked_into())
    }
}

pub struct Eip1193Transport {
    provider: Option<EthereumProvider>,
}

impl Eip1193Transport {
    pub fn detect() -> Self {
        let provider = detect();
        debug!(available = provider.is_some(), "browser wallet probe");
        Self { provider }
    }

    pub fn provider(&self) -> Option<&EthereumProvider> {
        self.provider.as_ref()
    }
}

/// Provider errors carry `{ code, message }`; anything else is a transport
/// failure.
fn rpc_error(err: JsValue) -> RpcError {
    let field = |name: &str| Reflect::get(&err, &JsValue::from_str(name)).ok();
    let code = field("code").and_then(|value| value.as_f64());
    let message = field("message").and_then(|value| value.as_string());
    match (code, message) {
        (Some(code), Some(message)) => RpcError::Rpc {
            code: code as i64,
            message,
        },
        (None, Some(message)) => RpcError::Transport(message),
        _ => RpcError::Transport(format!("{err:?}")),
    }
}

#[async_trait(?Send)]
impl JsonRpcTransport for Eip1193Transport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| RpcError::Transport("no browser wallet".to_owned()))?;
        let args = json!({ "method": method, "params": params })
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|err| RpcError::Malformed(err.to_string()))?;

        let promise = provider.request(&args).map_err(rpc_error)?;
        let result = JsFuture::from(promise).await.map_err(rpc_error)?;
        if result.is_undefined() || result.is_null() {
            return Ok(Value::Null);
        }
        serde_wasm_bindgen::from_value(result).map_err(|err| RpcError::Malformed(err.to_string()))
    }

    async fn pause(&self, duration: Duration) {
        let millis = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        TimeoutFuture::new(millis).await;
    }

    fn is_available(&self) -> bool {
        self.provider.is_some()
    }
}

/// Feeds the provider's `accountsChanged` events into `wallet`.
pub fn forward_account_changes(transport: &Eip1193Transport, wallet: Rc<RpcWallet<Eip1193Transport>>) {
    let Some(provider) = transport.provider() else {
        return;
    };
    let listener = Closure::<dyn FnMut(JsValue)>::new(move |accounts: JsValue| {
        let raw: Value = serde_wasm_bindgen::from_value(accounts).unwrap_or(Value::Array(Vec::new()));
        match parse_accounts(&raw) {
            Ok(accounts) => wallet.emit_accounts_changed(&accounts),
            Err(err) => warn!("ignoring unreadable accountsChanged payload: {err}"),
        }
    });
    provider.on("accountsChanged", listener.as_ref().unchecked_ref());
    listener.forget();
}
