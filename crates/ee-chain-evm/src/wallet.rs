use async_trait::async_trait;
use ee_api_types::{Address, U256, parse_address};
use ee_chain_client::{
    AccountsListener, ClientError, ClientResult, ListenerId, ListenerSet, WalletProvider,
};
use serde_json::{Value, json};
use std::rc::Rc;
use tracing::warn;

use crate::rpc::{JsonRpcTransport, RpcError};

/// Wallet backed by JSON-RPC account methods.
///
/// Account-change notifications are pushed in by whoever owns the event
/// source (the browser bridge, or a node-side account switch) through
/// [`RpcWallet::emit_accounts_changed`].
pub struct RpcWallet<T> {
    transport: Rc<T>,
    listeners: ListenerSet,
}

impl<T: JsonRpcTransport> RpcWallet<T> {
    pub fn new(transport: Rc<T>) -> Self {
        Self {
            transport,
            listeners: ListenerSet::default(),
        }
    }

    pub fn emit_accounts_changed(&self, accounts: &[Address]) {
        self.listeners.emit(accounts);
    }

    async fn account_list(&self, method: &str) -> ClientResult<Vec<Address>> {
        if !self.transport.is_available() {
            return Err(ClientError::WalletUnavailable);
        }
        let raw = self
            .transport
            .request(method, json!([]))
            .await
            .map_err(|err| map_wallet_error(method, err))?;
        parse_accounts(&raw)
    }
}

fn map_wallet_error(method: &str, err: RpcError) -> ClientError {
    if err.is_user_rejection() {
        ClientError::AuthorizationDenied(err.to_string())
    } else {
        ClientError::remote(format!("{method}: {err}"))
    }
}

/// Accounts arrive as hex strings; unparseable entries are dropped.
pub fn parse_accounts(raw: &Value) -> ClientResult<Vec<Address>> {
    let entries = raw
        .as_array()
        .ok_or_else(|| ClientError::remote(format!("expected an account list, got {raw}")))?;
    Ok(entries
        .iter()
        .filter_map(|entry| {
            let text = entry.as_str()?;
            match parse_address(text) {
                Ok(address) => Some(address),
                Err(err) => {
                    warn!(account = text, "ignoring malformed account: {err}");
                    None
                }
            }
        })
        .collect())
}

#[async_trait(?Send)]
impl<T: JsonRpcTransport> WalletProvider for RpcWallet<T> {
    fn is_available(&self) -> bool {
        self.transport.is_available()
    }

    async fn accounts(&self) -> ClientResult<Vec<Address>> {
        self.account_list("eth_accounts").await
    }

    async fn request_accounts(&self) -> ClientResult<Vec<Address>> {
        self.account_list("eth_requestAccounts").await
    }

    async fn balance(&self, account: &Address) -> ClientResult<U256> {
        if !self.transport.is_available() {
            return Err(ClientError::WalletUnavailable);
        }
        let raw = self
            .transport
            .request("eth_getBalance", json!([account, "latest"]))
            .await
            .map_err(|err| map_wallet_error("eth_getBalance", err))?;
        serde_json::from_value(raw).map_err(|err| ClientError::remote(format!("eth_getBalance: {err}")))
    }

    fn on_accounts_changed(&self, listener: AccountsListener) -> ListenerId {
        self.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::time::Duration;

    struct FixedTransport {
        available: bool,
        response: Result<Value, RpcError>,
        methods: RefCell<Vec<String>>,
    }

    #[async_trait(?Send)]
    impl JsonRpcTransport for FixedTransport {
        async fn request(&self, method: &str, _params: Value) -> Result<Value, RpcError> {
            self.methods.borrow_mut().push(method.to_owned());
            self.response.clone()
        }

        async fn pause(&self, _duration: Duration) {}

        fn is_available(&self) -> bool {
            self.available
        }
    }

    fn wallet(available: bool, response: Result<Value, RpcError>) -> RpcWallet<FixedTransport> {
        RpcWallet::new(Rc::new(FixedTransport {
            available,
            response,
            methods: RefCell::new(Vec::new()),
        }))
    }

    #[tokio::test]
    async fn reads_authorized_accounts() -> anyhow::Result<()> {
        let wallet = wallet(
            true,
            Ok(json!([
                "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed",
                "not-an-address",
                "0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
            ])),
        );
        let accounts = wallet.accounts().await?;
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].to_checksum(None), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
        assert_eq!(wallet.transport.methods.borrow()[0], "eth_accounts");
        Ok(())
    }

    #[tokio::test]
    async fn missing_extension_is_wallet_unavailable() {
        let wallet = wallet(false, Ok(json!([])));
        assert_eq!(wallet.request_accounts().await, Err(ClientError::WalletUnavailable));
        assert!(wallet.transport.methods.borrow().is_empty());
    }

    #[tokio::test]
    async fn rejected_prompt_is_authorization_denied() {
        let wallet = wallet(
            true,
            Err(RpcError::Rpc {
                code: 4001,
                message: "User rejected the request.".to_owned(),
            }),
        );
        assert!(matches!(
            wallet.request_accounts().await,
            Err(ClientError::AuthorizationDenied(_))
        ));
    }

    #[tokio::test]
    async fn balance_is_parsed_from_quantity() -> anyhow::Result<()> {
        let wallet = wallet(true, Ok(json!("0xde0b6b3a7640000")));
        assert_eq!(wallet.balance(&Address::ZERO).await?, U256::from(1_000_000_000_000_000_000_u128));
        Ok(())
    }

    #[tokio::test]
    async fn balance_beyond_128_bits_is_kept() -> anyhow::Result<()> {
        let wallet = wallet(true, Ok(json!("0x100000000000000000000000000000000")));
        assert_eq!(wallet.balance(&Address::ZERO).await?, U256::from(1) << 128);
        Ok(())
    }

    #[tokio::test]
    async fn non_quantity_balance_is_a_remote_failure() {
        let wallet = wallet(true, Ok(json!(true)));
        assert!(matches!(
            wallet.balance(&Address::ZERO).await,
            Err(ClientError::RemoteCallFailed(_))
        ));
    }

    #[test]
    fn emitted_changes_reach_listeners() {
        let wallet = wallet(true, Ok(json!([])));
        let seen = Rc::new(RefCell::new(0));
        let sink = seen.clone();
        wallet.on_accounts_changed(Rc::new(move |_accounts: Vec<Address>| *sink.borrow_mut() += 1));
        wallet.emit_accounts_changed(&[]);
        assert_eq!(*seen.borrow(), 1);
    }
}
