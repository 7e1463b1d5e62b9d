use ee_api_types::{Address, Session};
use ee_chain_client::{AccountsListener, ClientError, ClientResult, ListenerId, WalletProvider};
use std::cell::Cell;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Reads and watches the wallet's authorized accounts.
pub struct WalletSessionProbe {
    wallet: Rc<dyn WalletProvider>,
    subscription: Cell<Option<ListenerId>>,
}

impl WalletSessionProbe {
    pub fn new(wallet: Rc<dyn WalletProvider>) -> Self {
        Self {
            wallet,
            subscription: Cell::new(None),
        }
    }

    /// Accounts the wallet already authorized. Never prompts and never
    /// fails; problems read as an empty session.
    pub async fn probe_session(&self) -> Session {
        if !self.wallet.is_available() {
            debug!("no wallet extension detected");
            return Session::empty();
        }
        match self.wallet.accounts().await {
            Ok(accounts) => Session::from_accounts(&accounts),
            Err(err) => {
                warn!("error checking wallet connection: {err}");
                Session::empty()
            }
        }
    }

    /// Prompts the wallet for authorization.
    pub async fn request_session(&self) -> ClientResult<Session> {
        if !self.wallet.is_available() {
            return Err(ClientError::WalletUnavailable);
        }
        let accounts = self.wallet.request_accounts().await.map_err(|err| match err {
            ClientError::RemoteCallFailed(message) => ClientError::AuthorizationDenied(message),
            other => other,
        })?;
        if accounts.is_empty() {
            return Err(ClientError::AuthorizationDenied("no account authorized".to_owned()));
        }
        let session = Session::from_accounts(&accounts);
        info!(account = ?session.active_address, "wallet connected");
        Ok(session)
    }

    /// Replaces any previous subscription, so at most one handler is live.
    pub fn subscribe_account_change(&self, handler: impl Fn(Vec<Address>) + 'static) {
        self.unsubscribe();
        let listener: AccountsListener = Rc::new(handler);
        self.subscription.set(Some(self.wallet.on_accounts_changed(listener)));
    }

    pub fn unsubscribe(&self) {
        if let Some(id) = self.subscription.take() {
            self.wallet.remove_listener(id);
        }
    }
}

impl Drop for WalletSessionProbe {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
