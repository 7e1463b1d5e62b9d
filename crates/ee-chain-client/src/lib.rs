use async_trait::async_trait;
use ee_api_types::{Address, ListingId, ListingRecord, Session, U256};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

mod config;
#[cfg(any(test, feature = "testing"))]
pub mod memory;

pub use config::{ContractConfig, DEFAULT_CONTRACT_ADDRESS, RPC_URL_ENV};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("MetaMask is not installed. Please install it to use this dApp.")]
    WalletUnavailable,
    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),
    #[error("{0}")]
    ValidationFailed(String),
    #[error("{0}")]
    RemoteCallFailed(String),
    #[error("listing {id} skipped: {reason}")]
    PartialLoadFailure { id: ListingId, reason: String },
}

impl ClientError {
    pub fn remote(err: impl fmt::Display) -> Self {
        Self::RemoteCallFailed(err.to_string())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed(message.into())
    }

    /// Best available text for a notification.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::RemoteCallFailed(message) if message.trim().is_empty() => "Unknown error".to_owned(),
            Self::RemoteCallFailed(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Read side of the property registry contract.
#[async_trait(?Send)]
pub trait RegistryReads {
    async fn all_listing_ids(&self) -> ClientResult<Vec<ListingId>>;
    async fn listing_details(&self, id: ListingId) -> ClientResult<ListingRecord>;
    async fn listing_ids_for_owner(&self, owner: &Address) -> ClientResult<Vec<ListingId>>;
    async fn admin_balance(&self, admin: &Address) -> ClientResult<U256>;
    async fn super_admin(&self) -> ClientResult<Address>;
    async fn is_admin(&self, account: &Address) -> ClientResult<bool>;
    async fn is_user_registered(&self, account: &Address) -> ClientResult<bool>;
    /// `admin()` of contracts that predate the multi-admin interface.
    async fn legacy_admin(&self) -> ClientResult<Address>;
}

/// A state-changing contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractCall {
    RegisterListing {
        title: String,
        description: String,
        location: String,
        price: U256,
    },
    BuyListing { id: ListingId, value: U256 },
    ApproveListing(ListingId),
    RejectListing(ListingId),
    AddAdmin(Address),
    RegisterUser(Address),
    WithdrawAdminBalance,
}

impl ContractCall {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RegisterListing { .. } => "registerProperty",
            Self::BuyListing { .. } => "buyProperty",
            Self::ApproveListing(_) => "approveProperty",
            Self::RejectListing(_) => "rejectProperty",
            Self::AddAdmin(_) => "addAdmin",
            Self::RegisterUser(_) => "registerUser",
            Self::WithdrawAdminBalance => "withdrawAdminBalance",
        }
    }

    /// Native currency attached to the call.
    pub fn value(&self) -> U256 {
        match self {
            Self::BuyListing { value, .. } => *value,
            _ => U256::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTx {
    pub tx_hash: String,
    pub from: Address,
    pub call: ContractCall,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub block_number: Option<u64>,
}

/// Write side: submission and confirmation are separate awaits.
#[async_trait(?Send)]
pub trait RegistryWrites {
    async fn submit(&self, from: &Address, call: ContractCall) -> ClientResult<PendingTx>;
    /// Resolves once that specific submission is mined. A reverted
    /// transaction is a `RemoteCallFailed`.
    async fn wait_for_confirmation(&self, tx: &PendingTx) -> ClientResult<TxReceipt>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type AccountsListener = Rc<dyn Fn(Vec<Address>)>;

/// Browser wallet extension (EIP-1193 style).
#[async_trait(?Send)]
pub trait WalletProvider {
    fn is_available(&self) -> bool;
    /// Already-authorized accounts; never prompts.
    async fn accounts(&self) -> ClientResult<Vec<Address>>;
    /// Prompts the user to authorize accounts.
    async fn request_accounts(&self) -> ClientResult<Vec<Address>>;
    async fn balance(&self, account: &Address) -> ClientResult<U256>;
    fn on_accounts_changed(&self, listener: AccountsListener) -> ListenerId;
    fn remove_listener(&self, id: ListenerId);
}

/// Listener bookkeeping shared by wallet implementations.
#[derive(Default)]
pub struct ListenerSet {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(ListenerId, AccountsListener)>>,
}

impl ListenerSet {
    pub fn add(&self, listener: AccountsListener) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    pub fn remove(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|(existing, _)| *existing != id);
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn emit(&self, accounts: &[Address]) {
        // Listeners may add or remove listeners while running.
        let snapshot: Vec<AccountsListener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in snapshot {
            listener(accounts.to_vec());
        }
    }
}

/// Handle for public reads; bound to no signer.
#[derive(Clone)]
pub struct ReadOnlyContract {
    address: Address,
    reads: Rc<dyn RegistryReads>,
}

impl ReadOnlyContract {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn reads(&self) -> &dyn RegistryReads {
        self.reads.as_ref()
    }
}

/// Handle bound to the session's active account.
#[derive(Clone)]
pub struct WritableContract {
    signer: Address,
    writes: Rc<dyn RegistryWrites>,
}

impl WritableContract {
    pub fn signer(&self) -> Address {
        self.signer
    }

    pub async fn submit(&self, call: ContractCall) -> ClientResult<PendingTx> {
        self.writes.submit(&self.signer, call).await
    }

    pub async fn wait_for_confirmation(&self, tx: &PendingTx) -> ClientResult<TxReceipt> {
        self.writes.wait_for_confirmation(tx).await
    }
}

/// Produces contract handles for the one configured deployment.
#[derive(Clone)]
pub struct ContractAccessor {
    config: ContractConfig,
    wallet: Rc<dyn WalletProvider>,
    reads: Rc<dyn RegistryReads>,
    writes: Rc<dyn RegistryWrites>,
}

impl ContractAccessor {
    pub fn new<R>(config: ContractConfig, wallet: Rc<dyn WalletProvider>, registry: Rc<R>) -> Self
    where
        R: RegistryReads + RegistryWrites + 'static,
    {
        Self {
            config,
            wallet,
            reads: registry.clone(),
            writes: registry,
        }
    }

    pub fn config(&self) -> &ContractConfig {
        &self.config
    }

    pub fn wallet(&self) -> Rc<dyn WalletProvider> {
        self.wallet.clone()
    }

    pub fn read_only(&self) -> ReadOnlyContract {
        ReadOnlyContract {
            address: self.config.address,
            reads: self.reads.clone(),
        }
    }

    pub fn writable(&self, session: &Session) -> ClientResult<WritableContract> {
        if !self.wallet.is_available() {
            return Err(ClientError::WalletUnavailable);
        }
        let Some(signer) = session.active_address else {
            return Err(ClientError::AuthorizationDenied("no account authorized".to_owned()));
        };
        Ok(WritableContract {
            signer,
            writes: self.writes.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryLedger, InMemoryWallet};

    fn accessor(wallet: Rc<InMemoryWallet>) -> ContractAccessor {
        let ledger = Rc::new(InMemoryLedger::current(Address::repeat_byte(9)));
        ContractAccessor::new(ContractConfig::default(), wallet, ledger)
    }

    #[test]
    fn writable_requires_a_wallet() {
        let accessor = accessor(Rc::new(InMemoryWallet::missing()));
        let session = Session::from_accounts(&[Address::repeat_byte(1)]);
        assert_eq!(accessor.writable(&session).err(), Some(ClientError::WalletUnavailable));
    }

    #[test]
    fn writable_requires_an_account() {
        let accessor = accessor(Rc::new(InMemoryWallet::with_accounts(Vec::new())));
        assert!(matches!(
            accessor.writable(&Session::empty()),
            Err(ClientError::AuthorizationDenied(_))
        ));
    }

    #[test]
    fn writable_binds_the_session_account() {
        let account = Address::repeat_byte(1);
        let accessor = accessor(Rc::new(InMemoryWallet::with_accounts(vec![account])));
        let handle = accessor.writable(&Session::from_accounts(&[account])).unwrap();
        assert_eq!(handle.signer(), account);
    }

    #[test]
    fn read_only_works_without_wallet() {
        let accessor = accessor(Rc::new(InMemoryWallet::missing()));
        assert_eq!(accessor.read_only().address(), ContractConfig::default().address);
    }

    #[test]
    fn listener_set_removes_and_emits() {
        let set = ListenerSet::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let id = set.add(Rc::new(move |accounts: Vec<Address>| sink.borrow_mut().push(accounts.len())));
        set.emit(&[Address::ZERO]);
        set.remove(id);
        set.emit(&[Address::ZERO]);
        assert_eq!(*seen.borrow(), vec![1]);
        assert!(set.is_empty());
    }

    #[test]
    fn empty_remote_message_reads_as_unknown() {
        assert_eq!(ClientError::remote("").diagnostic(), "Unknown error");
        assert_eq!(ClientError::remote("reverted").diagnostic(), "reverted");
    }
}
