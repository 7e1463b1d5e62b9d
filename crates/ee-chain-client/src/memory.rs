//! In-process ledger and wallet.
//!
//! `InMemoryLedger` answers the registry call surface from local maps and
//! applies writes when their confirmation is awaited. It enforces only the
//! status and role checks needed to make flows observable; fees and
//! commission accounting are not modelled. Failure injection, per-method call
//! counters and a confirmation gate make it usable as a test double.

use async_trait::async_trait;
use ee_api_types::{Address, ContractGeneration, ListingId, ListingRecord, ListingStatus, U256};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::watch;
use tracing::debug;

use crate::{
    AccountsListener, ClientError, ClientResult, ContractCall, ListenerId, ListenerSet, PendingTx,
    RegistryReads, RegistryWrites, TxReceipt, WalletProvider,
};

const UNRECOGNIZED: &str = "execution reverted: function selector was not recognized";

struct LedgerState {
    generation: Option<ContractGeneration>,
    super_admin: Address,
    admins: BTreeSet<Address>,
    registered: BTreeSet<Address>,
    listings: BTreeMap<u64, ListingRecord>,
    next_id: u64,
    admin_balances: HashMap<Address, U256>,
    broken_ids: BTreeSet<u64>,
    fail_enumeration: bool,
    reject_next_submit: Option<String>,
    revert_next_confirmation: Option<String>,
    submitted: HashMap<String, (Address, ContractCall)>,
    block_number: u64,
}

pub struct InMemoryLedger {
    state: RefCell<LedgerState>,
    calls: RefCell<HashMap<&'static str, usize>>,
    confirmations_held: watch::Sender<bool>,
}

impl InMemoryLedger {
    fn with_generation(generation: Option<ContractGeneration>, super_admin: Address) -> Self {
        let (confirmations_held, _) = watch::channel(false);
        Self {
            state: RefCell::new(LedgerState {
                generation,
                super_admin,
                admins: BTreeSet::new(),
                registered: BTreeSet::new(),
                listings: BTreeMap::new(),
                next_id: 1,
                admin_balances: HashMap::new(),
                broken_ids: BTreeSet::new(),
                fail_enumeration: false,
                reject_next_submit: None,
                revert_next_confirmation: None,
                submitted: HashMap::new(),
                block_number: 0,
            }),
            calls: RefCell::new(HashMap::new()),
            confirmations_held,
        }
    }

    /// A multi-admin registry whose deployer is `super_admin`.
    pub fn current(super_admin: Address) -> Self {
        Self::with_generation(Some(ContractGeneration::Current), super_admin)
    }

    /// A single-admin registry exposing only `admin()`.
    pub fn legacy(admin: Address) -> Self {
        Self::with_generation(Some(ContractGeneration::Legacy), admin)
    }

    /// Neither role interface answers.
    pub fn without_role_interface() -> Self {
        Self::with_generation(None, Address::ZERO)
    }

    pub fn add_admin(&self, admin: Address) {
        let mut state = self.state.borrow_mut();
        state.admins.insert(admin);
        state.registered.insert(admin);
    }

    pub fn register_user(&self, user: Address) {
        self.state.borrow_mut().registered.insert(user);
    }

    pub fn insert_listing(&self, owner: Address, title: &str, price: U256, status: ListingStatus) -> ListingId {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        state.listings.insert(
            id,
            ListingRecord {
                id: U256::from(id),
                title: title.to_owned(),
                description: format!("{title} description"),
                location: "Testville".to_owned(),
                price,
                owner,
                status: status.ordinal(),
                approved_by: Address::ZERO,
            },
        );
        ListingId(id)
    }

    /// Stores a record verbatim under `key`, including malformed ones.
    pub fn insert_raw_record(&self, key: ListingId, record: ListingRecord) {
        let mut state = self.state.borrow_mut();
        state.next_id = state.next_id.max(key.0 + 1);
        state.listings.insert(key.0, record);
    }

    pub fn listing(&self, id: ListingId) -> Option<ListingRecord> {
        self.state.borrow().listings.get(&id.0).cloned()
    }

    pub fn set_admin_balance(&self, admin: Address, amount: U256) {
        self.state.borrow_mut().admin_balances.insert(admin, amount);
    }

    /// Details reads for `id` fail from now on.
    pub fn break_listing(&self, id: ListingId) {
        self.state.borrow_mut().broken_ids.insert(id.0);
    }

    pub fn fail_enumeration(&self, fail: bool) {
        self.state.borrow_mut().fail_enumeration = fail;
    }

    pub fn reject_next_submission(&self, reason: &str) {
        self.state.borrow_mut().reject_next_submit = Some(reason.to_owned());
    }

    pub fn revert_next_confirmation(&self, reason: &str) {
        self.state.borrow_mut().revert_next_confirmation = Some(reason.to_owned());
    }

    /// Confirmations wait until [`release_confirmations`](Self::release_confirmations).
    pub fn hold_confirmations(&self) {
        self.confirmations_held.send_replace(true);
    }

    pub fn release_confirmations(&self) {
        self.confirmations_held.send_replace(false);
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls.borrow().get(method).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.borrow().values().sum()
    }

    fn record_call(&self, method: &'static str) {
        *self.calls.borrow_mut().entry(method).or_default() += 1;
    }

    fn require(&self, generation: ContractGeneration) -> ClientResult<()> {
        if self.state.borrow().generation == Some(generation) {
            Ok(())
        } else {
            Err(ClientError::remote(UNRECOGNIZED))
        }
    }

    fn ids_where(&self, keep: impl Fn(&ListingRecord) -> bool) -> ClientResult<Vec<ListingId>> {
        let state = self.state.borrow();
        if state.fail_enumeration {
            return Err(ClientError::remote("could not enumerate properties"));
        }
        Ok(state
            .listings
            .iter()
            .filter(|(_, record)| keep(record))
            .map(|(key, _)| ListingId(*key))
            .collect())
    }
}

impl LedgerState {
    fn is_admin(&self, account: &Address) -> bool {
        match self.generation {
            Some(ContractGeneration::Current) => {
                *account == self.super_admin || self.admins.contains(account)
            }
            Some(ContractGeneration::Legacy) => *account == self.super_admin,
            None => false,
        }
    }

    fn is_registered(&self, account: &Address) -> bool {
        match self.generation {
            Some(ContractGeneration::Current) => self.registered.contains(account) || self.is_admin(account),
            _ => true,
        }
    }

    fn listing_mut(&mut self, id: ListingId) -> Result<&mut ListingRecord, String> {
        self.listings
            .get_mut(&id.0)
            .ok_or_else(|| format!("property {id} does not exist"))
    }

    fn require_current(&self) -> Result<(), String> {
        if self.generation == Some(ContractGeneration::Current) {
            Ok(())
        } else {
            Err("function selector was not recognized".to_owned())
        }
    }

    fn apply(&mut self, from: Address, call: &ContractCall) -> Result<(), String> {
        match call {
            ContractCall::RegisterListing {
                title,
                description,
                location,
                price,
            } => {
                if !self.is_registered(&from) {
                    return Err("only registered users can register properties".to_owned());
                }
                let id = self.next_id;
                self.next_id += 1;
                self.listings.insert(
                    id,
                    ListingRecord {
                        id: U256::from(id),
                        title: title.clone(),
                        description: description.clone(),
                        location: location.clone(),
                        price: *price,
                        owner: from,
                        status: ListingStatus::Pending.ordinal(),
                        approved_by: Address::ZERO,
                    },
                );
            }
            ContractCall::BuyListing { id, value } => {
                let listing = self.listing_mut(*id)?;
                if listing.status != ListingStatus::Approved.ordinal() {
                    return Err("property is not for sale".to_owned());
                }
                if listing.owner == from {
                    return Err("owner cannot buy own property".to_owned());
                }
                if *value < listing.price {
                    return Err("insufficient payment".to_owned());
                }
                listing.owner = from;
                listing.status = ListingStatus::Sold.ordinal();
            }
            ContractCall::ApproveListing(id) | ContractCall::RejectListing(id) => {
                if !self.is_admin(&from) {
                    return Err("only admins can validate properties".to_owned());
                }
                let approve = matches!(call, ContractCall::ApproveListing(_));
                let listing = self.listing_mut(*id)?;
                if listing.status != ListingStatus::Pending.ordinal() {
                    return Err("property is not pending".to_owned());
                }
                if approve {
                    listing.status = ListingStatus::Approved.ordinal();
                    listing.approved_by = from;
                } else {
                    listing.status = ListingStatus::Rejected.ordinal();
                }
            }
            ContractCall::AddAdmin(admin) => {
                self.require_current()?;
                if from != self.super_admin {
                    return Err("only the super admin can add admins".to_owned());
                }
                self.admins.insert(*admin);
                self.registered.insert(*admin);
            }
            ContractCall::RegisterUser(user) => {
                self.require_current()?;
                if !self.is_admin(&from) {
                    return Err("only admins can register users".to_owned());
                }
                self.registered.insert(*user);
            }
            ContractCall::WithdrawAdminBalance => {
                if !self.is_admin(&from) {
                    return Err("only admins can withdraw".to_owned());
                }
                let balance = self.admin_balances.get(&from).copied().unwrap_or_default();
                if balance.is_zero() {
                    return Err("no balance to withdraw".to_owned());
                }
                self.admin_balances.insert(from, U256::ZERO);
            }
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl RegistryReads for InMemoryLedger {
    async fn all_listing_ids(&self) -> ClientResult<Vec<ListingId>> {
        self.record_call("getAllProperties");
        self.ids_where(|_| true)
    }

    async fn listing_details(&self, id: ListingId) -> ClientResult<ListingRecord> {
        self.record_call("getPropertyDetails");
        let state = self.state.borrow();
        let key = id.0;
        if state.broken_ids.contains(&key) {
            return Err(ClientError::remote(format!("execution reverted: property {id} unreadable")));
        }
        state
            .listings
            .get(&key)
            .cloned()
            .ok_or_else(|| ClientError::remote(format!("execution reverted: property {id} does not exist")))
    }

    async fn listing_ids_for_owner(&self, owner: &Address) -> ClientResult<Vec<ListingId>> {
        self.record_call("getUserProperties");
        self.ids_where(|record| record.owner == *owner)
    }

    async fn admin_balance(&self, admin: &Address) -> ClientResult<U256> {
        self.record_call("getAdminBalance");
        Ok(self
            .state
            .borrow()
            .admin_balances
            .get(admin)
            .copied()
            .unwrap_or_default())
    }

    async fn super_admin(&self) -> ClientResult<Address> {
        self.record_call("superAdmin");
        self.require(ContractGeneration::Current)?;
        Ok(self.state.borrow().super_admin)
    }

    async fn is_admin(&self, account: &Address) -> ClientResult<bool> {
        self.record_call("isAdmin");
        self.require(ContractGeneration::Current)?;
        Ok(self.state.borrow().admins.contains(account))
    }

    async fn is_user_registered(&self, account: &Address) -> ClientResult<bool> {
        self.record_call("isUserRegistered");
        self.require(ContractGeneration::Current)?;
        Ok(self.state.borrow().registered.contains(account))
    }

    async fn legacy_admin(&self) -> ClientResult<Address> {
        self.record_call("admin");
        self.require(ContractGeneration::Legacy)?;
        Ok(self.state.borrow().super_admin)
    }
}

#[async_trait(?Send)]
impl RegistryWrites for InMemoryLedger {
    async fn submit(&self, from: &Address, call: ContractCall) -> ClientResult<PendingTx> {
        self.record_call(call.name());
        let mut state = self.state.borrow_mut();
        if let Some(reason) = state.reject_next_submit.take() {
            return Err(ClientError::remote(reason));
        }

        let tx_hash = format!("0x{:064x}", state.submitted.len() + 1);
        state.submitted.insert(tx_hash.clone(), (*from, call.clone()));
        debug!(tx_hash = %tx_hash, method = call.name(), "submitted");
        Ok(PendingTx {
            tx_hash,
            from: *from,
            call,
        })
    }

    async fn wait_for_confirmation(&self, tx: &PendingTx) -> ClientResult<TxReceipt> {
        self.record_call("waitForConfirmation");
        let mut gate = self.confirmations_held.subscribe();
        gate.wait_for(|held| !*held)
            .await
            .map(|_| ())
            .map_err(ClientError::remote)?;

        let mut state = self.state.borrow_mut();
        let Some((from, call)) = state.submitted.get(&tx.tx_hash).cloned() else {
            return Err(ClientError::remote(format!("unknown transaction {}", tx.tx_hash)));
        };
        if let Some(reason) = state.revert_next_confirmation.take() {
            return Err(ClientError::remote(format!("execution reverted: {reason}")));
        }
        state
            .apply(from, &call)
            .map_err(|reason| ClientError::remote(format!("execution reverted: {reason}")))?;
        state.block_number += 1;

        Ok(TxReceipt {
            tx_hash: tx.tx_hash.clone(),
            block_number: Some(state.block_number),
        })
    }
}

/// Wallet extension stand-in.
pub struct InMemoryWallet {
    available: bool,
    authorized: RefCell<Vec<Address>>,
    grantable: RefCell<Vec<Address>>,
    decline_requests: Cell<bool>,
    fail_queries: Cell<bool>,
    balances: RefCell<HashMap<Address, U256>>,
    listeners: ListenerSet,
}

impl InMemoryWallet {
    fn build(available: bool, authorized: Vec<Address>, grantable: Vec<Address>) -> Self {
        Self {
            available,
            authorized: RefCell::new(authorized),
            grantable: RefCell::new(grantable),
            decline_requests: Cell::new(false),
            fail_queries: Cell::new(false),
            balances: RefCell::new(HashMap::new()),
            listeners: ListenerSet::default(),
        }
    }

    /// No extension installed.
    pub fn missing() -> Self {
        Self::build(false, Vec::new(), Vec::new())
    }

    /// Extension with `accounts` already authorized.
    pub fn with_accounts(accounts: Vec<Address>) -> Self {
        Self::build(true, accounts.clone(), accounts)
    }

    /// Extension that authorizes `accounts` only once asked.
    pub fn locked(accounts: Vec<Address>) -> Self {
        Self::build(true, Vec::new(), accounts)
    }

    pub fn decline_requests(&self) {
        self.decline_requests.set(true);
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.set(fail);
    }

    pub fn set_balance(&self, account: Address, amount: U256) {
        self.balances.borrow_mut().insert(account, amount);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// The user picked different accounts in the extension.
    pub fn switch_accounts(&self, accounts: Vec<Address>) {
        *self.authorized.borrow_mut() = accounts.clone();
        *self.grantable.borrow_mut() = accounts.clone();
        self.listeners.emit(&accounts);
    }
}

#[async_trait(?Send)]
impl WalletProvider for InMemoryWallet {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn accounts(&self) -> ClientResult<Vec<Address>> {
        if !self.available {
            return Err(ClientError::WalletUnavailable);
        }
        if self.fail_queries.get() {
            return Err(ClientError::remote("wallet transport error"));
        }
        Ok(self.authorized.borrow().clone())
    }

    async fn request_accounts(&self) -> ClientResult<Vec<Address>> {
        if !self.available {
            return Err(ClientError::WalletUnavailable);
        }
        if self.decline_requests.get() {
            return Err(ClientError::AuthorizationDenied("User rejected the request.".to_owned()));
        }
        let granted = self.grantable.borrow().clone();
        *self.authorized.borrow_mut() = granted.clone();
        Ok(granted)
    }

    async fn balance(&self, account: &Address) -> ClientResult<U256> {
        if !self.available {
            return Err(ClientError::WalletUnavailable);
        }
        Ok(self.balances.borrow().get(account).copied().unwrap_or_default())
    }

    fn on_accounts_changed(&self, listener: AccountsListener) -> ListenerId {
        self.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}
