//! The dApp controller: owns the state container and drives session,
//! role, listing and action flows against one contract deployment.

use ee_api_types::{Address, ListingId, RoleSet, Session, format_ether};
use ee_chain_client::{ClientError, ClientResult, ContractAccessor, ContractCall};
use std::rc::Rc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::actions::{self, ActionKind, Refresh};
use crate::listings::ListingLoader;
use crate::roles::RoleResolver;
use crate::session::WalletSessionProbe;
use crate::state::{ActiveView, FormField, NotificationKind, Store};

pub const CONNECTED: &str = "Wallet connected successfully!";
pub const CONNECT_FAILED: &str = "Failed to connect wallet. Please try again.";
pub const LOAD_LISTINGS_FAILED: &str = "Failed to load properties. Please try again.";
pub const LOAD_OWNED_FAILED: &str = "Failed to load your properties. Please try again.";
pub const LOAD_PENDING_FAILED: &str = "Failed to load pending properties. Please try again.";
pub const LOAD_EARNINGS_FAILED: &str = "Failed to load admin earnings. Please try again.";

/// How a user action ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Stopped before anything was submitted.
    Rejected,
    /// Submission or confirmation failed.
    Failed,
    Confirmed,
    /// The account changed while the action was in flight; its result was
    /// discarded.
    Stale,
}

/// An account switch, already applied to the store under `epoch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountChange {
    pub epoch: u64,
    pub session: Session,
}

pub struct AccountEvents(mpsc::UnboundedReceiver<AccountChange>);

impl AccountEvents {
    pub async fn next(&mut self) -> Option<AccountChange> {
        self.0.recv().await
    }
}

pub struct Dapp {
    accessor: ContractAccessor,
    store: Rc<Store>,
    probe: WalletSessionProbe,
    resolver: Rc<RoleResolver>,
}

impl Dapp {
    pub fn new(accessor: ContractAccessor) -> Self {
        let probe = WalletSessionProbe::new(accessor.wallet());
        Self {
            accessor,
            store: Rc::new(Store::new()),
            probe,
            resolver: Rc::new(RoleResolver::new()),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn accessor(&self) -> &ContractAccessor {
        &self.accessor
    }

    // ── Session ──

    /// Picks up an already-authorized account and loads its data.
    pub async fn start(&self) {
        let epoch = self.store.epoch();
        let session = self.probe.probe_session().await;
        if !self.is_current(epoch) {
            self.store.set_loading(false);
            return;
        }
        self.store.set_session(session.clone());
        if let Some(account) = session.active_address {
            info!(account = %account, "existing wallet session");
            self.load_account(epoch, account).await;
        }
        self.store.set_loading(false);
    }

    pub async fn connect_wallet(&self) -> ClientResult<()> {
        let epoch = self.store.epoch();
        let session = match self.probe.request_session().await {
            Ok(session) => session,
            Err(err) => {
                warn!("error connecting wallet: {err}");
                match err {
                    ClientError::WalletUnavailable => self.store.notify_error(err.to_string()),
                    _ => self.store.notify_error(CONNECT_FAILED),
                };
                return Err(err);
            }
        };
        if !self.is_current(epoch) {
            return Ok(());
        }
        let Some(account) = session.active_address else {
            return Err(ClientError::AuthorizationDenied("no account authorized".to_owned()));
        };

        let epoch = if self.store.session().active_address == Some(account) {
            self.store.set_session(session);
            epoch
        } else {
            self.resolver.reset();
            self.store.begin_epoch(session)
        };
        self.load_account(epoch, account).await;
        if self.is_current(epoch) {
            self.store.notify_success(CONNECTED);
        }
        Ok(())
    }

    /// Subscribes to wallet account switches. The store is reset the moment
    /// the wallet reports a switch; the returned stream carries the follow-up
    /// loading work for [`Dapp::on_account_change`].
    pub fn watch_accounts(&self) -> AccountEvents {
        let (sender, receiver) = mpsc::unbounded_channel();
        let store = self.store.clone();
        let resolver = self.resolver.clone();
        self.probe.subscribe_account_change(move |accounts| {
            let session = Session::from_accounts(&accounts);
            resolver.reset();
            let epoch = store.begin_epoch(session.clone());
            info!(epoch, account = ?session.active_address, "wallet accounts changed");
            if sender.send(AccountChange { epoch, session }).is_err() {
                debug!("account change receiver dropped");
            }
        });
        AccountEvents(receiver)
    }

    pub async fn on_account_change(&self, change: AccountChange) {
        if !self.is_current(change.epoch) {
            return;
        }
        if let Some(account) = change.session.active_address {
            self.load_account(change.epoch, account).await;
        }
    }

    pub async fn run_account_events(&self, mut events: AccountEvents) {
        while let Some(change) = events.next().await {
            self.on_account_change(change).await;
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        let current = self.store.epoch();
        if current != epoch {
            info!(started = epoch, current, "discarding result from a previous session");
        }
        current == epoch
    }

    async fn load_account(&self, epoch: u64, account: Address) {
        let contract = self.accessor.read_only();
        let roles = self.resolver.resolve(&contract, &account).await;
        if !self.is_current(epoch) {
            return;
        }
        info!(account = %account, tier = roles.tier().badge(), "roles resolved");
        self.store.set_roles(roles);

        self.refresh_native_balance(epoch, account).await;
        self.load_collections(epoch, account, initial_loads(&roles)).await;
    }

    async fn refresh_native_balance(&self, epoch: u64, account: Address) {
        match self.accessor.wallet().balance(&account).await {
            Ok(balance) if self.is_current(epoch) => {
                self.store.set_native_balance(Some(format_ether(balance)));
            }
            Ok(_) => {}
            Err(err) => warn!(account = %account, "error fetching balance: {err}"),
        }
    }

    /// Reloads the requested collections, in order, for `account`.
    async fn load_collections(&self, epoch: u64, account: Address, refresh: Refresh) {
        let contract = self.accessor.read_only();
        let loader = ListingLoader::new(&contract);

        if refresh.approved {
            let loaded = loader.load_all_approved().await;
            if !self.is_current(epoch) {
                return;
            }
            match loaded {
                Ok(listings) => self.store.set_listings(listings),
                Err(err) => self.load_failed("approved listings", err, LOAD_LISTINGS_FAILED),
            }
        }
        if refresh.pending {
            let loaded = loader.load_pending().await;
            if !self.is_current(epoch) {
                return;
            }
            match loaded {
                Ok(listings) => self.store.set_pending_listings(listings),
                Err(err) => self.load_failed("pending listings", err, LOAD_PENDING_FAILED),
            }
        }
        if refresh.admin_balance {
            let loaded = loader.load_admin_balance(&account).await;
            if !self.is_current(epoch) {
                return;
            }
            match loaded {
                Ok(balance) => self.store.set_admin_balance(balance),
                Err(err) => self.load_failed("admin balance", err, LOAD_EARNINGS_FAILED),
            }
        }
        if refresh.owned {
            let loaded = loader.load_owned(&account).await;
            if !self.is_current(epoch) {
                return;
            }
            match loaded {
                Ok(listings) => self.store.set_owned_listings(listings),
                Err(err) => self.load_failed("owned listings", err, LOAD_OWNED_FAILED),
            }
        }
    }

    fn load_failed(&self, what: &str, err: ClientError, text: &str) {
        error!("error loading {what}: {err}");
        self.store.notify_error(text);
    }

    // ── Actions ──

    pub async fn register_property(&self) -> ActionOutcome {
        let form = self.store.read(|state| state.property_form.clone());
        let call = actions::validate_property_form(&form);
        self.run_action(ActionKind::RegisterProperty, call, None).await
    }

    /// `price` is the listing's displayed price; it is sent as the payment.
    pub async fn buy_property(&self, id: ListingId, price: &str) -> ActionOutcome {
        let call = actions::validate_purchase(id, price);
        self.run_action(ActionKind::BuyProperty, call, None).await
    }

    pub async fn approve_property(&self, id: ListingId) -> ActionOutcome {
        self.run_action(ActionKind::ApproveProperty, Ok(ContractCall::ApproveListing(id)), None)
            .await
    }

    pub async fn reject_property(&self, id: ListingId) -> ActionOutcome {
        self.run_action(ActionKind::RejectProperty, Ok(ContractCall::RejectListing(id)), None)
            .await
    }

    pub async fn add_admin(&self) -> ActionOutcome {
        let input = self.store.read(|state| state.new_admin_address.clone());
        match actions::validate_address(&input) {
            Ok(admin) => {
                self.run_action(ActionKind::AddAdmin, Ok(ContractCall::AddAdmin(admin)), Some(admin))
                    .await
            }
            Err(err) => self.run_action(ActionKind::AddAdmin, Err(err), None).await,
        }
    }

    pub async fn register_user(&self) -> ActionOutcome {
        let input = self.store.read(|state| state.new_user_address.clone());
        match actions::validate_address(&input) {
            Ok(user) => {
                self.run_action(ActionKind::RegisterUser, Ok(ContractCall::RegisterUser(user)), Some(user))
                    .await
            }
            Err(err) => self.run_action(ActionKind::RegisterUser, Err(err), None).await,
        }
    }

    pub async fn withdraw_earnings(&self) -> ActionOutcome {
        self.run_action(ActionKind::WithdrawEarnings, Ok(ContractCall::WithdrawAdminBalance), None)
            .await
    }

    async fn run_action(
        &self,
        kind: ActionKind,
        call: ClientResult<ContractCall>,
        subject: Option<Address>,
    ) -> ActionOutcome {
        let call = match call {
            Ok(call) => call,
            Err(err) => {
                debug!(action = ?kind, "rejected: {err}");
                self.store.notify_error(err.diagnostic());
                return ActionOutcome::Rejected;
            }
        };
        let epoch = self.store.epoch();
        let handle = match self.accessor.writable(&self.store.session()) {
            Ok(handle) => handle,
            Err(err) => {
                self.store.notify_error(kind.failure_text(&err));
                return ActionOutcome::Rejected;
            }
        };

        let pending = match handle.submit(call).await {
            Ok(pending) => pending,
            Err(err) => return self.action_failed(kind, epoch, err),
        };
        if !self.is_current(epoch) {
            return ActionOutcome::Stale;
        }
        info!(action = ?kind, tx_hash = %pending.tx_hash, "transaction submitted");
        self.store.notify(NotificationKind::Success, kind.in_flight_text(), None);

        let receipt = match handle.wait_for_confirmation(&pending).await {
            Ok(receipt) => receipt,
            Err(err) => return self.action_failed(kind, epoch, err),
        };
        info!(action = ?kind, tx_hash = %receipt.tx_hash, block = ?receipt.block_number, "transaction confirmed");
        if !self.is_current(epoch) {
            return ActionOutcome::Stale;
        }

        match kind {
            ActionKind::RegisterProperty => self.store.clear_property_form(),
            ActionKind::AddAdmin => self.store.set_new_admin_address(String::new()),
            ActionKind::RegisterUser => self.store.set_new_user_address(String::new()),
            _ => {}
        }
        let signer = handle.signer();
        self.load_collections(epoch, signer, kind.refreshes()).await;
        self.refresh_native_balance(epoch, signer).await;
        if !self.is_current(epoch) {
            return ActionOutcome::Stale;
        }
        self.store.notify_success(kind.success_text(subject.as_ref()));
        ActionOutcome::Confirmed
    }

    fn action_failed(&self, kind: ActionKind, epoch: u64, err: ClientError) -> ActionOutcome {
        error!(action = ?kind, "action failed: {err}");
        if !self.is_current(epoch) {
            return ActionOutcome::Stale;
        }
        self.store.notify_error(kind.failure_text(&err));
        ActionOutcome::Failed
    }

    // ── View ──

    /// Switches view if the current roles allow it.
    pub fn navigate(&self, view: ActiveView) -> bool {
        let permitted = view.is_permitted(&self.store.roles());
        if permitted {
            self.store.set_active_view(view);
        } else {
            debug!(view = view.key(), "navigation refused");
        }
        permitted
    }

    pub fn set_form_field(&self, field: FormField, value: String) {
        self.store.set_form_field(field, value);
    }

    pub fn set_new_admin_address(&self, value: String) {
        self.store.set_new_admin_address(value);
    }

    pub fn set_new_user_address(&self, value: String) {
        self.store.set_new_user_address(value);
    }

    pub fn dismiss_notification(&self, id: u64) {
        self.store.dismiss(id);
    }
}

/// What a freshly resolved account needs loaded.
fn initial_loads(roles: &RoleSet) -> Refresh {
    Refresh {
        approved: true,
        pending: roles.is_admin(),
        admin_balance: roles.is_admin(),
        owned: roles.is_registered_user(),
    }
}
