//! Client state container.
//!
//! One `watch` channel owns the whole [`AppState`]; every field has a single
//! setter on [`Store`], and renderers subscribe to the channel.

use ee_api_types::{Listing, RoleSet, Session};
use serde::Serialize;
use std::cell::Cell;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// Success notifications clear themselves after this long.
pub const SUCCESS_DISMISS_AFTER: Duration = Duration::from_secs(3);

// ── Views ──

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ActiveView {
    #[default]
    Home,
    Marketplace,
    MyProperties,
    RegisterProperty,
    AdminPanel,
    SuperAdmin,
}

impl ActiveView {
    pub const ALL: [ActiveView; 6] = [
        Self::Home,
        Self::Marketplace,
        Self::MyProperties,
        Self::RegisterProperty,
        Self::AdminPanel,
        Self::SuperAdmin,
    ];

    pub fn is_permitted(self, roles: &RoleSet) -> bool {
        match self {
            Self::Home | Self::Marketplace => true,
            Self::MyProperties | Self::RegisterProperty => roles.is_plain_user(),
            Self::AdminPanel => roles.is_admin(),
            Self::SuperAdmin => roles.is_super_admin(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Marketplace => "Marketplace",
            Self::MyProperties => "My Properties",
            Self::RegisterProperty => "Register Property",
            Self::AdminPanel => "Admin Panel",
            Self::SuperAdmin => "Super Admin",
        }
    }

    /// Stable identifier used in markup.
    pub fn key(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Marketplace => "marketplace",
            Self::MyProperties => "myProperties",
            Self::RegisterProperty => "registerProperty",
            Self::AdminPanel => "adminPanel",
            Self::SuperAdmin => "superAdmin",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|view| view.key() == key)
    }
}

// ── Forms ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Description,
    Location,
    Price,
}

impl FormField {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "title" => Some(Self::Title),
            "description" => Some(Self::Description),
            "location" => Some(Self::Location),
            "price" => Some(Self::Price),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct PropertyForm {
    pub title: String,
    pub description: String,
    pub location: String,
    pub price: String,
}

impl PropertyForm {
    pub fn set(&mut self, field: FormField, value: String) {
        match field {
            FormField::Title => self.title = value,
            FormField::Description => self.description = value,
            FormField::Location => self.location = value,
            FormField::Price => self.price = value,
        }
    }
}

// ── Notifications ──

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub text: String,
    /// Whoever displays the notification schedules [`Store::dismiss`] after
    /// this long.
    pub auto_dismiss: Option<Duration>,
}

// ── State ──

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub session: Session,
    /// Advances on every account change.
    pub epoch: u64,
    pub roles: RoleSet,
    pub loading: bool,
    pub active_view: ActiveView,
    pub property_form: PropertyForm,
    pub new_admin_address: String,
    pub new_user_address: String,
    pub listings: Vec<Listing>,
    pub owned_listings: Vec<Listing>,
    pub pending_listings: Vec<Listing>,
    pub admin_balance: String,
    pub native_balance: Option<String>,
    pub notification: Option<Notification>,
}

impl AppState {
    /// The view to draw: the selected one if the roles still allow it.
    pub fn visible_view(&self) -> ActiveView {
        if self.active_view.is_permitted(&self.roles) {
            self.active_view
        } else {
            ActiveView::Home
        }
    }
}

pub struct Store {
    state: watch::Sender<AppState>,
    next_notification: Cell<u64>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        let (state, _) = watch::channel(AppState {
            loading: true,
            admin_balance: "0".to_owned(),
            ..AppState::default()
        });
        Self {
            state,
            next_notification: Cell::new(1),
        }
    }

    pub fn snapshot(&self) -> AppState {
        self.state.borrow().clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&self.state.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.state.subscribe()
    }

    pub fn epoch(&self) -> u64 {
        self.read(|state| state.epoch)
    }

    pub fn session(&self) -> Session {
        self.read(|state| state.session.clone())
    }

    pub fn roles(&self) -> RoleSet {
        self.read(|state| state.roles)
    }

    fn update(&self, f: impl FnOnce(&mut AppState)) {
        self.state.send_modify(f);
    }

    pub fn set_session(&self, session: Session) {
        self.update(|state| state.session = session);
    }

    /// Starts a new epoch for `session` and drops everything derived from
    /// the previous account. Returns the new epoch.
    pub fn begin_epoch(&self, session: Session) -> u64 {
        let mut epoch = 0;
        self.update(|state| {
            state.epoch += 1;
            epoch = state.epoch;
            state.session = session;
            state.roles = RoleSet::NONE;
            state.listings.clear();
            state.owned_listings.clear();
            state.pending_listings.clear();
            state.admin_balance = "0".to_owned();
            state.native_balance = None;
            state.notification = None;
        });
        debug!(epoch, "session epoch advanced");
        epoch
    }

    pub fn set_roles(&self, roles: RoleSet) {
        self.update(|state| state.roles = roles);
    }

    pub fn set_loading(&self, loading: bool) {
        self.update(|state| state.loading = loading);
    }

    pub fn set_active_view(&self, view: ActiveView) {
        self.update(|state| state.active_view = view);
    }

    pub fn set_form_field(&self, field: FormField, value: String) {
        self.update(|state| state.property_form.set(field, value));
    }

    pub fn clear_property_form(&self) {
        self.update(|state| state.property_form = PropertyForm::default());
    }

    pub fn set_new_admin_address(&self, value: String) {
        self.update(|state| state.new_admin_address = value);
    }

    pub fn set_new_user_address(&self, value: String) {
        self.update(|state| state.new_user_address = value);
    }

    pub fn set_listings(&self, listings: Vec<Listing>) {
        self.update(|state| state.listings = listings);
    }

    pub fn set_owned_listings(&self, listings: Vec<Listing>) {
        self.update(|state| state.owned_listings = listings);
    }

    pub fn set_pending_listings(&self, listings: Vec<Listing>) {
        self.update(|state| state.pending_listings = listings);
    }

    pub fn set_admin_balance(&self, balance: String) {
        self.update(|state| state.admin_balance = balance);
    }

    pub fn set_native_balance(&self, balance: Option<String>) {
        self.update(|state| state.native_balance = balance);
    }

    /// Replaces the current notification and returns the new one's id.
    pub fn notify(&self, kind: NotificationKind, text: impl Into<String>, auto_dismiss: Option<Duration>) -> u64 {
        let id = self.next_notification.get();
        self.next_notification.set(id + 1);
        let notification = Notification {
            id,
            kind,
            text: text.into(),
            auto_dismiss,
        };
        self.update(|state| state.notification = Some(notification));
        id
    }

    pub fn notify_success(&self, text: impl Into<String>) -> u64 {
        self.notify(NotificationKind::Success, text, Some(SUCCESS_DISMISS_AFTER))
    }

    pub fn notify_error(&self, text: impl Into<String>) -> u64 {
        self.notify(NotificationKind::Error, text, None)
    }

    /// Clears notification `id` unless a newer one has replaced it.
    pub fn dismiss(&self, id: u64) {
        self.state.send_if_modified(|state| match &state.notification {
            Some(current) if current.id == id => {
                state.notification = None;
                true
            }
            _ => false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ee_api_types::Address;

    #[test]
    fn view_gates_follow_roles() {
        let plain = RoleSet::compose(false, false, true);
        let admin = RoleSet::compose(false, true, false);
        let root = RoleSet::compose(true, false, false);

        assert!(ActiveView::Marketplace.is_permitted(&RoleSet::NONE));
        assert!(!ActiveView::RegisterProperty.is_permitted(&RoleSet::NONE));
        assert!(ActiveView::MyProperties.is_permitted(&plain));
        assert!(!ActiveView::MyProperties.is_permitted(&admin));
        assert!(ActiveView::AdminPanel.is_permitted(&admin));
        assert!(!ActiveView::SuperAdmin.is_permitted(&admin));
        assert!(ActiveView::SuperAdmin.is_permitted(&root));
        assert!(ActiveView::AdminPanel.is_permitted(&root));
    }

    #[test]
    fn forbidden_view_renders_as_home() {
        let store = Store::new();
        store.set_active_view(ActiveView::AdminPanel);
        assert_eq!(store.snapshot().visible_view(), ActiveView::Home);
        store.set_roles(RoleSet::compose(false, true, true));
        assert_eq!(store.snapshot().visible_view(), ActiveView::AdminPanel);
    }

    #[test]
    fn view_keys_round_trip() {
        for view in ActiveView::ALL {
            assert_eq!(ActiveView::from_key(view.key()), Some(view));
        }
        assert_eq!(ActiveView::from_key("vault"), None);
    }

    #[test]
    fn newer_notification_survives_stale_dismissal() {
        let store = Store::new();
        let first = store.notify_success("Wallet connected successfully!");
        let second = store.notify_error("Please fill in all fields");
        store.dismiss(first);
        assert_eq!(store.snapshot().notification.map(|n| n.id), Some(second));
        store.dismiss(second);
        assert_eq!(store.snapshot().notification, None);
    }

    #[test]
    fn success_notifications_auto_dismiss() {
        let store = Store::new();
        store.notify_success("Property approved successfully!");
        let notification = store.snapshot().notification.unwrap();
        assert_eq!(notification.kind, NotificationKind::Success);
        assert_eq!(notification.auto_dismiss, Some(Duration::from_secs(3)));
    }

    #[test]
    fn new_epoch_drops_account_data() {
        let store = Store::new();
        store.set_roles(RoleSet::compose(true, true, true));
        store.set_admin_balance("1.5".to_owned());
        store.notify_error("Failed to load properties. Please try again.");

        let session = Session::from_accounts(&[Address::repeat_byte(4)]);
        let epoch = store.begin_epoch(session.clone());

        let state = store.snapshot();
        assert_eq!(epoch, 1);
        assert_eq!(state.session, session);
        assert_eq!(state.roles, RoleSet::NONE);
        assert_eq!(state.admin_balance, "0");
        assert!(state.notification.is_none());
    }

    #[tokio::test]
    async fn subscribers_see_updates() -> anyhow::Result<()> {
        let store = Store::new();
        let mut updates = store.subscribe();
        store.set_active_view(ActiveView::Marketplace);
        updates.changed().await?;
        assert_eq!(updates.borrow_and_update().active_view, ActiveView::Marketplace);
        Ok(())
    }
}
