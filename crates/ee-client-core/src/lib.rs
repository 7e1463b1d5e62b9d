//! Client-side logic of the EtherEstate dApp, independent of any rendering
//! surface.

pub mod actions;
pub mod app;
pub mod listings;
pub mod roles;
pub mod routes;
pub mod session;
pub mod state;

pub use actions::{ActionKind, Refresh};
pub use app::{AccountChange, AccountEvents, ActionOutcome, Dapp};
pub use listings::ListingLoader;
pub use roles::RoleResolver;
pub use session::WalletSessionProbe;
pub use state::{
    ActiveView, AppState, FormField, Notification, NotificationKind, PropertyForm, SUCCESS_DISMISS_AFTER, Store,
};
