//! HTML rendering.
//!
//! Pure functions from [`AppState`] to markup, so they run and test without
//! a browser. Interactive elements carry `data-action`, `data-view`,
//! `data-field` or `data-input` attributes that `events.rs` dispatches on.

use ee_api_types::{Listing, RoleTier, short_address};
use ee_client_core::actions::{can_buy, can_withdraw, validate_address};
use ee_client_core::{ActiveView, AppState, NotificationKind, routes};
use std::fmt::Write;

/// Markup for each region of the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub header: String,
    pub nav: String,
    pub notification: String,
    pub main: String,
}

pub fn page(state: &AppState) -> Page {
    Page {
        header: header(state),
        nav: nav(state),
        notification: notification(state),
        main: main(state),
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ── Chrome ──

pub fn header(state: &AppState) -> String {
    let wallet = match state.session.active_address {
        Some(account) if state.session.connected => {
            let balance = state
                .native_balance
                .as_deref()
                .map(|balance| format!(r#"<div class="wallet-balance">{} ETH</div>"#, escape(balance)))
                .unwrap_or_default();
            let tier = state.roles.tier();
            format!(
                r#"<div class="connected-wallet"><div class="wallet-address" title="{full}">{short}</div>{balance}<div class="role-badges"><span class="role-badge {class}">{badge}</span></div></div>"#,
                full = account.to_checksum(None),
                short = short_address(&account),
                class = badge_class(tier),
                badge = tier.badge(),
            )
        }
        _ => connect_button("connect-button"),
    };
    format!(
        r#"<div class="header-content"><h1>EtherEstate</h1><p class="tagline">Decentralized Property Registry on Blockchain</p><div class="wallet-info">{wallet}</div></div>"#
    )
}

fn badge_class(tier: RoleTier) -> &'static str {
    match tier {
        RoleTier::SuperAdmin => "super-admin",
        RoleTier::Admin => "admin",
        RoleTier::RegisteredUser => "user",
        RoleTier::Unregistered => "unregistered",
    }
}

fn connect_button(class: &str) -> String {
    format!(r#"<button class="{class}" data-action="connect">Connect Wallet</button>"#)
}

pub fn nav(state: &AppState) -> String {
    let active = state.visible_view();
    let mut items = String::new();
    for view in routes::navigation(&state.roles) {
        let class = if view == active { "active" } else { "" };
        let _ = write!(
            items,
            r#"<li class="{class}" data-view="{key}">{label}</li>"#,
            key = view.key(),
            label = view.label(),
        );
    }
    format!("<ul>{items}</ul>")
}

pub fn notification(state: &AppState) -> String {
    let Some(notification) = &state.notification else {
        return String::new();
    };
    let kind = match notification.kind {
        NotificationKind::Error => "error",
        NotificationKind::Success => "success",
    };
    format!(
        r#"<div class="notification {kind}">{text}<button class="close-notification" data-action="dismiss" data-id="{id}">&times;</button></div>"#,
        text = escape(&notification.text),
        id = notification.id,
    )
}

// ── Views ──

pub fn main(state: &AppState) -> String {
    if state.loading {
        return r#"<div class="loading-container"><h2>Loading EtherEstate...</h2><p>Please wait while we connect to the blockchain</p></div>"#.to_owned();
    }
    match state.visible_view() {
        ActiveView::Home => home(state),
        ActiveView::Marketplace => marketplace(state),
        ActiveView::MyProperties => my_properties(state),
        ActiveView::RegisterProperty => register_property(state),
        ActiveView::AdminPanel => admin_panel(state),
        ActiveView::SuperAdmin => super_admin(state),
    }
}

fn view(class: &str, title: &str, subtitle: &str, body: &str) -> String {
    format!(
        r#"<div class="{class} view-container"><div class="view-header"><h2>{title}</h2><p>{subtitle}</p></div>{body}</div>"#
    )
}

fn empty_state(title: &str, hint: &str) -> String {
    format!(r#"<div class="empty-state"><h3>{title}</h3><p>{hint}</p></div>"#)
}

fn home(state: &AppState) -> String {
    let mut body = String::from(
        r#"<div class="hero-section"><h2>Welcome to EtherEstate</h2><p class="hero-description">A decentralized platform for property registration and trading on the Ethereum blockchain.</p>"#,
    );
    if !state.session.connected {
        let _ = write!(
            body,
            r#"<div class="connect-prompt"><p>Connect your wallet to access the platform</p>{}</div>"#,
            connect_button("connect-button large")
        );
    } else if !state.roles.is_registered_user() {
        body.push_str(
            r#"<div class="info-card warning"><h3>Account Not Registered</h3><p>Your wallet address needs to be registered to use the platform.</p><p>Please contact the administrator to get registered.</p></div>"#,
        );
    }
    body.push_str("</div>");

    if state.session.connected && state.roles.is_registered_user() {
        body.push_str(r#"<div class="quick-stats">"#);
        body.push_str(&stat("Total Properties", state.listings.len()));
        body.push_str(&stat("Your Properties", state.owned_listings.len()));
        if state.roles.is_admin() {
            body.push_str(&stat("Pending Approvals", state.pending_listings.len()));
        }
        body.push_str("</div>");
    }
    format!(r#"<div class="home-view view-container">{body}</div>"#)
}

fn stat(title: &str, value: usize) -> String {
    format!(r#"<div class="stat-card"><h3>{title}</h3><p class="stat-value">{value}</p></div>"#)
}

fn listing_card(listing: &Listing, status: bool, actions: &str) -> String {
    let initial = listing
        .title
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect::<String>())
        .unwrap_or_default();
    let status = if status {
        format!(
            r#"<div class="status-badge status-{ordinal}">{label}</div>"#,
            ordinal = listing.status.ordinal(),
            label = listing.status.label(),
        )
    } else {
        String::new()
    };
    format!(
        r#"<div class="property-card" data-listing="{id}"><div class="property-image-placeholder">{initial}</div><div class="property-details"><h3>{title}</h3>{status}<p class="property-location">{location}</p><p class="property-price">{price} ETH</p><p class="property-owner">{owner}</p><p class="property-description">{description}</p>{actions}</div></div>"#,
        id = listing.id,
        initial = escape(&initial),
        title = escape(&listing.title),
        location = escape(&listing.location),
        price = escape(&listing.price),
        owner = short_address(&listing.owner),
        description = escape(&listing.description),
    )
}

fn grid(cards: impl Iterator<Item = String>) -> String {
    let cards: String = cards.collect();
    format!(r#"<div class="properties-grid">{cards}</div>"#)
}

fn marketplace(state: &AppState) -> String {
    let body = if state.listings.is_empty() {
        empty_state("No properties available", "Check back later or register a new property")
    } else {
        grid(state.listings.iter().map(|listing| {
            let buyable = can_buy(
                state.session.connected,
                state.roles.is_registered_user(),
                state.session.active_address.as_ref(),
                &listing.owner,
            );
            let actions = if buyable {
                format!(
                    r#"<button class="action-button buy-button" data-action="buy" data-id="{}" data-price="{}">Buy Property</button>"#,
                    listing.id,
                    escape(&listing.price),
                )
            } else {
                String::new()
            };
            listing_card(listing, false, &actions)
        }))
    };
    view(
        "properties-view",
        "Property Marketplace",
        "Browse and purchase properties on the blockchain",
        &body,
    )
}

fn my_properties(state: &AppState) -> String {
    let body = if state.owned_listings.is_empty() {
        format!(
            r#"{}<button class="action-button" data-view="{}">Register Property</button>"#,
            empty_state("No properties registered", "Register your first property to get started"),
            ActiveView::RegisterProperty.key(),
        )
    } else {
        grid(state.owned_listings.iter().map(|listing| listing_card(listing, true, "")))
    };
    view("my-properties-view", "My Properties", "Manage your property portfolio", &body)
}

fn register_property(state: &AppState) -> String {
    let form = &state.property_form;
    let preview = if form.title.is_empty() {
        r#"<div class="empty-preview"><p>Your property details will appear here</p></div>"#.to_owned()
    } else {
        let location = if form.location.is_empty() { "Location not specified".to_owned() } else { escape(&form.location) };
        let price = if form.price.is_empty() { "Price not set".to_owned() } else { format!("{} ETH", escape(&form.price)) };
        let description = if form.description.is_empty() {
            "No description provided".to_owned()
        } else {
            escape(&form.description)
        };
        format!(
            r#"<h4>{title}</h4><p class="preview-location">{location}</p><p class="preview-price">{price}</p><p class="preview-description">{description}</p>"#,
            title = escape(&form.title),
        )
    };
    let body = format!(
        r#"<div class="property-form-container"><div class="property-form">
<div class="form-group"><label for="title">Title</label><input type="text" id="title" data-field="title" value="{title}" placeholder="Luxury Beachfront Villa"></div>
<div class="form-group"><label for="description">Description</label><textarea id="description" data-field="description" rows="4" placeholder="Describe your property in detail...">{description}</textarea></div>
<div class="form-group"><label for="location">Location</label><input type="text" id="location" data-field="location" value="{location}" placeholder="123 Blockchain Ave, Crypto City"></div>
<div class="form-group"><label for="price">Price (ETH)</label><input type="text" inputmode="decimal" id="price" data-field="price" value="{price}" placeholder="2.5"></div>
<button class="action-button submit-button" data-action="register-property">Register Property</button>
</div><div class="form-preview"><h3>Property Preview</h3><div class="preview-card">{preview}</div></div></div>"#,
        title = escape(&form.title),
        description = escape(&form.description),
        location = escape(&form.location),
        price = escape(&form.price),
    );
    view(
        "register-property-view",
        "Register New Property",
        "Add your property to the blockchain registry",
        &body,
    )
}

fn address_card(title: &str, prompt: &str, input: &str, value: &str, action: &str, button: &str) -> String {
    let disabled = if validate_address(value).is_ok() { "" } else { " disabled" };
    format!(
        r#"<div class="admin-card"><h3>{title}</h3><div class="card-content"><p>{prompt}</p><div class="address-input"><input type="text" data-input="{input}" value="{value}" placeholder="0x123...abc"><button class="action-button" data-action="{action}"{disabled}>{button}</button></div></div></div>"#,
        value = escape(value),
    )
}

fn admin_panel(state: &AppState) -> String {
    let pending = if state.pending_listings.is_empty() {
        empty_state("No pending properties", "All caught up with approvals!")
    } else {
        let cards: String = state
            .pending_listings
            .iter()
            .map(|listing| {
                let actions = format!(
                    r#"<div class="approval-actions"><button class="action-button approve-button" data-action="approve" data-id="{id}">Approve</button><button class="action-button reject-button" data-action="reject" data-id="{id}">Reject</button></div>"#,
                    id = listing.id,
                );
                listing_card(listing, false, &actions)
            })
            .collect();
        format!(r#"<div class="pending-properties-list">{cards}</div>"#)
    };
    let withdraw_disabled = if can_withdraw(&state.admin_balance) { "" } else { " disabled" };
    let body = format!(
        r#"<div class="admin-tabs"><div class="admin-tab active"><h3>Pending Approvals</h3>{pending}</div>
<div class="admin-tab"><h3>Earnings &amp; Balance</h3><div class="earnings-card"><div class="balance-display"><span class="balance-amount">{balance}</span> <span class="balance-currency">ETH</span></div><p class="balance-description">This is your accumulated commission from property sales</p><button class="action-button withdraw-button" data-action="withdraw"{withdraw_disabled}>Withdraw Earnings</button></div></div>
<div class="admin-tab">{register}</div></div>"#,
        balance = escape(&state.admin_balance),
        register = address_card(
            "Register New User",
            "Register a new user wallet address:",
            "new-user",
            &state.new_user_address,
            "register-user",
            "Register User",
        ),
    );
    view(
        "admin-panel-view",
        "Admin Dashboard",
        "Manage property approvals and platform administration",
        &body,
    )
}

fn super_admin(state: &AppState) -> String {
    let body = format!(
        r#"<div class="super-admin-cards">{}</div>"#,
        address_card(
            "Add New Admin",
            "Grant admin privileges to a wallet address:",
            "new-admin",
            &state.new_admin_address,
            "add-admin",
            "Add Admin",
        )
    );
    view(
        "super-admin-view",
        "Super Admin Console",
        "Manage platform roles and permissions",
        &body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ee_api_types::{Address, ListingId, ListingStatus, RoleSet, Session};
    use ee_client_core::{Notification, PropertyForm};

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn listing(id: u64, owner: Address) -> Listing {
        Listing {
            id: ListingId(id),
            title: "villa <by the sea>".to_owned(),
            description: "Sunny".to_owned(),
            location: "Algarve".to_owned(),
            price: "2.5".to_owned(),
            owner,
            status: ListingStatus::Approved,
            approved_by: Address::ZERO,
        }
    }

    fn state_for(account: u8, roles: RoleSet) -> AppState {
        AppState {
            session: Session::from_accounts(&[addr(account)]),
            roles,
            admin_balance: "0".to_owned(),
            ..AppState::default()
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn buy_button_hidden_for_owner() {
        let mut state = state_for(1, RoleSet::compose(false, false, true));
        state.active_view = ActiveView::Marketplace;
        state.listings = vec![listing(1, addr(1)), listing(2, addr(2))];

        let html = main(&state);
        assert_eq!(html.matches(r#"data-action="buy""#).count(), 1);
        assert!(html.contains(r#"data-id="2" data-price="2.5""#));
        assert!(html.contains("villa &lt;by the sea&gt;"));
        assert!(html.contains(r#"<div class="property-image-placeholder">V</div>"#));
    }

    #[test]
    fn unregistered_visitor_cannot_buy() {
        let mut state = state_for(3, RoleSet::NONE);
        state.active_view = ActiveView::Marketplace;
        state.listings = vec![listing(1, addr(1))];
        assert!(!main(&state).contains(r#"data-action="buy""#));
    }

    #[test]
    fn withdraw_disabled_without_balance() {
        let mut state = state_for(2, RoleSet::compose(false, true, true));
        state.active_view = ActiveView::AdminPanel;
        assert!(main(&state).contains(r#"data-action="withdraw" disabled"#));
        state.admin_balance = "0.3".to_owned();
        assert!(main(&state).contains(r#"data-action="withdraw">"#));
    }

    #[test]
    fn add_admin_needs_valid_address() {
        let mut state = state_for(9, RoleSet::compose(true, true, true));
        state.active_view = ActiveView::SuperAdmin;
        state.new_admin_address = "0xabc".to_owned();
        assert!(main(&state).contains(r#"data-action="add-admin" disabled"#));
        state.new_admin_address = addr(5).to_string().to_lowercase();
        assert!(main(&state).contains(r#"data-action="add-admin">"#));
    }

    #[test]
    fn forbidden_view_falls_back_to_home() {
        let mut state = state_for(1, RoleSet::compose(false, false, true));
        state.active_view = ActiveView::SuperAdmin;
        assert!(main(&state).contains("home-view"));
        assert!(!nav(&state).contains("superAdmin"));
        assert!(nav(&state).contains(r#"<li class="active" data-view="home">"#));
    }

    #[test]
    fn header_shows_role_and_short_address() {
        let mut state = state_for(0xab, RoleSet::compose(false, true, true));
        state.native_balance = Some("12.5".to_owned());
        let html = header(&state);
        assert!(html.contains(&short_address(&addr(0xab))));
        assert!(html.contains("12.5 ETH"));
        assert!(html.contains(r#"<span class="role-badge admin">Admin</span>"#));
        assert!(header(&AppState::default()).contains(r#"data-action="connect""#));
    }

    #[test]
    fn notification_carries_dismiss_id() {
        let state = AppState {
            notification: Some(Notification {
                id: 7,
                kind: NotificationKind::Error,
                text: "Please fill in all fields".to_owned(),
                auto_dismiss: None,
            }),
            ..AppState::default()
        };
        let html = notification(&state);
        assert!(html.starts_with(r#"<div class="notification error">"#));
        assert!(html.contains(r#"data-action="dismiss" data-id="7""#));
        assert!(notification(&AppState::default()).is_empty());
    }

    #[test]
    fn register_form_echoes_buffer() {
        let mut state = state_for(1, RoleSet::compose(false, false, true));
        state.active_view = ActiveView::RegisterProperty;
        state.property_form = PropertyForm {
            title: "Loft".to_owned(),
            price: "2".to_owned(),
            ..PropertyForm::default()
        };
        let html = main(&state);
        assert!(html.contains(r#"data-field="title" value="Loft""#));
        assert!(html.contains("2 ETH"));
        assert!(html.contains("Location not specified"));
    }

    #[test]
    fn loading_screen_replaces_views() {
        let state = AppState {
            loading: true,
            ..AppState::default()
        };
        assert!(main(&state).contains("loading-container"));
    }
}
