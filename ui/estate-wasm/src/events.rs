//! Event binding.
//!
//! Handlers are delegated from the `#app` root, so they survive repaints.
//! Clicks dispatch on `data-view` / `data-action`; input events on
//! `data-field` / `data-input`.

use ee_api_types::ListingId;
use ee_client_core::{ActiveView, Dapp, FormField, routes};
use std::rc::Rc;
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, Event};

use crate::dom;

/// Helper: attach a listener for `event` to `target` for the page's lifetime.
macro_rules! listen {
    ($target:expr, $event:expr, $handler:expr) => {{
        let cb = Closure::wrap(Box::new($handler) as Box<dyn FnMut(Event)>);
        if let Err(err) = $target.add_event_listener_with_callback($event, cb.as_ref().unchecked_ref()) {
            warn!("could not bind {} listener: {:?}", $event, err);
        }
        cb.forget();
    }};
}

/// Bind all UI event listeners. Call once after mounting.
pub fn bind_events(root: &Element, dapp: Rc<Dapp>) {
    // ── Clicks ──
    {
        let dapp = dapp.clone();
        listen!(root, "click", move |event: Event| {
            if let Some(el) = dom::closest(&event, "[data-view]") {
                if let Some(view) = dom::attr(&el, "data-view").and_then(|key| ActiveView::from_key(&key)) {
                    navigate(&dapp, view);
                }
                return;
            }
            if let Some(el) = dom::closest(&event, "[data-action]") {
                on_action(&dapp, &el);
            }
        });
    }

    // ── Inputs ──
    {
        let dapp = dapp.clone();
        listen!(root, "input", move |event: Event| {
            let Some(el) = event.target().and_then(|target| target.dyn_into::<Element>().ok()) else {
                return;
            };
            let Some(value) = dom::field_value(&el) else {
                return;
            };
            if let Some(field) = dom::attr(&el, "data-field").and_then(|name| FormField::from_name(&name)) {
                dapp.set_form_field(field, value);
                return;
            }
            match dom::attr(&el, "data-input").as_deref() {
                Some("new-admin") => dapp.set_new_admin_address(value),
                Some("new-user") => dapp.set_new_user_address(value),
                _ => {}
            }
        });
    }

    // ── History ──
    listen!(dom::window(), "popstate", move |_: Event| {
        let view = routes::view_for_path(&dom::current_path());
        if !dapp.navigate(view) {
            dapp.navigate(ActiveView::Home);
        }
    });
}

pub fn navigate(dapp: &Dapp, view: ActiveView) {
    if dapp.navigate(view) {
        dom::push_path(routes::path_for_view(view));
    }
}

fn listing_id(el: &Element) -> Option<ListingId> {
    dom::attr(el, "data-id")?.parse().ok().map(ListingId)
}

fn on_action(dapp: &Rc<Dapp>, el: &Element) {
    let Some(action) = dom::attr(el, "data-action") else {
        return;
    };
    debug!(action = %action, "ui action");

    match action.as_str() {
        "dismiss" => {
            if let Some(id) = dom::attr(el, "data-id").and_then(|id| id.parse().ok()) {
                dapp.dismiss_notification(id);
            }
            return;
        }
        "buy" | "approve" | "reject" if listing_id(el).is_none() => {
            warn!(action = %action, "listing button without an id");
            return;
        }
        _ => {}
    }

    let dapp = dapp.clone();
    let id = listing_id(el);
    let price = dom::attr(el, "data-price").unwrap_or_default();
    spawn_local(async move {
        match (action.as_str(), id) {
            ("connect", _) => {
                let _ = dapp.connect_wallet().await;
            }
            ("register-property", _) => {
                dapp.register_property().await;
            }
            ("buy", Some(id)) => {
                dapp.buy_property(id, &price).await;
            }
            ("approve", Some(id)) => {
                dapp.approve_property(id).await;
            }
            ("reject", Some(id)) => {
                dapp.reject_property(id).await;
            }
            ("withdraw", _) => {
                dapp.withdraw_earnings().await;
            }
            ("add-admin", _) => {
                dapp.add_admin().await;
            }
            ("register-user", _) => {
                dapp.register_user().await;
            }
            (other, _) => warn!(action = other, "unknown ui action"),
        }
    });
}
