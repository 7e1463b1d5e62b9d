//! EtherEstate WASM Frontend
//!
//! Browser shell around `ee-client-core`: wires the injected wallet into the
//! EVM registry adapter, repaints on every state change and schedules
//! notification dismissal.

pub mod dom;
pub mod eip1193;
pub mod events;
pub mod logging;
pub mod render;

use ee_chain_client::ContractConfig;
use ee_client_core::{Dapp, routes};
use gloo_timers::future::TimeoutFuture;
use std::rc::Rc;
use tracing::{info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::dom::Surface;
use crate::eip1193::Eip1193Transport;

/// WASM entry point – called automatically when the module is instantiated.
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    // Improve panic messages in the browser console
    console_error_panic_hook::set_once();
    logging::init();

    init().await
}

/// Mount, wire the wallet, then load the session.
async fn init() -> Result<(), JsValue> {
    let root = dom::by_id("app").ok_or_else(|| JsValue::from_str("missing #app root"))?;
    let surface = Surface::mount(root)?;

    let config = ContractConfig::default();
    info!(contract = %config.address, chain = %config.chain_name, "starting EtherEstate");
    let transport = Rc::new(Eip1193Transport::detect());
    let (accessor, wallet) = ee_chain_evm::accessor_over(config, transport.clone());
    eip1193::forward_account_changes(&transport, wallet);

    let dapp = Rc::new(Dapp::new(accessor));
    let account_events = dapp.watch_accounts();
    events::bind_events(&surface.root, dapp.clone());
    spawn_local(render_loop(surface, dapp.clone()));
    {
        let dapp = dapp.clone();
        spawn_local(async move { dapp.run_account_events(account_events).await });
    }

    let requested = routes::view_for_path(&dom::current_path());
    dapp.start().await;
    if !dapp.navigate(requested) {
        warn!(view = requested.key(), "requested view not available for this account");
    }
    Ok(())
}

/// Repaints after every store change and arms auto-dismissal for each new
/// notification that asks for it.
async fn render_loop(surface: Surface, dapp: Rc<Dapp>) {
    let mut updates = dapp.store().subscribe();
    let mut armed: Option<u64> = None;
    loop {
        let state = updates.borrow_and_update().clone();
        surface.paint(render::page(&state));

        let fresh = state
            .notification
            .as_ref()
            .filter(|notification| armed != Some(notification.id));
        if let Some(notification) = fresh {
            armed = Some(notification.id);
            if let Some(delay) = notification.auto_dismiss {
                let dapp = dapp.clone();
                let id = notification.id;
                let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
                spawn_local(async move {
                    TimeoutFuture::new(millis).await;
                    dapp.dismiss_notification(id);
                });
            }
        }

        if updates.changed().await.is_err() {
            break;
        }
    }
}
