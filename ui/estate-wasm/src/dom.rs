//! DOM access.
//!
//! The page is four regions mounted under the `#app` root. Each region is
//! repainted only when its markup changes, and focus inside the main region
//! survives a repaint so typing into a form is not interrupted.

use std::cell::RefCell;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlElement, HtmlInputElement, HtmlTextAreaElement};

use crate::render::Page;

// ── Helpers ──

fn doc() -> Document {
    window().document().unwrap()
}

pub fn window() -> web_sys::Window {
    web_sys::window().unwrap()
}

pub fn by_id(id: &str) -> Option<Element> {
    doc().get_element_by_id(id)
}

/// The nearest ancestor-or-self of the event target matching `selector`.
pub fn closest(event: &web_sys::Event, selector: &str) -> Option<Element> {
    let target = event.target()?.dyn_into::<Element>().ok()?;
    target.closest(selector).ok()?
}

pub fn attr(el: &Element, name: &str) -> Option<String> {
    el.get_attribute(name)
}

/// Current value of an `<input>` or `<textarea>`.
pub fn field_value(el: &Element) -> Option<String> {
    if let Some(input) = el.dyn_ref::<HtmlInputElement>() {
        Some(input.value())
    } else {
        el.dyn_ref::<HtmlTextAreaElement>().map(HtmlTextAreaElement::value)
    }
}

pub fn current_path() -> String {
    window().location().pathname().unwrap_or_default()
}

pub fn push_path(path: &str) {
    if current_path() == path {
        return;
    }
    if let Ok(history) = window().history() {
        let _ = history.push_state_with_url(&JsValue::NULL, "", Some(path));
    }
}

// ── Focus ──

/// Which form control had focus, and where its caret was.
struct FocusMark {
    selector: String,
    caret: Option<u32>,
}

fn focus_mark() -> Option<FocusMark> {
    let active = doc().active_element()?;
    let selector = ["data-field", "data-input"]
        .into_iter()
        .find_map(|name| attr(&active, name).map(|value| format!(r#"[{name}="{value}"]"#)))?;
    let caret = if let Some(input) = active.dyn_ref::<HtmlInputElement>() {
        input.selection_start().ok().flatten()
    } else {
        active
            .dyn_ref::<HtmlTextAreaElement>()
            .and_then(|area| area.selection_start().ok().flatten())
    };
    Some(FocusMark { selector, caret })
}

fn restore_focus(mark: FocusMark) {
    let Some(el) = doc().query_selector(&mark.selector).ok().flatten() else {
        return;
    };
    if let Some(html) = el.dyn_ref::<HtmlElement>() {
        let _ = html.focus();
    }
    if let Some(caret) = mark.caret {
        if let Some(input) = el.dyn_ref::<HtmlInputElement>() {
            let _ = input.set_selection_range(caret, caret);
        } else if let Some(area) = el.dyn_ref::<HtmlTextAreaElement>() {
            let _ = area.set_selection_range(caret, caret);
        }
    }
}

// ── Surface ──

const SKELETON: &str = r#"<header class="app-header" id="app-header"></header>
<nav class="app-nav" id="app-nav"></nav>
<div class="notifications" id="notifications"></div>
<main class="main-content" id="main-content"></main>
<footer class="footer"><div class="footer-content"><p>EtherEstate - Decentralized Property Registry</p></div></footer>"#;

/// The mounted page regions plus the markup last written to each.
pub struct Surface {
    pub root: Element,
    header: Element,
    nav: Element,
    notification: Element,
    main: Element,
    painted: RefCell<Page>,
}

impl Surface {
    pub fn mount(root: Element) -> Result<Self, JsValue> {
        root.set_inner_html(SKELETON);
        let region = |id: &str| by_id(id).ok_or_else(|| JsValue::from_str(&format!("missing #{id}")));
        Ok(Self {
            header: region("app-header")?,
            nav: region("app-nav")?,
            notification: region("notifications")?,
            main: region("main-content")?,
            root,
            painted: RefCell::new(Page::default()),
        })
    }

    pub fn paint(&self, page: Page) {
        let mut painted = self.painted.borrow_mut();
        if painted.header != page.header {
            self.header.set_inner_html(&page.header);
        }
        if painted.nav != page.nav {
            self.nav.set_inner_html(&page.nav);
        }
        if painted.notification != page.notification {
            self.notification.set_inner_html(&page.notification);
        }
        if painted.main != page.main {
            let mark = focus_mark();
            self.main.set_inner_html(&page.main);
            if let Some(mark) = mark {
                restore_focus(mark);
            }
        }
        *painted = page;
    }
}
