use ee_api_types::RoleSet;

use crate::state::ActiveView;

/// Path aliases accepted for each view; the first is canonical.
const ROUTES: &[(&str, ActiveView)] = &[
    ("/", ActiveView::Home),
    ("/marketplace", ActiveView::Marketplace),
    ("/all-properties", ActiveView::Marketplace),
    ("/register", ActiveView::RegisterProperty),
    ("/dashboard", ActiveView::MyProperties),
    ("/admin", ActiveView::AdminPanel),
    ("/admin-earnings", ActiveView::AdminPanel),
    ("/super-admin", ActiveView::SuperAdmin),
];

/// Unknown paths land on home. Trailing slashes and query strings are
/// ignored.
pub fn view_for_path(path: &str) -> ActiveView {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    let path = if trimmed.is_empty() { "/" } else { trimmed };
    ROUTES
        .iter()
        .find(|(route, _)| *route == path)
        .map(|(_, view)| *view)
        .unwrap_or(ActiveView::Home)
}

pub fn path_for_view(view: ActiveView) -> &'static str {
    ROUTES
        .iter()
        .find(|(_, candidate)| *candidate == view)
        .map(|(path, _)| *path)
        .unwrap_or("/")
}

/// Menu entries offered to `roles`, in display order.
pub fn navigation(roles: &RoleSet) -> Vec<ActiveView> {
    ActiveView::ALL
        .into_iter()
        .filter(|view| view.is_permitted(roles))
        .collect()
}
