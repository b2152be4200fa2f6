//! Role filtering over menu entries.
//!
//! Visibility is set membership (`role ∈ entry.roles`), not a hierarchy
//! comparison: a catalog can expose an entry to guests and admins but not to
//! the tiers in between.

use portal_auth::Role;

use crate::catalog::{MenuEntry, NavigationCatalog, SubMenuEntry};

/// `true` when `entry` is visible to `role` given the authentication state.
pub fn entry_visible(entry: &MenuEntry, role: Role, is_authenticated: bool) -> bool {
    if entry.requires_auth && !is_authenticated {
        return false;
    }
    entry.allows(role)
}

/// Visible entries of `entries`, sorted by `order` (stable).
pub fn filter_entries(entries: &[MenuEntry], role: Role, is_authenticated: bool) -> Vec<MenuEntry> {
    let mut visible: Vec<MenuEntry> = entries
        .iter()
        .filter(|entry| entry_visible(entry, role, is_authenticated))
        .cloned()
        .collect();
    visible.sort_by_key(|entry| entry.order);
    visible
}

/// Filter the static catalog for `role`.
pub fn filter_static(
    catalog: &NavigationCatalog,
    role: Role,
    is_authenticated: bool,
) -> Vec<MenuEntry> {
    filter_entries(catalog.entries(), role, is_authenticated)
}

/// Sub-entries of a dropdown visible to `role`.
///
/// No `requires_auth` check here: the parent dropdown's gating applies.
pub fn filter_sub_items(sub_items: &[SubMenuEntry], role: Role) -> Vec<SubMenuEntry> {
    sub_items.iter().filter(|sub| sub.allows(role)).cloned().collect()
}

/// Whether `menu_id` in `catalog` is reachable for the given identity.
/// Unknown ids are never accessible.
pub fn can_access_menu(
    catalog: &NavigationCatalog,
    menu_id: &str,
    role: Role,
    is_authenticated: bool,
) -> bool {
    catalog
        .find(menu_id)
        .is_some_and(|entry| entry_visible(entry, role, is_authenticated))
}
