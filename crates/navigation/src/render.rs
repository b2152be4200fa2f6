//! Turns resolved entries into what a navigation bar actually shows.

use serde::Serialize;

use portal_auth::{Role, SessionState};
use portal_core::MenuId;

use crate::catalog::{EntryKind, MenuEntry, SubMenuEntry};
use crate::filter::filter_sub_items;

/// Entry ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderedEntry {
    Link {
        id: MenuId,
        label: String,
        path: String,
        icon: Option<String>,
    },
    Dropdown {
        id: MenuId,
        label: String,
        icon: Option<String>,
        items: Vec<SubMenuEntry>,
    },
}

impl RenderedEntry {
    pub fn id(&self) -> &MenuId {
        match self {
            RenderedEntry::Link { id, .. } | RenderedEntry::Dropdown { id, .. } => id,
        }
    }
}

/// Render resolved entries for an identity.
///
/// Applies the display-time rules on top of whichever source resolved the
/// menu:
/// - entries needing authentication are hidden from anonymous users;
/// - dropdown sub-entries are filtered for `role`, and a dropdown left with
///   nothing to show is dropped;
/// - `show_username` entries are labelled with `username` when one is known.
pub fn render_menu(
    entries: &[MenuEntry],
    role: Role,
    is_authenticated: bool,
    username: Option<&str>,
) -> Vec<RenderedEntry> {
    entries
        .iter()
        .filter(|entry| !entry.requires_auth || is_authenticated)
        .filter_map(|entry| {
            let label = match username {
                Some(name) if entry.show_username => name.to_string(),
                _ => entry.name.clone(),
            };
            match &entry.kind {
                EntryKind::Link { path } => Some(RenderedEntry::Link {
                    id: entry.id.clone(),
                    label,
                    path: path.clone(),
                    icon: entry.icon.clone(),
                }),
                EntryKind::Dropdown { sub_items } => {
                    let items = filter_sub_items(sub_items, role);
                    if items.is_empty() {
                        tracing::debug!("suppressing empty dropdown '{}' for {role}", entry.id);
                        return None;
                    }
                    Some(RenderedEntry::Dropdown {
                        id: entry.id.clone(),
                        label,
                        icon: entry.icon.clone(),
                        items,
                    })
                }
            }
        })
        .collect()
}

/// [`render_menu`] with identity taken from a session snapshot.
pub fn render_for_session(entries: &[MenuEntry], state: &SessionState) -> Vec<RenderedEntry> {
    let username = state.user().and_then(|u| u.display_username());
    render_menu(entries, state.role(), state.is_authenticated(), username)
}

/// Action behind an authentication menu item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthAction {
    Navigate,
    Logout,
}

/// Login / register / logout items shown next to the main menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthMenuItem {
    pub id: &'static str,
    pub name: &'static str,
    pub path: Option<&'static str>,
    pub icon: Option<&'static str>,
    pub order: i32,
    pub action: AuthAction,
}

/// Authentication items for the current state: login and register when
/// signed out, logout when signed in.
pub fn auth_menu_items(is_authenticated: bool) -> Vec<AuthMenuItem> {
    if is_authenticated {
        return vec![AuthMenuItem {
            id: "logout",
            name: "Logout",
            path: None,
            icon: Some("LogOut"),
            order: 3,
            action: AuthAction::Logout,
        }];
    }
    vec![
        AuthMenuItem {
            id: "login",
            name: "Login",
            path: Some("/login"),
            icon: None,
            order: 1,
            action: AuthAction::Navigate,
        },
        AuthMenuItem {
            id: "register",
            name: "Register",
            path: Some("/register"),
            icon: None,
            order: 2,
            action: AuthAction::Navigate,
        },
    ]
}
