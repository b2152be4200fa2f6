//! `portal-navigation`: menu model, role filtering and source resolution.
//!
//! The resolver prefers a remote, role-scoped menu tree and degrades to the
//! built-in catalog when the remote side is unavailable. Rendering rules
//! (sub-item filtering, empty dropdown suppression) apply to either source.

pub mod catalog;
pub mod filter;
pub mod render;
pub mod resolver;
pub mod source;

pub use catalog::{
    EntryKind, MenuEntry, NavigationCatalog, SubMenuDetails, SubMenuEntry, decode_entries,
};
pub use filter::{can_access_menu, entry_visible, filter_entries, filter_static, filter_sub_items};
pub use render::{
    AuthAction, AuthMenuItem, RenderedEntry, auth_menu_items, render_for_session, render_menu,
};
pub use resolver::{NavigationResolver, Resolution, ResolvedMenu, ResolverConfig};
pub use source::{MenuSource, SourceError};
