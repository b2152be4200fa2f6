//! Menu resolution: remote source first, static catalog on failure.
//!
//! Exactly one source wins a resolution. Remote and static entries are never
//! merged, so a menu can't show duplicate or contradictory items.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use portal_auth::{Role, SessionStore};

use crate::catalog::{MenuEntry, NavigationCatalog, SubMenuEntry};
use crate::filter::{filter_entries, filter_static, filter_sub_items};
use crate::source::{MenuSource, SourceError};

/// Which source produced a menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Tree returned by the remote source.
    Remote(Vec<MenuEntry>),
    /// Static catalog filtered locally because the remote source failed.
    Fallback(Vec<MenuEntry>),
}

impl Resolution {
    pub fn entries(&self) -> &[MenuEntry] {
        match self {
            Resolution::Remote(entries) | Resolution::Fallback(entries) => entries,
        }
    }

    pub fn into_entries(self) -> Vec<MenuEntry> {
        match self {
            Resolution::Remote(entries) | Resolution::Fallback(entries) => entries,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Resolution::Fallback(_))
    }
}

/// A resolution tagged with the session it was computed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMenu {
    pub role: Role,
    pub is_authenticated: bool,
    /// Session generation observed when resolution started.
    pub generation: u64,
    pub resolution: Resolution,
}

impl ResolvedMenu {
    /// `false` once the session has changed since resolution started; the
    /// result should then be discarded instead of rendered.
    pub fn is_current(&self, session: &SessionStore) -> bool {
        session.generation() == self.generation
    }
}

/// Resolver tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// A remote fetch slower than this counts as a failure.
    pub fetch_timeout: Duration,
    /// Re-apply local role filtering to remote trees.
    pub verify_remote: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(5),
            verify_remote: false,
        }
    }
}

pub struct NavigationResolver {
    source: Arc<dyn MenuSource>,
    catalog: NavigationCatalog,
    config: ResolverConfig,
}

impl core::fmt::Debug for NavigationResolver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NavigationResolver")
            .field("catalog_len", &self.catalog.len())
            .field("config", &self.config)
            .finish()
    }
}

impl NavigationResolver {
    pub fn new(
        source: Arc<dyn MenuSource>,
        catalog: NavigationCatalog,
        config: ResolverConfig,
    ) -> Self {
        Self {
            source,
            catalog,
            config,
        }
    }

    /// Resolver over the built-in fallback catalog.
    pub fn with_static_catalog(source: Arc<dyn MenuSource>, config: ResolverConfig) -> Self {
        Self::new(source, NavigationCatalog::static_fallback(), config)
    }

    pub fn catalog(&self) -> &NavigationCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve the menu for `role`, reporting which source won.
    ///
    /// Never fails: every remote failure (network, status, parse, timeout)
    /// degrades to the static catalog.
    pub async fn resolve(&self, role: Role, is_authenticated: bool) -> Resolution {
        match self.fetch_remote(role).await {
            Ok(entries) if self.config.verify_remote => {
                Resolution::Remote(filter_entries(&entries, role, is_authenticated))
            }
            Ok(entries) => Resolution::Remote(entries),
            Err(err) => {
                tracing::warn!("remote menu unavailable for {role}, using static catalog: {err}");
                Resolution::Fallback(self.filter_static(role, is_authenticated))
            }
        }
    }

    /// Resolved entries without the source tag.
    pub async fn resolve_menu(&self, role: Role, is_authenticated: bool) -> Vec<MenuEntry> {
        self.resolve(role, is_authenticated).await.into_entries()
    }

    /// Resolve for the live session, recording the generation so the caller
    /// can detect a logout that happened while the fetch was in flight.
    pub async fn resolve_for_session(&self, session: &SessionStore) -> ResolvedMenu {
        let generation = session.generation();
        let state = session.state();
        let role = state.role();
        let is_authenticated = state.is_authenticated();

        let resolution = self.resolve(role, is_authenticated).await;
        ResolvedMenu {
            role,
            is_authenticated,
            generation,
            resolution,
        }
    }

    pub fn filter_static(&self, role: Role, is_authenticated: bool) -> Vec<MenuEntry> {
        filter_static(&self.catalog, role, is_authenticated)
    }

    pub fn filter_sub_items(&self, sub_items: &[SubMenuEntry], role: Role) -> Vec<SubMenuEntry> {
        filter_sub_items(sub_items, role)
    }

    async fn fetch_remote(&self, role: Role) -> Result<Vec<MenuEntry>, SourceError> {
        match tokio::time::timeout(self.config.fetch_timeout, self.source.fetch_menus(role)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(SourceError::Timeout),
        }
    }
}
