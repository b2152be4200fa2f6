//! Remote menu source abstraction.

use async_trait::async_trait;
use thiserror::Error;

use portal_auth::Role;

use crate::catalog::MenuEntry;

/// Provider of role-scoped menu trees (typically the admin menu API).
///
/// Implementations return the tree exactly as the remote side filtered it;
/// the resolver decides what to trust.
#[async_trait]
pub trait MenuSource: Send + Sync {
    async fn fetch_menus(&self, role: Role) -> Result<Vec<MenuEntry>, SourceError>;
}

/// Why a remote menu fetch produced no usable tree.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("network error: {0}")]
    Network(String),
    #[error("menu API error ({0}): {1}")]
    Api(u16, String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("menu fetch timed out")]
    Timeout,
    #[error("menu request was unauthorized")]
    Unauthorized,
}
