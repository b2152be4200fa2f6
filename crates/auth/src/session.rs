//! Process-wide session state with durable persistence.
//!
//! [`SessionStore`] is the only writer of identity/token state. Everything
//! else holds an `Arc<SessionStore>` and reads through it.
//!
//! Two storage entries are maintained:
//! - [`keys::TOKEN`]: the raw bearer token, read first by the credential
//!   middleware.
//! - [`keys::SNAPSHOT`]: a structured JSON snapshot
//!   (`{"state":{"user","token","isAuthenticated"},"version"}`), the only
//!   source used to rehydrate the store at construction.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use portal_core::{DomainError, DomainResult};

use crate::roles::Role;
use crate::storage::DurableStorage;
use crate::user::UserProfile;

/// Storage keys owned by the session.
pub mod keys {
    /// Raw bearer token.
    pub const TOKEN: &str = "token";

    /// Structured session snapshot.
    pub const SNAPSHOT: &str = "auth-storage";
}

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 0;

/// Persisted form of the session, as stored under [`keys::SNAPSHOT`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub state: PersistedState,

    #[serde(default)]
    pub version: u32,

    #[serde(default, rename = "savedAt", skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub user: Option<UserProfile>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub is_authenticated: bool,
}

impl PersistedSession {
    fn from_state(state: &SessionState) -> Self {
        Self {
            state: PersistedState {
                user: state.user.clone(),
                token: state.token.clone(),
                is_authenticated: state.is_authenticated,
            },
            version: SNAPSHOT_VERSION,
            saved_at: Some(Utc::now()),
        }
    }

    /// Pull just the token out of a raw snapshot.
    ///
    /// Looser than full parsing: a snapshot whose profile no
    /// longer matches [`UserProfile`] can still yield its token.
    pub fn token_from_blob(raw: &str) -> Option<String> {
        let value: serde_json::Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("failed to parse session snapshot: {err}");
                return None;
            }
        };
        value
            .get("state")
            .and_then(|state| state.get("token"))
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    }
}

/// Identity, credential and authenticated flag.
///
/// Invariants (enforced by [`SessionStore`]):
/// - `is_authenticated` iff `token` is present.
/// - a present `user` implies a present `token`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    user: Option<UserProfile>,
    token: Option<String>,
    is_authenticated: bool,
}

impl SessionState {
    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    /// Role used for gating; anything short of an authenticated user is guest.
    pub fn role(&self) -> Role {
        if !self.is_authenticated {
            return Role::Guest;
        }
        self.user.as_ref().map_or(Role::Guest, |u| u.role)
    }

    fn authenticated(user: Option<UserProfile>, token: String) -> Self {
        Self {
            user,
            token: Some(token),
            is_authenticated: true,
        }
    }

    /// Rebuild state from a snapshot, dropping anything that breaks the
    /// invariants.
    fn from_persisted(persisted: PersistedState) -> Self {
        let token = persisted
            .token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        match token {
            Some(token) if persisted.is_authenticated => Self::authenticated(persisted.user, token),
            Some(_) => {
                tracing::warn!(
                    "session snapshot has a token but is not authenticated; starting empty"
                );
                Self::default()
            }
            None => {
                if persisted.is_authenticated || persisted.user.is_some() {
                    tracing::warn!(
                        "session snapshot claims an identity without a token; starting empty"
                    );
                }
                Self::default()
            }
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: SessionState,
    generation: u64,
}

/// Single owner of the session.
pub struct SessionStore {
    inner: RwLock<Inner>,
    storage: Arc<dyn DurableStorage>,
}

impl core::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("SessionStore")
            .field("is_authenticated", &inner.state.is_authenticated)
            .field("role", &inner.state.role())
            .field("generation", &inner.generation)
            .finish()
    }
}

impl SessionStore {
    /// Build the store and synchronously restore it from the snapshot.
    ///
    /// Never fails: an absent, unreadable or malformed snapshot yields an
    /// empty (guest) session.
    pub fn rehydrate(storage: Arc<dyn DurableStorage>) -> Self {
        let state = Self::load_snapshot(storage.as_ref());
        if state.is_authenticated {
            tracing::info!("session restored (role={})", state.role());
        }
        Self {
            inner: RwLock::new(Inner {
                state,
                generation: 0,
            }),
            storage,
        }
    }

    pub fn arc(storage: Arc<dyn DurableStorage>) -> Arc<Self> {
        Arc::new(Self::rehydrate(storage))
    }

    fn load_snapshot(storage: &dyn DurableStorage) -> SessionState {
        let raw = match storage.get(keys::SNAPSHOT) {
            Ok(Some(raw)) => raw,
            Ok(None) => return SessionState::default(),
            Err(err) => {
                tracing::warn!("failed to read session snapshot: {err}");
                return SessionState::default();
            }
        };

        match serde_json::from_str::<PersistedSession>(&raw) {
            Ok(persisted) => SessionState::from_persisted(persisted.state),
            Err(err) => {
                tracing::warn!("ignoring malformed session snapshot: {err}");
                SessionState::default()
            }
        }
    }

    /// Backing storage, shared with the credential middleware.
    pub fn storage(&self) -> &Arc<dyn DurableStorage> {
        &self.storage
    }

    /// Copy of the current state.
    pub fn state(&self) -> SessionState {
        self.read(|inner| inner.state.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read(|inner| inner.state.is_authenticated)
    }

    pub fn token(&self) -> Option<String> {
        self.read(|inner| inner.state.token.clone())
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.read(|inner| inner.state.user.clone())
    }

    pub fn current_role(&self) -> Role {
        self.read(|inner| inner.state.role())
    }

    /// Incremented by every mutation. Async work started under one generation
    /// can compare before applying its result.
    pub fn generation(&self) -> u64 {
        self.read(|inner| inner.generation)
    }

    /// Start an authenticated session.
    ///
    /// The token and snapshot are written before this returns.
    pub fn set_session(&self, user: UserProfile, token: impl Into<String>) -> DomainResult<()> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(DomainError::validation(
                "an authenticated session requires a non-blank token",
            ));
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.state = SessionState::authenticated(Some(user), token.clone());
        inner.generation += 1;

        if let Err(err) = self.storage.set(keys::TOKEN, &token) {
            tracing::error!("failed to persist token: {err}");
        }
        self.persist_snapshot(&inner.state);

        tracing::info!("session started (role={})", inner.state.role());
        Ok(())
    }

    /// Reset to the empty session and remove both storage entries.
    ///
    /// Idempotent; safe to call from several concurrent 401 handlers. The
    /// generation only advances when there was a session to clear.
    pub fn clear_session(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let was_authenticated = inner.state.is_authenticated;
        if inner.state != SessionState::default() {
            inner.state = SessionState::default();
            inner.generation += 1;
        }

        for key in [keys::TOKEN, keys::SNAPSHOT] {
            if let Err(err) = self.storage.remove(key) {
                tracing::error!("failed to remove '{key}' from storage: {err}");
            }
        }

        if was_authenticated {
            tracing::info!("session cleared");
        }
    }

    /// Replace the profile of the current session (e.g. after a profile edit).
    ///
    /// Token and authenticated flag are untouched. Rejected when there is no
    /// session to attach the profile to.
    pub fn update_user(&self, user: UserProfile) -> DomainResult<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if !inner.state.is_authenticated {
            return Err(DomainError::invariant(
                "cannot attach a user profile without an authenticated session",
            ));
        }
        inner.state.user = Some(user);
        inner.generation += 1;
        self.persist_snapshot(&inner.state);
        Ok(())
    }

    fn persist_snapshot(&self, state: &SessionState) {
        let snapshot = PersistedSession::from_state(state);
        match serde_json::to_string(&snapshot) {
            Ok(raw) => {
                if let Err(err) = self.storage.set(keys::SNAPSHOT, &raw) {
                    tracing::error!("failed to persist session snapshot: {err}");
                }
            }
            Err(err) => tracing::error!("failed to serialize session snapshot: {err}"),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&Inner) -> T) -> T {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn alice() -> UserProfile {
        UserProfile::new("alice", Role::Manager).with_email("alice@example.com")
    }

    fn store_with(storage: &Arc<MemoryStorage>) -> SessionStore {
        SessionStore::rehydrate(storage.clone())
    }

    #[test]
    fn starts_empty_without_snapshot() {
        let storage = MemoryStorage::arc();
        let store = store_with(&storage);

        assert!(!store.is_authenticated());
        assert_eq!(store.token(), None);
        assert_eq!(store.user(), None);
        assert_eq!(store.current_role(), Role::Guest);
    }

    #[test]
    fn set_session_persists_synchronously() {
        let storage = MemoryStorage::arc();
        let store = store_with(&storage);

        store.set_session(alice(), "tok-123").unwrap();

        assert!(store.is_authenticated());
        assert_eq!(store.current_role(), Role::Manager);
        assert_eq!(storage.get(keys::TOKEN).unwrap().as_deref(), Some("tok-123"));

        let raw = storage.get(keys::SNAPSHOT).unwrap().unwrap();
        let snapshot: PersistedSession = serde_json::from_str(&raw).unwrap();
        assert_eq!(snapshot.state.token.as_deref(), Some("tok-123"));
        assert!(snapshot.state.is_authenticated);
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
    }

    #[test]
    fn blank_token_is_rejected() {
        let storage = MemoryStorage::arc();
        let store = store_with(&storage);

        let err = store.set_session(alice(), "   ").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(!store.is_authenticated());
        assert!(storage.keys().is_empty());
    }

    #[test]
    fn rehydrate_round_trip() {
        let storage = MemoryStorage::arc();
        store_with(&storage).set_session(alice(), "tok-123").unwrap();

        let restored = store_with(&storage);
        let state = restored.state();
        assert!(state.is_authenticated());
        assert_eq!(state.token(), Some("tok-123"));
        assert_eq!(state.user(), Some(&alice()));
    }

    #[test]
    fn rehydrate_ignores_primary_key_alone() {
        let storage = MemoryStorage::arc();
        storage.set(keys::TOKEN, "orphan").unwrap();

        let store = store_with(&storage);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn malformed_snapshot_starts_empty() {
        let storage = MemoryStorage::arc();
        storage.set(keys::SNAPSHOT, "{not json").unwrap();
        assert!(!store_with(&storage).is_authenticated());

        storage
            .set(
                keys::SNAPSHOT,
                r#"{"state":{"user":null,"token":null,"isAuthenticated":true}}"#,
            )
            .unwrap();
        assert_eq!(store_with(&storage).state(), SessionState::default());

        storage
            .set(keys::SNAPSHOT, r#"{"state":{"token":"abc","isAuthenticated":false}}"#)
            .unwrap();
        assert!(!store_with(&storage).is_authenticated());
    }

    #[test]
    fn clear_session_is_idempotent() {
        let storage = MemoryStorage::arc();
        let store = store_with(&storage);
        store.set_session(alice(), "tok-123").unwrap();

        store.clear_session();
        let once = store.state();
        store.clear_session();

        assert_eq!(store.state(), once);
        assert_eq!(once, SessionState::default());
        assert_eq!(storage.get(keys::TOKEN).unwrap(), None);
        assert_eq!(storage.get(keys::SNAPSHOT).unwrap(), None);
    }

    #[test]
    fn update_user_keeps_token_and_refreshes_snapshot() {
        let storage = MemoryStorage::arc();
        let store = store_with(&storage);
        store.set_session(alice(), "tok-123").unwrap();

        let renamed = UserProfile::new("alice.s", Role::Manager);
        store.update_user(renamed.clone()).unwrap();

        assert_eq!(store.token().as_deref(), Some("tok-123"));
        assert!(store.is_authenticated());
        assert_eq!(store_with(&storage).user(), Some(renamed));
    }

    #[test]
    fn update_user_without_session_is_rejected() {
        let storage = MemoryStorage::arc();
        let store = store_with(&storage);
        assert!(store.update_user(alice()).is_err());
        assert_eq!(store.user(), None);
    }

    #[test]
    fn generation_advances_on_every_mutation() {
        let storage = MemoryStorage::arc();
        let store = store_with(&storage);
        assert_eq!(store.generation(), 0);

        store.set_session(alice(), "t").unwrap();
        store.update_user(alice()).unwrap();
        store.clear_session();
        assert_eq!(store.generation(), 3);
    }

    #[test]
    fn clearing_an_empty_session_keeps_the_generation() {
        let storage = MemoryStorage::arc();
        let store = store_with(&storage);
        store.clear_session();
        assert_eq!(store.generation(), 0);

        store.set_session(alice(), "t").unwrap();
        store.clear_session();
        store.clear_session();
        assert_eq!(store.generation(), 2);
    }

    #[test]
    fn token_from_blob_is_lenient_about_the_profile() {
        let raw = r#"{"state":{"user":{"username":123},"token":"abc"},"version":0}"#;
        assert_eq!(PersistedSession::token_from_blob(raw).as_deref(), Some("abc"));
        assert_eq!(PersistedSession::token_from_blob(r#"{"state":{}}"#), None);
        assert_eq!(PersistedSession::token_from_blob(r#"{"state":{"token":""}}"#), None);
        assert_eq!(PersistedSession::token_from_blob("garbage"), None);
    }
}
