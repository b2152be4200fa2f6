//! Bearer credential attach and 401 teardown around every API call.
//!
//! The two halves compose explicitly into the client's call path:
//! `request = attach_credential(request)` before send and
//! `response = detect_unauthorized(response)?` after receive.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Request, Response, StatusCode};

use portal_auth::{DurableStorage, GuardNotice, Navigator, PersistedSession, SessionStore, keys};

use crate::error::ClientError;

pub struct CredentialMiddleware {
    session: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
    login_path: String,
}

impl core::fmt::Debug for CredentialMiddleware {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialMiddleware")
            .field("login_path", &self.login_path)
            .finish_non_exhaustive()
    }
}

impl CredentialMiddleware {
    pub fn new(
        session: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            session,
            navigator,
            login_path: login_path.into(),
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Find the bearer token in durable storage.
    ///
    /// Reads the primary key first. When it is empty the token is recovered
    /// from the session snapshot and written back to the primary key. Storage
    /// failures along the way mean "no token".
    pub fn resolve_token(&self) -> Option<String> {
        let storage = self.session.storage();

        match storage.get(keys::TOKEN) {
            Ok(Some(token)) if !token.trim().is_empty() => return Some(token),
            Ok(_) => {}
            Err(err) => tracing::warn!("token read failed, trying snapshot: {err}"),
        }

        let token = recover_from_snapshot(storage.as_ref())?;
        if let Err(err) = storage.set(keys::TOKEN, &token) {
            tracing::warn!("could not restore primary token key: {err}");
        } else {
            tracing::debug!("restored primary token from snapshot ({})", token_prefix(&token));
        }
        Some(token)
    }

    /// Attach `Authorization: Bearer <token>` when a token resolves.
    ///
    /// Without a token the request goes out untouched.
    pub fn attach_credential(&self, mut request: Request) -> Request {
        let Some(token) = self.resolve_token() else {
            tracing::debug!("no credential for {} {}", request.method(), request.url().path());
            return request;
        };

        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers_mut().insert(AUTHORIZATION, value);
                tracing::debug!("attached credential ({})", token_prefix(&token));
            }
            Err(_) => tracing::warn!(
                "stored token is not a valid header value; sending without credential"
            ),
        }
        request
    }

    /// Tear the session down on a 401 and reject the response.
    ///
    /// Every other status passes through. Concurrent 401s each clear the
    /// session and redirect independently; both operations are idempotent.
    pub fn detect_unauthorized(&self, response: Response) -> Result<Response, ClientError> {
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::warn!("{} answered 401; clearing session", response.url().path());
        self.session.clear_session();
        self.navigator
            .redirect(&self.login_path, Some(&GuardNotice::SessionExpired));
        Err(ClientError::Unauthorized)
    }
}

fn recover_from_snapshot(storage: &dyn DurableStorage) -> Option<String> {
    match storage.get(keys::SNAPSHOT) {
        Ok(Some(blob)) => {
            let token = PersistedSession::token_from_blob(&blob);
            if token.is_none() {
                tracing::debug!("session snapshot holds no token");
            }
            token
        }
        Ok(None) => None,
        Err(err) => {
            tracing::warn!("snapshot read failed: {err}");
            None
        }
    }
}

/// First few characters of a token, for logs.
pub(crate) fn token_prefix(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    if prefix.len() < token.len() {
        format!("{prefix}...")
    } else {
        prefix
    }
}
