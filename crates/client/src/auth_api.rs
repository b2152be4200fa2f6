//! Authentication endpoints and their effect on the session.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use portal_auth::{SessionStore, UserProfile};

use crate::client::SharedClient;
use crate::error::ClientError;

#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl core::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

impl core::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("full_name", &self.full_name)
            .finish()
    }
}

/// Body of a successful login or registration.
#[derive(Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

impl core::fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthResponse")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Login, registration and profile refresh. The only API surface that
/// mutates the session besides the credential middleware.
#[derive(Debug, Clone)]
pub struct AuthApi {
    client: SharedClient,
    session: Arc<SessionStore>,
}

impl AuthApi {
    pub fn new(client: SharedClient, session: Arc<SessionStore>) -> Self {
        Self { client, session }
    }

    /// `POST /auth/login`, then start a session with the returned identity.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<UserProfile, ClientError> {
        let response: AuthResponse = self.client.post_json("/auth/login", credentials).await?;
        self.session
            .set_session(response.user.clone(), response.token)?;
        tracing::info!("logged in as {} ({})", response.user.username, response.user.role);
        Ok(response.user)
    }

    /// `POST /auth/register`. Does not sign the new user in.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        let response: AuthResponse = self.client.post_json("/auth/register", request).await?;
        tracing::info!("registered {}", response.user.username);
        Ok(response)
    }

    /// `GET /users/me`, then refresh the session's profile.
    pub async fn current_user(&self) -> Result<UserProfile, ClientError> {
        let user: UserProfile = self.client.get_json("/users/me").await?;
        self.session.update_user(user.clone())?;
        Ok(user)
    }

    /// Notify the server (best effort) and end the local session.
    pub async fn logout(&self) {
        if self.session.is_authenticated() {
            if let Err(err) = self
                .client
                .post_json::<_, serde_json::Value>("/auth/logout", &serde_json::json!({}))
                .await
            {
                tracing::debug!("server logout failed: {err}");
            }
        }
        self.session.clear_session();
        tracing::info!("logged out");
    }
}
