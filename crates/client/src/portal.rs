//! Wiring of session, credential middleware, API client, resolver and guard.

use std::sync::Arc;

use portal_auth::{
    DurableStorage, Navigator, Role, RouteGuard, RouteGuardDecision, RouteGuardRequest,
    SessionStore,
};
use portal_navigation::{NavigationResolver, RenderedEntry, ResolvedMenu, render_for_session};

use crate::auth_api::AuthApi;
use crate::client::{ApiClient, SharedClient};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::menu_api::MenuApi;
use crate::middleware::CredentialMiddleware;

/// Everything a front end needs, built in dependency order.
///
/// The session is rehydrated first, so the guard and the first outbound
/// request both see the restored identity.
pub struct Portal {
    session: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
    client: SharedClient,
    menus: Arc<MenuApi>,
    auth: AuthApi,
    resolver: NavigationResolver,
    guard: RouteGuard,
}

impl core::fmt::Debug for Portal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Portal")
            .field("session", &self.session)
            .field("client", &self.client)
            .field("resolver", &self.resolver)
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

impl Portal {
    pub fn connect(
        config: ClientConfig,
        storage: Arc<dyn DurableStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ClientError> {
        let session = SessionStore::arc(storage);
        let middleware = CredentialMiddleware::new(
            session.clone(),
            navigator.clone(),
            config.login_path.clone(),
        );
        let guard = RouteGuard::new(config.guard_config());
        let resolver_config = config.resolver_config();

        let client = Arc::new(ApiClient::new(config, middleware)?);
        let menus = Arc::new(MenuApi::new(client.clone()));
        let auth = AuthApi::new(client.clone(), session.clone());
        let resolver = NavigationResolver::with_static_catalog(menus.clone(), resolver_config);

        tracing::info!(
            "portal ready (authenticated: {}, role: {})",
            session.is_authenticated(),
            session.current_role()
        );

        Ok(Self {
            session,
            navigator,
            client,
            menus,
            auth,
            resolver,
            guard,
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn client(&self) -> &SharedClient {
        &self.client
    }

    pub fn menus(&self) -> &MenuApi {
        &self.menus
    }

    pub fn auth(&self) -> &AuthApi {
        &self.auth
    }

    pub fn resolver(&self) -> &NavigationResolver {
        &self.resolver
    }

    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }

    /// Resolve the menu for the current session.
    pub async fn resolve_menu(&self) -> ResolvedMenu {
        self.resolver.resolve_for_session(&self.session).await
    }

    /// Resolve and render for the current session.
    ///
    /// A result resolved for a session that has since changed (typically a
    /// 401 on the menu fetch itself) is discarded and resolved once more for
    /// the new session. `None` when the session changed again.
    pub async fn render_menu(&self) -> Option<Vec<RenderedEntry>> {
        let mut resolved = self.resolve_menu().await;
        if !resolved.is_current(&self.session) {
            tracing::debug!("menu resolved for a previous session; resolving again");
            resolved = self.resolve_menu().await;
            if !resolved.is_current(&self.session) {
                tracing::debug!("session changed again; discarding menu");
                return None;
            }
        }
        Some(render_for_session(
            resolved.resolution.entries(),
            &self.session.state(),
        ))
    }

    /// Gate a protected view, redirecting through the navigator when denied.
    pub fn enter(&self, required_role: Role) -> RouteGuardDecision {
        let request = RouteGuardRequest::for_session(required_role, &self.session);
        self.guard.enforce(&request, self.navigator.as_ref())
    }
}
