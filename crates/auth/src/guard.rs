//! Route gating for protected views.
//!
//! Evaluation is a pure function of `(required_role, current_role,
//! is_authenticated)`; the redirect itself is a separate, explicit step
//! ([`RouteGuard::enforce`]) so routers can evaluate without side effects.

use serde::{Deserialize, Serialize};

use crate::navigator::Navigator;
use crate::roles::{Role, has_minimum_role};
use crate::session::{SessionState, SessionStore};

/// Inputs to a guard evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteGuardRequest {
    pub required_role: Role,
    pub current_role: Role,
    pub is_authenticated: bool,
}

impl RouteGuardRequest {
    pub fn new(required_role: Role, current_role: Role, is_authenticated: bool) -> Self {
        Self {
            required_role,
            current_role,
            is_authenticated,
        }
    }

    /// Request for `required_role` against the live session.
    pub fn for_session(required_role: Role, session: &SessionStore) -> Self {
        let state = session.state();
        Self::new(required_role, state.role(), state.is_authenticated())
    }
}

/// Outcome of a guard evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteGuardDecision {
    /// Render the protected view.
    Allow,
    /// Not signed in and the route needs more than guest access.
    RedirectLogin,
    /// Signed in (or guest route) but the role is too low.
    RedirectForbidden,
}

impl RouteGuardDecision {
    pub fn is_allowed(self) -> bool {
        self == RouteGuardDecision::Allow
    }
}

/// Message surfaced to the user alongside a redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "role", rename_all = "snake_case")]
pub enum GuardNotice {
    LoginRequired,
    RoleRequired(Role),
    SessionExpired,
}

impl core::fmt::Display for GuardNotice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            GuardNotice::LoginRequired => f.write_str("Please log in to use this page."),
            GuardNotice::RoleRequired(role) => {
                write!(f, "This page requires {} access.", role.display_name())
            }
            GuardNotice::SessionExpired => {
                f.write_str("Your session has expired. Please log in again.")
            }
        }
    }
}

/// Decide whether a protected view may render.
///
/// - No IO
/// - No panics
/// - Identical inputs always give the identical decision
pub fn evaluate(request: &RouteGuardRequest) -> RouteGuardDecision {
    if request.required_role != Role::Guest && !request.is_authenticated {
        return RouteGuardDecision::RedirectLogin;
    }
    if !has_minimum_role(request.current_role, request.required_role) {
        return RouteGuardDecision::RedirectForbidden;
    }
    RouteGuardDecision::Allow
}

/// Where guard redirects land and whether notices are shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    pub login_path: String,
    /// Destination for [`RouteGuardDecision::RedirectForbidden`].
    pub fallback_path: String,
    pub show_notice: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            fallback_path: "/".to_string(),
            show_notice: true,
        }
    }
}

/// Guard bound to a redirect configuration.
#[derive(Debug, Clone, Default)]
pub struct RouteGuard {
    config: GuardConfig,
}

impl RouteGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn evaluate(&self, request: &RouteGuardRequest) -> RouteGuardDecision {
        evaluate(request)
    }

    /// Private-route check: a user profile *and* a token must be present.
    pub fn evaluate_session(&self, state: &SessionState) -> RouteGuardDecision {
        if state.user().is_none() || state.token().is_none() {
            return RouteGuardDecision::RedirectLogin;
        }
        RouteGuardDecision::Allow
    }

    /// Redirect destination for a decision; `None` for [`RouteGuardDecision::Allow`].
    pub fn redirect_target(&self, decision: RouteGuardDecision) -> Option<&str> {
        match decision {
            RouteGuardDecision::Allow => None,
            RouteGuardDecision::RedirectLogin => Some(&self.config.login_path),
            RouteGuardDecision::RedirectForbidden => Some(&self.config.fallback_path),
        }
    }

    /// Notice for a decision, honouring `show_notice`.
    pub fn notice(
        &self,
        request: &RouteGuardRequest,
        decision: RouteGuardDecision,
    ) -> Option<GuardNotice> {
        if !self.config.show_notice {
            return None;
        }
        match decision {
            RouteGuardDecision::Allow => None,
            RouteGuardDecision::RedirectLogin => Some(GuardNotice::LoginRequired),
            RouteGuardDecision::RedirectForbidden => {
                Some(GuardNotice::RoleRequired(request.required_role))
            }
        }
    }

    /// Evaluate and perform the redirect (if any) through `navigator`.
    pub fn enforce(
        &self,
        request: &RouteGuardRequest,
        navigator: &dyn Navigator,
    ) -> RouteGuardDecision {
        let decision = self.evaluate(request);
        if let Some(target) = self.redirect_target(decision) {
            tracing::debug!(
                "route guard {:?}: required={} current={} authenticated={}",
                decision,
                request.required_role,
                request.current_role,
                request.is_authenticated
            );
            let notice = self.notice(request, decision);
            navigator.redirect(target, notice.as_ref());
        }
        decision
    }
}
