//! Seam between the portal core and the view router.

use crate::guard::GuardNotice;

/// Performs navigations requested by the route guard and the credential
/// middleware. Implemented by whatever owns the view stack.
pub trait Navigator: Send + Sync {
    /// Replace the current view with `to`, optionally surfacing `notice`.
    fn redirect(&self, to: &str, notice: Option<&GuardNotice>);
}

/// Navigator that only records redirects in the log.
///
/// Used when no router is attached (headless tools, tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn redirect(&self, to: &str, notice: Option<&GuardNotice>) {
        match notice {
            Some(notice) => tracing::info!("redirect to {to}: {notice}"),
            None => tracing::info!("redirect to {to}"),
        }
    }
}
