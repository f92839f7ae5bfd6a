//! Route guard: decides whether a console route may be shown.

use medconsole_session::SessionManager;
use medconsole_transport::{DASHBOARD_ROUTE, LOGIN_ROUTE};

/// Outcome of a route check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(&'static str),
}

/// Gatekeeper run before every route change.
///
/// The rules, in order:
///
/// 1. No valid session: anything but the login page goes to login.
/// 2. Signed in and heading for the login page: go to the dashboard.
/// 3. Signed in without the admin role: the session is cleared, go to login.
/// 4. `/` goes to the dashboard.
/// 5. Everything else is allowed.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    session: SessionManager,
}

impl RouteGuard {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    pub fn check(&self, path: &str) -> GuardDecision {
        if !self.session.is_authenticated() {
            return if path == LOGIN_ROUTE {
                GuardDecision::Allow
            } else {
                GuardDecision::Redirect(LOGIN_ROUTE)
            };
        }

        if path == LOGIN_ROUTE {
            return GuardDecision::Redirect(DASHBOARD_ROUTE);
        }

        if !self.session.is_admin() {
            tracing::warn!(path, "session is not an administrator, signing out");
            if let Err(e) = self.session.clear_session() {
                tracing::warn!(error = %e, "failed to clear session");
            }
            return GuardDecision::Redirect(LOGIN_ROUTE);
        }

        if path == "/" {
            return GuardDecision::Redirect(DASHBOARD_ROUTE);
        }
        GuardDecision::Allow
    }
}
