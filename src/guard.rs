use std::sync::Arc;

use crate::routes::{LANDING, Route, RouteClass};
use crate::session::SessionStore;

/// NavigationDecision
///
/// The guard's verdict for one navigation attempt. A redirect aborts the
/// original navigation; the intended destination is discarded, not queued
/// for replay after login (the console's historical behavior — see
/// DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    Proceed,
    Redirect(Route),
}

/// RouteGuard
///
/// Gates every navigation on the current session state. `check` is
/// synchronous and must run before the target view mounts, so protected
/// content never flashes for an anonymous visitor.
///
/// Two abstract states drive the decision: `Authenticated` and
/// `Unauthenticated`, re-evaluated from the session store on every attempt
/// rather than cached here.
pub struct RouteGuard {
    session: Arc<SessionStore>,
}

impl RouteGuard {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }

    /// check
    ///
    /// - auth-only route while authenticated -> redirect to the landing
    ///   route.
    /// - protected route while unauthenticated -> redirect to login.
    /// - every other combination proceeds unmodified.
    pub fn check(&self, target: Route) -> NavigationDecision {
        let authenticated = self.session.is_authenticated();
        let decision = match (target.class(), authenticated) {
            (RouteClass::AuthOnly, true) => NavigationDecision::Redirect(LANDING),
            (RouteClass::Protected, false) => NavigationDecision::Redirect(Route::Login),
            _ => NavigationDecision::Proceed,
        };
        if let NavigationDecision::Redirect(to) = decision {
            tracing::debug!(
                "navigation to {} redirected to {} (authenticated={authenticated})",
                target.path(),
                to.path()
            );
        }
        decision
    }

    /// Path-based variant for callers holding raw URLs. Paths outside the
    /// route table proceed unmodified.
    pub fn check_path(&self, path: &str) -> NavigationDecision {
        match Route::from_path(path) {
            Some(route) => self.check(route),
            None => NavigationDecision::Proceed,
        }
    }
}
