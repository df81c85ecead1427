//! Route resolution against the session state.
//!
//! Authenticated users reach the matcher, profile and settings views;
//! anonymous users reach the login, signup and password reset views. A
//! request for a route outside the current state's set lands on that
//! state's entry point.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Matcher,
    Profile,
    Settings,
    Login,
    Signup,
    RequestPasswordReset,
    ResetPassword,
}

impl Route {
    pub fn requires_auth(self) -> bool {
        matches!(self, Route::Matcher | Route::Profile | Route::Settings)
    }

    /// Where a user in `state` lands by default.
    pub fn entry(state: SessionState) -> Self {
        match state {
            SessionState::Authenticated => Route::Matcher,
            SessionState::Anonymous => Route::Login,
        }
    }

    fn allowed_in(self, state: SessionState) -> bool {
        self.requires_auth() == (state == SessionState::Authenticated)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Route::Matcher => "matcher",
            Route::Profile => "profile",
            Route::Settings => "settings",
            Route::Login => "login",
            Route::Signup => "signup",
            Route::RequestPasswordReset => "request-password-reset",
            Route::ResetPassword => "reset-password",
        };
        f.write_str(name)
    }
}

/// Current route, shared between the front end and the 401 stage.
#[derive(Debug, Clone)]
pub struct Router {
    current: Arc<Mutex<Route>>,
}

impl Default for Router {
    fn default() -> Self {
        Self {
            current: Arc::new(Mutex::new(Route::Login)),
        }
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Route> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn current(&self) -> Route {
        *self.lock()
    }

    /// Navigate to `requested`, or to the entry point of `state` when the
    /// route is not available in that state. Returns where we ended up.
    pub fn resolve(&self, requested: Route, state: SessionState) -> Route {
        let route = if requested.allowed_in(state) {
            requested
        } else {
            Route::entry(state)
        };
        if route != requested {
            tracing::debug!(%requested, %route, "route redirected");
        }
        *self.lock() = route;
        route
    }

    /// Force the unauthenticated entry point.
    pub fn reset(&self) {
        *self.lock() = Route::Login;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use SessionState::{Anonymous, Authenticated};

    #[test]
    fn authenticated_routes() {
        let router = Router::new();
        assert_eq!(router.resolve(Route::Profile, Authenticated), Route::Profile);
        assert_eq!(router.resolve(Route::Settings, Authenticated), Route::Settings);
        assert_eq!(router.resolve(Route::Login, Authenticated), Route::Matcher);
        assert_eq!(router.resolve(Route::Signup, Authenticated), Route::Matcher);
        assert_eq!(router.current(), Route::Matcher);
    }

    #[test]
    fn anonymous_routes() {
        let router = Router::new();
        assert_eq!(router.resolve(Route::Signup, Anonymous), Route::Signup);
        assert_eq!(
            router.resolve(Route::ResetPassword, Anonymous),
            Route::ResetPassword
        );
        assert_eq!(router.resolve(Route::Matcher, Anonymous), Route::Login);
        assert_eq!(router.resolve(Route::Settings, Anonymous), Route::Login);
    }

    #[test]
    fn reset_goes_to_login_for_every_clone() {
        let router = Router::new();
        let hook = router.clone();
        router.resolve(Route::Settings, Authenticated);

        hook.reset();
        assert_eq!(router.current(), Route::Login);
    }

    #[test]
    fn entry_points_and_auth_requirements() {
        assert_eq!(Route::entry(Authenticated), Route::Matcher);
        assert_eq!(Route::entry(Anonymous), Route::Login);
        assert!(Route::Profile.requires_auth());
        assert!(!Route::Signup.requires_auth());
        assert_eq!(Route::RequestPasswordReset.to_string(), "request-password-reset");
    }
}
