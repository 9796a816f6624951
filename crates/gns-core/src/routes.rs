//! Dashboard route table and the authentication guard evaluated before
//! every navigation.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
    Tasks,
    Logs,
    ApiTokens,
    Teams,
    Settings,
}

impl Route {
    pub const ALL: [Route; 7] = [
        Route::Login,
        Route::Dashboard,
        Route::Tasks,
        Route::Logs,
        Route::ApiTokens,
        Route::Teams,
        Route::Settings,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Dashboard => "/",
            Route::Tasks => "/tasks",
            Route::Logs => "/logs",
            Route::ApiTokens => "/tokens",
            Route::Teams => "/teams",
            Route::Settings => "/settings",
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        let trimmed = path.trim().trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        Self::ALL.into_iter().find(|route| route.path() == normalized)
    }

    /// Everything except the login page sits behind authentication.
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Route::Login)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(Route),
}

impl GuardDecision {
    /// The route the navigation actually lands on
    pub fn destination(self, target: Route) -> Route {
        match self {
            GuardDecision::Proceed => target,
            GuardDecision::Redirect(route) => route,
        }
    }
}

pub fn guard(target: Route, authenticated: bool) -> GuardDecision {
    if target.requires_auth() && !authenticated {
        GuardDecision::Redirect(Route::Login)
    } else if target == Route::Login && authenticated {
        GuardDecision::Redirect(Route::Dashboard)
    } else {
        GuardDecision::Proceed
    }
}

/// Receives route changes; the front end decides what showing a route means.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}
