//! Dashboard routes and the navigation seam

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    Dashboard,
    Login,
    ForgotPassword,
    ResetConfirmed,
    ChangePassword,
    EditAccount,
    ViewCustomers,
    OrderHistory,
    RequestWithdrawal,
    ReferFriend,
    Redeem,
    PrivacySettings,
    NotificationSettings,
    CloseAccount,
    LogIssue,
}

impl Route {
    pub const ALL: [Route; 15] = [
        Route::Dashboard,
        Route::Login,
        Route::ForgotPassword,
        Route::ResetConfirmed,
        Route::ChangePassword,
        Route::EditAccount,
        Route::ViewCustomers,
        Route::OrderHistory,
        Route::RequestWithdrawal,
        Route::ReferFriend,
        Route::Redeem,
        Route::PrivacySettings,
        Route::NotificationSettings,
        Route::CloseAccount,
        Route::LogIssue,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Dashboard => "/",
            Route::Login => "/login",
            Route::ForgotPassword => "/forgot-password",
            Route::ResetConfirmed => "/reset-confirmed",
            Route::ChangePassword => "/change-password",
            Route::EditAccount => "/edit-account",
            Route::ViewCustomers => "/view-customers",
            Route::OrderHistory => "/order-history",
            Route::RequestWithdrawal => "/request-withdrawal",
            Route::ReferFriend => "/refer-friend",
            Route::Redeem => "/redeem",
            Route::PrivacySettings => "/privacy-settings",
            Route::NotificationSettings => "/notification-settings",
            Route::CloseAccount => "/close-account",
            Route::LogIssue => "/log-issue",
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        let trimmed = path.trim_end_matches('/');
        let trimmed = if trimmed.is_empty() { "/" } else { trimmed };
        Route::ALL.into_iter().find(|r| r.path() == trimmed)
    }

    /// Pages reachable without a session.
    pub fn requires_auth(&self) -> bool {
        !matches!(
            self,
            Route::Login | Route::ForgotPassword | Route::ResetConfirmed
        )
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

impl std::str::FromStr for Route {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Route::from_path(s).ok_or_else(|| SessionError::UnknownRoute(s.to_string()))
    }
}

/// Receives navigation requests issued by the session on login and logout.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator that only records the request in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNavigator;

impl Navigator for NullNavigator {
    fn navigate(&self, route: Route) {
        tracing::debug!(route = %route, "Navigation requested");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_round_trip() {
        for route in Route::ALL {
            assert_eq!(Route::from_path(route.path()), Some(route));
            assert_eq!(route.to_string().parse::<Route>().unwrap(), route);
        }
    }

    #[test]
    fn test_trailing_slash_and_unknown() {
        assert_eq!(Route::from_path("/login/"), Some(Route::Login));
        assert_eq!(Route::from_path(""), Some(Route::Dashboard));
        assert!(Route::from_path("/admin").is_none());
        assert!("/admin".parse::<Route>().is_err());
    }

    #[test]
    fn test_public_routes() {
        assert!(!Route::Login.requires_auth());
        assert!(!Route::ForgotPassword.requires_auth());
        assert!(!Route::ResetConfirmed.requires_auth());
        assert!(Route::Dashboard.requires_auth());
        assert!(Route::RequestWithdrawal.requires_auth());
    }
}
