//! Authentication State Machine
//!
//! ```text
//! Authenticating ──rehydrate(valid)──▶ Authenticated
//!       │                                 │   ▲
//!       └──rehydrate(none/expired)──▶ Unauthenticated
//!                                         ▲   │
//!           logout / expiry timer ────────┘   └── login
//! ```

use serde::{Deserialize, Serialize};

use crate::credential::Credential;
use crate::identity::Affiliate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthPhase {
    /// Startup rehydration check in progress
    Authenticating,
    /// No session
    Unauthenticated,
    /// Affiliate and credential present
    Authenticated,
}

impl AuthPhase {
    /// Check if transition to another phase is valid
    pub fn can_transition_to(&self, target: AuthPhase) -> bool {
        match (self, target) {
            // Startup resolves exactly once, either way
            (AuthPhase::Authenticating, AuthPhase::Authenticated) => true,
            (AuthPhase::Authenticating, AuthPhase::Unauthenticated) => true,
            (AuthPhase::Unauthenticated, AuthPhase::Authenticated) => true,
            (AuthPhase::Authenticated, AuthPhase::Unauthenticated) => true,
            // Re-login replaces the session wholesale
            (AuthPhase::Authenticated, AuthPhase::Authenticated) => true,
            (AuthPhase::Unauthenticated, AuthPhase::Unauthenticated) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthPhase::Authenticating => "authenticating",
            AuthPhase::Unauthenticated => "unauthenticated",
            AuthPhase::Authenticated => "authenticated",
        }
    }
}

impl std::fmt::Display for AuthPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What consumers see of the session at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub affiliate: Option<Affiliate>,
    pub affiliate_id: Option<String>,
    pub credential: Option<Credential>,
    pub loading: bool,
    pub phase: AuthPhase,
}

impl SessionSnapshot {
    pub(crate) fn initial() -> Self {
        Self {
            affiliate: None,
            affiliate_id: None,
            credential: None,
            loading: true,
            phase: AuthPhase::Authenticating,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase == AuthPhase::Authenticated
    }

    /// `Authorization` header value for outbound requests.
    pub fn bearer_header(&self) -> Option<String> {
        self.credential.as_ref().map(Credential::bearer)
    }
}
