//! Affiliate Portal Core
//!
//! Central coordination layer: configuration, logging, and the `Portal`
//! container that ties durable storage, the session, and the backend client
//! together for the dashboard's views.

mod config;
mod dashboard;
mod error;
mod portal;

pub use config::Config;
pub use dashboard::DashboardSummary;
pub use error::CoreError;
pub use portal::Portal;

// Re-export core components
pub use portal_api::{
    ApiClient, ApiError, Customer, PaymentMethod, WithdrawalRecord, WithdrawalRequest,
    WithdrawalStatus,
};
pub use portal_session::{
    Affiliate, AffiliateId, AuthPhase, Credential, LoginResponse, Navigator, NullNavigator, Route,
    SessionError, SessionManager, SessionSnapshot,
};
pub use portal_storage::{Database, StorageError};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
