//! Affiliate Portal Backend Client
//!
//! Typed access to the affiliate backend's REST endpoints. Authenticated
//! calls carry `Authorization: Bearer <credential>`.

mod client;
mod error;
mod models;

pub use client::ApiClient;
pub use error::ApiError;
pub use models::{
    AccountProfile, Customer, NotificationSettings, PaymentMethod, PrivacySettings, Subscription,
    WithdrawalRecord, WithdrawalRequest, WithdrawalStatus,
};

pub type Result<T> = std::result::Result<T, ApiError>;
