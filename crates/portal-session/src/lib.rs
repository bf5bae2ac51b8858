//! Affiliate Portal Session Management
//!
//! - A session pairs the signed-in affiliate with the bearer credential
//!   issued at login; both are present or both are absent
//! - Sessions persist to durable storage and are rehydrated at startup
//! - Expired credentials are never restored, and a live credential is
//!   logged out automatically at its expiry instant
//! - Consumers observe changes through a `watch` subscription

mod clock;
mod credential;
mod error;
mod identity;
mod manager;
mod navigation;
mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credential::{is_expired, Claims, Credential};
pub use error::SessionError;
pub use identity::{Affiliate, AffiliateId, LoginResponse};
pub use manager::{SessionManager, AFFILIATE_KEY, TOKEN_KEY};
pub use navigation::{Navigator, NullNavigator, Route};
pub use state::{AuthPhase, SessionSnapshot};

pub type Result<T> = std::result::Result<T, SessionError>;
