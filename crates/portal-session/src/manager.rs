//! Session Manager
//!
//! Owns the signed-in affiliate and credential, mirrors them into durable
//! storage, and logs out automatically when the credential expires.

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use portal_storage::Database;

use crate::clock::{Clock, SystemClock};
use crate::credential::Credential;
use crate::identity::{Affiliate, LoginResponse};
use crate::navigation::{Navigator, Route};
use crate::state::{AuthPhase, SessionSnapshot};
use crate::Result;

/// Storage key holding the raw credential
pub const TOKEN_KEY: &str = "token";
/// Storage key holding the JSON-serialized affiliate
pub const AFFILIATE_KEY: &str = "affiliate";

/// The single pending auto-logout, if any.
#[derive(Default)]
struct ExpiryTimer {
    /// Bumped on every re-arm or cancel; a firing task with a stale
    /// generation does nothing.
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl ExpiryTimer {
    fn disarm(&mut self) {
        self.generation += 1;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Owns the session. Session changes that touch the timer run under the
/// `expiry` lock, taken before `state`; the navigator is called with no
/// lock held.
pub struct SessionManager {
    /// Current session, published to subscribers on every change
    state: Arc<RwLock<SessionSnapshot>>,
    /// Pending expiry task
    expiry: Arc<Mutex<ExpiryTimer>>,
    /// Durable backing copy
    db: Database,
    clock: Arc<dyn Clock>,
    navigator: Arc<dyn Navigator>,
    events: Arc<watch::Sender<SessionSnapshot>>,
}

impl SessionManager {
    pub fn new(db: Database, navigator: Arc<dyn Navigator>) -> Self {
        Self::with_clock(db, navigator, Arc::new(SystemClock))
    }

    pub fn with_clock(db: Database, navigator: Arc<dyn Navigator>, clock: Arc<dyn Clock>) -> Self {
        let (events, _) = watch::channel(SessionSnapshot::initial());

        Self {
            state: Arc::new(RwLock::new(SessionSnapshot::initial())),
            expiry: Arc::new(Mutex::new(ExpiryTimer::default())),
            db,
            clock,
            navigator,
            events: Arc::new(events),
        }
    }

    /// Restore the persisted session at startup.
    ///
    /// Expired or unreadable sessions are logged out. `loading` drops to
    /// false once this returns, and a second call changes nothing.
    pub fn rehydrate(&self) -> AuthPhase {
        if !self.state.read().loading {
            tracing::warn!("Session already rehydrated");
            return self.phase();
        }

        match self.load_persisted() {
            Ok(Some((credential, affiliate))) => {
                if credential.is_expired_at(self.clock.now()) {
                    tracing::info!("Persisted credential expired, clearing session");
                    self.logout();
                } else {
                    tracing::info!(affiliate_id = %affiliate.id, "Restored session");
                    if !self.begin(credential, affiliate, false) {
                        self.logout();
                    }
                }
            }
            Ok(None) => {
                tracing::debug!("No persisted session");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Persisted session unreadable, clearing");
                self.logout();
            }
        }

        let snapshot = {
            let mut state = self.state.write();
            state.loading = false;
            if state.phase == AuthPhase::Authenticating {
                state.phase = AuthPhase::Unauthenticated;
            }
            state.clone()
        };
        self.publish(snapshot.clone());

        snapshot.phase
    }

    /// Start a session from the backend's login payload.
    ///
    /// A payload without a token or affiliate is logged and ignored. An
    /// already expired credential is never stored; it ends any current
    /// session instead.
    pub fn login(&self, response: LoginResponse) {
        let token = response.token.filter(|t| !t.is_empty());
        let (Some(token), Some(affiliate)) = (token, response.affiliate) else {
            tracing::error!("Token or affiliate data not found in login response");
            return;
        };

        let credential = Credential::new(token);
        if credential.is_expired_at(self.clock.now()) {
            tracing::warn!(affiliate_id = %affiliate.id, "Login credential already expired");
            self.logout();
            return;
        }

        let affiliate_id = affiliate.id.to_string();
        if !self.begin(credential, affiliate, true) {
            self.logout();
            return;
        }

        tracing::info!(affiliate_id = %affiliate_id, "Logged in");
        self.navigator.navigate(Route::Dashboard);
    }

    /// End the session. Safe to call when already logged out.
    pub fn logout(&self) {
        {
            let mut timer = self.expiry.lock();
            timer.disarm();
            self.clear();
        }
        self.navigator.navigate(Route::Login);
    }

    /// Arm the auto-logout for `credential`, replacing any pending one.
    ///
    /// An already expired or undecodable credential logs out immediately.
    /// Without a tokio runtime the timer is skipped and expiry is enforced
    /// at the next rehydration.
    pub fn schedule_expiry(&self, credential: &Credential) {
        let armed = {
            let mut timer = self.expiry.lock();
            self.arm(&mut timer, credential)
        };
        if !armed {
            tracing::info!("Credential expired");
            self.logout();
        }
    }

    /// Replace the session and its timer in one step.
    ///
    /// Returns false when the credential turned out to be expired; the
    /// caller logs out.
    fn begin(&self, credential: Credential, affiliate: Affiliate, persist: bool) -> bool {
        let mut timer = self.expiry.lock();
        timer.disarm();

        if persist {
            if let Err(e) = self.persist(&credential, &affiliate) {
                tracing::error!(error = %e, "Failed to persist session");
            }
        }
        self.install(credential.clone(), affiliate);

        self.arm(&mut timer, &credential)
    }

    /// Spawn the timer task for `credential`. Must be called with the
    /// `expiry` lock held.
    fn arm(&self, timer: &mut ExpiryTimer, credential: &Credential) -> bool {
        let now = self.clock.now();
        let exp = match credential.expires_at() {
            Some(exp) if !credential.is_expired_at(now) => exp,
            _ => return false,
        };

        timer.disarm();

        let delay = Duration::from_secs(u64::try_from(exp - now).unwrap_or_default());

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime, expiry timer not armed");
            return true;
        };

        // Deadline is fixed now, not when the task is first polled
        let Some(deadline) = tokio::time::Instant::now().checked_add(delay) else {
            tracing::warn!(exp, "Expiry too far in the future, timer not armed");
            return true;
        };

        let generation = timer.generation;
        let manager = self.clone();
        timer.task = Some(runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            manager.expire(generation);
        }));

        tracing::debug!(expires_in_secs = delay.as_secs(), "Armed expiry timer");
        true
    }

    fn expire(&self, generation: u64) {
        {
            let mut timer = self.expiry.lock();
            if timer.generation != generation {
                tracing::debug!(generation, "Ignoring stale expiry timer");
                return;
            }
            // Running inside this task; drop the handle rather than abort it
            timer.task = None;
            timer.generation += 1;

            tracing::info!("Credential expired, logging out");
            self.clear();
        }
        self.navigator.navigate(Route::Login);
    }

    /// Drop the session from memory and storage. Must be called with the
    /// `expiry` lock held.
    fn clear(&self) {
        let snapshot = {
            let mut state = self.state.write();
            if state.phase == AuthPhase::Authenticated {
                tracing::info!(affiliate_id = ?state.affiliate_id, "Logged out");
            }
            state.affiliate = None;
            state.affiliate_id = None;
            state.credential = None;
            state.phase = AuthPhase::Unauthenticated;
            state.clone()
        };

        if let Err(e) = self.db.remove_many(&[TOKEN_KEY, AFFILIATE_KEY]) {
            tracing::error!(error = %e, "Failed to clear persisted session");
        }

        self.publish(snapshot);
    }

    fn install(&self, credential: Credential, affiliate: Affiliate) {
        let snapshot = {
            let mut state = self.state.write();
            debug_assert!(state.phase.can_transition_to(AuthPhase::Authenticated));
            state.affiliate_id = Some(affiliate.id.to_string());
            state.affiliate = Some(affiliate);
            state.credential = Some(credential);
            state.phase = AuthPhase::Authenticated;
            state.clone()
        };
        self.publish(snapshot);
    }

    fn persist(&self, credential: &Credential, affiliate: &Affiliate) -> Result<()> {
        let affiliate_json = serde_json::to_string(affiliate)?;
        self.db.set_many(&[
            (TOKEN_KEY, credential.as_str()),
            (AFFILIATE_KEY, affiliate_json.as_str()),
        ])?;
        Ok(())
    }

    /// Both keys must be present; a lone leftover key is dropped.
    fn load_persisted(&self) -> Result<Option<(Credential, Affiliate)>> {
        let token = self.db.get(TOKEN_KEY)?;
        let affiliate = self.db.get(AFFILIATE_KEY)?;

        match (token, affiliate) {
            (Some(token), Some(affiliate_json)) => {
                let affiliate: Affiliate = serde_json::from_str(&affiliate_json)?;
                Ok(Some((Credential::new(token), affiliate)))
            }
            (None, None) => Ok(None),
            _ => {
                tracing::debug!("Dropping incomplete persisted session");
                self.db.remove_many(&[TOKEN_KEY, AFFILIATE_KEY])?;
                Ok(None)
            }
        }
    }

    fn publish(&self, snapshot: SessionSnapshot) {
        self.events.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    /// Receive a fresh snapshot after every session change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.read().clone()
    }

    pub fn affiliate(&self) -> Option<Affiliate> {
        self.state.read().affiliate.clone()
    }

    pub fn affiliate_id(&self) -> Option<String> {
        self.state.read().affiliate_id.clone()
    }

    pub fn credential(&self) -> Option<Credential> {
        self.state.read().credential.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    pub fn phase(&self) -> AuthPhase {
        self.state.read().phase
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase() == AuthPhase::Authenticated
    }

    #[cfg(test)]
    fn expiry_generation(&self) -> u64 {
        self.expiry.lock().generation
    }

    pub fn has_pending_expiry(&self) -> bool {
        self.expiry
            .lock()
            .task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Clone for SessionManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            expiry: Arc::clone(&self.expiry),
            db: self.db.clone(),
            clock: Arc::clone(&self.clock),
            navigator: Arc::clone(&self.navigator),
            events: Arc::clone(&self.events),
        }
    }
}
