//! Main portal state container
//!
//! Views read session state from here and issue backend calls through it.

use std::sync::Arc;

use portal_api::{
    AccountProfile, ApiClient, ApiError, Customer, NotificationSettings, PaymentMethod,
    PrivacySettings, Subscription, WithdrawalRecord, WithdrawalRequest,
};
use portal_session::{Affiliate, AuthPhase, Navigator, Route, SessionManager};
use portal_storage::Database;

use crate::config::Config;
use crate::dashboard::DashboardSummary;
use crate::error::CoreError;
use crate::Result;

pub struct Portal {
    /// Configuration
    config: Config,
    /// Session manager (owns identity, credential, expiry)
    session: SessionManager,
    /// Unauthenticated backend client
    api: ApiClient,
}

impl Portal {
    pub fn new(config: Config, navigator: Arc<dyn Navigator>) -> Result<Self> {
        let db = Database::open(&config.database_path)?;
        let session = SessionManager::new(db, navigator);
        Self::with_session(config, session)
    }

    pub fn with_session(config: Config, session: SessionManager) -> Result<Self> {
        let api = ApiClient::new(config.api_url()?);

        Ok(Self {
            config,
            session,
            api,
        })
    }

    /// Restore any persisted session. Call once at startup.
    pub fn initialize(&self) -> AuthPhase {
        let phase = self.session.rehydrate();
        tracing::info!(phase = %phase, "Portal initialized");
        phase
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    // === Authentication ===

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Affiliate> {
        let response = self.api.login(email, password).await?;
        self.session.login(response);

        match self.session.affiliate() {
            Some(affiliate) if self.session.is_authenticated() => Ok(affiliate),
            _ => Err(CoreError::LoginRejected),
        }
    }

    pub fn sign_out(&self) {
        self.session.logout();
    }

    /// Which route to render for a request to `route`.
    ///
    /// `None` while the startup check is still running; protected pages
    /// redirect to the login page without a session.
    pub fn guard(&self, route: Route) -> Option<Route> {
        let snapshot = self.session.snapshot();
        if snapshot.loading {
            return None;
        }
        if route.requires_auth() && !snapshot.is_authenticated() {
            tracing::debug!(requested = %route, "Redirecting to login");
            return Some(Route::Login);
        }
        Some(route)
    }

    // === Affiliate data ===

    /// Client bound to the current credential, plus the affiliate id.
    fn authorized(&self) -> Result<(ApiClient, String)> {
        let snapshot = self.session.snapshot();
        match (snapshot.credential, snapshot.affiliate_id) {
            (Some(credential), Some(affiliate_id)) => {
                Ok((self.api.with_credential(credential), affiliate_id))
            }
            _ => Err(CoreError::NotAuthenticated),
        }
    }

    /// Client bound to the current credential, plus the user id the
    /// account endpoints expect: the credential's subject, else the
    /// affiliate id.
    fn account(&self) -> Result<(ApiClient, String)> {
        let snapshot = self.session.snapshot();
        match (snapshot.credential, snapshot.affiliate_id) {
            (Some(credential), Some(affiliate_id)) => {
                let user_id = credential
                    .claims()
                    .and_then(|claims| claims.sub)
                    .filter(|sub| !sub.is_empty())
                    .unwrap_or(affiliate_id);
                Ok((self.api.with_credential(credential), user_id))
            }
            _ => Err(CoreError::NotAuthenticated),
        }
    }

    /// A rejected credential ends the session.
    fn api_failure(&self, error: ApiError) -> CoreError {
        if error.is_unauthorized() {
            tracing::warn!(error = %error, "Backend rejected credential, logging out");
            self.session.logout();
        }
        CoreError::Api(error)
    }

    pub async fn dashboard(&self) -> Result<DashboardSummary> {
        let (api, affiliate_id) = self.authorized()?;

        let (customers, earned, balance, withdrawn) = futures_util::try_join!(
            api.referred_customers(&affiliate_id),
            api.total_earnings(&affiliate_id),
            api.balance(&affiliate_id),
            api.total_withdrawn(&affiliate_id),
        )
        .map_err(|e| self.api_failure(e))?;

        Ok(DashboardSummary::new(
            customers.len(),
            earned,
            balance,
            withdrawn,
        ))
    }

    pub async fn customers(&self, query: Option<&str>) -> Result<Vec<Customer>> {
        let (api, affiliate_id) = self.authorized()?;
        let customers = api
            .referred_customers(&affiliate_id)
            .await
            .map_err(|e| self.api_failure(e))?;

        Ok(match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(query) => customers.into_iter().filter(|c| c.matches(query)).collect(),
            None => customers,
        })
    }

    pub async fn withdrawals(&self) -> Result<Vec<WithdrawalRecord>> {
        let (api, affiliate_id) = self.authorized()?;
        api.withdrawal_requests(&affiliate_id)
            .await
            .map_err(|e| self.api_failure(e))
    }

    /// Submit a withdrawal and return the refreshed request list.
    pub async fn submit_withdrawal(
        &self,
        method: PaymentMethod,
        amount: f64,
    ) -> Result<Vec<WithdrawalRecord>> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(CoreError::InvalidAmount(amount));
        }

        let (api, affiliate_id) = self.authorized()?;
        let request = WithdrawalRequest {
            affiliate_id: affiliate_id.clone(),
            amount,
            method,
        };

        api.request_withdrawal(&request)
            .await
            .map_err(|e| self.api_failure(e))?;

        api.withdrawal_requests(&affiliate_id)
            .await
            .map_err(|e| self.api_failure(e))
    }

    pub async fn change_password(&self, current_password: &str, new_password: &str) -> Result<()> {
        let (api, _) = self.authorized()?;
        let email = self
            .session
            .affiliate()
            .and_then(|a| a.email)
            .ok_or(CoreError::NotAuthenticated)?;

        api.change_password(&email, current_password, new_password)
            .await
            .map_err(|e| self.api_failure(e))
    }

    // === Account settings ===

    pub async fn profile(&self) -> Result<AccountProfile> {
        let (api, user_id) = self.account()?;
        api.account_profile(&user_id)
            .await
            .map_err(|e| self.api_failure(e))
    }

    pub async fn update_profile(&self, profile: &AccountProfile) -> Result<()> {
        let (api, user_id) = self.account()?;
        api.update_account_profile(&user_id, profile)
            .await
            .map_err(|e| self.api_failure(e))
    }

    pub async fn privacy_settings(&self) -> Result<PrivacySettings> {
        let (api, user_id) = self.account()?;
        api.privacy_settings(&user_id)
            .await
            .map_err(|e| self.api_failure(e))
    }

    pub async fn update_privacy_settings(&self, settings: &PrivacySettings) -> Result<()> {
        let (api, user_id) = self.account()?;
        api.update_privacy_settings(&user_id, settings)
            .await
            .map_err(|e| self.api_failure(e))
    }

    pub async fn notification_settings(&self) -> Result<NotificationSettings> {
        let (api, user_id) = self.account()?;
        api.notification_settings(&user_id)
            .await
            .map_err(|e| self.api_failure(e))
    }

    pub async fn update_notification_settings(&self, settings: &NotificationSettings) -> Result<()> {
        let (api, user_id) = self.account()?;
        api.update_notification_settings(&user_id, settings)
            .await
            .map_err(|e| self.api_failure(e))
    }

    pub async fn order_history(&self) -> Result<Vec<Subscription>> {
        let (api, user_id) = self.account()?;
        api.subscriptions(&user_id)
            .await
            .map_err(|e| self.api_failure(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use portal_session::{AffiliateId, LoginResponse, NullNavigator};
    use serde_json::{json, Value};
    use std::path::PathBuf;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn portal_at(base: &str) -> Portal {
        let db = Database::open_in_memory().unwrap();
        let session = SessionManager::new(db, Arc::new(NullNavigator));
        let mut config = Config::new(PathBuf::from("/unused"));
        config.api_base_url = base.to_string();
        Portal::with_session(config, session).unwrap()
    }

    fn portal() -> Portal {
        portal_at("http://127.0.0.1:9")
    }

    fn token(sub: Option<&str>) -> String {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let mut claims = json!({ "exp": now + 3600 });
        if let Some(sub) = sub {
            claims["sub"] = Value::from(sub);
        }
        format!("h.{}.s", URL_SAFE_NO_PAD.encode(claims.to_string()))
    }

    fn login_with(portal: &Portal, sub: Option<&str>) -> String {
        let token = token(sub);
        let mut affiliate = Affiliate::new(AffiliateId::Number(5));
        affiliate.email = Some("five@example.com".to_string());
        portal
            .session()
            .login(LoginResponse::new(token.clone(), affiliate));
        token
    }

    fn login(portal: &Portal) -> String {
        login_with(portal, Some("5"))
    }

    async fn mock_get(server: &MockServer, route: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[test]
    fn test_guard_holds_while_loading() {
        let portal = portal();
        assert_eq!(portal.guard(Route::Dashboard), None);
        assert_eq!(portal.guard(Route::Login), None);
    }

    #[test]
    fn test_guard_redirects_without_session() {
        let portal = portal();
        assert_eq!(portal.initialize(), AuthPhase::Unauthenticated);
        assert_eq!(portal.guard(Route::Dashboard), Some(Route::Login));
        assert_eq!(portal.guard(Route::RequestWithdrawal), Some(Route::Login));
        assert_eq!(portal.guard(Route::ForgotPassword), Some(Route::ForgotPassword));
    }

    #[test]
    fn test_guard_allows_signed_in_affiliate() {
        let portal = portal();
        portal.initialize();
        login(&portal);
        assert_eq!(portal.guard(Route::ViewCustomers), Some(Route::ViewCustomers));

        portal.sign_out();
        assert_eq!(portal.guard(Route::ViewCustomers), Some(Route::Login));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let session = SessionManager::new(db, Arc::new(NullNavigator));
        let mut config = Config::new(PathBuf::from("/unused"));
        config.api_base_url = "::".to_string();
        assert!(matches!(
            Portal::with_session(config, session),
            Err(CoreError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_data_calls_require_session() {
        let portal = portal();
        portal.initialize();
        assert!(matches!(portal.dashboard().await, Err(CoreError::NotAuthenticated)));
        assert!(matches!(portal.customers(None).await, Err(CoreError::NotAuthenticated)));
        assert!(matches!(portal.withdrawals().await, Err(CoreError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_withdrawal_amount_is_validated() {
        let portal = portal();
        portal.initialize();
        login(&portal);

        let method = PaymentMethod::MobileMoney {
            mobile_money_provider: "MTN Mobile Money".to_string(),
            phone_number: "0240000000".to_string(),
        };
        for amount in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let result = portal.submit_withdrawal(method.clone(), amount).await;
            assert!(matches!(result, Err(CoreError::InvalidAmount(_))));
        }
        assert!(portal.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_sign_in_installs_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/affiliates/login"))
            .and(body_json(json!({ "email": "five@example.com", "password": "pw" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": token(Some("5")),
                "affiliate": { "id": 5, "email": "five@example.com" }
            })))
            .mount(&server)
            .await;

        let portal = portal_at(&server.uri());
        portal.initialize();
        let affiliate = portal.sign_in("five@example.com", "pw").await.unwrap();

        assert_eq!(affiliate.id, AffiliateId::Number(5));
        assert!(portal.session().is_authenticated());
        assert_eq!(portal.guard(Route::Dashboard), Some(Route::Dashboard));
    }

    #[tokio::test]
    async fn test_sign_in_without_token_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/affiliates/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "affiliate": { "id": 5 }
            })))
            .mount(&server)
            .await;

        let portal = portal_at(&server.uri());
        portal.initialize();
        let result = portal.sign_in("five@example.com", "pw").await;

        assert!(matches!(result, Err(CoreError::LoginRejected)));
        assert!(!portal.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_dashboard_aggregates_figures() {
        let server = MockServer::start().await;
        let portal = portal_at(&server.uri());
        portal.initialize();
        let token = login(&portal);

        Mock::given(method("GET"))
            .and(path("/api/affiliates/users/affiliate/5"))
            .and(header("authorization", format!("Bearer {token}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "uid": "a", "email": "a@example.com", "active": true },
                { "uid": "b", "email": "b@example.com", "active": false }
            ])))
            .mount(&server)
            .await;
        mock_get(&server, "/api/subscription/earnings/5", json!({ "total_earnings": "150.00" })).await;
        mock_get(&server, "/api/subscription/balance/5", json!({ "balance": 100 })).await;
        mock_get(
            &server,
            "/api/subscription/affiliate/5/total-withdrawn",
            json!({ "total_withdrawn": 50 }),
        )
        .await;

        let summary = portal.dashboard().await.unwrap();
        assert_eq!(summary, DashboardSummary::new(2, 150.0, 100.0, 50.0));
    }

    #[tokio::test]
    async fn test_customer_search_filters_by_email() {
        let server = MockServer::start().await;
        mock_get(
            &server,
            "/api/affiliates/users/affiliate/5",
            json!([
                { "uid": "a", "email": "esi@school.edu" },
                { "uid": "b", "email": "kofi@example.com" },
                { "uid": "c" }
            ]),
        )
        .await;

        let portal = portal_at(&server.uri());
        portal.initialize();
        login(&portal);

        assert_eq!(portal.customers(None).await.unwrap().len(), 3);
        assert_eq!(portal.customers(Some("  ")).await.unwrap().len(), 3);
        let found = portal.customers(Some("SCHOOL")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].uid, "a");
    }

    #[tokio::test]
    async fn test_submit_withdrawal_refreshes_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/withdrawals/request"))
            .and(body_json(json!({
                "affiliate_id": "5",
                "amount": 40.0,
                "modeOfPayment": "Bank Transfer",
                "account_number": "0012",
                "branch": "Accra"
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        mock_get(
            &server,
            "/api/withdrawals/affiliate/5",
            json!({ "withdrawalRequests": [
                { "id": 9, "amount": "40", "mode_of_payment": "Bank Transfer", "status": "pending" }
            ] }),
        )
        .await;

        let portal = portal_at(&server.uri());
        portal.initialize();
        login(&portal);

        let method = PaymentMethod::BankTransfer {
            account_number: "0012".to_string(),
            branch: "Accra".to_string(),
        };
        let list = portal.submit_withdrawal(method, 40.0).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].amount, 40.0);
        assert_eq!(portal.withdrawals().await.unwrap(), list);
    }

    #[tokio::test]
    async fn test_rejected_credential_ends_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/withdrawals/affiliate/5"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let portal = portal_at(&server.uri());
        portal.initialize();
        login(&portal);

        let err = portal.withdrawals().await.unwrap_err();
        assert!(matches!(err, CoreError::Api(ApiError::Unauthorized(401))));
        assert!(!portal.session().is_authenticated());
        assert_eq!(portal.guard(Route::RequestWithdrawal), Some(Route::Login));
    }

    #[tokio::test]
    async fn test_server_error_keeps_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/withdrawals/affiliate/5"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let portal = portal_at(&server.uri());
        portal.initialize();
        login(&portal);

        let err = portal.withdrawals().await.unwrap_err();
        assert!(matches!(err, CoreError::Api(ApiError::Status { status: 503, .. })));
        assert!(portal.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_account_settings_use_token_subject() {
        let server = MockServer::start().await;
        mock_get(
            &server,
            "/api/users/user-abc",
            json!({ "user": { "display_name": "Five", "rankings": false } }),
        )
        .await;
        mock_get(
            &server,
            "/api/privacy/privacy-settings/user-abc",
            json!({ "privacySettings": { "data_research": true } }),
        )
        .await;
        mock_get(
            &server,
            "/api/notifications/notification-settings/user-abc",
            json!({ "notificationSettings": {
                "email_notifications": true,
                "sms_notifications": true,
                "promotional_materials": false
            } }),
        )
        .await;
        Mock::given(method("PUT"))
            .and(path("/api/privacy/privacy-settings/user-abc"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/api/users/user-abc"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let portal = portal_at(&server.uri());
        portal.initialize();
        login_with(&portal, Some("user-abc"));

        let mut profile = portal.profile().await.unwrap();
        assert_eq!(profile.display_name, "Five");
        profile.last_name = "Mensah".to_string();
        portal.update_profile(&profile).await.unwrap();

        let privacy = portal.privacy_settings().await.unwrap();
        assert!(privacy.data_research);
        assert!(!privacy.location_tracking);
        portal.update_privacy_settings(&privacy).await.unwrap();

        let notifications = portal.notification_settings().await.unwrap();
        assert!(notifications.sms_notifications);
        assert!(!notifications.promotional_materials);
    }

    #[tokio::test]
    async fn test_order_history_falls_back_to_affiliate_id() {
        let server = MockServer::start().await;
        mock_get(
            &server,
            "/api/subscription/5",
            json!({ "allSubscriptions": [
                { "id": 1, "date_paid": "2024-01-10", "package_type": "monthly", "amount_paid": 10 }
            ] }),
        )
        .await;
        Mock::given(method("PUT"))
            .and(path("/api/notifications/notification-settings/5"))
            .and(body_json(json!({
                "email_notifications": true,
                "sms_notifications": false,
                "promotional_materials": true
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let portal = portal_at(&server.uri());
        portal.initialize();
        login_with(&portal, None);

        let orders = portal.order_history().await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].package_type.as_deref(), Some("monthly"));
        portal
            .update_notification_settings(&NotificationSettings::default())
            .await
            .unwrap();
    }
}
