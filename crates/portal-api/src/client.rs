//! Backend HTTP client

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use url::Url;

use portal_session::{Credential, LoginResponse};

use crate::error::ApiError;
use crate::models::{
    AccountProfile, BalanceResponse, Customer, EarningsResponse, NotificationResponse,
    NotificationSettings, PrivacyResponse, PrivacySettings, ProfileResponse, ProfileUpdate,
    Subscription, SubscriptionListResponse, WithdrawalListResponse, WithdrawalRecord,
    WithdrawalRequest, WithdrawnResponse,
};
use crate::Result;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    credential: Option<Credential>,
}

impl ApiClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: with_trailing_slash(base_url),
            credential: None,
        }
    }

    /// A client that authenticates as `credential`.
    pub fn with_credential(&self, credential: Credential) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            credential: Some(credential),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        Ok(self.http.request(method, self.endpoint(path)?))
    }

    fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let credential = self.credential.as_ref().ok_or(ApiError::MissingCredential)?;
        Ok(self
            .request(method, path)?
            .header(reqwest::header::AUTHORIZATION, credential.bearer()))
    }

    async fn send(&self, request: RequestBuilder, authenticated: bool) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        if authenticated && matches!(status, StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND) {
            tracing::warn!(status = status.as_u16(), url = %response.url(), "Request not authorized");
            return Err(ApiError::Unauthorized(status.as_u16()));
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), "Request failed");
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.authorized(Method::GET, path)?;
        let response = self.send(request, true).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<()> {
        let request = self.authorized(method, path)?.json(body);
        self.send(request, true).await?;
        Ok(())
    }

    /// `POST /api/affiliates/login`
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let request = self
            .request(Method::POST, "api/affiliates/login")?
            .json(&json!({ "email": email, "password": password }));
        let response = self.send(request, false).await?;
        let bytes = response.bytes().await?;

        tracing::debug!(email = %email, "Login request accepted");
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// `POST /api/users/reset-password`
    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        let request = self
            .request(Method::POST, "api/users/reset-password")?
            .json(&json!({ "email": email }));
        self.send(request, false).await?;
        Ok(())
    }

    pub async fn referred_customers(&self, affiliate_id: &str) -> Result<Vec<Customer>> {
        self.get_json(&format!("api/affiliates/users/affiliate/{affiliate_id}"))
            .await
    }

    pub async fn total_earnings(&self, affiliate_id: &str) -> Result<f64> {
        let body: EarningsResponse = self
            .get_json(&format!("api/subscription/earnings/{affiliate_id}"))
            .await?;
        Ok(body.total_earnings)
    }

    pub async fn balance(&self, affiliate_id: &str) -> Result<f64> {
        let body: BalanceResponse = self
            .get_json(&format!("api/subscription/balance/{affiliate_id}"))
            .await?;
        Ok(body.balance)
    }

    pub async fn total_withdrawn(&self, affiliate_id: &str) -> Result<f64> {
        let body: WithdrawnResponse = self
            .get_json(&format!(
                "api/subscription/affiliate/{affiliate_id}/total-withdrawn"
            ))
            .await?;
        Ok(body.total_withdrawn)
    }

    pub async fn withdrawal_requests(&self, affiliate_id: &str) -> Result<Vec<WithdrawalRecord>> {
        let body: WithdrawalListResponse = self
            .get_json(&format!("api/withdrawals/affiliate/{affiliate_id}"))
            .await?;
        Ok(body.withdrawal_requests)
    }

    pub async fn request_withdrawal(&self, request: &WithdrawalRequest) -> Result<()> {
        let builder = self
            .authorized(Method::POST, "api/withdrawals/request")?
            .json(request);
        self.send(builder, true).await?;

        tracing::info!(
            affiliate_id = %request.affiliate_id,
            amount = request.amount,
            "Submitted withdrawal request"
        );
        Ok(())
    }

    pub async fn change_password(
        &self,
        email: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let request = self
            .authorized(Method::PATCH, "api/users/change-password")?
            .json(&json!({
                "email": email,
                "currentPassword": current_password,
                "newPassword": new_password,
            }));
        self.send(request, true).await?;
        Ok(())
    }

    pub async fn account_profile(&self, user_id: &str) -> Result<AccountProfile> {
        let body: ProfileResponse = self.get_json(&format!("api/users/{user_id}")).await?;
        Ok(body.user)
    }

    pub async fn update_account_profile(
        &self,
        user_id: &str,
        profile: &AccountProfile,
    ) -> Result<()> {
        self.write_json(
            Method::PATCH,
            &format!("api/users/{user_id}"),
            &ProfileUpdate { user: profile },
        )
        .await?;
        tracing::info!(user_id = %user_id, "Updated account profile");
        Ok(())
    }

    pub async fn privacy_settings(&self, user_id: &str) -> Result<PrivacySettings> {
        let body: PrivacyResponse = self
            .get_json(&format!("api/privacy/privacy-settings/{user_id}"))
            .await?;
        Ok(body.privacy_settings)
    }

    pub async fn update_privacy_settings(
        &self,
        user_id: &str,
        settings: &PrivacySettings,
    ) -> Result<()> {
        self.write_json(
            Method::PUT,
            &format!("api/privacy/privacy-settings/{user_id}"),
            settings,
        )
        .await
    }

    pub async fn notification_settings(&self, user_id: &str) -> Result<NotificationSettings> {
        let body: NotificationResponse = self
            .get_json(&format!("api/notifications/notification-settings/{user_id}"))
            .await?;
        Ok(body.notification_settings)
    }

    pub async fn update_notification_settings(
        &self,
        user_id: &str,
        settings: &NotificationSettings,
    ) -> Result<()> {
        self.write_json(
            Method::PUT,
            &format!("api/notifications/notification-settings/{user_id}"),
            settings,
        )
        .await
    }

    /// Paid subscriptions, newest as the backend orders them.
    pub async fn subscriptions(&self, user_id: &str) -> Result<Vec<Subscription>> {
        let body: SubscriptionListResponse =
            self.get_json(&format!("api/subscription/{user_id}")).await?;
        Ok(body.all_subscriptions)
    }

    /// Report a problem to the administrators. No session needed.
    pub async fn log_issue(&self, message: &str) -> Result<()> {
        let request = self
            .request(Method::POST, "api/admins/issues")?
            .json(&json!({ "issue_message": message }));
        self.send(request, false).await?;
        Ok(())
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
