//! Backend payloads

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Monetary values come back as either JSON numbers or decimal strings.
pub(crate) fn amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Null(()),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
        Raw::Null(()) => Ok(0.0),
    }
}

/// A customer who signed up through the affiliate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub uid: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    /// End of the customer's current subscription
    #[serde(default)]
    pub expiration_time: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Customer {
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.email
            .as_deref()
            .is_some_and(|email| email.to_lowercase().contains(&query))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Completed,
    Rejected,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalRecord {
    pub id: Value,
    #[serde(deserialize_with = "amount")]
    pub amount: f64,
    #[serde(default)]
    pub mode_of_payment: Option<String>,
    pub status: WithdrawalStatus,
    #[serde(default)]
    pub requested_at: Option<String>,
}

/// How the affiliate wants to be paid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "modeOfPayment")]
pub enum PaymentMethod {
    #[serde(rename = "Bank Transfer")]
    BankTransfer {
        account_number: String,
        branch: String,
    },
    #[serde(rename = "Mobile Money")]
    MobileMoney {
        mobile_money_provider: String,
        phone_number: String,
    },
}

/// Body of `POST /api/withdrawals/request`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WithdrawalRequest {
    pub affiliate_id: String,
    pub amount: f64,
    #[serde(flatten)]
    pub method: PaymentMethod,
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_default())
}

fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Editable account details. Other fields the backend returns are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountProfile {
    #[serde(default, deserialize_with = "text")]
    pub display_name: String,
    #[serde(default, deserialize_with = "text")]
    pub first_name: String,
    #[serde(default, deserialize_with = "text")]
    pub last_name: String,
    #[serde(default, deserialize_with = "text")]
    pub phone_number: String,
    /// Whether the user appears in public rankings
    #[serde(default, deserialize_with = "flag")]
    pub rankings: bool,
}

/// Read in snake_case, written back in camelCase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct PrivacySettings {
    #[serde(default, deserialize_with = "flag")]
    pub data_research: bool,
    #[serde(default, deserialize_with = "flag")]
    pub marketing_emails: bool,
    #[serde(default, deserialize_with = "flag")]
    pub share_data: bool,
    #[serde(default, deserialize_with = "flag")]
    pub make_my_profile_public: bool,
    #[serde(default, deserialize_with = "flag")]
    pub location_tracking: bool,
}

/// Missing fields take the defaults below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    #[serde(deserialize_with = "flag")]
    pub email_notifications: bool,
    #[serde(deserialize_with = "flag")]
    pub sms_notifications: bool,
    #[serde(deserialize_with = "flag")]
    pub promotional_materials: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email_notifications: true,
            sms_notifications: false,
            promotional_materials: true,
        }
    }
}

/// A paid subscription, as listed in the order history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Value,
    #[serde(default)]
    pub date_paid: Option<String>,
    #[serde(default)]
    pub package_type: Option<String>,
    #[serde(default, deserialize_with = "amount")]
    pub amount_paid: f64,
    /// Days added to the subscription
    #[serde(default)]
    pub extension_duration: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
pub(crate) struct EarningsResponse {
    #[serde(deserialize_with = "amount")]
    pub total_earnings: f64,
}

#[derive(Deserialize)]
pub(crate) struct BalanceResponse {
    #[serde(deserialize_with = "amount")]
    pub balance: f64,
}

#[derive(Deserialize)]
pub(crate) struct WithdrawnResponse {
    #[serde(deserialize_with = "amount")]
    pub total_withdrawn: f64,
}

#[derive(Deserialize)]
pub(crate) struct WithdrawalListResponse {
    #[serde(rename = "withdrawalRequests", default)]
    pub withdrawal_requests: Vec<WithdrawalRecord>,
}

#[derive(Deserialize)]
pub(crate) struct ProfileResponse {
    pub user: AccountProfile,
}

#[derive(Serialize)]
pub(crate) struct ProfileUpdate<'a> {
    pub user: &'a AccountProfile,
}

#[derive(Deserialize)]
pub(crate) struct PrivacyResponse {
    #[serde(rename = "privacySettings")]
    pub privacy_settings: PrivacySettings,
}

#[derive(Deserialize)]
pub(crate) struct NotificationResponse {
    #[serde(rename = "notificationSettings")]
    pub notification_settings: NotificationSettings,
}

#[derive(Deserialize)]
pub(crate) struct SubscriptionListResponse {
    #[serde(rename = "allSubscriptions", default)]
    pub all_subscriptions: Vec<Subscription>,
}
