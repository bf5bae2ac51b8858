//! Affiliate identity and the login payload

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Backend identifiers arrive as either numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AffiliateId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for AffiliateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AffiliateId::Number(n) => write!(f, "{n}"),
            AffiliateId::Text(s) => f.write_str(s),
        }
    }
}

/// Profile of the signed-in affiliate.
///
/// Unknown fields are kept in `extra` so the stored snapshot round-trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Affiliate {
    pub id: AffiliateId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Affiliate {
    pub fn new(id: AffiliateId) -> Self {
        Self {
            id,
            first_name: None,
            last_name: None,
            email: None,
            phone: None,
            referral_code: None,
            extra: Map::new(),
        }
    }

    pub fn display_name(&self) -> Option<String> {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(name), None) | (None, Some(name)) => Some(name.to_string()),
            (None, None) => None,
        }
    }
}

/// Body returned by the backend's login endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub affiliate: Option<Affiliate>,
}

impl LoginResponse {
    pub fn new(token: impl Into<String>, affiliate: Affiliate) -> Self {
        Self {
            token: Some(token.into()),
            affiliate: Some(affiliate),
        }
    }
}
