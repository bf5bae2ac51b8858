//! Portal configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use crate::error::CoreError;
use crate::Result;

pub const DEFAULT_API_URL: &str = "https://edfrica-backend-supabase.onrender.com";

const API_URL_ENV: &str = "AFFILIATE_PORTAL_API_URL";
const DATA_DIR_ENV: &str = "AFFILIATE_PORTAL_DATA_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the session database file
    pub database_path: PathBuf,
    /// Base URL of the affiliate backend
    pub api_base_url: String,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            database_path: data_dir.join("portal.db"),
            api_base_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Defaults, overridden by `AFFILIATE_PORTAL_DATA_DIR` and
    /// `AFFILIATE_PORTAL_API_URL` when set.
    pub fn from_env() -> Self {
        Self::with_overrides(
            std::env::var(DATA_DIR_ENV).ok(),
            std::env::var(API_URL_ENV).ok(),
        )
    }

    /// Defaults with optional overrides; blank values are ignored.
    pub fn with_overrides(data_dir: Option<String>, api_url: Option<String>) -> Self {
        let data_dir = data_dir
            .filter(|v| !v.trim().is_empty())
            .map_or_else(Self::data_dir, PathBuf::from);

        let mut config = Self::new(data_dir);
        if let Some(url) = api_url.filter(|v| !v.trim().is_empty()) {
            config.api_base_url = url.trim().to_string();
        }
        config
    }

    pub fn api_url(&self) -> Result<Url> {
        let url = Url::parse(&self.api_base_url)
            .map_err(|e| CoreError::Config(format!("api_base_url: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CoreError::Config(format!(
                "api_base_url must be http(s), got {}",
                url.scheme()
            )));
        }
        Ok(url)
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("AffiliatePortal"))
            .unwrap_or_else(|| PathBuf::from(".affiliate-portal"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

// Platform data directory lookup
mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}
