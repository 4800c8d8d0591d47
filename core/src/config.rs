//! Environment-driven client configuration.

use std::env;

use crate::auth::TokenProvider;
use crate::error::{ApiError, Result};

pub const ENV_BASE_URL: &str = "LIGHTERBASE_BASE_URL";
pub const ENV_TOKEN: &str = "LIGHTERBASE_TOKEN";

/// Settings needed to construct a `TableClient`.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub base_url: String,
    /// `None` falls back to the cookie provider.
    pub token: Option<TokenProvider>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<TokenProvider>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Read `LIGHTERBASE_BASE_URL` (required) and `LIGHTERBASE_TOKEN`
    /// (optional, used as a fixed token when non-empty).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base_url = lookup(ENV_BASE_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ApiError::Config(format!("{ENV_BASE_URL} is not set")))?;
        let token = lookup(ENV_TOKEN)
            .filter(|v| !v.is_empty())
            .map(TokenProvider::Fixed);
        Ok(Self { base_url, token })
    }
}
