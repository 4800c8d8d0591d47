//! Per-request token resolution.
//!
//! # Design
//! A `TokenProvider` is resolved on every request, so a `Dynamic` provider can
//! hand out rotated tokens without rebuilding the client. The cookie fallback
//! goes through `CookieSource` instead of a global environment, which lets
//! hosts that do have a cookie jar wire it in and keeps tests hermetic.

use std::fmt;
use std::sync::Arc;

/// Name of the cookie consulted by `TokenProvider::BrowserCookie`.
pub const AUTH_COOKIE: &str = "authToken";

/// Read-only view of the execution environment's cookies.
pub trait CookieSource: Send + Sync {
    /// The raw `name=value; name2=value2` cookie string, or `None` when the
    /// environment has no cookie store.
    fn cookie_header(&self) -> Option<String>;
}

/// A fixed cookie string, for hosts that receive cookies out of band.
#[derive(Debug, Clone)]
pub struct StaticCookies(pub String);

impl CookieSource for StaticCookies {
    fn cookie_header(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Strategy used to obtain the bearer token for each request.
#[derive(Clone)]
pub enum TokenProvider {
    /// The same token for every request.
    Fixed(String),

    /// Invoked once per request; its return value is the token.
    Dynamic(Arc<dyn Fn() -> String + Send + Sync>),

    /// Read the `authToken` cookie from a cookie source. With no source the
    /// token is empty and no Authorization header is sent.
    BrowserCookie(Option<Arc<dyn CookieSource>>),
}

impl TokenProvider {
    pub fn fixed(token: impl Into<String>) -> Self {
        Self::Fixed(token.into())
    }

    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(f))
    }

    pub fn cookies<S>(source: S) -> Self
    where
        S: CookieSource + 'static,
    {
        Self::BrowserCookie(Some(Arc::new(source)))
    }

    /// Resolve the token for one request. An empty string means "send no
    /// Authorization header".
    pub fn resolve(&self) -> String {
        match self {
            Self::Fixed(token) => token.clone(),
            Self::Dynamic(f) => f(),
            Self::BrowserCookie(source) => source
                .as_ref()
                .and_then(|s| s.cookie_header())
                .and_then(|header| cookie_value(&header, AUTH_COOKIE))
                .unwrap_or_default(),
        }
    }
}

impl Default for TokenProvider {
    fn default() -> Self {
        Self::BrowserCookie(None)
    }
}

impl fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Token values stay out of logs.
        match self {
            Self::Fixed(_) => f.write_str("Fixed(..)"),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
            Self::BrowserCookie(source) => {
                write!(f, "BrowserCookie(source: {})", source.is_some())
            }
        }
    }
}

impl From<String> for TokenProvider {
    fn from(token: String) -> Self {
        Self::Fixed(token)
    }
}

impl From<&str> for TokenProvider {
    fn from(token: &str) -> Self {
        Self::Fixed(token.to_string())
    }
}

/// Value of the cookie called `name`, if present and non-empty.
fn cookie_value(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| k.trim() == name)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
