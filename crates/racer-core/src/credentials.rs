//! Credential string handling.

use crate::error::AppError;

/// Cookie pair whose value is the CSRF token expected by every call.
pub const CSRF_COOKIE: &str = "bili_jct";

/// Cookie string plus the CSRF token derived from it.
#[derive(Clone)]
pub struct Credentials {
    cookie: String,
    csrf: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("cookie", &"<redacted>")
            .field("csrf", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn from_cookie(cookie: &str) -> Result<Self, AppError> {
        let csrf = extract_csrf(cookie).ok_or(AppError::MissingCsrfToken(CSRF_COOKIE))?;
        Ok(Self {
            csrf: csrf.to_string(),
            cookie: cookie.trim().to_string(),
        })
    }

    pub fn cookie(&self) -> &str {
        &self.cookie
    }

    pub fn csrf(&self) -> &str {
        &self.csrf
    }
}

/// Find the `bili_jct` value in a `k=v; k=v` cookie string.
pub fn extract_csrf(cookie: &str) -> Option<&str> {
    cookie
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == CSRF_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}
