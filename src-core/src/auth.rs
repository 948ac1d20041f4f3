//! Bearer session token handed out by the API server's login flow.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::KaleError;
use crate::storage::KeyValueStore;

/// Key (and cookie name) the token is stored under.
pub const TOKEN_KEY: &str = "token";

/// Lifetime of a stored token, matching the login cookie.
pub const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl SessionToken {
    /// A token issued now, valid for [`TOKEN_TTL_DAYS`].
    pub fn issue(value: impl Into<String>) -> Result<Self, KaleError> {
        Self::issued_at(value, Utc::now())
    }

    pub fn issued_at(value: impl Into<String>, now: DateTime<Utc>) -> Result<Self, KaleError> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(KaleError::Auth("Token must not be empty".to_string()));
        }
        Ok(Self {
            value,
            expires_at: now + Duration::days(TOKEN_TTL_DAYS),
        })
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.value)
    }

    /// Pull the token out of a `document.cookie` style string. The browser
    /// drops expired cookies itself, so the expiry here is nominal.
    pub fn from_cookie_header(cookies: &str) -> Option<Self> {
        cookies
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == TOKEN_KEY)
            .and_then(|(_, value)| Self::issue(value).ok())
    }

    pub fn save(&self, store: &impl KeyValueStore) -> Result<(), KaleError> {
        let json = serde_json::to_string(self)
            .map_err(|e| KaleError::Storage(format!("Failed to serialize token: {}", e)))?;
        store.set(TOKEN_KEY, &json)?;
        info!("Stored session token (expires {})", self.expires_at);
        Ok(())
    }

    /// Stored token, if present and unexpired. Expired or unreadable
    /// entries are removed.
    pub fn load(store: &impl KeyValueStore) -> Result<Option<Self>, KaleError> {
        Self::load_at(store, Utc::now())
    }

    pub fn load_at(
        store: &impl KeyValueStore,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, KaleError> {
        let Some(raw) = store.get(TOKEN_KEY)? else {
            return Ok(None);
        };

        match serde_json::from_str::<SessionToken>(&raw) {
            Ok(token) if !token.is_expired_at(now) => Ok(Some(token)),
            Ok(_) => {
                debug!("Stored session token expired, removing");
                store.remove(TOKEN_KEY)?;
                Ok(None)
            }
            Err(e) => {
                debug!("Unreadable session token ({}), removing", e);
                store.remove(TOKEN_KEY)?;
                Ok(None)
            }
        }
    }

    pub fn clear(store: &impl KeyValueStore) -> Result<(), KaleError> {
        store.remove(TOKEN_KEY)
    }
}

/// Token or the "not signed in" error used by authenticated calls.
pub fn require_token(token: Option<&SessionToken>) -> Result<&SessionToken, KaleError> {
    token.ok_or_else(|| KaleError::Auth("Authentication token not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_issue_sets_seven_day_expiry() {
        let token = SessionToken::issued_at("abc", at(1)).unwrap();
        assert_eq!(token.expires_at(), at(8));
        assert!(!token.is_expired_at(at(7)));
        assert!(token.is_expired_at(at(8)));
        assert_eq!(token.bearer(), "Bearer abc");
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(SessionToken::issue("   ").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let store = MemoryStore::new();
        let token = SessionToken::issued_at("abc", at(1)).unwrap();
        token.save(&store).unwrap();

        let loaded = SessionToken::load_at(&store, at(2)).unwrap();
        assert_eq!(loaded, Some(token));
    }

    #[test]
    fn test_expired_token_is_removed() {
        let store = MemoryStore::new();
        SessionToken::issued_at("abc", at(1)).unwrap().save(&store).unwrap();

        assert!(SessionToken::load_at(&store, at(9)).unwrap().is_none());
        assert!(store.get(TOKEN_KEY).unwrap().is_none());
    }

    #[test]
    fn test_garbage_token_is_removed() {
        let store = MemoryStore::new();
        store.set(TOKEN_KEY, "{{{").unwrap();
        assert!(SessionToken::load(&store).unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_from_cookie_header() {
        let token = SessionToken::from_cookie_header("email=a%40b.c; token=xyz.123; theme=dark")
            .unwrap();
        assert_eq!(token.value(), "xyz.123");
        assert!(SessionToken::from_cookie_header("email=a%40b.c").is_none());
        assert!(SessionToken::from_cookie_header("").is_none());
    }

    #[test]
    fn test_require_token() {
        let err = require_token(None).unwrap_err();
        assert_eq!(err.to_string(), "Authentication token not found");
    }
}
