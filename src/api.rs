//! Builds configured clients for the pages.

use kalecheck_core::history::HistoryClient;
use kalecheck_core::{ClientConfig, HttpBackend, KaleError, SessionToken};

use crate::browser::{self, BrowserStorage};

pub fn config() -> Result<ClientConfig, KaleError> {
    ClientConfig::defaults()
}

/// Signed-in user's token: the `token` cookie set at sign-in, falling
/// back to the copy in local storage.
pub fn session_token() -> Option<SessionToken> {
    SessionToken::from_cookie_header(&browser::cookies())
        .or_else(|| SessionToken::load(&BrowserStorage).ok().flatten())
}

pub fn backend() -> Result<HttpBackend, KaleError> {
    Ok(HttpBackend::new(config()?)?.with_token(session_token()))
}

pub fn history_client() -> Result<HistoryClient, KaleError> {
    HistoryClient::new(config()?, session_token())
}
