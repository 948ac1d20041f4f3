//! Carrying a background-removed image from the segmentation step to the
//! analysis step through key-value storage.
//!
//! The payload sits under three keys. The token also travels in the
//! navigation query string, so a stale payload left behind by an earlier
//! visit is never adopted.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::KaleError;
use crate::storage::KeyValueStore;
use crate::upload::{decode_data_url, to_data_url, UploadFile};

pub const FILE_KEY: &str = "bgRemovedFile";
pub const FILE_NAME_KEY: &str = "bgRemovedFileName";
pub const TOKEN_KEY: &str = "bgRemovedToken";

/// Query parameter carrying the token, as in `?handoff=<token>`.
pub const QUERY_PARAM: &str = "handoff";

/// Name used when the staged entry has lost its file name.
pub const DEFAULT_FILE_NAME: &str = "background_removed_image.png";

/// Opaque, time-derived token identifying one staging.
pub fn new_token(now: DateTime<Utc>) -> String {
    let nanos = now
        .timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_millis());
    format!("{:x}", nanos)
}

/// Query string to append to the analysis route.
pub fn query_for(token: &str) -> String {
    format!("?{}={}", QUERY_PARAM, token)
}

/// Pull the token out of a query string such as `?handoff=abc&x=1`.
pub fn token_from_query(query: &str) -> Option<String> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| *name == QUERY_PARAM)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Stage `file` and return the token to navigate with. Replaces any
/// previous staging.
pub fn stage(
    store: &impl KeyValueStore,
    file: &UploadFile,
    now: DateTime<Utc>,
) -> Result<String, KaleError> {
    let token = new_token(now);
    store.set(FILE_KEY, &to_data_url(&file.bytes, &file.mime))?;
    store.set(FILE_NAME_KEY, &file.name)?;
    store.set(TOKEN_KEY, &token)?;
    info!("Staged {} for analysis (token {})", file.name, token);
    Ok(token)
}

/// Adopt the staged file when `nav_token` matches. Any staging that is
/// looked at with a token is cleared, whether or not it was adopted. With
/// no navigation token the staging is left alone.
pub fn take(
    store: &impl KeyValueStore,
    nav_token: Option<&str>,
) -> Result<Option<UploadFile>, KaleError> {
    let Some(nav_token) = nav_token else {
        return Ok(None);
    };

    let staged_token = store.get(TOKEN_KEY)?;
    let payload = store.get(FILE_KEY)?;
    let name = store.get(FILE_NAME_KEY)?;
    clear(store)?;

    match (staged_token, payload) {
        (Some(staged), Some(payload)) if staged == nav_token => {
            let (mime, bytes) = decode_data_url(&payload)?;
            let name = name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
            info!("Adopted handed-off image {}", name);
            Ok(Some(UploadFile::new(name, mime, bytes)))
        }
        _ => {
            debug!("No matching handoff for token {}", nav_token);
            Ok(None)
        }
    }
}

/// Remove all three staging keys.
pub fn clear(store: &impl KeyValueStore) -> Result<(), KaleError> {
    store.remove(FILE_KEY)?;
    store.remove(FILE_NAME_KEY)?;
    store.remove(TOKEN_KEY)
}
