//! Authenticated access to the server-side prediction history.

use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use tracing::{info, warn};

use super::types::{is_object_id, HistoryRecord, RemoteHistoryItem};
use crate::auth::{require_token, SessionToken};
use crate::config::ClientConfig;
use crate::error::KaleError;
use crate::http::{build_client, status_error};

pub struct HistoryClient {
    client: reqwest::Client,
    config: ClientConfig,
    token: Option<SessionToken>,
}

impl HistoryClient {
    pub fn new(config: ClientConfig, token: Option<SessionToken>) -> Result<Self, KaleError> {
        config.validate()?;
        Ok(Self {
            client: build_client(&config)?,
            config,
            token,
        })
    }

    /// All of the user's records, newest first as the server sorts them.
    /// Items that are unreadable or lack a valid id are skipped.
    pub async fn list(&self) -> Result<Vec<HistoryRecord>, KaleError> {
        let token = require_token(self.token.as_ref())?;
        let url = self.config.history_url()?;

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, token.bearer())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| KaleError::MalformedResponse(format!("body is not JSON: {}", e)))?;
        let items = match body.get("data") {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Null) => Vec::new(),
            _ => {
                return Err(KaleError::MalformedResponse(
                    "history response has no `data` array".to_string(),
                ))
            }
        };

        let mut records = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::from_value::<RemoteHistoryItem>(item) {
                Ok(parsed) => {
                    let id = parsed.id.clone();
                    match parsed.into_record() {
                        Some(record) => records.push(record),
                        None => warn!("Skipping history item with invalid id {:?}", id),
                    }
                }
                Err(e) => warn!("Skipping unreadable history item: {}", e),
            }
        }
        info!("Loaded {} remote history record(s)", records.len());
        Ok(records)
    }

    pub async fn get(&self, id: &str) -> Result<HistoryRecord, KaleError> {
        check_id(id)?;
        let token = require_token(self.token.as_ref())?;
        let url = self.config.history_item_url(id)?;

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, token.bearer())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| KaleError::MalformedResponse(format!("body is not JSON: {}", e)))?;
        let item = body
            .get("data")
            .cloned()
            .ok_or_else(|| KaleError::MalformedResponse("missing `data` object".to_string()))?;
        serde_json::from_value::<RemoteHistoryItem>(item)
            .ok()
            .and_then(RemoteHistoryItem::into_record)
            .ok_or_else(|| KaleError::MalformedResponse("history item has no valid id".to_string()))
    }

    /// Delete one record. The id is checked before any request is made.
    pub async fn delete(&self, id: &str) -> Result<(), KaleError> {
        check_id(id)?;
        let token = require_token(self.token.as_ref())?;
        let url = self.config.history_item_url(id)?;
        info!("Deleting remote history record {}", id);

        let response = self
            .client
            .delete(url)
            .header(AUTHORIZATION, token.bearer())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(())
    }
}

fn check_id(id: &str) -> Result<(), KaleError> {
    if is_object_id(id) {
        Ok(())
    } else {
        Err(KaleError::InvalidHistoryId(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(token: Option<SessionToken>) -> HistoryClient {
        let mut config = ClientConfig::defaults().unwrap();
        // Nothing listens here; these tests must fail before connecting.
        config.api_base_url = "http://127.0.0.1:9".to_string();
        HistoryClient::new(config, token).unwrap()
    }

    #[tokio::test]
    async fn test_delete_rejects_bad_id_before_request() {
        let token = SessionToken::issue("abc").unwrap();
        let err = client(Some(token)).delete("history_123").await.unwrap_err();
        assert!(matches!(err, KaleError::InvalidHistoryId(id) if id == "history_123"));
    }

    #[tokio::test]
    async fn test_requires_token() {
        let err = client(None).list().await.unwrap_err();
        assert!(matches!(err, KaleError::Auth(_)));

        let err = client(None)
            .delete("65f1a2b3c4d5e6f708192a3b")
            .await
            .unwrap_err();
        assert!(matches!(err, KaleError::Auth(_)));
    }
}
