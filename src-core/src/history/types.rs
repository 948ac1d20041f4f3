use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::analysis::types::as_number;
use crate::analysis::{AnalysisData, Features};

/// Shown when a record's timestamp is missing or unparseable.
pub const UNKNOWN: &str = "Unknown";

/// Image shown for server records that never stored one.
pub const FALLBACK_IMAGE_URL: &str = "/fallback-image.jpg";

/// One completed analysis, local or server-side. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub image_name: String,
    pub image_url: String,
    pub percentage_weight_loss: f64,
    pub features: Features,
}

impl HistoryRecord {
    /// Record for a fresh local result. The id is `history_<unix millis>`.
    pub fn from_analysis(
        image_name: &str,
        fallback_image_url: &str,
        data: &AnalysisData,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("history_{}", now.timestamp_millis()),
            timestamp: Some(now),
            image_name: image_name.to_string(),
            image_url: data
                .image_url
                .clone()
                .unwrap_or_else(|| fallback_image_url.to_string()),
            percentage_weight_loss: data.percentage_weight_loss,
            features: data.features.clone(),
        }
    }

    /// `(date, time)` for list rows.
    pub fn display_time(&self) -> (String, String) {
        format_timestamp(self.timestamp.as_ref())
    }
}

/// `("YYYY-MM-DD", "HH:MM")` in UTC, or `("Unknown", "Unknown")`.
pub fn format_timestamp(timestamp: Option<&DateTime<Utc>>) -> (String, String) {
    match timestamp {
        Some(ts) => (ts.format("%Y-%m-%d").to_string(), ts.format("%H:%M").to_string()),
        None => (UNKNOWN.to_string(), UNKNOWN.to_string()),
    }
}

/// Lenient RFC 3339 parse; anything else is treated as missing.
pub fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Server ids are MongoDB ObjectIDs: exactly 24 hex characters.
pub fn is_object_id(id: &str) -> bool {
    id.len() == 24 && id.chars().all(|c| c.is_ascii_hexdigit())
}

/// A history item as the API server serializes it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteHistoryItem {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(rename = "FileName", default)]
    pub file_name: Option<String>,
    #[serde(rename = "ImageUrl", default)]
    pub image_url: Option<String>,
    /// Numeric, or a numeric string.
    #[serde(rename = "Percentage", default)]
    pub percentage: Option<Value>,
    #[serde(rename = "Features", default)]
    pub features: Option<Map<String, Value>>,
    #[serde(rename = "Timestamp", default)]
    pub timestamp: Option<String>,
}

impl RemoteHistoryItem {
    /// Normalize into a [`HistoryRecord`]; `None` when the id is missing or
    /// not an ObjectID. Non-numeric feature values are dropped.
    pub fn into_record(self) -> Option<HistoryRecord> {
        let id = self.id.filter(|id| is_object_id(id))?;

        let features = self
            .features
            .unwrap_or_default()
            .iter()
            .filter_map(|(name, value)| as_number(value).map(|v| (name.clone(), v)))
            .collect();

        Some(HistoryRecord {
            id,
            timestamp: parse_timestamp(self.timestamp.as_deref()),
            image_name: self
                .file_name
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            image_url: self
                .image_url
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| FALLBACK_IMAGE_URL.to_string()),
            percentage_weight_loss: self.percentage.as_ref().and_then(as_number).unwrap_or(0.0),
            features,
        })
    }
}
