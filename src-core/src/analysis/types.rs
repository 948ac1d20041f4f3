//! Response types for the weight-loss prediction endpoint.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::KaleError;

/// Named numeric measurements extracted from the sample image.
pub type Features = BTreeMap<String, f64>;

/// The `data` object of a successful prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisData {
    /// Predicted percentage weight loss. The wire name keeps the server's spelling.
    #[serde(rename = "percentage_weight_lose")]
    pub percentage_weight_loss: f64,
    pub features: Features,
    /// Stored image location, when the server persisted the upload.
    #[serde(rename = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl AnalysisData {
    /// Validate a prediction body: `{ "status", "data": { "percentage_weight_lose": <number>,
    /// "features": { name: <number> } } }`.
    ///
    /// Numeric strings are accepted for feature values; anything else is a
    /// malformed response rather than a silently dropped column.
    pub fn from_body(body: &Value) -> Result<Self, KaleError> {
        let data = body
            .get("data")
            .and_then(Value::as_object)
            .ok_or_else(|| KaleError::MalformedResponse("missing `data` object".to_string()))?;

        let percentage_weight_loss = data
            .get("percentage_weight_lose")
            .and_then(as_number)
            .ok_or_else(|| {
                KaleError::MalformedResponse(
                    "missing numeric `percentage_weight_lose`".to_string(),
                )
            })?;

        let raw_features = data
            .get("features")
            .and_then(Value::as_object)
            .ok_or_else(|| KaleError::MalformedResponse("missing `features` object".to_string()))?;

        let mut features = Features::new();
        for (name, value) in raw_features {
            let number = as_number(value).ok_or_else(|| {
                KaleError::MalformedResponse(format!("feature `{}` is not numeric", name))
            })?;
            features.insert(name.clone(), number);
        }

        let image_url = data
            .get("imageUrl")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self {
            percentage_weight_loss,
            features,
            image_url,
        })
    }
}

pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}
