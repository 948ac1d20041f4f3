//! Calls to the prediction and segmentation services.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::info;

use super::types::AnalysisData;
use crate::auth::SessionToken;
use crate::config::ClientConfig;
use crate::error::KaleError;
use crate::http::{build_client, status_error};
use crate::upload::UploadFile;

/// Multipart field name both services read the image from.
pub const UPLOAD_FIELD: &str = "file";

/// The two remote processing steps. Implemented over HTTP by
/// [`HttpBackend`]; tests substitute their own.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait AnalysisBackend {
    /// Predict weight loss for one image.
    async fn predict(&self, file: &UploadFile) -> Result<AnalysisData, KaleError>;

    /// Remove the background; returns the processed image bytes.
    async fn segment(&self, file: &UploadFile) -> Result<Vec<u8>, KaleError>;
}

pub struct HttpBackend {
    client: reqwest::Client,
    config: ClientConfig,
    token: Option<SessionToken>,
}

impl HttpBackend {
    pub fn new(config: ClientConfig) -> Result<Self, KaleError> {
        config.validate()?;
        Ok(Self {
            client: build_client(&config)?,
            config,
            token: None,
        })
    }

    /// Attach the signed-in user's token. Prediction works without one;
    /// with one the server also records the result in the user's history.
    pub fn with_token(mut self, token: Option<SessionToken>) -> Self {
        self.token = token;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

fn image_form(file: &UploadFile) -> Result<Form, KaleError> {
    let part = Part::bytes(file.bytes.clone())
        .file_name(file.name.clone())
        .mime_str(&file.mime)
        .map_err(|e| KaleError::Validation(format!("Invalid MIME type '{}': {}", file.mime, e)))?;
    Ok(Form::new().part(UPLOAD_FIELD, part))
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl AnalysisBackend for HttpBackend {
    async fn predict(&self, file: &UploadFile) -> Result<AnalysisData, KaleError> {
        let url = self.config.predict_url()?;
        info!("Requesting prediction for {} from {}", file.name, url);

        let mut request = self.client.post(url).multipart(image_form(file)?);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, token.bearer());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| KaleError::MalformedResponse(format!("body is not JSON: {}", e)))?;
        let data = AnalysisData::from_body(&body)?;

        info!(
            "Prediction for {}: {:.2}% weight loss, {} features",
            file.name,
            data.percentage_weight_loss,
            data.features.len()
        );
        Ok(data)
    }

    async fn segment(&self, file: &UploadFile) -> Result<Vec<u8>, KaleError> {
        let url = self.config.segment_url()?;
        info!("Requesting background removal for {} from {}", file.name, url);

        let response = self
            .client
            .post(url)
            .multipart(image_form(file)?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(KaleError::MalformedResponse(
                "segmentation service returned an empty image".to_string(),
            ));
        }

        info!("Background removed for {}: {} bytes", file.name, bytes.len());
        Ok(bytes.to_vec())
    }
}
