//! Client configuration: service endpoints, timeouts and the local data dir.
//!
//! Layering, lowest to highest precedence:
//! 1. defaults embedded from `config/default.toml`
//! 2. an optional user TOML file
//! 3. `KALECHECK_*` environment variables (native only, `.env` honored)

use std::path::PathBuf;
#[cfg(not(target_arch = "wasm32"))]
use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::error::KaleError;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the API server (auth, predict, history).
    pub api_base_url: String,
    /// Base URL of the background segmentation service.
    pub segmentation_base_url: String,
    pub request_timeout_secs: u64,
    /// Where the native store file lives. `None` means the platform data dir.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Partial config; every field present replaces the lower layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigOverrides {
    pub api_base_url: Option<String>,
    pub segmentation_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub data_dir: Option<PathBuf>,
}

impl ClientConfig {
    /// The embedded defaults.
    pub fn defaults() -> Result<Self, KaleError> {
        let config: ClientConfig = toml::from_str(DEFAULT_CONFIG)
            .map_err(|e| KaleError::Config(format!("embedded defaults are invalid: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a complete or partial TOML document on top of the defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, KaleError> {
        let overrides: ConfigOverrides = toml::from_str(content)
            .map_err(|e| KaleError::Config(format!("invalid config file: {}", e)))?;
        let mut config = Self::defaults()?;
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(v) = overrides.api_base_url {
            self.api_base_url = v;
        }
        if let Some(v) = overrides.segmentation_base_url {
            self.segmentation_base_url = v;
        }
        if let Some(v) = overrides.request_timeout_secs {
            self.request_timeout_secs = v;
        }
        if let Some(v) = overrides.data_dir {
            self.data_dir = Some(v);
        }
    }

    pub fn validate(&self) -> Result<(), KaleError> {
        parse_base(&self.api_base_url, "api_base_url")?;
        parse_base(&self.segmentation_base_url, "segmentation_base_url")?;
        if self.request_timeout_secs == 0 {
            return Err(KaleError::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn predict_url(&self) -> Result<Url, KaleError> {
        join(&self.api_base_url, "api/predict")
    }

    pub fn segment_url(&self) -> Result<Url, KaleError> {
        join(&self.segmentation_base_url, "segment/")
    }

    pub fn history_url(&self) -> Result<Url, KaleError> {
        join(&self.api_base_url, "api/history")
    }

    pub fn history_item_url(&self, id: &str) -> Result<Url, KaleError> {
        join(&self.api_base_url, &format!("api/history/{}", id))
    }
}

/// Collect overrides from a variable lookup. Split out from the real
/// environment so tests stay hermetic.
pub fn overrides_from_lookup<F>(lookup: F) -> Result<ConfigOverrides, KaleError>
where
    F: Fn(&str) -> Option<String>,
{
    let request_timeout_secs = match lookup("KALECHECK_TIMEOUT_SECS") {
        Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
            KaleError::Config(format!(
                "KALECHECK_TIMEOUT_SECS: '{}' is not a whole number of seconds",
                raw
            ))
        })?),
        None => None,
    };

    Ok(ConfigOverrides {
        api_base_url: lookup("KALECHECK_API_URL"),
        segmentation_base_url: lookup("KALECHECK_SEGMENTATION_URL"),
        request_timeout_secs,
        data_dir: lookup("KALECHECK_DATA_DIR").map(PathBuf::from),
    })
}

fn parse_base(raw: &str, field: &str) -> Result<Url, KaleError> {
    let url = Url::parse(raw)
        .map_err(|e| KaleError::Config(format!("{}: '{}' is not a valid URL: {}", field, raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(KaleError::Config(format!("{}: '{}' cannot be a base URL", field, raw)));
    }
    Ok(url)
}

fn join(base: &str, path: &str) -> Result<Url, KaleError> {
    let mut base = parse_base(base, "base URL")?;
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path)
        .map_err(|e| KaleError::Config(format!("Failed to build URL for '{}': {}", path, e)))
}

#[cfg(not(target_arch = "wasm32"))]
impl ClientConfig {
    /// Load defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, KaleError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    KaleError::Config(format!("Failed to read config {:?}: {}", path, e))
                })?;
                Self::from_toml_str(&content)?
            }
            None => Self::defaults()?,
        };

        config.apply(overrides_from_lookup(|key| std::env::var(key).ok())?);
        config.validate()?;
        Ok(config)
    }

    /// Directory for the native key-value store file.
    pub fn resolve_data_dir(&self) -> Result<PathBuf, KaleError> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|d| d.join("kalecheck"))
            .ok_or_else(|| KaleError::Config("No platform data directory available".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_load() {
        let config = ClientConfig::defaults().unwrap();
        assert_eq!(config.api_base_url, "http://localhost:8081");
        assert_eq!(config.segmentation_base_url, "http://127.0.0.1:8082");
        assert_eq!(config.request_timeout_secs, 60);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_endpoint_urls() {
        let config = ClientConfig::defaults().unwrap();
        assert_eq!(config.predict_url().unwrap().as_str(), "http://localhost:8081/api/predict");
        assert_eq!(config.segment_url().unwrap().as_str(), "http://127.0.0.1:8082/segment/");
        assert_eq!(
            config.history_item_url("65f1a2b3c4d5e6f708192a3b").unwrap().as_str(),
            "http://localhost:8081/api/history/65f1a2b3c4d5e6f708192a3b"
        );
    }

    #[test]
    fn test_base_url_with_path_prefix() {
        let config = ClientConfig::from_toml_str(r#"api_base_url = "https://example.com/kale""#)
            .unwrap();
        assert_eq!(
            config.history_url().unwrap().as_str(),
            "https://example.com/kale/api/history"
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ClientConfig::from_toml_str("request_timeout_secs = 5").unwrap();
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.api_base_url, "http://localhost:8081");
    }

    #[test]
    fn test_invalid_url_rejected() {
        let result = ClientConfig::from_toml_str(r#"api_base_url = "not a url""#);
        assert!(matches!(result, Err(KaleError::Config(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = ClientConfig::from_toml_str("request_timeout_secs = 0");
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("KALECHECK_API_URL", "http://api.test:9000"),
            ("KALECHECK_TIMEOUT_SECS", "12"),
            ("KALECHECK_DATA_DIR", "/tmp/kale"),
        ]);
        let overrides = overrides_from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        let mut config = ClientConfig::defaults().unwrap();
        config.apply(overrides);
        assert_eq!(config.api_base_url, "http://api.test:9000");
        assert_eq!(config.segmentation_base_url, "http://127.0.0.1:8082");
        assert_eq!(config.request_timeout_secs, 12);
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/kale")));
    }

    #[test]
    fn test_env_bad_timeout() {
        let result = overrides_from_lookup(|k| {
            (k == "KALECHECK_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }
}
