//! User-facing alerts and HTTP status wording.

use serde::{Deserialize, Serialize};

use crate::error::KaleError;

/// How long the UI keeps an alert on screen.
pub const ALERT_DISMISS_MS: u32 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Success,
    Error,
    Warning,
    Info,
}

impl AlertKind {
    pub fn css_class(&self) -> &'static str {
        match self {
            AlertKind::Success => "alert alert-success",
            AlertKind::Error => "alert alert-error",
            AlertKind::Warning => "alert alert-warning",
            AlertKind::Info => "alert alert-info",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AlertKind::Success => "Success",
            AlertKind::Error => "Error",
            AlertKind::Warning => "Warning",
            AlertKind::Info => "Info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
}

impl Alert {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Warning,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Info,
            message: message.into(),
        }
    }
}

impl From<&KaleError> for Alert {
    fn from(err: &KaleError) -> Self {
        match err {
            KaleError::Validation(_) | KaleError::NoFile | KaleError::Busy => {
                Alert::warning(err.to_string())
            }
            _ => Alert::error(err.to_string()),
        }
    }
}

/// Map a non-2xx status to the message shown to the user.
///
/// 401/403/404/429 always get fixed wording; anything else prefers the
/// server's `message` and falls back to the status line.
pub fn status_message(code: u16, server_message: Option<&str>, reason: Option<&str>) -> String {
    match code {
        401 => "Your session has expired. Please sign in again.".to_string(),
        403 => "You do not have permission to perform this action.".to_string(),
        404 => "The requested resource was not found.".to_string(),
        429 => "Too many requests. Please wait a minute before trying again.".to_string(),
        _ => match server_message.map(str::trim).filter(|m| !m.is_empty()) {
            Some(message) => message.to_string(),
            None => format!("HTTP {}: {}", code, reason.unwrap_or("Unknown error")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapped_statuses_are_distinct() {
        let messages: Vec<String> = [401, 403, 404, 429]
            .iter()
            .map(|c| status_message(*c, Some("ignored"), None))
            .collect();
        for (i, a) in messages.iter().enumerate() {
            for b in messages.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
        assert!(messages[3].contains("Too many requests"));
    }

    #[test]
    fn test_other_status_prefers_server_message() {
        assert_eq!(
            status_message(500, Some("Failed to call prediction API"), Some("Internal Server Error")),
            "Failed to call prediction API"
        );
        assert_eq!(
            status_message(502, Some("  "), Some("Bad Gateway")),
            "HTTP 502: Bad Gateway"
        );
        assert_eq!(status_message(500, None, None), "HTTP 500: Unknown error");
    }

    #[test]
    fn test_alert_from_error_kind() {
        let alert = Alert::from(&KaleError::Validation("bad".to_string()));
        assert_eq!(alert.kind, AlertKind::Warning);

        let alert = Alert::from(&KaleError::Transport("refused".to_string()));
        assert_eq!(alert.kind, AlertKind::Error);
        assert!(alert.message.contains("refused"));
    }

    #[test]
    fn test_alert_kind_serializes_lowercase() {
        let json = serde_json::to_string(&AlertKind::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }
}
