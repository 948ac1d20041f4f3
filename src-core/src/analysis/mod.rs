//! Remote analysis: weight-loss prediction and background segmentation.

pub mod client;
pub mod types;

pub use client::{AnalysisBackend, HttpBackend, UPLOAD_FIELD};
pub use types::{AnalysisData, Features};
