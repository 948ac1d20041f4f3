//! Upload, analyze, persist.
//!
//! The free functions are the individual steps and are what the browser
//! front end drives from its signals. [`AnalyzeWorkflow`] strings them
//! together around a backend and a store for the CLI and tests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::analysis::{AnalysisBackend, AnalysisData};
use crate::error::KaleError;
use crate::export::report_csv;
use crate::handoff;
use crate::history::{HistoryRecord, LocalHistory};
use crate::storage::KeyValueStore;
use crate::upload::{UploadFile, UploadSession, ANALYSIS_PROGRESS, SEGMENTATION_PROGRESS};

pub type AnalysisSession = UploadSession<AnalysisData>;

/// Segmentation sessions hold the processed image as their result.
pub type SegmentationSession = UploadSession<UploadFile>;

pub fn new_analysis_session() -> AnalysisSession {
    UploadSession::new(ANALYSIS_PROGRESS)
}

pub fn new_segmentation_session() -> SegmentationSession {
    UploadSession::new(SEGMENTATION_PROGRESS)
}

/// Pick a file on the analysis step. A direct pick supersedes any staged
/// handoff.
pub fn select_for_analysis(
    session: &mut AnalysisSession,
    store: &impl KeyValueStore,
    file: UploadFile,
) -> Result<(), KaleError> {
    session.select(file)?;
    handoff::clear(store)
}

/// Adopt a handed-off image as a fresh selection. Returns whether one was
/// adopted.
pub fn adopt_handoff(
    session: &mut AnalysisSession,
    store: &impl KeyValueStore,
    nav_token: Option<&str>,
) -> Result<bool, KaleError> {
    match handoff::take(store, nav_token)? {
        Some(file) => {
            session.select(file)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Apply a prediction outcome. On success the result is appended to local
/// history and the new record returned. Outcomes for a session that is no
/// longer submitting (reset mid-flight) are dropped with `Ok(None)`.
pub fn finish_analysis(
    session: &mut AnalysisSession,
    store: &impl KeyValueStore,
    outcome: Result<AnalysisData, KaleError>,
    now: DateTime<Utc>,
) -> Result<Option<HistoryRecord>, KaleError> {
    match outcome {
        Ok(data) => {
            if !session.is_submitting() {
                return Ok(None);
            }
            let (name, preview) = match (session.file(), session.preview_url()) {
                (Some(file), Some(preview)) => (file.name.clone(), preview.to_string()),
                _ => return Ok(None),
            };
            // Persist first so a refused write never leaves a shown result
            // without its history entry.
            let record = HistoryRecord::from_analysis(&name, &preview, &data, now);
            let saved = match LocalHistory::new(store).append(record) {
                Ok(mut records) => records.remove(0),
                Err(err) => {
                    session.fail(err.to_string());
                    return Err(err);
                }
            };
            session.succeed(data.clone());
            info!(
                "Analysis of {} complete: {:.2}%",
                name, data.percentage_weight_loss
            );
            Ok(Some(saved))
        }
        Err(err) => {
            if session.fail(err.to_string()) {
                Err(err)
            } else {
                Ok(None)
            }
        }
    }
}

/// Apply a segmentation outcome. The processed image keeps the source
/// file name and is always PNG.
pub fn finish_segmentation(
    session: &mut SegmentationSession,
    outcome: Result<Vec<u8>, KaleError>,
) -> Result<bool, KaleError> {
    match outcome {
        Ok(bytes) => {
            let Some(name) = session.file().map(|f| f.name.clone()) else {
                return Ok(false);
            };
            Ok(session.succeed(UploadFile::new(name, "image/png", bytes)))
        }
        Err(err) => {
            if session.fail(err.to_string()) {
                Err(err)
            } else {
                Ok(false)
            }
        }
    }
}

/// Stage the processed image for the analysis step and return the
/// navigation token.
pub fn stage_for_analysis(
    session: &SegmentationSession,
    store: &impl KeyValueStore,
    now: DateTime<Utc>,
) -> Result<String, KaleError> {
    let processed = session.result().ok_or_else(|| {
        KaleError::Validation("Remove the background before continuing.".to_string())
    })?;
    handoff::stage(store, processed, now)
}

/// CSV report for a succeeded analysis.
pub fn export_report(session: &AnalysisSession) -> Result<String, KaleError> {
    match (session.file(), session.result()) {
        (Some(file), Some(data)) => report_csv(&file.name, data),
        _ => Err(KaleError::Validation(
            "No analysis result to export yet.".to_string(),
        )),
    }
}

/// Back to `Empty`, dropping any staged handoff.
pub fn reset<R>(session: &mut UploadSession<R>, store: &impl KeyValueStore) -> Result<(), KaleError> {
    session.reset();
    handoff::clear(store)
}

/// Both steps over one backend and one store.
pub struct AnalyzeWorkflow<B, S> {
    backend: B,
    store: S,
    segmentation: SegmentationSession,
    analysis: AnalysisSession,
    on_progress: Option<Arc<dyn Fn(u8) + Send + Sync>>,
}

impl<B: AnalysisBackend, S: KeyValueStore> AnalyzeWorkflow<B, S> {
    pub fn new(backend: B, store: S) -> Self {
        Self {
            backend,
            store,
            segmentation: new_segmentation_session(),
            analysis: new_analysis_session(),
            on_progress: None,
        }
    }

    /// Receive cosmetic progress values while a request is in flight.
    pub fn on_progress(mut self, callback: impl Fn(u8) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn analysis(&self) -> &AnalysisSession {
        &self.analysis
    }

    pub fn segmentation(&self) -> &SegmentationSession {
        &self.segmentation
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn select_for_segmentation(&mut self, file: UploadFile) -> Result<(), KaleError> {
        self.segmentation.select_letterboxed(file)
    }

    pub async fn remove_background(&mut self) -> Result<&UploadFile, KaleError> {
        let file = self.segmentation.begin_submit()?;
        let ticker = self.start_ticker(SEGMENTATION_PROGRESS);
        let outcome = self.backend.segment(&file).await;
        Self::stop_ticker(ticker, outcome.is_ok());

        finish_segmentation(&mut self.segmentation, outcome)?;
        self.segmentation
            .result()
            .ok_or_else(|| KaleError::MalformedResponse("segmentation produced no image".to_string()))
    }

    /// Hand the processed image over to the analysis step, as a navigation
    /// would, and adopt it there.
    pub fn continue_to_analysis(&mut self, now: DateTime<Utc>) -> Result<(), KaleError> {
        let token = stage_for_analysis(&self.segmentation, &self.store, now)?;
        if !adopt_handoff(&mut self.analysis, &self.store, Some(&token))? {
            warn!("Staged image was not found again under token {}", token);
            return Err(KaleError::Storage("Handoff staging was lost".to_string()));
        }
        Ok(())
    }

    pub fn adopt_handoff(&mut self, nav_token: Option<&str>) -> Result<bool, KaleError> {
        adopt_handoff(&mut self.analysis, &self.store, nav_token)
    }

    pub fn select_for_analysis(&mut self, file: UploadFile) -> Result<(), KaleError> {
        select_for_analysis(&mut self.analysis, &self.store, file)
    }

    /// Submit the selected image. On success the record written to local
    /// history is returned.
    pub async fn analyze(&mut self) -> Result<HistoryRecord, KaleError> {
        let file = self.analysis.begin_submit()?;
        let ticker = self.start_ticker(ANALYSIS_PROGRESS);
        let outcome = self.backend.predict(&file).await;
        Self::stop_ticker(ticker, outcome.is_ok());

        finish_analysis(&mut self.analysis, &self.store, outcome, Utc::now())?
            .ok_or_else(|| KaleError::MalformedResponse("analysis produced no result".to_string()))
    }

    pub fn export_csv(&self) -> Result<String, KaleError> {
        export_report(&self.analysis)
    }

    pub fn reset_analysis(&mut self) -> Result<(), KaleError> {
        reset(&mut self.analysis, &self.store)
    }

    pub fn reset_segmentation(&mut self) -> Result<(), KaleError> {
        reset(&mut self.segmentation, &self.store)
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn start_ticker(
        &self,
        plan: crate::upload::ProgressPlan,
    ) -> Option<crate::upload::progress::ProgressTicker> {
        let sink = self.on_progress.clone()?;
        Some(crate::upload::progress::ProgressTicker::spawn(plan, move |value| {
            sink(value)
        }))
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn stop_ticker(ticker: Option<crate::upload::progress::ProgressTicker>, succeeded: bool) {
        if let Some(ticker) = ticker {
            if succeeded {
                ticker.finish();
            } else {
                ticker.stop();
            }
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn start_ticker(&self, plan: crate::upload::ProgressPlan) -> Option<()> {
        let _ = plan;
        None
    }

    #[cfg(target_arch = "wasm32")]
    fn stop_ticker(_ticker: Option<()>, _succeeded: bool) {}
}
