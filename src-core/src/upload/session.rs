//! Per-image upload session: selection, one submission at a time, result.
//!
//! ```text
//! Empty --select--> Selected --begin_submit--> Submitting --succeed--> Succeeded
//!                      ^                           |
//!                      |                           +--fail--> Failed --begin_submit--> Submitting
//!  (any) --reset--> Empty
//! ```

use tracing::{debug, info};

use super::image_prep::{letterbox, to_data_url};
use super::progress::{ProgressPlan, SyntheticProgress};
use super::validation::validate_selection;
use crate::error::KaleError;

/// A file picked, dropped, or reconstructed from a handoff.
#[derive(Clone, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl std::fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("size", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Empty,
    Selected,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct UploadSession<R> {
    file: Option<UploadFile>,
    preview_url: Option<String>,
    stage: Stage,
    progress: SyntheticProgress,
    result: Option<R>,
    error: Option<String>,
}

impl<R> UploadSession<R> {
    pub fn new(plan: ProgressPlan) -> Self {
        Self {
            file: None,
            preview_url: None,
            stage: Stage::Empty,
            progress: SyntheticProgress::new(plan),
            result: None,
            error: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn file(&self) -> Option<&UploadFile> {
        self.file.as_ref()
    }

    pub fn preview_url(&self) -> Option<&str> {
        self.preview_url.as_deref()
    }

    pub fn progress(&self) -> u8 {
        self.progress.value()
    }

    pub fn result(&self) -> Option<&R> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.stage == Stage::Submitting
    }

    /// Whether the submit control should be enabled.
    pub fn can_submit(&self) -> bool {
        matches!(self.stage, Stage::Selected | Stage::Failed)
    }

    /// Accept a file as-is after validation. A rejected file leaves the
    /// session untouched.
    pub fn select(&mut self, file: UploadFile) -> Result<(), KaleError> {
        if self.is_submitting() {
            return Err(KaleError::Busy);
        }
        validate_selection(&file.name, &file.mime, file.size())?;
        self.accept(file);
        Ok(())
    }

    /// Validate, then letterbox onto the 512x512 canvas before accepting.
    /// Used by the background-removal step.
    pub fn select_letterboxed(&mut self, file: UploadFile) -> Result<(), KaleError> {
        if self.is_submitting() {
            return Err(KaleError::Busy);
        }
        validate_selection(&file.name, &file.mime, file.size())?;
        let prepared = letterbox(&file.bytes)?;
        self.accept(UploadFile::new(file.name, prepared.mime, prepared.bytes));
        Ok(())
    }

    fn accept(&mut self, file: UploadFile) {
        info!("Selected {} ({} bytes, {})", file.name, file.size(), file.mime);
        self.preview_url = Some(to_data_url(&file.bytes, &file.mime));
        self.file = Some(file);
        self.stage = Stage::Selected;
        self.result = None;
        self.error = None;
        self.progress.reset();
    }

    /// Enter `Submitting` and hand back the file to send.
    pub fn begin_submit(&mut self) -> Result<UploadFile, KaleError> {
        match self.stage {
            Stage::Empty => Err(KaleError::NoFile),
            Stage::Submitting => Err(KaleError::Busy),
            Stage::Succeeded => Err(KaleError::Validation(
                "This image has already been processed. Reset or choose another image.".to_string(),
            )),
            Stage::Selected | Stage::Failed => {
                let file = self.file.clone().ok_or(KaleError::NoFile)?;
                self.stage = Stage::Submitting;
                self.error = None;
                self.progress.reset();
                debug!("Submitting {}", file.name);
                Ok(file)
            }
        }
    }

    /// Advance the cosmetic progress; ignored outside `Submitting`.
    pub fn tick_progress(&mut self) -> u8 {
        if self.is_submitting() {
            self.progress.tick()
        } else {
            self.progress.value()
        }
    }

    /// Record a successful response. Returns `false` (and changes nothing)
    /// when no submission is in flight, e.g. after a reset.
    pub fn succeed(&mut self, result: R) -> bool {
        if !self.is_submitting() {
            debug!("Discarding response for a session that is no longer submitting");
            return false;
        }
        self.progress.finish();
        self.result = Some(result);
        self.stage = Stage::Succeeded;
        true
    }

    /// Record a failure message. Same in-flight rule as [`Self::succeed`].
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if !self.is_submitting() {
            return false;
        }
        let message = message.into();
        info!("Submission failed: {}", message);
        self.error = Some(message);
        self.stage = Stage::Failed;
        true
    }

    /// Back to `Empty` from any stage.
    pub fn reset(&mut self) {
        self.file = None;
        self.preview_url = None;
        self.result = None;
        self.error = None;
        self.progress.reset();
        self.stage = Stage::Empty;
    }
}
