//! File intake for both workflow steps: validation, letterboxing,
//! cosmetic progress and the per-image session state machine.

pub mod image_prep;
pub mod progress;
pub mod session;
pub mod validation;

pub use image_prep::{decode_data_url, letterbox, to_data_url, LetterboxGeometry, CANVAS_SIZE};
pub use progress::{ProgressPlan, SyntheticProgress, ANALYSIS_PROGRESS, SEGMENTATION_PROGRESS};
pub use session::{Stage, UploadFile, UploadSession};
pub use validation::{mime_from_name, validate_selection, MAX_FILE_BYTES};
