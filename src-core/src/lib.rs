pub mod analysis;
pub mod auth;
pub mod config;
pub mod error;
pub mod export;
pub mod handoff;
pub mod history;
mod http;
pub mod notice;
pub mod storage;
pub mod upload;
pub mod workflow;

pub use analysis::{AnalysisBackend, AnalysisData, Features, HttpBackend};
pub use auth::SessionToken;
pub use config::ClientConfig;
pub use error::KaleError;
pub use history::{HistoryClient, HistoryRecord, LocalHistory};
pub use notice::{Alert, AlertKind};
pub use storage::{KeyValueStore, MemoryStore};
pub use upload::{Stage, UploadFile, UploadSession};
pub use workflow::{AnalysisSession, AnalyzeWorkflow, SegmentationSession};

#[cfg(not(target_arch = "wasm32"))]
pub use storage::JsonFileStore;

/// Install the fmt subscriber. `RUST_LOG` wins; otherwise `info`.
/// Safe to call more than once.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
