//! Past analyses: the capped local list and the signed-in user's server copy.

pub mod remote;
pub mod store;
pub mod types;

pub use remote::HistoryClient;
pub use store::{LocalHistory, HISTORY_CAP, HISTORY_KEY};
pub use types::{format_timestamp, is_object_id, HistoryRecord, RemoteHistoryItem};
