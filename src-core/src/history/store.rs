use tracing::{info, warn};

use super::types::{HistoryRecord, FALLBACK_IMAGE_URL};
use crate::error::KaleError;
use crate::storage::KeyValueStore;

/// Storage key holding the JSON array of local records.
pub const HISTORY_KEY: &str = "analysisHistory";

/// Most records kept locally; older ones fall off the end.
pub const HISTORY_CAP: usize = 20;

/// Client-side history, newest first.
pub struct LocalHistory<S> {
    store: S,
}

impl<S: KeyValueStore> LocalHistory<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// All records, newest first. An unreadable value reads as empty so a
    /// corrupted entry never blocks new analyses.
    pub fn list(&self) -> Result<Vec<HistoryRecord>, KaleError> {
        let Some(raw) = self.store.get(HISTORY_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<HistoryRecord>>(&raw) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!("Ignoring unreadable local history: {}", e);
                Ok(Vec::new())
            }
        }
    }

    pub fn get(&self, id: &str) -> Result<Option<HistoryRecord>, KaleError> {
        Ok(self.list()?.into_iter().find(|r| r.id == id))
    }

    /// Prepend a record and trim to [`HISTORY_CAP`]. Returns the new list.
    ///
    /// When the store refuses the write (a full `localStorage` quota), the
    /// oldest records are dropped until it fits. If the new record alone is
    /// still too large, its inline preview is replaced by the placeholder
    /// image.
    pub fn append(&self, record: HistoryRecord) -> Result<Vec<HistoryRecord>, KaleError> {
        let mut records = self.list()?;
        info!("Saving {} to local history", record.id);
        records.insert(0, record);
        records.truncate(HISTORY_CAP);

        loop {
            match self.write(&records) {
                Ok(()) => return Ok(records),
                Err(KaleError::Storage(msg)) if records.len() > 1 => {
                    if let Some(evicted) = records.pop() {
                        warn!("History write refused ({}), evicting {}", msg, evicted.id);
                    }
                }
                Err(KaleError::Storage(msg)) if records[0].image_url.starts_with("data:") => {
                    warn!("History write refused ({}), dropping inline preview", msg);
                    records[0].image_url = FALLBACK_IMAGE_URL.to_string();
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Remove one record. Returns whether anything was removed.
    pub fn delete(&self, id: &str) -> Result<bool, KaleError> {
        let mut records = self.list()?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Ok(false);
        }
        self.write(&records)?;
        Ok(true)
    }

    pub fn clear(&self) -> Result<(), KaleError> {
        info!("Clearing local history");
        self.store.remove(HISTORY_KEY)
    }

    fn write(&self, records: &[HistoryRecord]) -> Result<(), KaleError> {
        let json = serde_json::to_string(records)
            .map_err(|e| KaleError::Storage(format!("Failed to serialize history: {}", e)))?;
        self.store.set(HISTORY_KEY, &json)
    }
}
