// src/state.rs
//! Single-record persistence of the last observed page.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use metrics::counter;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::StateError;
use crate::record::ContentRecord;

#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable state is treated as "never observed".
    pub async fn load(&self) -> Option<ContentRecord> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no prior state");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), "state unreadable, starting fresh: {e}");
                return None;
            }
        };
        match serde_json::from_str::<ContentRecord>(&raw) {
            Ok(rec) => Some(rec),
            Err(e) => {
                warn!(path = %self.path.display(), "state corrupt, starting fresh: {e}");
                None
            }
        }
    }

    /// Replaces the stored record wholesale (temp file + rename).
    pub async fn save(&self, record: &ContentRecord) -> Result<(), StateError> {
        let io_err = |source: std::io::Error| StateError::Io {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await.map_err(io_err)?;
        }

        let json = serde_json::to_vec_pretty(record)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).await.map_err(io_err)?;

        #[cfg(target_os = "windows")]
        if fs::try_exists(&self.path).await.unwrap_or(false) {
            fs::remove_file(&self.path).await.map_err(io_err)?;
        }

        fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        counter!("state_writes_total").increment(1);
        debug!(path = %self.path.display(), hash = %record.fingerprint, "state saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("nested/last_state.json"));
        let rec = ContentRecord::new("T", "2025-09-01", "a\nb", "https://x");
        store.save(&rec).await.unwrap();
        let back = store.load().await.unwrap();
        assert_eq!(back.fingerprint, rec.fingerprint);
        assert_eq!(back, rec);
        assert!(!dir.path().join("nested/last_state.json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_state.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(StateStore::new(&path).load().await.is_none());
    }
}
