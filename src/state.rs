//! Persisted account state — the sync watermark plus chain and rule config.
//!
//! One pretty-printed JSON record per installation, overwritten wholesale on
//! each save. A missing file is the bootstrap signal, not an error. Nothing
//! here guards against concurrent writers; one run at a time is an external
//! invariant.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StateError;
use crate::filter::FilterRule;

const STATE_FILE: &str = "state.json";

/// The persisted record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AccountState {
    /// Messages received at or before this epoch-millisecond timestamp are
    /// considered already processed. Non-decreasing across successful runs.
    pub last_sync_epoch_ms: i64,
    /// Mailbox total from the last successful sync. Informational.
    pub last_known_total: u64,
    /// Account email from the last successful sync. Informational.
    pub account_email: String,
    /// Pipeline producing speech, one argv list per stage; `"{}"` marks the
    /// argument that receives the sentence.
    pub speak_commands: Vec<Vec<String>>,
    /// Pipeline toggling the relay; `"{}"` receives `"1"` or `"0"`.
    pub power_commands: Vec<Vec<String>>,
    /// Selection rules. Absent means process everything.
    pub filters: Option<Vec<FilterRule>>,
}

/// Loads and saves the state file under the data directory.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(STATE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record. `Ok(None)` when no state has been saved yet.
    pub fn load(&self) -> Result<Option<AccountState>, StateError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the full record, replacing any previous contents.
    pub fn save(&self, state: &AccountState) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, raw)?;
        info!(path = %self.path.display(), "Saved account state");
        Ok(())
    }
}
