//! Persisted sync state — the UTC instant of the last completed full sync.
//!
//! Stored as a JSON document at `<home>/.stacksync/state/<stack>.json`.
//! Writes use the atomic `.tmp` + rename pattern; every mutating function
//! has an `_at(home, …)` form for tests and a convenience wrapper that
//! derives home from `dirs::home_dir()`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stacksync_core::StackName;

use crate::error::{io_err, SyncError};

/// On-disk sync state payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncStateFile {
    pub last_full_sync_at: DateTime<Utc>,
}

/// Path to the sync state JSON for a stack, rooted at `home`.
///
/// `~/.stacksync/state/<stack>.json`
pub fn state_path_at(home: &Path, stack_name: &StackName) -> PathBuf {
    home.join(".stacksync")
        .join("state")
        .join(format!("{}.json", stack_name.0))
}

/// Load the sync state for `stack_name`.
///
/// Returns `None` if no full sync has been recorded yet.
pub fn load_at(home: &Path, stack_name: &StackName) -> Result<Option<SyncStateFile>, SyncError> {
    let path = state_path_at(home, stack_name);
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    Ok(Some(serde_json::from_str(&contents)?))
}

/// Save the sync state for `stack_name` atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_at(
    home: &Path,
    stack_name: &StackName,
    state: &SyncStateFile,
) -> Result<(), SyncError> {
    let path = state_path_at(home, stack_name);
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid state path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(state)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// The sync-state collaborator consumed by the orchestrator.
pub trait SyncStateStore {
    fn last_full_sync(&self) -> Result<Option<DateTime<Utc>>, SyncError>;
    fn record_full_sync(&self, at: DateTime<Utc>) -> Result<(), SyncError>;
}

/// File-backed [`SyncStateStore`], one timestamp per deployment target.
#[derive(Debug, Clone)]
pub struct FileSyncState {
    home: PathBuf,
    stack_name: StackName,
}

impl FileSyncState {
    /// Rooted at `dirs::home_dir()`.
    pub fn new(stack_name: StackName) -> Result<Self, SyncError> {
        let home = dirs::home_dir().ok_or(SyncError::HomeNotFound)?;
        Ok(Self::at(home, stack_name))
    }

    /// Explicit home; used in tests with `TempDir`.
    pub fn at(home: impl Into<PathBuf>, stack_name: StackName) -> Self {
        Self {
            home: home.into(),
            stack_name,
        }
    }
}

impl SyncStateStore for FileSyncState {
    fn last_full_sync(&self) -> Result<Option<DateTime<Utc>>, SyncError> {
        Ok(load_at(&self.home, &self.stack_name)?.map(|s| s.last_full_sync_at))
    }

    fn record_full_sync(&self, at: DateTime<Utc>) -> Result<(), SyncError> {
        save_at(
            &self.home,
            &self.stack_name,
            &SyncStateFile {
                last_full_sync_at: at,
            },
        )
    }
}
