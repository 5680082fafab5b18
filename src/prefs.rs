//! Persisted location selection.
//!
//! The only thing that survives a restart is the id of the selected
//! location.  It is stored as a tiny JSON document in the user's config
//! directory.  A missing or unreadable file reads as "nothing selected".

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("could not write preferences to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not encode preferences: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Read/write access to the persisted selection.
pub trait SelectionStore: Send + Sync {
    fn selected_location(&self) -> Option<i64>;
    fn set_selected_location(&self, id: i64) -> Result<(), PrefsError>;
    fn clear_selected_location(&self) -> Result<(), PrefsError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Prefs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    selected_location_id: Option<i64>,
}

/// JSON file backed store.
pub struct FileSelectionStore {
    path: PathBuf,
}

impl FileSelectionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/wp-reader/prefs.json`, or `None` on platforms without a
    /// config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wp-reader").join("prefs.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Prefs {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Prefs::default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read preferences");
                return Prefs::default();
            }
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "ignoring corrupt preferences");
            Prefs::default()
        })
    }

    fn store(&self, prefs: &Prefs) -> Result<(), PrefsError> {
        let io_err = |source| PrefsError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(prefs)?;
        fs::write(&self.path, json).map_err(io_err)?;
        debug!(path = %self.path.display(), ?prefs, "preferences saved");
        Ok(())
    }
}

impl SelectionStore for FileSelectionStore {
    fn selected_location(&self) -> Option<i64> {
        self.load().selected_location_id
    }

    fn set_selected_location(&self, id: i64) -> Result<(), PrefsError> {
        let mut prefs = self.load();
        prefs.selected_location_id = Some(id);
        self.store(&prefs)
    }

    fn clear_selected_location(&self) -> Result<(), PrefsError> {
        let mut prefs = self.load();
        prefs.selected_location_id = None;
        self.store(&prefs)
    }
}

/// Non-persistent store, used when no config directory is available.
#[derive(Debug, Default)]
pub struct MemorySelectionStore {
    selected: Mutex<Option<i64>>,
}

impl SelectionStore for MemorySelectionStore {
    fn selected_location(&self) -> Option<i64> {
        *self.selected.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_selected_location(&self, id: i64) -> Result<(), PrefsError> {
        *self.selected.lock().unwrap_or_else(|e| e.into_inner()) = Some(id);
        Ok(())
    }

    fn clear_selected_location(&self) -> Result<(), PrefsError> {
        *self.selected.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
