//! services/dashboard_client/src/adapters/store.rs
//!
//! A `SessionStore` backed by a single JSON file, so a signed-in session
//! survives between CLI invocations. The file is written with 0o600
//! permissions because it holds bearer and refresh tokens.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use task_dashboard_core::ports::{PortError, PortResult, SessionStore};

/// On-disk layout of the session file.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionFile {
    #[serde(default)]
    values: BTreeMap<String, String>,
    #[serde(default)]
    last_updated: Option<String>,
}

/// Keeps the session in memory and writes the whole map through on every change.
pub struct FileSessionStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileSessionStore {
    /// Opens the store at `path`. A missing or unreadable file starts an empty session.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = load_session_file(&path)
            .map(|file| file.values)
            .unwrap_or_default();
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    fn with_values<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> T,
    ) -> PortResult<T> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| PortError::Storage("session lock poisoned".to_string()))?;
        Ok(f(&mut values))
    }

    fn persist(&self, values: BTreeMap<String, String>) -> PortResult<()> {
        if values.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(PortError::Storage(format!(
                    "Failed to remove session file: {}",
                    e
                ))),
            };
        }

        let file = SessionFile {
            values,
            last_updated: Some(chrono::Utc::now().to_rfc3339()),
        };
        save_session_file(&self.path, &file)
            .map_err(|e| PortError::Storage(format!("Failed to write session file: {}", e)))
    }
}

fn load_session_file(path: &Path) -> Option<SessionFile> {
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("failed to read session file: {e}");
            return None;
        }
    };

    match serde_json::from_str::<SessionFile>(&data) {
        Ok(file) => Some(file),
        Err(e) => {
            tracing::warn!("failed to parse session file, starting signed out: {e}");
            None
        }
    }
}

fn save_session_file(path: &Path, file: &SessionFile) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(file)?;

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut out = options.open(path)?;

    // `mode` only applies on creation; tighten a file left by an older write.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        out.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    out.write_all(json.as_bytes())?;
    out.flush()
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        self.with_values(|values| values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        let snapshot = self.with_values(|values| {
            values.insert(key.to_string(), value.to_string());
            values.clone()
        })?;
        self.persist(snapshot)
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        let snapshot = self.with_values(|values| {
            values.remove(key).map(|_| values.clone())
        })?;
        match snapshot {
            Some(values) => self.persist(values),
            None => Ok(()),
        }
    }

    fn clear(&self) -> PortResult<()> {
        self.with_values(|values| values.clear())?;
        self.persist(BTreeMap::new())
    }
}
