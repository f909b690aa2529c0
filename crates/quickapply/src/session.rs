use crate::utils::atomic_write;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What the last run learned about the login session.
///
/// The cookies themselves live in the Chrome profile directory; this file
/// only records whether that profile was logged in and where it was left.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub logged_in: bool,
    #[serde(default)]
    pub last_url: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Reads the stored state. A missing or unreadable file is a fresh session.
    pub fn load(&self) -> SessionState {
        let Ok(raw) = std::fs::read_to_string(&self.path) else {
            return SessionState::default();
        };
        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(e) => {
                log::warn!(
                    "[!] Ignoring unreadable session state {}: {}",
                    self.path.display(),
                    e
                );
                SessionState::default()
            }
        }
    }

    pub fn save(&self, logged_in: bool, last_url: &str) -> anyhow::Result<SessionState> {
        let state = SessionState {
            logged_in,
            last_url: last_url.to_string(),
            updated_at: Some(Utc::now()),
        };
        atomic_write(&self.path, &serde_json::to_vec_pretty(&state)?)?;
        Ok(state)
    }
}
