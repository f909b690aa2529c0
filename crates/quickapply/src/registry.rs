//! Job ids whose application was abandoned on an earlier attempt.
//!
//! The set only grows. It is rewritten atomically after every insertion so a
//! crash never leaves a half-written file behind.

use crate::utils::atomic_write;
use anyhow::Context;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct FailedApplications {
    path: PathBuf,
    ids: BTreeSet<String>,
}

impl FailedApplications {
    /// Loads the registry, starting empty when the file does not exist yet.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let ids = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            if raw.trim().is_empty() {
                BTreeSet::new()
            } else {
                serde_json::from_str::<Vec<String>>(&raw)
                    .with_context(|| format!("Malformed registry {}", path.display()))?
                    .into_iter()
                    .collect()
            }
        } else {
            BTreeSet::new()
        };
        log::debug!(
            "[*] Loaded {} previously failed application(s) from {}",
            ids.len(),
            path.display()
        );
        Ok(Self {
            path: path.to_path_buf(),
            ids,
        })
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.ids.contains(job_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Inserts `job_id` and persists the set. Returns `false` if it was
    /// already recorded, in which case nothing is written.
    pub fn record(&mut self, job_id: &str) -> anyhow::Result<bool> {
        if !self.ids.insert(job_id.to_string()) {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let ids: Vec<&String> = self.ids.iter().collect();
        let json = serde_json::to_vec_pretty(&ids)?;
        atomic_write(&self.path, &json)
    }
}
