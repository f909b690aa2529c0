use anyhow::Context;
use std::env;
use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Cooperative stop flag, checked by the runner between job listings.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

use fd_lock::{RwLock, RwLockWriteGuard};
use once_cell::sync::Lazy;
use std::fs::File;
use std::sync::Mutex;

// Stores the write guard to keep the lock held for the process lifetime.
static INSTANCE_LOCK: Lazy<Mutex<Option<RwLockWriteGuard<'static, File>>>> =
    Lazy::new(|| Mutex::new(None));

/// Ensures that only one run shares the browser profile and the registry.
pub fn ensure_single_instance() -> Result<(), Box<dyn Error>> {
    let mut lock_path = get_user_data_dir()?;
    lock_path.pop(); // parent of 'profile' (~/.local/share/quickapply/)
    std::fs::create_dir_all(&lock_path)?;
    lock_path.push("quickapply.lock");

    let file = File::create(&lock_path)?;
    // Leak the RwLock to get a 'static reference so the guard can outlive this function.
    let lock_ref: &'static mut RwLock<File> = Box::leak(Box::new(RwLock::new(file)));

    match lock_ref.try_write() {
        Ok(guard) => {
            if let Ok(mut slot) = INSTANCE_LOCK.lock() {
                *slot = Some(guard);
            }
            Ok(())
        }
        Err(_) => Err("Another quickapply run is already active.".into()),
    }
}

#[cfg(target_os = "linux")]
const PROFILE_SUBPATH: &str = ".local/share/quickapply/profile";

#[cfg(target_os = "macos")]
const PROFILE_SUBPATH: &str = "Library/Application Support/quickapply/profile";

#[cfg(target_os = "windows")]
const PROFILE_SUBPATH: &str = "AppData/Roaming/quickapply/profile";

/// Returns the Chrome profile directory that carries the logged-in session.
///
/// - **Linux:** `~/.local/share/quickapply/profile`
/// - **macOS:** `~/Library/Application Support/quickapply/profile`
/// - **Windows:** `%USERPROFILE%\AppData\Roaming\quickapply\profile`
///
/// Creates the directory if it does not already exist.
pub fn get_user_data_dir() -> Result<PathBuf, Box<dyn Error>> {
    let home_dir = env::var("HOME").or_else(|_| env::var("USERPROFILE"))?;
    let user_data_dir = PathBuf::from(&home_dir).join(PROFILE_SUBPATH);

    if !user_data_dir.exists() {
        std::fs::create_dir_all(&user_data_dir)?;
        log::info!("User data directory created at: {:?}", user_data_dir);
    }

    Ok(user_data_dir)
}

/// Completely removes the browser profile, logging the session out.
pub fn wipe_user_data_dir() -> Result<(), Box<dyn Error>> {
    let path = get_user_data_dir()?;
    if path.exists() {
        std::fs::remove_dir_all(&path)?;
        log::info!("Wiped profile directory: {:?}", path);
    }
    Ok(())
}

/// Escapes a string for embedding inside a single-quoted JS literal.
pub fn js_escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

/// Writes `content` next to `path` and renames it into place, so a crash
/// mid-write leaves either the old file or the new one.
pub fn atomic_write(path: &Path, content: &[u8]) -> anyhow::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)
        .with_context(|| format!("Failed to create directory {:?}", parent))?;

    let mut temp = NamedTempFile::new_in(&parent)
        .with_context(|| format!("Failed to create temporary file in {:?}", parent))?;
    temp.write_all(content)
        .with_context(|| format!("Failed to write temporary file for {:?}", path))?;
    temp.flush()?;
    temp.persist(path)
        .with_context(|| format!("Failed to persist temporary file to {:?}", path))?;
    Ok(())
}

/// Lowercases and collapses whitespace, the form every keyword test uses.
pub fn normalize_text(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_escape_handles_quotes_and_newlines() {
        assert_eq!(js_escape("it's"), "it\\'s");
        assert_eq!(js_escape("a\\b"), "a\\\\b");
        assert_eq!(js_escape("line1\nline2"), "line1\\nline2");
    }

    #[test]
    fn atomic_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("state.json");
        std::fs::write(&target, "old").unwrap();

        atomic_write(&target, b"new content").unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new content");
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn normalize_text_collapses_whitespace() {
        assert_eq!(
            normalize_text("  Are you\n  legally   AUTHORIZED? "),
            "are you legally authorized?"
        );
    }

    #[test]
    fn cancellation_token_is_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
