//! Chrome profile directory management
//!
//! The scanner needs a logged-in LMS session, so the default is a persistent
//! profile under the user's data directory. A throwaway profile is available
//! for headless runs and tests.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// RAII wrapper for a Chrome profile directory
///
/// Throwaway profiles are removed on drop; persistent ones never are.
#[derive(Debug)]
pub struct BrowserProfile {
    path: PathBuf,
    cleanup_on_drop: bool,
}

impl BrowserProfile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        !self.cleanup_on_drop
    }
}

impl Drop for BrowserProfile {
    fn drop(&mut self) {
        if self.cleanup_on_drop && self.path.exists() {
            info!("BrowserProfile cleanup: removing {}", self.path.display());
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                warn!("Failed to cleanup profile directory {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Where the persistent profile lives when none is configured
pub fn default_profile_dir() -> Result<PathBuf> {
    let base = dirs::data_local_dir().context("Could not determine local data directory")?;
    Ok(base.join("lms_autoscan").join("chrome-profile"))
}

/// Open (or create) a profile that survives restarts
///
/// A `SingletonLock` left behind by a crashed Chrome is removed; a live one
/// is an error since two browsers cannot share a profile.
pub fn open_persistent_profile(dir: &Path) -> Result<BrowserProfile> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create profile directory: {}", dir.display()))?;

    if is_singleton_lock_stale(dir) {
        cleanup_stale_lock(dir)?;
    } else {
        anyhow::bail!(
            "Chrome profile {} is in use by another browser; close it or pass a different --profile-dir",
            dir.display()
        );
    }

    info!("Using persistent Chrome profile: {}", dir.display());
    Ok(BrowserProfile {
        path: dir.to_path_buf(),
        cleanup_on_drop: false,
    })
}

/// Create a unique throwaway profile directory using UUID v4
pub fn create_unique_profile() -> Result<BrowserProfile> {
    let path = std::env::temp_dir().join(format!("lms_autoscan_chrome_{}", Uuid::new_v4()));

    debug!("Creating unique Chrome profile: {}", path.display());

    // create_dir fails if the directory exists, which catches a UUID collision
    std::fs::create_dir(&path)
        .with_context(|| format!("Failed to create profile directory: {}", path.display()))?;

    Ok(BrowserProfile {
        path,
        cleanup_on_drop: true,
    })
}

/// Check if a `SingletonLock` is stale (its Chrome process is gone)
///
/// The lock is a symlink whose target is `{hostname}-{PID}`.
#[cfg(unix)]
pub fn is_singleton_lock_stale(profile_dir: &Path) -> bool {
    let lock_path = profile_dir.join("SingletonLock");

    if !lock_path.exists() && !lock_path.is_symlink() {
        return true;
    }

    match std::fs::read_link(&lock_path) {
        Ok(target) => {
            let target_str = target.to_string_lossy();
            let Some(pid) = target_str
                .rsplit('-')
                .next()
                .and_then(|pid| pid.parse::<i32>().ok())
            else {
                warn!("Could not parse PID from SingletonLock target: {}", target_str);
                return false;
            };

            // kill(pid, 0) probes for existence without sending a signal
            let exists = unsafe { libc::kill(pid, 0) == 0 };
            if exists {
                debug!("SingletonLock is active: PID {} is running", pid);
            } else {
                info!("SingletonLock is stale: PID {} no longer exists", pid);
            }
            !exists
        }
        Err(e) => {
            debug!("Could not read SingletonLock as symlink: {}", e);
            lock_path.is_file()
        }
    }
}

#[cfg(not(unix))]
pub fn is_singleton_lock_stale(_profile_dir: &Path) -> bool {
    true
}

/// Remove a stale `SingletonLock`; only call after `is_singleton_lock_stale`
pub fn cleanup_stale_lock(profile_dir: &Path) -> Result<()> {
    let lock_path = profile_dir.join("SingletonLock");

    // Broken symlinks report exists() == false
    if lock_path.exists() || lock_path.is_symlink() {
        info!("Removing stale SingletonLock: {}", lock_path.display());
        std::fs::remove_file(&lock_path)
            .with_context(|| format!("Failed to remove SingletonLock: {}", lock_path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_profile_is_removed_on_drop() {
        let profile = create_unique_profile().expect("profile");
        let path = profile.path().to_path_buf();
        assert!(path.exists());
        assert!(!profile.is_persistent());
        drop(profile);
        assert!(!path.exists());
    }

    #[test]
    fn persistent_profile_survives_drop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let profile_dir = dir.path().join("profile");
        let profile = open_persistent_profile(&profile_dir).expect("profile");
        assert!(profile.is_persistent());
        drop(profile);
        assert!(profile_dir.exists());
    }
}
