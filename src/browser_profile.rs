//! Chrome profile directory management
//!
//! Every pooled session gets its own UUID-named user-data directory so that
//! concurrent Chrome processes never fight over a SingletonLock. Directories
//! left behind by a crashed process are swept at startup.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::utils::constants::PROFILE_DIR_PREFIX;

// =============================================================================
// BrowserProfile - RAII wrapper for profile directory
// =============================================================================

/// RAII wrapper for Chrome profile directory
///
/// Automatically cleans up the profile directory on drop.
#[derive(Debug)]
pub struct BrowserProfile {
    path: PathBuf,
    cleanup_on_drop: bool,
}

impl BrowserProfile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            cleanup_on_drop: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consume the profile and return the path, disabling auto-cleanup
    #[cfg(test)]
    fn into_path(mut self) -> PathBuf {
        self.cleanup_on_drop = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for BrowserProfile {
    fn drop(&mut self) {
        if self.cleanup_on_drop && self.path.exists() {
            debug!("BrowserProfile cleanup: removing {}", self.path.display());
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                warn!("Failed to cleanup profile directory {}: {}", self.path.display(), e);
            }
        }
    }
}

// =============================================================================
// Profile Creation
// =============================================================================

/// Create a unique Chrome profile directory under the system temp dir
///
/// Uses `create_dir` (not `create_dir_all`) so a UUID collision fails loudly
/// instead of sharing a directory.
pub fn create_unique_profile() -> Result<BrowserProfile> {
    create_unique_profile_in(&std::env::temp_dir())
}

/// Create a unique Chrome profile directory under `parent`
pub fn create_unique_profile_in(parent: &Path) -> Result<BrowserProfile> {
    let path = parent.join(format!("{}_{}", PROFILE_DIR_PREFIX, Uuid::new_v4()));

    std::fs::create_dir(&path)
        .with_context(|| format!("Failed to create profile directory: {}", path.display()))?;

    debug!("Created Chrome profile directory: {}", path.display());
    Ok(BrowserProfile::new(path))
}

// =============================================================================
// Stale profile sweep
// =============================================================================

/// Whether the Chrome process that locked `profile_dir` is gone
///
/// SingletonLock is a symlink with target `{hostname}-{PID}`. A missing lock
/// means Chrome never started or exited cleanly, both of which are stale.
#[cfg(target_os = "linux")]
fn is_profile_stale(profile_dir: &Path) -> bool {
    let lock_path = profile_dir.join("SingletonLock");
    if !lock_path.is_symlink() {
        return true;
    }

    match std::fs::read_link(&lock_path) {
        Ok(target) => {
            let target = target.to_string_lossy();
            match target.rsplit('-').next().and_then(|pid| pid.parse::<u32>().ok()) {
                Some(pid) => !Path::new(&format!("/proc/{pid}")).exists(),
                None => {
                    warn!("Could not parse PID from SingletonLock target: {}", target);
                    false
                }
            }
        }
        Err(_) => false,
    }
}

/// Without procfs there is no cheap liveness probe; only unlocked dirs are stale
#[cfg(not(target_os = "linux"))]
fn is_profile_stale(profile_dir: &Path) -> bool {
    let lock_path = profile_dir.join("SingletonLock");
    !lock_path.exists() && !lock_path.is_symlink()
}

/// Remove profile directories orphaned by earlier runs
///
/// Only directories carrying this service's prefix and no live lock holder
/// are touched. Returns the number removed.
pub fn cleanup_stale_profiles() -> Result<usize> {
    cleanup_stale_profiles_in(&std::env::temp_dir())
}

pub fn cleanup_stale_profiles_in(parent: &Path) -> Result<usize> {
    let entries = std::fs::read_dir(parent)
        .with_context(|| format!("Failed to read temp directory: {}", parent.display()))?;

    let mut cleaned = 0;
    for entry in entries.flatten() {
        let path = entry.path();

        if let Some(name) = path.file_name().and_then(|n| n.to_str())
            && name.starts_with(PROFILE_DIR_PREFIX)
            && path.is_dir()
            && is_profile_stale(&path)
        {
            match std::fs::remove_dir_all(&path) {
                Ok(()) => cleaned += 1,
                Err(e) => warn!("Failed to remove stale profile {}: {}", path.display(), e),
            }
        }
    }

    if cleaned > 0 {
        info!("Cleaned {} stale Chrome profile directories", cleaned);
    }
    Ok(cleaned)
}
