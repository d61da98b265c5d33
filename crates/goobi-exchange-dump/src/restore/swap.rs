//! Scoped replacement of one live directory tree by a staged one.
//!
//! The live tree is first renamed to a hidden shadow sibling, the staged tree
//! is moved into place and only then is the shadow deleted. Until the staged
//! tree is in place the shadow is renamed back on failure.

use crate::error::Result;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

/// Outcome of a successful [`swap_tree`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwapReport {
    /// A live tree existed and was removed
    pub replaced_existing: bool,
    /// Shadow that could not be deleted after the swap
    pub leftover_shadow: Option<Utf8PathBuf>,
}

/// Hidden sibling name used while a swap is in flight.
fn shadow_path(live: &Utf8Path) -> Result<Utf8PathBuf> {
    let name = live
        .file_name()
        .ok_or_else(|| io::Error::other(format!("cannot swap {}: no folder name", live)))?;
    let parent = live.parent().unwrap_or(Utf8Path::new("."));
    Ok(parent.join(format!(".{}.{}", name, Uuid::new_v4().simple())))
}

/// Replaces `live` with the directory `staged`.
///
/// `staged` is consumed. A missing `live` is created from scratch.
pub fn swap_tree(staged: &Utf8Path, live: &Utf8Path) -> Result<SwapReport> {
    if let Some(parent) = live.parent() {
        if !parent.as_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let shadow = if fs::symlink_metadata(live).is_ok() {
        let shadow = shadow_path(live)?;
        debug!("Moving {} aside to {}", live, shadow);
        fs::rename(live, &shadow)?;
        Some(shadow)
    } else {
        None
    };

    if let Err(e) = move_into_place(staged, live) {
        if let Some(shadow) = &shadow {
            rollback(shadow, live);
        }
        return Err(e);
    }

    let mut report = SwapReport {
        replaced_existing: shadow.is_some(),
        leftover_shadow: None,
    };
    if let Some(shadow) = shadow {
        if let Err(e) = remove_path(&shadow) {
            warn!("Failed to delete {}: {}", shadow, e);
            report.leftover_shadow = Some(shadow);
        }
    }
    Ok(report)
}

fn move_into_place(staged: &Utf8Path, live: &Utf8Path) -> Result<()> {
    match fs::rename(staged, live) {
        Ok(()) => Ok(()),
        Err(e) => {
            // Renames fail across filesystems
            debug!("Rename of {} failed ({}), copying instead", staged, e);
            copy_tree(staged, live)?;
            fs::remove_dir_all(staged)?;
            Ok(())
        }
    }
}

fn rollback(shadow: &Utf8Path, live: &Utf8Path) {
    warn!("Restoring {} from {}", live, shadow);
    if fs::symlink_metadata(live).is_ok() {
        if let Err(e) = remove_path(live) {
            warn!("Failed to clear partial {}: {}", live, e);
            return;
        }
    }
    if let Err(e) = fs::rename(shadow, live) {
        warn!("Failed to restore {} from {}: {}", live, shadow, e);
    }
}

fn remove_path(path: &Utf8Path) -> io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Recursively copies the directory `from` to `to`, keeping permissions.
pub fn copy_tree(from: &Utf8Path, to: &Utf8Path) -> Result<()> {
    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(from).map_err(|_| {
            io::Error::other(format!("{} is outside {}", entry.path().display(), from))
        })?;
        let target = to.as_std_path().join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        } else {
            debug!("Not copying non-regular entry {}", entry.path().display());
        }
    }
    Ok(())
}
