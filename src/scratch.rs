//! Scratch Space Management
//!
//! One temporary directory per run holds every intermediate artifact. Names
//! come from a process-wide monotonic counter, so concurrent chains can never
//! alias each other's files no matter how many are alive at once.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{MergeError, Result};

/// Default prefix for the scratch directory name.
pub const DEFAULT_TEMP_PREFIX: &str = "aclip_merge-";

/// Process-scoped temporary directory plus its name generator.
///
/// Dropping the space removes the directory and everything in it; call
/// [`ScratchSpace::close`] to observe removal errors instead.
pub struct ScratchSpace {
    dir: TempDir,
    next_id: AtomicU64,
}

impl ScratchSpace {
    /// Create a fresh directory under the system temp root.
    pub fn create(prefix: &str) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .map_err(|e| MergeError::ScratchDir { source: e })?;

        debug!(path = %dir.path().display(), "created scratch directory");

        Ok(Self {
            dir,
            next_id: AtomicU64::new(0),
        })
    }

    /// Path of the scratch directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Reserve a new, never-before-issued artifact path with `extension`.
    ///
    /// The file itself is not created; the engine writes it.
    pub fn allocate(&self, extension: &str) -> Artifact {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let path = self.dir.path().join(format!("tmp{}.{}", id, extension));
        debug!(path = %path.display(), "allocated artifact");
        Artifact { path }
    }

    /// Number of artifact names issued so far.
    pub fn issued(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }

    /// Remove the directory, reporting failure.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .map_err(|e| MergeError::ScratchCleanup {
                path: path.clone(),
                source: e,
            })?;
        debug!(path = %path.display(), "removed scratch directory");
        Ok(())
    }
}

impl fmt::Debug for ScratchSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScratchSpace")
            .field("path", &self.dir.path())
            .field("issued", &self.issued())
            .finish()
    }
}

/// A scratch audio file owned by exactly one fold step.
///
/// The file is deleted when the artifact is dropped, which happens as soon as
/// the next step supersedes it (or the step that was to fill it fails).
#[derive(Debug)]
pub struct Artifact {
    path: PathBuf,
}

impl Artifact {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Artifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "released artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove artifact"),
        }
    }
}
