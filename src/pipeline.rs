//! End-to-end merge run
//!
//! manifest → groups → concurrent folds → publish, with the scratch space
//! released on every exit path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::MergeConfig;
use crate::engine::AudioEngine;
use crate::error::Result;
use crate::manifest::{group_by_actor, Manifest};
use crate::merge::TimelineMerger;
use crate::publish::OutputPublisher;
use crate::scratch::ScratchSpace;

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Written files, one per actor, in first-appearance order
    pub outputs: Vec<PathBuf>,
    /// Scratch directory used by the run (already removed)
    pub scratch_dir: PathBuf,
    pub groups: usize,
    pub clips: usize,
}

/// Merge `manifest_path` into `dest` using the engine from `config`
pub async fn merge_manifest(
    manifest_path: &Path,
    dest: &Path,
    config: &MergeConfig,
) -> Result<MergeReport> {
    merge_with_engine(manifest_path, dest, config, config.build_engine()).await
}

/// Same as [`merge_manifest`] with an explicit engine
pub async fn merge_with_engine(
    manifest_path: &Path,
    dest: &Path,
    config: &MergeConfig,
    engine: Arc<dyn AudioEngine>,
) -> Result<MergeReport> {
    let manifest = Manifest::load(manifest_path)?;
    let publisher = OutputPublisher::new(dest, engine.extension())?;
    let scratch = Arc::new(ScratchSpace::create(&config.temp_prefix)?);
    let scratch_dir = scratch.path().to_path_buf();

    info!(
        engine = engine.name(),
        scratch = %scratch_dir.display(),
        "starting merge"
    );

    let merger = TimelineMerger::new(engine, Arc::clone(&scratch));
    let outcome = run(&manifest, &merger, &publisher).await;
    drop(merger);

    let cleanup = release(scratch);
    let outputs = match (outcome, cleanup) {
        (Ok(outputs), Ok(())) => outputs,
        (Ok(_), Err(e)) => return Err(e),
        (Err(e), Ok(())) => return Err(e),
        (Err(e), Err(cleanup_err)) => {
            warn!(error = %cleanup_err, "scratch cleanup failed after merge error");
            return Err(e);
        }
    };

    Ok(MergeReport {
        groups: outputs.len(),
        clips: manifest.clips.len(),
        outputs,
        scratch_dir,
    })
}

async fn run(
    manifest: &Manifest,
    merger: &TimelineMerger,
    publisher: &OutputPublisher,
) -> Result<Vec<PathBuf>> {
    let Some(reference) = manifest.reference_clip() else {
        info!("manifest has no clips, nothing to merge");
        return Ok(Vec::new());
    };

    let groups = group_by_actor(&manifest.clips);
    info!(groups = groups.len(), "grouped clips by actor");

    let tracks = merger.merge_all(&reference.file, groups).await?;
    publisher.publish(tracks).await
}

/// Close the scratch space if this is the last handle to it
fn release(scratch: Arc<ScratchSpace>) -> Result<()> {
    match Arc::try_unwrap(scratch) {
        Ok(scratch) => scratch.close(),
        Err(shared) => {
            // Still referenced elsewhere; the last drop removes the directory
            warn!(path = %shared.path().display(), "scratch space still shared at shutdown");
            Ok(())
        }
    }
}
