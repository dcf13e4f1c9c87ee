//! Timeline Merger
//!
//! Builds one track per actor by folding its clips onto a silent seed:
//!
//! ```text
//! seed = zero_trim(reference)
//! t1   = overlay(seed, clip1, clip1.start_at)
//! t2   = overlay(t1,   clip2, clip2.start_at)
//! ...
//! ```
//!
//! Steps of one chain run strictly one after another. Chains for different
//! actors run as independent tasks and race freely; [`TimelineMerger::merge_all`]
//! is the barrier that waits for all of them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::engine::AudioEngine;
use crate::error::{MergeError, Result};
use crate::manifest::Group;
use crate::scratch::{Artifact, ScratchSpace};

/// Final merged artifact of one actor
#[derive(Debug)]
pub struct ActorTrack {
    pub actor: String,
    /// Number of clips folded into the track
    pub clips: usize,
    pub artifact: Artifact,
}

/// Drives the per-actor folds against an engine and a scratch space
#[derive(Clone)]
pub struct TimelineMerger {
    engine: Arc<dyn AudioEngine>,
    scratch: Arc<ScratchSpace>,
}

impl TimelineMerger {
    pub fn new(engine: Arc<dyn AudioEngine>, scratch: Arc<ScratchSpace>) -> Self {
        Self { engine, scratch }
    }

    /// Produce a silent, zero-length artifact in the format of `reference`
    pub async fn seed(&self, reference: &Path) -> Result<Artifact> {
        let seed = self.scratch.allocate(self.engine.extension());
        self.engine.zero_trim(reference, seed.path()).await?;

        info!(
            "zero trim : {} -> {}",
            reference.display(),
            seed.path().display()
        );

        Ok(seed)
    }

    /// Fold one group onto a fresh seed, in manifest order
    ///
    /// Each overlay completes before the next one starts. The superseded
    /// artifact is deleted as soon as its successor exists; if a step fails,
    /// both the current timeline and the half-written output are deleted.
    pub async fn merge_group(&self, reference: &Path, group: Group) -> Result<ActorTrack> {
        let mut timeline = self.seed(reference).await?;

        for clip in &group.clips {
            let next = self.scratch.allocate(self.engine.extension());
            self.engine
                .overlay(timeline.path(), &clip.file, clip.start_at, next.path())
                .await?;

            info!(
                actor = %group.actor,
                "merged : {} + {} -> {}",
                timeline.path().display(),
                clip.file.display(),
                next.path().display()
            );

            timeline = next;
        }

        Ok(ActorTrack {
            actor: group.actor,
            clips: group.clips.len(),
            artifact: timeline,
        })
    }

    /// Run every group's fold concurrently and wait for all of them
    ///
    /// Tracks come back in the order of `groups`. The first failure aborts
    /// the remaining chains; they are drained before returning so no engine
    /// call outlives the scratch space.
    pub async fn merge_all(&self, reference: &Path, groups: Vec<Group>) -> Result<Vec<ActorTrack>> {
        let count = groups.len();
        let mut tasks = JoinSet::new();
        let mut actors = HashMap::with_capacity(count);

        for (index, group) in groups.into_iter().enumerate() {
            let merger = self.clone();
            let reference: PathBuf = reference.to_path_buf();
            let actor = group.actor.clone();
            let handle = tasks.spawn(async move {
                (index, merger.merge_group(&reference, group).await)
            });
            actors.insert(handle.id(), actor);
        }

        let mut tracks: Vec<Option<ActorTrack>> = (0..count).map(|_| None).collect();

        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok((index, Ok(track))) => {
                    tracks[index] = Some(track);
                    continue;
                }
                Ok((_, Err(e))) => e,
                Err(e) => MergeError::TaskFailed {
                    actor: actors
                        .get(&e.id())
                        .cloned()
                        .unwrap_or_else(|| "<unknown>".to_string()),
                    reason: e.to_string(),
                },
            };

            abandon(&mut tasks).await;
            return Err(failure);
        }

        Ok(tracks.into_iter().flatten().collect())
    }
}

/// Abort the chains still in flight and wait until they are gone
async fn abandon(tasks: &mut JoinSet<(usize, Result<ActorTrack>)>) {
    if tasks.is_empty() {
        return;
    }

    warn!(remaining = tasks.len(), "aborting remaining merge chains");
    tasks.abort_all();

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Err(e))) => warn!(error = %e, "merge chain failed while aborting"),
            Err(e) if e.is_panic() => warn!(error = %e, "merge chain panicked while aborting"),
            _ => {}
        }
    }
}
