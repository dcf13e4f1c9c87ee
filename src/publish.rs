//! Output publishing
//!
//! Copies each actor's final artifact to `<dest>/<actor>.<ext>`.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{MergeError, Result};
use crate::merge::ActorTrack;

/// Writes merged tracks into the destination directory
#[derive(Debug, Clone)]
pub struct OutputPublisher {
    dest: PathBuf,
    extension: String,
}

impl OutputPublisher {
    /// Check that `dest` is an existing directory
    ///
    /// Done before any merging so a bad destination fails fast.
    pub fn new(dest: &Path, extension: &str) -> Result<Self> {
        if !dest.is_dir() {
            return Err(MergeError::DestinationMissing {
                path: dest.to_path_buf(),
            });
        }

        Ok(Self {
            dest: dest.to_path_buf(),
            extension: extension.to_string(),
        })
    }

    /// Output path for `actor`
    pub fn output_path(&self, actor: &str) -> PathBuf {
        self.dest.join(format!("{}.{}", actor, self.extension))
    }

    /// Copy every track to its output path, in order
    ///
    /// Each artifact is released right after its copy.
    pub async fn publish(&self, tracks: Vec<ActorTrack>) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(tracks.len());

        for track in tracks {
            let to = self.output_path(&track.actor);
            tokio::fs::copy(track.artifact.path(), &to)
                .await
                .map_err(|e| MergeError::Publish {
                    from: track.artifact.path().to_path_buf(),
                    to: to.clone(),
                    source: e,
                })?;

            info!(
                actor = %track.actor,
                clips = track.clips,
                "published {}",
                to.display()
            );
            written.push(to);
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scratch::{ScratchSpace, DEFAULT_TEMP_PREFIX};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn track(scratch: &ScratchSpace, actor: &str, content: &[u8]) -> ActorTrack {
        let artifact = scratch.allocate("wav");
        std::fs::write(artifact.path(), content).unwrap();
        ActorTrack {
            actor: actor.to_string(),
            clips: 1,
            artifact,
        }
    }

    #[test]
    fn test_missing_destination_is_rejected() {
        let err = OutputPublisher::new(Path::new("/nonexistent/out"), "wav").unwrap_err();
        assert_eq!(err.error_code(), "DESTINATION_MISSING");
    }

    #[test]
    fn test_file_destination_is_rejected() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"").unwrap();

        assert!(OutputPublisher::new(&file, "wav").is_err());
    }

    #[tokio::test]
    async fn test_publish_copies_and_releases() {
        let dest = tempdir().unwrap();
        let scratch = ScratchSpace::create(DEFAULT_TEMP_PREFIX).unwrap();
        let tracks = vec![track(&scratch, "A", b"alpha"), track(&scratch, "B", b"beta")];
        let publisher = OutputPublisher::new(dest.path(), "wav").unwrap();

        let written = publisher.publish(tracks).await.unwrap();

        assert_eq!(
            written,
            vec![dest.path().join("A.wav"), dest.path().join("B.wav")]
        );
        assert_eq!(std::fs::read(dest.path().join("A.wav")).unwrap(), b"alpha");
        assert_eq!(std::fs::read(dest.path().join("B.wav")).unwrap(), b"beta");
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_publish_fails_when_destination_disappears() {
        let dest = tempdir().unwrap();
        let scratch = ScratchSpace::create(DEFAULT_TEMP_PREFIX).unwrap();
        let publisher = OutputPublisher::new(dest.path(), "wav").unwrap();
        let gone = dest.path().to_path_buf();
        dest.close().unwrap();

        let err = publisher
            .publish(vec![track(&scratch, "A", b"alpha")])
            .await
            .unwrap_err();

        match err {
            MergeError::Publish { to, .. } => assert_eq!(to, gone.join("A.wav")),
            other => panic!("Expected Publish error, got: {:?}", other),
        }
    }
}
