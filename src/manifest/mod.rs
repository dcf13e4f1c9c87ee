//! Manifest Module
//!
//! Loads the clip list and partitions it by actor:
//! - [`Manifest::load`] parses and validates the JSON manifest
//! - [`group_by_actor`] builds the per-actor fold inputs

pub mod group;

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{MergeError, Result};

pub use group::{group_by_actor, Group};

/// Latest accepted `startAt`. Anything later is almost certainly a unit mix-up.
pub const MAX_START_AT: Duration = Duration::from_secs(24 * 60 * 60);

/// One recorded take placed on an actor's timeline
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Clip {
    /// Actor identifier; also the output file stem
    pub actor: String,
    /// Source audio file, resolved against the manifest directory on load
    pub file: PathBuf,
    /// Offset from the start of the actor's timeline
    #[serde(rename = "startAt", deserialize_with = "deserialize_millis")]
    pub start_at: Duration,
}

impl Clip {
    pub fn new(actor: impl Into<String>, file: impl Into<PathBuf>, start_at: Duration) -> Self {
        Self {
            actor: actor.into(),
            file: file.into(),
            start_at,
        }
    }
}

/// Ordered clip list
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    pub clips: Vec<Clip>,
}

impl Manifest {
    /// Load a manifest and resolve its clip paths
    ///
    /// # Errors
    /// * `ManifestNotFound` - If the file does not exist
    /// * `ManifestRead` - If the file cannot be read
    /// * `ManifestSyntax` - If the content is not a valid manifest
    /// * `InvalidClip` - If an actor cannot be used as a file name
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MergeError::ManifestNotFound {
                    path: path.to_path_buf(),
                    source: e,
                }
            } else {
                MergeError::ManifestRead {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let manifest = Self::parse(&content, base_dir).map_err(|e| match e {
            MergeError::ManifestSyntax { source, .. } => MergeError::ManifestSyntax {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        tracing::info!(
            path = %path.display(),
            clips = manifest.clips.len(),
            "loaded manifest"
        );

        Ok(manifest)
    }

    /// Parse manifest JSON, resolving relative clip files against `base_dir`
    pub fn parse(content: &str, base_dir: &Path) -> Result<Self> {
        let mut manifest: Manifest =
            serde_json::from_str(content).map_err(|e| MergeError::ManifestSyntax {
                path: PathBuf::new(),
                source: e,
            })?;

        for (index, clip) in manifest.clips.iter_mut().enumerate() {
            validate_actor(index, &clip.actor)?;
            if clip.file.as_os_str().is_empty() {
                return Err(MergeError::InvalidClip {
                    index,
                    reason: "file is empty".to_string(),
                });
            }
            if clip.start_at > MAX_START_AT {
                return Err(MergeError::InvalidClip {
                    index,
                    reason: format!(
                        "startAt of {} ms is beyond the {} ms limit",
                        clip.start_at.as_millis(),
                        MAX_START_AT.as_millis()
                    ),
                });
            }
            clip.file = base_dir.join(&clip.file);
        }

        Ok(manifest)
    }

    /// First clip of the manifest, the format reference for every seed
    pub fn reference_clip(&self) -> Option<&Clip> {
        self.clips.first()
    }
}

fn validate_actor(index: usize, actor: &str) -> Result<()> {
    let invalid = |reason: &str| MergeError::InvalidClip {
        index,
        reason: format!("actor {:?} {}", actor, reason),
    };

    if actor.is_empty() {
        return Err(invalid("is empty"));
    }
    if actor.contains(|c: char| c == '/' || c == '\\') {
        return Err(invalid("contains a path separator"));
    }
    let mut components = Path::new(actor).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid("is not a plain file name")),
    }
}

/// Milliseconds as a JSON number (integer or fractional), kept to microseconds
fn deserialize_millis<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let millis = f64::deserialize(deserializer)?;
    if !millis.is_finite() || millis < 0.0 {
        return Err(serde::de::Error::custom(format!(
            "startAt must be a non-negative number of milliseconds, got {}",
            millis
        )));
    }
    Ok(Duration::from_micros((millis * 1000.0).round() as u64))
}
