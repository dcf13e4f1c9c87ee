//! Run configuration.
//!
//! The command line only takes the manifest and destination, so backend
//! selection lives in environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::engine::{AudioEngine, FfmpegEngine, NativeEngine};
use crate::error::{MergeError, Result};
use crate::scratch::DEFAULT_TEMP_PREFIX;

/// Selects the audio backend.
pub const ENV_ENGINE: &str = "ACLIP_MERGE_ENGINE";
/// Overrides the ffmpeg binary.
pub const ENV_FFMPEG: &str = "ACLIP_MERGE_FFMPEG";
/// Overrides the scratch directory prefix.
pub const ENV_TEMP_PREFIX: &str = "ACLIP_MERGE_TEMP_PREFIX";

/// Audio backend choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    /// In-process hound engine.
    #[default]
    Native,
    /// External ffmpeg binary.
    Ffmpeg,
}

impl FromStr for EngineKind {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(EngineKind::Native),
            "ffmpeg" => Ok(EngineKind::Ffmpeg),
            _ => Err(MergeError::InvalidConfig {
                key: ENV_ENGINE.to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Settings for one merge run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConfig {
    pub engine: EngineKind,
    pub ffmpeg_program: PathBuf,
    pub temp_prefix: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            ffmpeg_program: PathBuf::from("ffmpeg"),
            temp_prefix: DEFAULT_TEMP_PREFIX.to_string(),
        }
    }
}

impl MergeConfig {
    /// Build from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; unset or empty keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(engine) = get(ENV_ENGINE) {
            config.engine = engine.parse()?;
        }
        if let Some(program) = get(ENV_FFMPEG) {
            config.ffmpeg_program = PathBuf::from(program);
        }
        if let Some(prefix) = get(ENV_TEMP_PREFIX) {
            config.temp_prefix = prefix;
        }

        Ok(config)
    }

    /// Construct the configured backend.
    pub fn build_engine(&self) -> Arc<dyn AudioEngine> {
        match self.engine {
            EngineKind::Native => Arc::new(NativeEngine::new()),
            EngineKind::Ffmpeg => Arc::new(FfmpegEngine::new(self.ffmpeg_program.clone())),
        }
    }
}
