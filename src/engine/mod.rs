//! Audio Engine Module
//!
//! The narrow capability the merger needs from an audio backend:
//! - Zero-trim a source into a silent, format-matched seed
//! - Overlay a delayed clip onto a base without normalization
//!
//! Backends:
//! - [`NativeEngine`]: in-process WAV mixing on the blocking pool
//! - [`FfmpegEngine`]: one ffmpeg child process per operation

pub mod buffer;
pub mod ffmpeg;
pub mod io;
pub mod native;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use buffer::AudioBuffer;
pub use ffmpeg::FfmpegEngine;
pub use native::NativeEngine;

/// Trait that all audio backends must implement
///
/// Implementations write only to `output` and never modify their inputs.
/// Every call is a suspension point for the invoking chain.
#[async_trait]
pub trait AudioEngine: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &'static str;

    /// Extension (without the dot) of the files this backend produces
    fn extension(&self) -> &'static str {
        "wav"
    }

    /// Write a zero-duration file with the audio format of `source`
    async fn zero_trim(&self, source: &Path, output: &Path) -> Result<()>;

    /// Delay `clip` by `delay`, sum it onto `base` and write the mix to `output`
    async fn overlay(&self, base: &Path, clip: &Path, delay: Duration, output: &Path)
        -> Result<()>;
}
