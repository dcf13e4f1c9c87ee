//! In-process WAV engine
//!
//! Decodes, mixes and re-encodes with hound on tokio's blocking pool, so the
//! async chains only ever await the result.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::engine::buffer::{frames_for, AudioBuffer};
use crate::engine::io::{probe_wav, read_wav, write_wav};
use crate::engine::AudioEngine;
use crate::error::{MergeError, Result};

/// Built-in engine backed by hound
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEngine;

impl NativeEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioEngine for NativeEngine {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn zero_trim(&self, source: &Path, output: &Path) -> Result<()> {
        let source = source.to_path_buf();
        let output = output.to_path_buf();
        run_blocking("zero-trim", move |cancel| {
            zero_trim_blocking(&source, &output, cancel)
        })
        .await
    }

    async fn overlay(
        &self,
        base: &Path,
        clip: &Path,
        delay: Duration,
        output: &Path,
    ) -> Result<()> {
        let base = base.to_path_buf();
        let clip = clip.to_path_buf();
        let output = output.to_path_buf();
        run_blocking("overlay", move |cancel| {
            overlay_blocking(&base, &clip, delay, &output, cancel)
        })
        .await
    }
}

/// Cancellation signal shared with a blocking job.
///
/// Blocking jobs cannot be aborted, so they poll this before touching the
/// scratch directory.
#[derive(Debug, Clone, Default)]
struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Raises its flag when dropped, including when the awaiting future is aborted.
struct CancelOnDrop(CancelFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

async fn run_blocking<F>(operation: &'static str, work: F) -> Result<()>
where
    F: FnOnce(&CancelFlag) -> Result<()> + Send + 'static,
{
    let cancel = CancelFlag::default();
    let job_flag = cancel.clone();
    let _guard = CancelOnDrop(cancel);

    tokio::task::spawn_blocking(move || work(&job_flag))
        .await
        .map_err(|e| MergeError::Engine {
            operation,
            reason: format!("worker thread failed: {}", e),
            source: Some(Box::new(e)),
        })?
}

fn zero_trim_blocking(source: &Path, output: &Path, cancel: &CancelFlag) -> Result<()> {
    let spec = probe_wav(source)?;
    if cancel.is_cancelled() {
        return Err(MergeError::engine("zero-trim", "cancelled before writing output"));
    }
    let silence = AudioBuffer::new(spec.channels as usize, 0, spec.sample_rate);
    write_wav(output, &silence, spec)?;
    if cancel.is_cancelled() {
        let _ = std::fs::remove_file(output);
        return Err(MergeError::engine("zero-trim", "cancelled while writing output"));
    }
    Ok(())
}

fn overlay_blocking(
    base: &Path,
    clip: &Path,
    delay: Duration,
    output: &Path,
    cancel: &CancelFlag,
) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(MergeError::engine("overlay", "cancelled before start"));
    }
    let (mut mix, spec) = read_wav(base)?;
    let (clip_audio, _) = read_wav(clip)?;

    // Conform the clip to the base so the seed's format carries through
    let clip_audio = clip_audio
        .remix(spec.channels as usize)
        .resample(spec.sample_rate);
    let offset = frames_for(delay, spec.sample_rate);

    debug!(
        base_frames = mix.len(),
        clip_frames = clip_audio.len(),
        offset,
        "mixing clip"
    );

    mix.mix_at(offset, &clip_audio)?;
    debug!(frames = mix.len(), peak = mix.peak(), "mixed clip");

    if cancel.is_cancelled() {
        return Err(MergeError::engine("overlay", "cancelled before writing output"));
    }
    write_wav(output, &mix, spec)?;
    if cancel.is_cancelled() {
        // The owning step is gone, so nothing else will remove this file
        let _ = std::fs::remove_file(output);
        return Err(MergeError::engine("overlay", "cancelled while writing output"));
    }
    Ok(())
}
