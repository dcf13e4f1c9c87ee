//! FFmpeg-backed engine.
//!
//! Each operation runs one ffmpeg child process. Children are spawned with
//! `kill_on_drop`, so a chain that gets aborted takes its ffmpeg process down
//! with it instead of leaving it writing into a removed scratch directory.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::engine::AudioEngine;
use crate::error::{MergeError, Result};

/// Lines of ffmpeg stderr kept in error messages.
const STDERR_TAIL_LINES: usize = 8;

/// Engine that shells out to ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    program: PathBuf,
}

impl FfmpegEngine {
    /// Create an engine invoking `program` (usually just `ffmpeg`).
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, operation: &'static str, args: Vec<OsString>) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!("Running FFmpeg: {:?}", cmd);

        let output = cmd
            .output()
            .await
            .map_err(|e| MergeError::EngineUnavailable {
                program: self.program.display().to_string(),
                source: e,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MergeError::engine(
                operation,
                format!(
                    "ffmpeg exited with code {:?}: {}",
                    output.status.code(),
                    stderr_tail(&stderr)
                ),
            ));
        }

        Ok(())
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl AudioEngine for FfmpegEngine {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn zero_trim(&self, source: &Path, output: &Path) -> Result<()> {
        self.run("zero-trim", zero_trim_args(source, output)).await
    }

    async fn overlay(
        &self,
        base: &Path,
        clip: &Path,
        delay: Duration,
        output: &Path,
    ) -> Result<()> {
        self.run("overlay", overlay_args(base, clip, delay, output))
            .await
    }
}

/// Arguments for trimming `source` down to zero samples.
pub fn zero_trim_args(source: &Path, output: &Path) -> Vec<OsString> {
    let mut args = common_args();
    args.push("-i".into());
    args.push(source.into());
    args.push("-af".into());
    args.push("atrim=end_sample=0".into());
    args.push(output.into());
    args
}

/// Arguments for delaying `clip` and mixing it onto `base`.
///
/// amix runs with `normalize=0` so levels add up instead of being halved,
/// and `dropout_transition=0` so the base does not fade when the clip ends.
pub fn overlay_args(base: &Path, clip: &Path, delay: Duration, output: &Path) -> Vec<OsString> {
    let graph = format!(
        "[1]adelay=delays={}:all=1[clip];\
         [0][clip]amix=inputs=2:duration=longest:dropout_transition=0:normalize=0[out]",
        format_millis(delay)
    );

    let mut args = common_args();
    args.push("-i".into());
    args.push(base.into());
    args.push("-i".into());
    args.push(clip.into());
    args.push("-filter_complex".into());
    args.push(graph.into());
    args.push("-map".into());
    args.push("[out]".into());
    args.push(output.into());
    args
}

fn common_args() -> Vec<OsString> {
    ["-hide_banner", "-nostdin", "-loglevel", "error", "-y"]
        .into_iter()
        .map(OsString::from)
        .collect()
}

/// Render a delay as adelay milliseconds, keeping microsecond precision.
fn format_millis(delay: Duration) -> String {
    let micros = delay.as_micros();
    if micros % 1000 == 0 {
        format!("{}", micros / 1000)
    } else {
        format!("{}.{:03}", micros / 1000, micros % 1000)
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_zero_trim_args() {
        let args = zero_trim_args(Path::new("/in/a1.wav"), Path::new("/tmp/x/tmp0.wav"));
        assert_eq!(
            strings(&args),
            vec![
                "-hide_banner",
                "-nostdin",
                "-loglevel",
                "error",
                "-y",
                "-i",
                "/in/a1.wav",
                "-af",
                "atrim=end_sample=0",
                "/tmp/x/tmp0.wav",
            ]
        );
    }

    #[test]
    fn test_overlay_args_carry_delay_and_inputs_in_order() {
        let args = overlay_args(
            Path::new("/tmp/x/tmp0.wav"),
            Path::new("/in/a2.wav"),
            Duration::from_millis(2000),
            Path::new("/tmp/x/tmp1.wav"),
        );
        let args = strings(&args);

        let inputs: Vec<&String> = args
            .iter()
            .enumerate()
            .filter(|(i, _)| *i > 0 && args[i - 1] == "-i")
            .map(|(_, a)| a)
            .collect();
        assert_eq!(inputs, vec!["/tmp/x/tmp0.wav", "/in/a2.wav"]);

        let graph = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];
        assert!(graph.contains("adelay=delays=2000:all=1"));
        assert!(graph.contains("normalize=0"));
        assert_eq!(args.last().unwrap(), "/tmp/x/tmp1.wav");
    }

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(Duration::ZERO), "0");
        assert_eq!(format_millis(Duration::from_millis(500)), "500");
        assert_eq!(format_millis(Duration::from_micros(1500)), "1.500");
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let stderr: String = (0..20).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(&stderr);
        assert!(tail.starts_with("line 12"));
        assert!(tail.ends_with("line 19"));
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let engine = FfmpegEngine::new("/nonexistent/bin/ffmpeg");
        let result = engine
            .zero_trim(Path::new("a.wav"), Path::new("b.wav"))
            .await;
        assert!(matches!(result, Err(MergeError::EngineUnavailable { .. })));
    }
}
