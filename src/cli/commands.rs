//! CLI Command Implementations

use tracing::info;

use crate::cli::{Cli, USAGE};
use crate::config::MergeConfig;
use crate::error::Result;
use crate::pipeline::merge_manifest;

/// What a CLI invocation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Arguments were incomplete; the usage line was printed
    Usage,
    /// The merge ran and wrote this many outputs
    Merged { outputs: usize },
}

/// Run the command line.
///
/// A missing destination is not an error: the usage line is printed and
/// nothing is read or written.
pub async fn execute(cli: Cli) -> Result<Outcome> {
    let (input, dest) = match (cli.input, cli.dest) {
        (Some(input), Some(dest)) => (input, dest),
        _ => {
            println!("{}", USAGE);
            return Ok(Outcome::Usage);
        }
    };

    let config = MergeConfig::from_env()?;
    info!(
        "aclip-merge v{}: {} -> {}",
        env!("CARGO_PKG_VERSION"),
        input.display(),
        dest.display()
    );

    let report = merge_manifest(&input, &dest, &config).await?;

    for output in &report.outputs {
        println!("{}", output.display());
    }
    info!(
        clips = report.clips,
        actors = report.groups,
        "merge complete"
    );

    Ok(Outcome::Merged {
        outputs: report.outputs.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_parse_both_arguments() {
        let cli = Cli::try_parse_from(["aclip-merge", "takes.json", "/out"]).unwrap();
        assert_eq!(cli.input, Some(PathBuf::from("takes.json")));
        assert_eq!(cli.dest, Some(PathBuf::from("/out")));
    }

    #[test]
    fn test_extra_arguments_are_rejected() {
        assert!(Cli::try_parse_from(["aclip-merge", "a.json", "/out", "extra"]).is_err());
    }

    #[test]
    fn test_version_flag_is_not_accepted() {
        assert!(Cli::try_parse_from(["aclip-merge", "--version"]).is_err());
    }

    #[tokio::test]
    async fn test_missing_destination_prints_usage_only() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("never-read.json");
        let cli = Cli::try_parse_from([std::ffi::OsStr::new("aclip-merge"), missing.as_os_str()]).unwrap();

        let outcome = execute(cli).await.unwrap();

        assert_eq!(outcome, Outcome::Usage);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_no_arguments_prints_usage() {
        let cli = Cli::try_parse_from(["aclip-merge"]).unwrap();
        assert_eq!(execute(cli).await.unwrap(), Outcome::Usage);
    }
}
