//! CLI Module
//!
//! Command-line interface: `aclip-merge <inputFile> <destDir>`.

pub mod commands;

use clap::Parser;
use std::path::PathBuf;

/// Usage line printed when the destination is missing
pub const USAGE: &str = "aclip-merge <inputFile> <destDir>";

/// Merge time-offset audio takes into one track per actor
#[derive(Parser, Debug)]
#[command(name = "aclip-merge")]
#[command(about, long_about = None)]
pub struct Cli {
    /// Clip manifest (JSON)
    pub input: Option<PathBuf>,

    /// Existing directory that receives one file per actor
    pub dest: Option<PathBuf>,
}
