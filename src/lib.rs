//! aclip-merge - Per-Actor Audio Take Merging
//!
//! Reads a manifest of time-offset clips and produces one mixed track per
//! actor.
//!
//! # Architecture
//!
//! - `manifest`: clip list loading and grouping by actor
//! - `scratch`: process-scoped temp directory and self-deleting artifacts
//! - `engine`: the zero-trim/overlay capability and its backends
//! - `merge`: sequential fold per actor, concurrent across actors
//! - `publish`: copies final tracks to the destination
//! - `pipeline`: wires the above into one run

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod merge;
pub mod pipeline;
pub mod publish;
pub mod scratch;

pub use config::{EngineKind, MergeConfig};
pub use error::{ErrorKind, MergeError, Result};
pub use pipeline::{merge_manifest, merge_with_engine, MergeReport};
