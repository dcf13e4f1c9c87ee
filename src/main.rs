//! aclip-merge CLI
//!
//! Merges the clips of a manifest into one track per actor.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use aclip_merge::cli::{commands, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries only the usage line and output paths
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    commands::execute(cli).await.map_err(|e| {
        for hint in e.recovery_suggestions() {
            eprintln!("hint: {}", hint);
        }
        let code = e.error_code();
        anyhow::Error::new(e).context(format!("merge failed [{}]", code))
    })?;

    Ok(())
}
