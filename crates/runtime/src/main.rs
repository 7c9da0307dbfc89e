#![deny(clippy::all, clippy::pedantic)]

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = runtime::Args::parse();
    let summary = runtime::run(&args)?;
    if summary.frames_dropped > 0 {
        anyhow::bail!("{} of {} frames were dropped", summary.frames_dropped, args.frames);
    }
    Ok(())
}
