//! Beatframe - narrative beat to image-generation prompt compiler
//!
//! Usage:
//!   beatframe compile episode.yaml   Compile every beat of an episode
//!   beatframe time episode.yaml      Show resolved time of day per scene
//!   beatframe show <story> <n>       Show a stored result set
//!   beatframe schema episode         JSON Schema for input documents
//!   beatframe --help                 Show all commands

use anyhow::Result;
use clap::Parser;

use beatframe::cli::output::{DetailLevel, OutputMode};
use beatframe::cli::Cli;
use beatframe::init::AppContext;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Tracing to stderr so stdout stays clean for --json
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("beatframe=info".parse()?),
        )
        .init();

    let mode = OutputMode::from_flags(cli.json, cli.md);
    let detail = DetailLevel::from_flags(cli.brief, cli.full);

    let ctx = AppContext::new(
        cli.data_path.clone(),
        cli.config.as_deref(),
        cli.bible.as_deref(),
    )?;
    beatframe::cli::execute(&cli, &ctx, mode, detail).await?;

    Ok(())
}
