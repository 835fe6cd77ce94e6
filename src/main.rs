use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

/// Options market sentiment dashboard engine
#[derive(Parser)]
#[command(name = "oiscope", version)]
struct Cli {
    /// Backend base URL; overrides and persists the stored value
    #[arg(long)]
    base_url: Option<String>,

    /// Data directory (defaults to the platform data dir)
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    oiscope::init_tracing();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => directories::ProjectDirs::from("", "", "oiscope")
            .context("could not determine platform data directory")?
            .data_dir()
            .to_path_buf(),
    };

    oiscope::run(data_dir, cli.base_url).await?;
    Ok(())
}
