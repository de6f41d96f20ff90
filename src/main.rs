use clap::Parser;
use eyre::Result;
use tracing_subscriber::EnvFilter;
use webui_batch_lib::cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    run(Cli::parse()).await
}
