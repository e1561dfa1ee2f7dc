use clap::Parser;
use dcon_cli::Cli;
use dcon_console::{init_tracing, run_cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run_cli(cli).await
}
