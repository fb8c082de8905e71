use clap::Parser;
use drawings_server::DrawingsServer;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = cli::Cli::parse();
    let config = cli.load_config()?;
    DrawingsServer::open(config)?.serve().await?;
    Ok(())
}
