use std::path::PathBuf;

use clap::Parser;
use blkproxy::server::Server;

#[derive(Debug, Parser)]
#[command(name = "blkproxy-server")]
#[command(about = "blkproxy-server tcp server", long_about = None)]
struct Cli {
    #[arg(long)]
    config_path: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    tracing_subscriber::fmt::init();

    let mut server = Server::from_config(args.config_path).await?;
    server.run(tokio::signal::ctrl_c()).await?;

    Ok(())
}
