use blkproxy::block::Mode;
use blkproxy::client::{proxy_client::ProxyClient, Client};
use blkproxy::proxy::{CONTROL_ENDPOINT_NAME, ERROR_CODE_ATTR};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "blkproxy-client")]
#[command(about = "blkproxy-client tcp client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command()]
    Ping {
        #[arg(short)]
        port: u16,
    },
    /// Creates a proxy target named NAME over the registered device DEVICE
    CreateTarget {
        #[arg(short)]
        port: u16,
        #[arg(long)]
        name: String,
        #[arg(long)]
        device: String,
    },
    /// Reads the error_code attribute of the target proxying DEVICE
    ShowFault {
        #[arg(short)]
        port: u16,
        #[arg(long)]
        device: String,
    },
    /// Stores CODE into the error_code attribute of the target proxying DEVICE
    StoreFault {
        #[arg(short)]
        port: u16,
        #[arg(long)]
        device: String,
        #[arg(long)]
        code: i32,
    },
}

fn attr_path(device: &str) -> String {
    format!("{}/{}", device, CONTROL_ENDPOINT_NAME)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    match args.command {
        Commands::Ping { port } => {
            let mut client = ProxyClient::new(format!("127.0.0.1:{}", port));
            client.connect().await?;
            let response = client.ping().await?;
            println!("{}", response.message);
        }
        Commands::CreateTarget { port, name, device } => {
            let mut client = ProxyClient::new(format!("127.0.0.1:{}", port));
            client.connect().await?;
            let response = client
                .create_target(name, vec![device], Mode::ReadWrite)
                .await?;
            println!("{}", serde_json::to_string(&response)?);
        }
        Commands::ShowFault { port, device } => {
            let mut client = ProxyClient::new(format!("127.0.0.1:{}", port));
            client.connect().await?;
            let response = client
                .show_attr(attr_path(&device), ERROR_CODE_ATTR.to_string())
                .await?;
            println!("{}", serde_json::to_string(&response)?);
        }
        Commands::StoreFault { port, device, code } => {
            let mut client = ProxyClient::new(format!("127.0.0.1:{}", port));
            client.connect().await?;
            let response = client
                .store_attr(
                    attr_path(&device),
                    ERROR_CODE_ATTR.to_string(),
                    format!("{}\n", code),
                )
                .await?;
            println!("{}", serde_json::to_string(&response)?);
        }
    }

    Ok(())
}
