//! This file contains 2 things
//!  1. the TCP listener implementation
//!    - It accepts tcp connections
//!    - tries to parse a [`Message`] out of the connection
//!    - tries to construct a [`Command`] out of the parsed Message
//!    - executes the command against the [`TargetTable`]
//!    - writes the response back to the client
//!  2. The construction of the device registry / target table from a config file
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::{
    io::AsyncWriteExt,
    net::{TcpListener, TcpStream},
};
use tracing::{event, instrument, Level};

use crate::block::in_memory::InMemory;
use crate::block::registry::DeviceRegistry;
use crate::block::SyncBlockDevice;
use crate::cmd::Command;
use crate::control::ControlRegistry;
use crate::target::TargetTable;

use self::config::{Config, DeviceBackend};
use self::message::Message;

pub mod config;
pub mod message;

pub struct Server {
    listener: TcpListener,
    table: Arc<TargetTable>,
}

impl Server {
    /// Builds a [`Server`] from a json config file: binds the listener and
    /// registers every declared device. Targets are created at runtime
    /// through [`crate::cmd::create_target`].
    pub async fn from_config(path: PathBuf) -> anyhow::Result<Self> {
        let c = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&c)?;

        let devices = DeviceRegistry::default();
        for device in config.devices {
            let backend: SyncBlockDevice = match device.backend {
                DeviceBackend::InMemory { capacity } => {
                    Arc::new(InMemory::with_capacity(capacity))
                }
            };
            devices.register(&device.name, backend)?;
            event!(Level::INFO, name = %device.name, "device registered");
        }

        let listener = TcpListener::bind(format!("127.0.0.1:{}", config.port)).await?;
        let table = Arc::new(TargetTable::new(devices, ControlRegistry::default()));

        Ok(Self { listener, table })
    }

    /// Accepts connections until the provided `shutdown` future resolves.
    pub async fn run<F: Future>(&mut self, shutdown: F) -> anyhow::Result<()> {
        event!(Level::INFO, "Listener started");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    event!(Level::INFO, "Shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (tcp_stream, _) = accepted?;
                    let table = self.table.clone();
                    tokio::spawn(handle_connection(tcp_stream, table));
                }
            }
        }
    }
}

#[instrument(level = "debug", skip(tcp_stream, table))]
async fn handle_connection(
    mut tcp_stream: TcpStream,
    table: Arc<TargetTable>,
) -> anyhow::Result<()> {
    loop {
        let message = Message::try_from_async_read(&mut tcp_stream).await?;
        let cmd = Command::try_from_message(message)?;
        let response = cmd.execute(table.clone()).await.serialize();

        tcp_stream.write_all(&response).await?;
    }
}
