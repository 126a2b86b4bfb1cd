//! A concrete [`Client`] implementation for blkproxy
use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::block::Mode;
use crate::cmd;
use crate::cmd::create_target::CreateTargetResponse;
use crate::cmd::ping::PingResponse;
use crate::cmd::read::ReadResponse;
use crate::cmd::remove_target::RemoveTargetResponse;
use crate::cmd::show_attr::ShowAttrResponse;
use crate::cmd::store_attr::StoreAttrResponse;
use crate::cmd::write::WriteResponse;
use crate::server::message::{IntoMessage, Message};

use super::error::{Error, Result};
use super::Client;

/// ProxyClient handle
pub struct ProxyClient {
    /// state stores the [`ProxyClientState`] of this implementation
    state: ProxyClientState,
}

/// A [`ProxyClient`] can either be Connected or Disconnected
enum ProxyClientState {
    Disconnected { addr: String },
    Connected { connection: TcpStream },
}

impl ProxyClient {
    pub fn new(addr: String) -> Self {
        Self {
            state: ProxyClientState::Disconnected { addr },
        }
    }

    fn get_conn_mut(&mut self) -> Result<&mut TcpStream> {
        match &mut self.state {
            ProxyClientState::Connected { connection } => Ok(connection),
            ProxyClientState::Disconnected { .. } => Err(Error::Logic {
                reason: "You must call `connect` before any other method for ProxyClient"
                    .to_string(),
            }),
        }
    }

    /// Sends one command and decodes the typed response it answers with.
    async fn round_trip<C: IntoMessage, R: DeserializeOwned>(&mut self, cmd: C) -> Result<R> {
        let request = Message::from(cmd).serialize();

        let conn = self.get_conn_mut()?;
        conn.write_all(&request).await?;

        let response = Message::try_from_async_read(conn).await?;
        let payload = response.payload.ok_or(Error::InvalidServerResponse {
            reason: "empty response payload".to_string(),
        })?;
        Ok(serde_json::from_slice(&payload)?)
    }
}

#[async_trait]
impl Client for ProxyClient {
    async fn connect(&mut self) -> Result<()> {
        match &self.state {
            ProxyClientState::Disconnected { addr } => {
                let connection =
                    TcpStream::connect(addr)
                        .await
                        .map_err(|e| Error::UnableToConnect {
                            reason: e.to_string(),
                        })?;
                self.state = ProxyClientState::Connected { connection };
            }
            ProxyClientState::Connected { .. } => {
                return Err(Error::Logic {
                    reason: "called `connect` twice on a ProxyClient".to_string(),
                });
            }
        }

        Ok(())
    }

    async fn ping(&mut self) -> Result<PingResponse> {
        self.round_trip(cmd::ping::Ping).await
    }

    async fn create_target(
        &mut self,
        name: String,
        args: Vec<String>,
        mode: Mode,
    ) -> Result<CreateTargetResponse> {
        self.round_trip(cmd::create_target::CreateTarget::new(name, args, mode))
            .await
    }

    async fn remove_target(&mut self, name: String) -> Result<RemoveTargetResponse> {
        self.round_trip(cmd::remove_target::RemoveTarget::new(name))
            .await
    }

    async fn show_attr(&mut self, path: String, name: String) -> Result<ShowAttrResponse> {
        self.round_trip(cmd::show_attr::ShowAttr::new(path, name))
            .await
    }

    async fn store_attr(
        &mut self,
        path: String,
        name: String,
        input: String,
    ) -> Result<StoreAttrResponse> {
        self.round_trip(cmd::store_attr::StoreAttr::new(path, name, input))
            .await
    }

    async fn read(&mut self, target: String, offset: u64, len: u32) -> Result<ReadResponse> {
        self.round_trip(cmd::read::Read::new(target, offset, len))
            .await
    }

    async fn write(&mut self, target: String, offset: u64, data: Bytes) -> Result<WriteResponse> {
        self.round_trip(cmd::write::Write::new(target, offset, data))
            .await
    }
}
