//! Module that contains the Client API for all public commands implemented by blkproxy.
use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    block::Mode,
    cmd::{
        create_target::CreateTargetResponse, ping::PingResponse, read::ReadResponse,
        remove_target::RemoveTargetResponse, show_attr::ShowAttrResponse,
        store_attr::StoreAttrResponse, write::WriteResponse,
    },
};

use self::error::Result;

pub mod error;
pub mod proxy_client;

/// Trait that defines which functions a blkproxy client needs to implement
#[async_trait]
pub trait Client {
    /// Starts a TCP connection with a blkproxy server
    async fn connect(&mut self) -> Result<()>;
    /// Ping command interface
    async fn ping(&mut self) -> Result<PingResponse>;
    /// CreateTarget command interface
    async fn create_target(
        &mut self,
        name: String,
        args: Vec<String>,
        mode: Mode,
    ) -> Result<CreateTargetResponse>;
    /// RemoveTarget command interface
    async fn remove_target(&mut self, name: String) -> Result<RemoveTargetResponse>;
    /// ShowAttr command interface - reads a control attribute
    async fn show_attr(&mut self, path: String, name: String) -> Result<ShowAttrResponse>;
    /// StoreAttr command interface - writes a control attribute
    async fn store_attr(
        &mut self,
        path: String,
        name: String,
        input: String,
    ) -> Result<StoreAttrResponse>;
    /// Read command interface - issues a read request through a target
    async fn read(&mut self, target: String, offset: u64, len: u32) -> Result<ReadResponse>;
    /// Write command interface - issues a write request through a target
    async fn write(&mut self, target: String, offset: u64, data: Bytes) -> Result<WriteResponse>;
}
