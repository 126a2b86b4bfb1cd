//! This trait represents the interface for a block device.
//!
//! Requests carry their own completion channel: whoever ends up owning a
//! [`Request`] is responsible for completing it, exactly once. Completion is
//! enforced by move semantics - completing consumes the request - so a
//! request can never be completed twice, and the device a request is
//! submitted to is the only party that can complete it.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

pub mod in_memory;
pub mod mock;
pub mod registry;

/// Terminal status of a block request. 0 is success; any other value is an
/// implementation defined error status.
pub type StatusCode = i32;

/// Conventional status values. Nothing validates against this list - an
/// injected status can be any i32.
pub mod status {
    use super::StatusCode;

    pub const OK: StatusCode = 0;
    /// Generic I/O failure.
    pub const IOERR: StatusCode = 5;
    /// The request addresses a range outside the device capacity.
    pub const INVAL: StatusCode = 22;
}

pub type SyncBlockDevice = Arc<dyn BlockDevice + Send + Sync + 'static>;

#[async_trait]
pub trait BlockDevice: Debug {
    /// Device capacity in bytes.
    fn capacity(&self) -> u64;

    /// Takes ownership of `request`. From this point the device is solely
    /// responsible for completing it - exactly once, possibly after `submit`
    /// has returned. Failures are reported through the request's completion
    /// status, never as a return value.
    async fn submit(&self, request: Request);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Read,
    Write,
}

/// Access mode requested when opening a device through the
/// [`registry::DeviceRegistry`]. Recorded on the handle; enforcement is the
/// device's own business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    ReadOnly,
    ReadWrite,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::ReadWrite
    }
}

/// What a request carries: reads know how many bytes they want back, writes
/// carry the bytes to store.
#[derive(Debug)]
pub enum Payload {
    Read { len: u32 },
    Write { data: Bytes },
}

/// A single block I/O request against a byte range of a device.
#[derive(Debug)]
pub struct Request {
    offset: u64,
    payload: Payload,
    completion: oneshot::Sender<Completion>,
}

/// The terminal state of a request, delivered through its completion channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub status: StatusCode,
    /// Present only for successfully completed reads.
    pub data: Option<Bytes>,
}

impl Completion {
    pub fn ok() -> Self {
        Self {
            status: status::OK,
            data: None,
        }
    }

    pub fn with_data(data: Bytes) -> Self {
        Self {
            status: status::OK,
            data: Some(data),
        }
    }

    pub fn error(status: StatusCode) -> Self {
        Self { status, data: None }
    }
}

impl Request {
    /// Constructs a read request and the receiver its completion will be
    /// delivered on.
    pub fn read(offset: u64, len: u32) -> (Self, oneshot::Receiver<Completion>) {
        Self::new(offset, Payload::Read { len })
    }

    /// Constructs a write request and the receiver its completion will be
    /// delivered on.
    pub fn write(offset: u64, data: Bytes) -> (Self, oneshot::Receiver<Completion>) {
        Self::new(offset, Payload::Write { data })
    }

    fn new(offset: u64, payload: Payload) -> (Self, oneshot::Receiver<Completion>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                offset,
                payload,
                completion: tx,
            },
            rx,
        )
    }

    pub fn direction(&self) -> Direction {
        match self.payload {
            Payload::Read { .. } => Direction::Read,
            Payload::Write { .. } => Direction::Write,
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of bytes addressed by this request.
    pub fn len(&self) -> u32 {
        match &self.payload {
            Payload::Read { len } => *len,
            Payload::Write { data } => data.len() as u32,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Delivers the terminal state of this request. Consuming `self` is what
    /// makes double completion unrepresentable. If the issuer has dropped its
    /// receiver the completion is discarded - there is nobody left to care.
    pub fn complete(self, completion: Completion) {
        let _ = self.completion.send(completion);
    }

    /// Completes the request with a failure status and no data.
    pub fn fail(self, status: StatusCode) {
        self.complete(Completion::error(status));
    }
}

/// Errors returned by the device [`registry::DeviceRegistry`]
#[derive(Debug, Serialize)]
pub enum Error {
    NotFound { name: String },
    AlreadyRegistered { name: String },
    Logic { reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::{status, Completion, Direction, Request};

    #[test]
    fn read_request_accessors() {
        let (request, _rx) = Request::read(512, 64);
        assert_eq!(request.direction(), Direction::Read);
        assert_eq!(request.offset(), 512);
        assert_eq!(request.len(), 64);
    }

    #[test]
    fn write_request_accessors() {
        let (request, _rx) = Request::write(0, Bytes::from_static(b"abc"));
        assert_eq!(request.direction(), Direction::Write);
        assert_eq!(request.len(), 3);
    }

    #[tokio::test]
    async fn completion_is_delivered() {
        let (request, rx) = Request::read(0, 8);
        request.fail(status::IOERR);

        let completion = rx.await.unwrap();
        assert_eq!(completion, Completion::error(status::IOERR));
    }

    #[test]
    fn completion_with_dropped_receiver_is_a_noop() {
        let (request, rx) = Request::read(0, 8);
        drop(rx);
        request.complete(Completion::ok());
    }
}
