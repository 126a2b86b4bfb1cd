//! This module contains the definition of a [`Message`] - the smallest unit of parseable bytes built for the blkproxy [`crate::server::Server`].
//!
//! When serialized, a [`Message`] looks like the following:
//!
//! [4 bytes - cmd id][4 bytes - length of payload][payload]
use std::mem::size_of;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::instrument;

use crate::error::{Error, InvalidRequest, Result};

/// Kind of arbitrary but let's make sure a single connection can't consume more
/// than 1Mb of memory...
pub const MAX_MESSAGE_SIZE: u32 = 1024 * 1024;

/// The unit of the protocol built on top of TCP that this server uses.
#[derive(Debug)]
pub struct Message {
    /// Used as a way of identifying the layout of the payload for deserialization
    pub id: u32,
    /// the request/response payload
    pub payload: Option<Bytes>,
}

/// A trait that has to be implemented for any structs/enums that can be transformed into a [`Message`]
pub trait IntoMessage {
    /// Same as [`Message::id`]
    fn id(&self) -> u32;
    /// Same as [`Message::payload`]
    fn payload(&self) -> Option<Bytes> {
        None
    }
}

impl Message {
    /// Constructs a new [`Message`] with the given id and payload
    pub fn new(id: u32, payload: Option<Bytes>) -> Self {
        Self { id, payload }
    }

    /// This function tries to construct a [`Message`] by reading bytes from the provided [`AsyncRead`] source
    /// # Errors
    /// This function returns errors in the following cases
    ///  1. The payload size is bigger than [`MAX_MESSAGE_SIZE`]
    ///  2. The message is somehow malformed (eg: less bytes were provided than the length received)
    #[instrument(level = "debug", skip(reader))]
    pub async fn try_from_async_read<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self> {
        let id = reader.read_u32().await?;
        let payload_length = reader.read_u32().await?;

        let payload = if payload_length > 0 {
            if payload_length > MAX_MESSAGE_SIZE {
                return Err(Error::InvalidRequest(InvalidRequest::MaxMessageSizeExceeded {
                    max: MAX_MESSAGE_SIZE,
                    got: payload_length,
                }));
            }
            let mut buf = vec![0u8; payload_length as usize];
            reader.read_exact(&mut buf).await?;
            Some(buf.into())
        } else {
            None
        };

        Ok(Self { id, payload })
    }

    /// Serializes a [`Message`] struct into it's serialized format (see top level comment for format)
    pub fn serialize(self) -> Bytes {
        let payload_len = self.payload.as_ref().map_or(0, |payload| payload.len());
        let mut buf = BytesMut::with_capacity(payload_len + 2 * size_of::<u32>());

        buf.put_u32(self.id);
        buf.put_u32(payload_len as u32);
        if let Some(payload) = self.payload {
            buf.put(payload);
        }

        buf.freeze()
    }
}

impl<M: IntoMessage> From<M> for Message {
    fn from(v: M) -> Self {
        Self {
            id: v.id(),
            payload: v.payload(),
        }
    }
}
