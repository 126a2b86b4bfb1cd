use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::block::{Request, StatusCode};
use crate::proxy::Disposition;
use crate::server::message::IntoMessage;
use crate::target::TargetTable;
use crate::utils::serde_opt_hex_bytes;

pub const READ_CMD: u32 = 6;

/// Command that issues a read request through a proxy target and waits for
/// its completion.
///
/// The completion always arrives through the request's own channel, whether
/// the target forwarded the request or failed it on the spot - the response
/// carries the [`Disposition`] so callers can tell which happened.
#[derive(Debug, Serialize, Deserialize)]
pub struct Read {
    target: String,
    offset: u64,
    len: u32,
}

impl Read {
    pub fn new(target: String, offset: u64, len: u32) -> Self {
        Self {
            target,
            offset,
            len,
        }
    }

    pub async fn execute(self, table: Arc<TargetTable>) -> ReadResponse {
        let target = match table.get(&self.target) {
            Ok(target) => target,
            Err(err) => {
                return ReadResponse::Failure {
                    message: err.to_string(),
                }
            }
        };

        let (request, completion) = Request::read(self.offset, self.len);
        let disposition = target.map(request).await;

        match completion.await {
            Ok(completion) => ReadResponse::Success {
                disposition,
                status: completion.status,
                data: completion.data,
            },
            Err(_) => ReadResponse::Failure {
                message: "request was dropped before completion".to_string(),
            },
        }
    }

    pub fn cmd_id() -> u32 {
        READ_CMD
    }
}

impl IntoMessage for Read {
    fn id(&self) -> u32 {
        Self::cmd_id()
    }

    fn payload(&self) -> Option<Bytes> {
        Some(Bytes::from(serde_json::to_string(self).unwrap()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub enum ReadResponse {
    Success {
        disposition: Disposition,
        status: StatusCode,
        #[serde(with = "serde_opt_hex_bytes")]
        data: Option<Bytes>,
    },
    Failure {
        message: String,
    },
}

impl IntoMessage for ReadResponse {
    fn id(&self) -> u32 {
        READ_CMD
    }

    fn payload(&self) -> Option<Bytes> {
        Some(Bytes::from(serde_json::to_string(self).unwrap()))
    }
}
