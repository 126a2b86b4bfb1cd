use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::block::{Request, StatusCode};
use crate::proxy::Disposition;
use crate::server::message::IntoMessage;
use crate::target::TargetTable;
use crate::utils::serde_hex_bytes;

pub const WRITE_CMD: u32 = 7;

/// Command that issues a write request through a proxy target and waits for
/// its completion.
#[derive(Debug, Serialize, Deserialize)]
pub struct Write {
    target: String,
    offset: u64,
    #[serde(with = "serde_hex_bytes")]
    data: Bytes,
}

impl Write {
    pub fn new(target: String, offset: u64, data: Bytes) -> Self {
        Self {
            target,
            offset,
            data,
        }
    }

    pub async fn execute(self, table: Arc<TargetTable>) -> WriteResponse {
        let target = match table.get(&self.target) {
            Ok(target) => target,
            Err(err) => {
                return WriteResponse::Failure {
                    message: err.to_string(),
                }
            }
        };

        let (request, completion) = Request::write(self.offset, self.data);
        let disposition = target.map(request).await;

        match completion.await {
            Ok(completion) => WriteResponse::Success {
                disposition,
                status: completion.status,
            },
            Err(_) => WriteResponse::Failure {
                message: "request was dropped before completion".to_string(),
            },
        }
    }

    pub fn cmd_id() -> u32 {
        WRITE_CMD
    }
}

impl IntoMessage for Write {
    fn id(&self) -> u32 {
        Self::cmd_id()
    }

    fn payload(&self) -> Option<Bytes> {
        Some(Bytes::from(serde_json::to_string(self).unwrap()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub enum WriteResponse {
    Success {
        disposition: Disposition,
        status: StatusCode,
    },
    Failure {
        message: String,
    },
}

impl IntoMessage for WriteResponse {
    fn id(&self) -> u32 {
        WRITE_CMD
    }

    fn payload(&self) -> Option<Bytes> {
        Some(Bytes::from(serde_json::to_string(self).unwrap()))
    }
}
