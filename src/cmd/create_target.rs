use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::block::Mode;
use crate::server::message::IntoMessage;
use crate::target::TargetTable;

pub const CREATE_TARGET_CMD: u32 = 2;

/// Command that constructs a new proxy target over a registered device.
///
/// `args` is the target's raw argument list - for a proxy target that is
/// exactly one element, the device name. Argument validation belongs to the
/// target's own constructor, not here.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTarget {
    name: String,
    args: Vec<String>,
    mode: Mode,
}

impl CreateTarget {
    pub fn new(name: String, args: Vec<String>, mode: Mode) -> Self {
        Self { name, args, mode }
    }

    pub async fn execute(self, table: Arc<TargetTable>) -> CreateTargetResponse {
        match table.create(&self.name, &self.args, self.mode) {
            Ok(()) => CreateTargetResponse::Success {
                message: "Ok".to_string(),
            },
            Err(err) => CreateTargetResponse::Failure {
                message: err.to_string(),
            },
        }
    }

    pub fn cmd_id() -> u32 {
        CREATE_TARGET_CMD
    }
}

impl IntoMessage for CreateTarget {
    fn id(&self) -> u32 {
        Self::cmd_id()
    }

    fn payload(&self) -> Option<Bytes> {
        Some(Bytes::from(serde_json::to_string(self).unwrap()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub enum CreateTargetResponse {
    Success { message: String },
    Failure { message: String },
}

impl IntoMessage for CreateTargetResponse {
    fn id(&self) -> u32 {
        CREATE_TARGET_CMD
    }

    fn payload(&self) -> Option<Bytes> {
        Some(Bytes::from(serde_json::to_string(self).unwrap()))
    }
}
