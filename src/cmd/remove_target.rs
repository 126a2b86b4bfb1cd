use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::server::message::IntoMessage;
use crate::target::TargetTable;

pub const REMOVE_TARGET_CMD: u32 = 3;

/// Command that destroys a live proxy target, tearing down its control
/// endpoint and releasing its device handle.
#[derive(Debug, Serialize, Deserialize)]
pub struct RemoveTarget {
    name: String,
}

impl RemoveTarget {
    pub fn new(name: String) -> Self {
        Self { name }
    }

    pub async fn execute(self, table: Arc<TargetTable>) -> RemoveTargetResponse {
        match table.remove(&self.name) {
            Ok(()) => RemoveTargetResponse::Success {
                message: "Ok".to_string(),
            },
            Err(err) => RemoveTargetResponse::Failure {
                message: err.to_string(),
            },
        }
    }

    pub fn cmd_id() -> u32 {
        REMOVE_TARGET_CMD
    }
}

impl IntoMessage for RemoveTarget {
    fn id(&self) -> u32 {
        Self::cmd_id()
    }

    fn payload(&self) -> Option<Bytes> {
        Some(Bytes::from(serde_json::to_string(self).unwrap()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub enum RemoveTargetResponse {
    Success { message: String },
    Failure { message: String },
}

impl IntoMessage for RemoveTargetResponse {
    fn id(&self) -> u32 {
        REMOVE_TARGET_CMD
    }

    fn payload(&self) -> Option<Bytes> {
        Some(Bytes::from(serde_json::to_string(self).unwrap()))
    }
}
