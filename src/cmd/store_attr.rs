use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::server::message::IntoMessage;
use crate::target::TargetTable;

pub const STORE_ATTR_CMD: u32 = 5;

/// Command that writes a control attribute. A rejected store (input that
/// fails the attribute's parse contract) reports a failure and leaves the
/// stored value untouched.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoreAttr {
    path: String,
    name: String,
    input: String,
}

impl StoreAttr {
    pub fn new(path: String, name: String, input: String) -> Self {
        Self { path, name, input }
    }

    pub async fn execute(self, table: Arc<TargetTable>) -> StoreAttrResponse {
        match table.control().store(&self.path, &self.name, &self.input) {
            Ok(consumed) => StoreAttrResponse::Success { consumed },
            Err(err) => StoreAttrResponse::Failure {
                message: Error::from(err).to_string(),
            },
        }
    }

    pub fn cmd_id() -> u32 {
        STORE_ATTR_CMD
    }
}

impl IntoMessage for StoreAttr {
    fn id(&self) -> u32 {
        Self::cmd_id()
    }

    fn payload(&self) -> Option<Bytes> {
        Some(Bytes::from(serde_json::to_string(self).unwrap()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub enum StoreAttrResponse {
    Success { consumed: usize },
    Failure { message: String },
}

impl IntoMessage for StoreAttrResponse {
    fn id(&self) -> u32 {
        STORE_ATTR_CMD
    }

    fn payload(&self) -> Option<Bytes> {
        Some(Bytes::from(serde_json::to_string(self).unwrap()))
    }
}
