use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::server::message::IntoMessage;
use crate::target::TargetTable;

pub const SHOW_ATTR_CMD: u32 = 4;

/// Command that reads a control attribute, e.g. `d0/proxy_target` /
/// `error_code`. The returned value is the attribute's textual rendering,
/// trailing newline included.
#[derive(Debug, Serialize, Deserialize)]
pub struct ShowAttr {
    path: String,
    name: String,
}

impl ShowAttr {
    pub fn new(path: String, name: String) -> Self {
        Self { path, name }
    }

    pub async fn execute(self, table: Arc<TargetTable>) -> ShowAttrResponse {
        match table.control().show(&self.path, &self.name) {
            Ok(value) => ShowAttrResponse::Success { value },
            Err(err) => ShowAttrResponse::Failure {
                message: Error::from(err).to_string(),
            },
        }
    }

    pub fn cmd_id() -> u32 {
        SHOW_ATTR_CMD
    }
}

impl IntoMessage for ShowAttr {
    fn id(&self) -> u32 {
        Self::cmd_id()
    }

    fn payload(&self) -> Option<Bytes> {
        Some(Bytes::from(serde_json::to_string(self).unwrap()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub enum ShowAttrResponse {
    Success { value: String },
    Failure { message: String },
}

impl IntoMessage for ShowAttrResponse {
    fn id(&self) -> u32 {
        SHOW_ATTR_CMD
    }

    fn payload(&self) -> Option<Bytes> {
        Some(Bytes::from(serde_json::to_string(self).unwrap()))
    }
}
