use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::server::message::IntoMessage;

pub const PING_CMD: u32 = 1;

/// Healthcheck command - does nothing besides answering
#[derive(Debug, Serialize, Deserialize)]
pub struct Ping;

impl Ping {
    pub async fn execute(self) -> PingResponse {
        PingResponse {
            message: "PONG".to_string(),
        }
    }

    pub fn cmd_id() -> u32 {
        PING_CMD
    }
}

impl IntoMessage for Ping {
    fn id(&self) -> u32 {
        Self::cmd_id()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PingResponse {
    pub message: String,
}

impl IntoMessage for PingResponse {
    fn id(&self) -> u32 {
        PING_CMD
    }

    fn payload(&self) -> Option<Bytes> {
        Some(Bytes::from(serde_json::to_string(self).unwrap()))
    }
}
