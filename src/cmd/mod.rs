//! Module that contains all commands implemented by blkproxy.
//!
//! # Design principals
//! Commands have 2 responsibilities:
//!  1. Parse request params (basically serde_json calls)
//!  2. Construct responses that are sent back to callers
//!
//! Everything else should be delegated to the [`crate::target`] layer or other modules.
pub mod create_target;
pub mod ping;
pub mod read;
pub mod remove_target;
pub mod show_attr;
pub mod store_attr;
pub mod write;

use std::sync::Arc;

use create_target::CreateTarget as CreateTargetCommand;
use ping::Ping as PingCommand;
use read::Read as ReadCommand;
use remove_target::RemoveTarget as RemoveTargetCommand;
use show_attr::ShowAttr as ShowAttrCommand;
use store_attr::StoreAttr as StoreAttrCommand;
use tracing::{event, instrument, Level};
use write::Write as WriteCommand;

use crate::{
    error::{Error, InvalidRequest, Result},
    server::message::Message,
    target::TargetTable,
};

/// Command definition - this enum contains all commands implemented by blkproxy.
#[derive(Debug)]
pub enum Command {
    Ping(PingCommand),
    CreateTarget(CreateTargetCommand),
    RemoveTarget(RemoveTargetCommand),
    ShowAttr(ShowAttrCommand),
    StoreAttr(StoreAttrCommand),
    Read(ReadCommand),
    Write(WriteCommand),
}

/// macro that tries to construct a specific [`Command`] from a [`Message`]
macro_rules! try_from_message_with_payload {
    ($message:expr, $t:ident) => {{
        (|| {
            if $message.id != $t::cmd_id() {
                return Err(Error::InvalidRequest(
                    InvalidRequest::UnableToConstructCommandFromMessage {
                        expected_id: $t::cmd_id(),
                        got: $message.id,
                    },
                ));
            }

            if let Some(payload) = $message.payload {
                let s: $t = serde_json::from_slice(&payload).map_err(|e| {
                    Error::InvalidRequest(InvalidRequest::InvalidJsonPayload(e.to_string()))
                })?;
                Ok(s)
            } else {
                return Err(Error::InvalidRequest(InvalidRequest::EmptyMessagePayload));
            }
        })()
    }};
}

impl Command {
    /// Executes a given command by forwarding the [`TargetTable`] instance provided
    #[instrument(name = "cmd::execute", level = "info", skip(table))]
    pub async fn execute(self, table: Arc<TargetTable>) -> Message {
        match self {
            Command::Ping(cmd) => cmd.execute().await.into(),
            Command::CreateTarget(cmd) => cmd.execute(table).await.into(),
            Command::RemoveTarget(cmd) => cmd.execute(table).await.into(),
            Command::ShowAttr(cmd) => cmd.execute(table).await.into(),
            Command::StoreAttr(cmd) => cmd.execute(table).await.into(),
            Command::Read(cmd) => cmd.execute(table).await.into(),
            Command::Write(cmd) => cmd.execute(table).await.into(),
        }
    }

    /// Tries to construct a [`Command`] from the provided [`Message`]
    ///
    /// # Errors
    /// returns an error if the payload doesn't conform with the specified [`Command`]
    #[instrument(level = "info")]
    pub fn try_from_message(message: Message) -> Result<Command> {
        match message.id {
            ping::PING_CMD => Ok(Command::Ping(ping::Ping)),
            create_target::CREATE_TARGET_CMD => Ok(Command::CreateTarget(
                try_from_message_with_payload!(message, CreateTargetCommand)?,
            )),
            remove_target::REMOVE_TARGET_CMD => Ok(Command::RemoveTarget(
                try_from_message_with_payload!(message, RemoveTargetCommand)?,
            )),
            show_attr::SHOW_ATTR_CMD => Ok(Command::ShowAttr(try_from_message_with_payload!(
                message,
                ShowAttrCommand
            )?)),
            store_attr::STORE_ATTR_CMD => Ok(Command::StoreAttr(try_from_message_with_payload!(
                message,
                StoreAttrCommand
            )?)),
            read::READ_CMD => Ok(Command::Read(try_from_message_with_payload!(
                message,
                ReadCommand
            )?)),
            write::WRITE_CMD => Ok(Command::Write(try_from_message_with_payload!(
                message,
                WriteCommand
            )?)),
            _ => {
                event!(Level::WARN, "Unrecognized command: {}", message.id);
                Err(Error::InvalidRequest(InvalidRequest::UnrecognizedCommand {
                    id: message.id,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::Command;
    use crate::block::Mode;
    use crate::cmd::create_target::CreateTarget;
    use crate::cmd::show_attr::ShowAttr;
    use crate::error::{Error, InvalidRequest};
    use crate::server::message::Message;

    #[test]
    fn invalid_request_mixed_message_id() {
        let show_cmd = ShowAttr::new("d0/proxy_target".to_string(), "error_code".to_string());
        let mut message = Message::from(show_cmd);
        message.id = CreateTarget::cmd_id();

        let err = Command::try_from_message(message).err().unwrap();
        match err {
            Error::InvalidRequest(InvalidRequest::InvalidJsonPayload(_)) => {}
            _ => {
                panic!("Unexpected error: {}", err);
            }
        }
    }

    #[test]
    fn missing_payload_is_rejected() {
        let message = Message::new(CreateTarget::cmd_id(), None);
        let err = Command::try_from_message(message).err().unwrap();
        assert!(matches!(
            err,
            Error::InvalidRequest(InvalidRequest::EmptyMessagePayload)
        ));
    }

    #[test]
    fn unrecognized_command_is_rejected() {
        let message = Message::new(9999, Some(Bytes::from_static(b"{}")));
        let err = Command::try_from_message(message).err().unwrap();
        assert!(matches!(
            err,
            Error::InvalidRequest(InvalidRequest::UnrecognizedCommand { id: 9999 })
        ));
    }

    #[test]
    fn create_target_round_trips_through_message() {
        let cmd = CreateTarget::new(
            "t0".to_string(),
            vec!["d0".to_string()],
            Mode::ReadWrite,
        );
        let message = Message::from(cmd);

        let parsed = Command::try_from_message(message).unwrap();
        assert!(matches!(parsed, Command::CreateTarget(_)));
    }
}
