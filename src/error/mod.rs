//! This module defines client/user visible errors that can be returned by blkproxy.

use std::fmt::Display;

use serde::Serialize;

pub type Result<T> = std::result::Result<T, Error>;

/// Error enum with all possible variants
#[derive(Debug, Serialize)]
pub enum Error {
    /// A construction or control endpoint call received input it rejects
    /// outright - nothing was mutated.
    InvalidArgument {
        reason: String,
    },
    /// The underlying device could not be resolved during target construction.
    DeviceLookup(crate::block::Error),
    /// Creating the control endpoint failed during target construction.
    ControlEndpointCreate(crate::control::Error),
    /// Registering the control attribute failed during target construction.
    ControlAttributeCreate(crate::control::Error),
    TargetAlreadyExists {
        name: String,
    },
    TargetNotFound {
        name: String,
    },
    InvalidRequest(InvalidRequest),
    Io {
        reason: String,
    },
    Logic {
        reason: String,
    },
}

impl Error {
    /// Returns true if this is an instance of a [`Error::InvalidArgument`] variant
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument { .. })
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            reason: err.to_string(),
        }
    }
}

impl From<crate::control::Error> for Error {
    fn from(err: crate::control::Error) -> Self {
        use crate::control::Error as ControlError;
        match err {
            ControlError::InvalidInput { reason } => Self::InvalidArgument { reason },
            ControlError::NoSuchEndpoint { path } => Self::InvalidArgument {
                reason: format!("no such control endpoint: {}", path),
            },
            ControlError::NoSuchAttribute { path, name } => Self::InvalidArgument {
                reason: format!("no such control attribute: {}/{}", path, name),
            },
            err => Self::Logic {
                reason: err.to_string(),
            },
        }
    }
}

/// Requests that were rejected at the wire protocol layer, before a command
/// was ever executed.
#[derive(Debug, Serialize)]
pub enum InvalidRequest {
    UnableToConstructCommandFromMessage { expected_id: u32, got: u32 },
    InvalidJsonPayload(String),
    EmptyMessagePayload,
    UnrecognizedCommand { id: u32 },
    MaxMessageSizeExceeded { max: u32, got: u32 },
}
