use std::error::Error;
use std::fmt;
use serde::{Deserialize, Serialize};

use crate::session::ConnectionState;

/// Why an inbound message could not be turned into a snapshot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The text was not valid JSON.
    Json(String),
    /// Valid JSON, but not an object (array, string, number, null...).
    NotAnObject,
}

impl Error for DecodeError {}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DecodeError::Json(ref msg) => write!(f, "invalid JSON: {}", msg),
            DecodeError::NotAnObject => write!(f, "snapshot payload is not a JSON object"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LinkError {
    /// The socket could not be created or failed underneath us.
    Transport(String),
    Decode(DecodeError),
    /// A command was sent while the session was not open. The command is dropped.
    NotConnected,
    /// Not a failure: the action is waiting behind a confirmation dialog.
    ConfirmationRequired,
    InvalidTransition {
        from: ConnectionState,
        action: &'static str,
    },
    Serialization(String),
    Config(String),
}

impl Error for LinkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LinkError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            LinkError::Transport(ref msg) => write!(f, "Transport error: {}", msg),
            LinkError::Decode(ref e) => write!(f, "Decode error: {}", e),
            LinkError::NotConnected => write!(f, "Not connected to device"),
            LinkError::ConfirmationRequired => write!(f, "Action requires confirmation"),
            LinkError::InvalidTransition { ref from, action } => {
                write!(f, "Cannot {} while session is {:?}", action, from)
            }
            LinkError::Serialization(ref msg) => write!(f, "Serialization error: {}", msg),
            LinkError::Config(ref msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl From<DecodeError> for LinkError {
    fn from(e: DecodeError) -> Self {
        LinkError::Decode(e)
    }
}
