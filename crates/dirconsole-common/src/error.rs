use std::io;
use std::time::Duration;
use thiserror::Error;

/// Coarse classification of a [`ConsoleError`], cheap to copy and compare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingArgument,
    InvalidArgument,
    ConcurrentUse,
    SessionDead,
    Timeout,
    ProtocolDesync,
    UnexpectedShape,
    Daemon,
    Transport,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::MissingArgument => "missing_argument",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::ConcurrentUse => "concurrent_use",
            ErrorKind::SessionDead => "session_dead",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ProtocolDesync => "protocol_desync",
            ErrorKind::UnexpectedShape => "unexpected_shape",
            ErrorKind::Daemon => "daemon",
            ErrorKind::Transport => "transport",
        }
    }
}

/// Every way a console command can fail.
///
/// Errors for which [`ConsoleError::is_fatal`] returns true leave the byte
/// stream at an unknown position; the session that produced them refuses
/// further commands.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("another command is already pending on this session")]
    ConcurrentUse,

    #[error("session is dead, reconnect before sending further commands")]
    SessionDead,

    #[error("no complete response within {0:?}")]
    Timeout(Duration),

    #[error("protocol desync: {0}")]
    ProtocolDesync(String),

    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),

    #[error("director error {code}: {message}")]
    Daemon { code: i64, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
}

impl ConsoleError {
    /// Transport error for a peer that went away before the response ended
    pub fn closed() -> Self {
        ConsoleError::Transport(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed by director",
        ))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ConsoleError::MissingArgument(_) => ErrorKind::MissingArgument,
            ConsoleError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ConsoleError::ConcurrentUse => ErrorKind::ConcurrentUse,
            ConsoleError::SessionDead => ErrorKind::SessionDead,
            ConsoleError::Timeout(_) => ErrorKind::Timeout,
            ConsoleError::ProtocolDesync(_) => ErrorKind::ProtocolDesync,
            ConsoleError::UnexpectedShape(_) => ErrorKind::UnexpectedShape,
            ConsoleError::Daemon { .. } => ErrorKind::Daemon,
            ConsoleError::Transport(_) => ErrorKind::Transport,
        }
    }

    /// Whether the session is unusable after this error
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::SessionDead
                | ErrorKind::Timeout
                | ErrorKind::ProtocolDesync
                | ErrorKind::Transport
        )
    }

    /// Short advice for whoever has to show this error to a person
    pub fn hint(&self) -> Option<&'static str> {
        match self.kind() {
            ErrorKind::SessionDead | ErrorKind::Transport | ErrorKind::ProtocolDesync => {
                Some("reconnect and retry")
            }
            ErrorKind::Timeout => Some("the director may be busy"),
            ErrorKind::UnexpectedShape => {
                Some("director returned an unexpected format, possibly a version mismatch")
            }
            ErrorKind::ConcurrentUse => Some("wait for the pending command to finish"),
            _ => None,
        }
    }
}
