// Error types
pub mod error;
pub use error::{ConsoleError, ErrorKind};

// Wire framing
pub mod protocol;
pub use protocol::{Frame, Signal};

// Commands, replies and configuration
pub mod types;
pub use types::{
    ApiMode, Command, ConsoleConfig, Envelope, Framing, LogEntry, LogResult, Response, RpcError,
    VersionResult,
};
