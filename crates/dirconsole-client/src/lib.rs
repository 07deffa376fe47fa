// Console session bound to one director connection
pub mod session;
pub use session::{ConsoleSession, Transport, DEFAULT_TIMEOUT};

// Convenience operations layered on the session
mod director;

// `list log` command construction
pub mod log_query;
pub use log_query::LogQuery;

pub use dirconsole_common::{
    ApiMode, Command, ConsoleError, ErrorKind, Framing, LogEntry, Response, VersionResult,
};
