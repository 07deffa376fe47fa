// dirconsole-client/src/session.rs
// One command at a time over an already-open director console connection
use dirconsole_common::protocol::{read_response, write_frame};
use dirconsole_common::{ApiMode, Command, ConsoleError, Framing, Response};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Round-trip timeout used by the convenience operations unless overridden
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Any duplex byte stream connected to a director console
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Unpin + Send + ?Sized {}

/// Client end of a director console connection.
///
/// The protocol is strictly request/response, so a session holds at most one
/// pending command. A second caller arriving while a command is pending gets
/// [`ConsoleError::ConcurrentUse`] instead of waiting.
///
/// Once a fatal error happens (timeout, transport failure, undecodable reply)
/// the position in the byte stream is unknown and the session is dead: every
/// later call fails with [`ConsoleError::SessionDead`] without touching the
/// transport. Connecting, authenticating and closing remain the caller's job;
/// use [`ConsoleSession::into_inner`] to get the transport back.
pub struct ConsoleSession<T> {
    dead: AtomicBool,
    timeout: Duration,
    inner: Mutex<Inner<T>>,
}

struct Inner<T> {
    transport: T,
    /// Reply format the director is currently using on this connection
    api_mode: ApiMode,
    /// Set while a command is on the wire; still set afterwards means the
    /// previous caller dropped its future mid-response
    in_flight: bool,
}

impl<T: Transport> ConsoleSession<T> {
    /// Bind to a fresh console connection, which starts in plain text mode
    pub fn new(transport: T) -> Self {
        Self::with_api_mode(transport, ApiMode::Off)
    }

    /// Bind to a connection whose API mode was already negotiated
    pub fn with_api_mode(transport: T, api_mode: ApiMode) -> Self {
        Self {
            dead: AtomicBool::new(false),
            timeout: DEFAULT_TIMEOUT,
            inner: Mutex::new(Inner {
                transport,
                api_mode,
                in_flight: false,
            }),
        }
    }

    /// Set the timeout used by the convenience operations
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_dead(&self) -> bool {
        self.dead.load(Ordering::SeqCst)
    }

    /// Current API mode, or `None` while a command is pending
    pub fn api_mode(&self) -> Option<ApiMode> {
        self.inner.try_lock().ok().map(|inner| inner.api_mode)
    }

    /// Give the transport back so the caller can close it
    pub fn into_inner(self) -> T {
        self.inner.into_inner().transport
    }

    /// Send one command and wait at most `timeout` for its complete reply.
    ///
    /// Structured commands are decoded as JSON; plain commands are returned
    /// with `decoded` left empty. Commands are never retried.
    pub async fn send_command(
        &self,
        command: &Command,
        timeout: Duration,
    ) -> Result<Response, ConsoleError> {
        if self.is_dead() {
            return Err(ConsoleError::SessionDead);
        }

        let mut inner = self
            .inner
            .try_lock()
            .map_err(|_| ConsoleError::ConcurrentUse)?;

        if inner.in_flight {
            self.kill("previous command was abandoned before its reply was read");
            return Err(ConsoleError::SessionDead);
        }

        inner.in_flight = true;
        let result = match tokio::time::timeout(timeout, inner.round_trip(command)).await {
            Ok(result) => result,
            Err(_) => Err(ConsoleError::Timeout(timeout)),
        };

        match result {
            Ok(response) => {
                inner.in_flight = false;
                Ok(response)
            }
            Err(e) => {
                // Fatal errors leave `in_flight` set; the session is dead anyway
                if e.is_fatal() {
                    self.kill(&e);
                } else {
                    inner.in_flight = false;
                }
                Err(e)
            }
        }
    }

    fn kill(&self, cause: impl std::fmt::Display) {
        if !self.dead.swap(true, Ordering::SeqCst) {
            warn!("Console session is dead: {}", cause);
        }
    }
}

impl<T: Transport> Inner<T> {
    async fn round_trip(&mut self, command: &Command) -> Result<Response, ConsoleError> {
        let wanted = command.framing().api_mode();
        if self.api_mode != wanted {
            let switch = wanted.switch_command();
            debug!("Switching API mode: {:?} -> {:?}", self.api_mode, wanted);
            let reply = self.exchange(&switch).await?;
            debug!("API mode switch reply: {} bytes", reply.len());
            self.api_mode = wanted;
        }

        debug!("Sending command: {}", command.text());
        let raw = self.exchange(command.text()).await?;

        let decoded = match command.framing() {
            Framing::Plain => None,
            Framing::Structured => Some(decode(&raw)?),
        };

        Ok(Response { raw, decoded })
    }

    async fn exchange(&mut self, line: &str) -> Result<Vec<u8>, ConsoleError> {
        write_frame(&mut self.transport, line.as_bytes()).await?;
        read_response(&mut self.transport).await
    }
}

fn decode(raw: &[u8]) -> Result<serde_json::Value, ConsoleError> {
    serde_json::from_slice(raw).map_err(|e| {
        ConsoleError::ProtocolDesync(format!(
            "structured reply is not valid JSON ({}): {:?}",
            e,
            String::from_utf8_lossy(&raw[..raw.len().min(80)])
        ))
    })
}
