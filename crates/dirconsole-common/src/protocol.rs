//! Bsock wire framing used by the director console.
//!
//! Every message starts with a big-endian `i32` length. A positive length is
//! followed by that many payload bytes; a negative length is a [`Signal`]
//! and carries no payload.
use crate::error::ConsoleError;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest single data frame accepted from the director
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024; // 16MB

/// Largest complete response accepted from the director
pub const MAX_RESPONSE_SIZE: usize = 64 * 1024 * 1024; // 64MB

/// Out-of-band signals carried in place of a frame length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    EndOfData,
    EndOfDataPoll,
    Status,
    Terminate,
    Poll,
    Heartbeat,
    HeartbeatResponse,
    Btime,
    Break,
    StartSelect,
    EndSelect,
    InvalidCommand,
    CommandFailed,
    CommandOk,
    CommandBegin,
    MessagesPending,
    MainPrompt,
    SelectInput,
    WarningMessage,
    ErrorMessage,
    InfoMessage,
    RunCommand,
    YesNo,
    StartRestoreTree,
    EndRestoreTree,
    SubPrompt,
    TextInput,
    Unknown(i32),
}

impl Signal {
    pub fn from_code(code: i32) -> Self {
        match code {
            -1 => Signal::EndOfData,
            -2 => Signal::EndOfDataPoll,
            -3 => Signal::Status,
            -4 => Signal::Terminate,
            -5 => Signal::Poll,
            -6 => Signal::Heartbeat,
            -7 => Signal::HeartbeatResponse,
            -9 => Signal::Btime,
            -10 => Signal::Break,
            -11 => Signal::StartSelect,
            -12 => Signal::EndSelect,
            -13 => Signal::InvalidCommand,
            -14 => Signal::CommandFailed,
            -15 => Signal::CommandOk,
            -16 => Signal::CommandBegin,
            -17 => Signal::MessagesPending,
            -18 => Signal::MainPrompt,
            -19 => Signal::SelectInput,
            -20 => Signal::WarningMessage,
            -21 => Signal::ErrorMessage,
            -22 => Signal::InfoMessage,
            -23 => Signal::RunCommand,
            -24 => Signal::YesNo,
            -25 => Signal::StartRestoreTree,
            -26 => Signal::EndRestoreTree,
            -27 => Signal::SubPrompt,
            -28 => Signal::TextInput,
            other => Signal::Unknown(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Signal::EndOfData => -1,
            Signal::EndOfDataPoll => -2,
            Signal::Status => -3,
            Signal::Terminate => -4,
            Signal::Poll => -5,
            Signal::Heartbeat => -6,
            Signal::HeartbeatResponse => -7,
            Signal::Btime => -9,
            Signal::Break => -10,
            Signal::StartSelect => -11,
            Signal::EndSelect => -12,
            Signal::InvalidCommand => -13,
            Signal::CommandFailed => -14,
            Signal::CommandOk => -15,
            Signal::CommandBegin => -16,
            Signal::MessagesPending => -17,
            Signal::MainPrompt => -18,
            Signal::SelectInput => -19,
            Signal::WarningMessage => -20,
            Signal::ErrorMessage => -21,
            Signal::InfoMessage => -22,
            Signal::RunCommand => -23,
            Signal::YesNo => -24,
            Signal::StartRestoreTree => -25,
            Signal::EndRestoreTree => -26,
            Signal::SubPrompt => -27,
            Signal::TextInput => -28,
            Signal::Unknown(code) => code,
        }
    }

    /// Whether this signal closes the response to the current command
    pub fn ends_response(self) -> bool {
        matches!(self, Signal::EndOfData | Signal::EndOfDataPoll)
    }
}

/// One unit read off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Data(Vec<u8>),
    Signal(Signal),
}

/// Write a single data frame and flush it
pub async fn write_frame<W>(stream: &mut W, payload: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let len = i32::try_from(payload.len())
        .ok()
        .filter(|len| (*len as usize) <= MAX_FRAME_SIZE)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Frame size {} exceeds maximum allowed size of {}",
                    payload.len(),
                    MAX_FRAME_SIZE
                ),
            )
        })?;

    // Prefix and payload in a single write
    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(payload);

    stream.write_all(&buf).await?;
    stream.flush().await
}

/// Write a signal and flush it
pub async fn write_signal<W>(stream: &mut W, signal: Signal) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    stream.write_all(&signal.code().to_be_bytes()).await?;
    stream.flush().await
}

/// Read exactly one frame
pub async fn read_frame<R>(stream: &mut R) -> Result<Frame, ConsoleError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut len_buf = [0u8; 4];
    read_exact_or_closed(stream, &mut len_buf).await?;

    let len = i32::from_be_bytes(len_buf);
    if len < 0 {
        return Ok(Frame::Signal(Signal::from_code(len)));
    }

    let len = len as usize;
    if len > MAX_FRAME_SIZE {
        return Err(ConsoleError::ProtocolDesync(format!(
            "Frame size {} exceeds maximum allowed size of {}",
            len, MAX_FRAME_SIZE
        )));
    }

    let mut buf = vec![0u8; len];
    read_exact_or_closed(stream, &mut buf).await?;
    Ok(Frame::Data(buf))
}

/// Read frames until the director ends the response, returning the
/// concatenated payload
pub async fn read_response<R>(stream: &mut R) -> Result<Vec<u8>, ConsoleError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut raw = Vec::new();

    loop {
        match read_frame(stream).await? {
            Frame::Data(payload) => {
                if raw.len() + payload.len() > MAX_RESPONSE_SIZE {
                    return Err(ConsoleError::ProtocolDesync(format!(
                        "Response exceeds maximum allowed size of {}",
                        MAX_RESPONSE_SIZE
                    )));
                }
                raw.extend_from_slice(&payload);
            }
            Frame::Signal(signal) if signal.ends_response() => return Ok(raw),
            Frame::Signal(Signal::Terminate) => return Err(ConsoleError::closed()),
            Frame::Signal(signal) => {
                tracing::trace!(?signal, "skipping signal inside response");
            }
        }
    }
}

async fn read_exact_or_closed<R>(stream: &mut R, buf: &mut [u8]) -> Result<(), ConsoleError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    match stream.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(ConsoleError::closed()),
        Err(e) => Err(ConsoleError::Transport(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_codes_round_trip() {
        for code in -28..=-1 {
            assert_eq!(Signal::from_code(code).code(), code);
        }
        assert_eq!(Signal::from_code(-8), Signal::Unknown(-8));
        assert_eq!(Signal::from_code(-99), Signal::Unknown(-99));
    }

    #[test]
    fn test_only_eod_ends_response() {
        assert!(Signal::EndOfData.ends_response());
        assert!(Signal::EndOfDataPoll.ends_response());
        assert!(!Signal::MainPrompt.ends_response());
        assert!(!Signal::CommandOk.ends_response());
        assert!(!Signal::Heartbeat.ends_response());
    }

    #[tokio::test]
    async fn test_frame_wire_format() {
        let mut out = Vec::new();
        write_frame(&mut out, b"version").await.unwrap();
        assert_eq!(&out[..4], &7i32.to_be_bytes());
        assert_eq!(&out[4..], b"version");

        let mut out = Vec::new();
        write_signal(&mut out, Signal::EndOfData).await.unwrap();
        assert_eq!(out, vec![0xff, 0xff, 0xff, 0xff]);
    }

    #[tokio::test]
    async fn test_read_frame_data_and_signal() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"hello").await.unwrap();
        write_signal(&mut wire, Signal::MainPrompt).await.unwrap();

        let mut reader = wire.as_slice();
        assert_eq!(
            read_frame(&mut reader).await.unwrap(),
            Frame::Data(b"hello".to_vec())
        );
        assert_eq!(
            read_frame(&mut reader).await.unwrap(),
            Frame::Signal(Signal::MainPrompt)
        );
    }

    #[tokio::test]
    async fn test_read_frame_rejects_oversized_length() {
        let wire = ((MAX_FRAME_SIZE + 1) as i32).to_be_bytes();
        let mut reader = &wire[..];
        let err = read_frame(&mut reader).await.unwrap_err();
        assert!(matches!(err, ConsoleError::ProtocolDesync(_)));
    }

    #[tokio::test]
    async fn test_read_frame_truncated_payload_is_closed() {
        let mut wire = 10i32.to_be_bytes().to_vec();
        wire.extend_from_slice(b"short");
        let mut reader = wire.as_slice();
        let err = read_frame(&mut reader).await.unwrap_err();
        match err {
            ConsoleError::Transport(e) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("Expected Transport error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_response_concatenates_and_skips_signals() {
        let mut wire = Vec::new();
        write_signal(&mut wire, Signal::CommandBegin).await.unwrap();
        write_frame(&mut wire, b"line one\n").await.unwrap();
        write_signal(&mut wire, Signal::Heartbeat).await.unwrap();
        write_frame(&mut wire, b"line two\n").await.unwrap();
        write_signal(&mut wire, Signal::CommandOk).await.unwrap();
        write_signal(&mut wire, Signal::EndOfData).await.unwrap();
        write_frame(&mut wire, b"next response").await.unwrap();

        let mut reader = wire.as_slice();
        let raw = read_response(&mut reader).await.unwrap();
        assert_eq!(raw, b"line one\nline two\n");

        // The following response is left untouched on the stream
        assert_eq!(
            read_frame(&mut reader).await.unwrap(),
            Frame::Data(b"next response".to_vec())
        );
    }

    #[tokio::test]
    async fn test_read_response_empty_is_valid_when_terminated() {
        let mut wire = Vec::new();
        write_signal(&mut wire, Signal::EndOfData).await.unwrap();
        let mut reader = wire.as_slice();
        assert!(read_response(&mut reader).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_response_terminate_and_eof_are_errors() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"partial").await.unwrap();
        write_signal(&mut wire, Signal::Terminate).await.unwrap();
        let mut reader = wire.as_slice();
        assert!(matches!(
            read_response(&mut reader).await.unwrap_err(),
            ConsoleError::Transport(_)
        ));

        let mut wire = Vec::new();
        write_frame(&mut wire, b"partial").await.unwrap();
        let mut reader = wire.as_slice();
        assert!(matches!(
            read_response(&mut reader).await.unwrap_err(),
            ConsoleError::Transport(_)
        ));
    }

    #[tokio::test]
    async fn test_read_response_rejects_oversized_total() {
        // Five maximum-size frames, streamed rather than held in memory
        let header = (MAX_FRAME_SIZE as i32).to_be_bytes();
        let mut reader: Box<dyn AsyncRead + Unpin> = Box::new(tokio::io::empty());
        for _ in 0..(MAX_RESPONSE_SIZE / MAX_FRAME_SIZE + 1) {
            reader = Box::new(
                reader
                    .chain(std::io::Cursor::new(header.to_vec()))
                    .chain(tokio::io::repeat(0).take(MAX_FRAME_SIZE as u64)),
            );
        }

        let err = read_response(&mut reader).await.unwrap_err();
        assert!(matches!(err, ConsoleError::ProtocolDesync(_)));
        assert!(err.is_fatal());
    }
}
