use crate::error::ConsoleError;
use crate::protocol::MAX_FRAME_SIZE;
use anyhow::Context;
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Connection-wide reply format negotiated with the `.api` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMode {
    /// Free text replies (`.api 0`)
    Off,
    /// JSON-RPC enveloped replies (`.api 2`)
    Json,
}

impl ApiMode {
    pub fn level(self) -> u8 {
        match self {
            ApiMode::Off => 0,
            ApiMode::Json => 2,
        }
    }

    /// Console command that puts the director into this mode
    pub fn switch_command(self) -> String {
        format!(".api {}", self.level())
    }
}

/// How the reply to a command is expected to look
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Raw text, returned verbatim
    Plain,
    /// A JSON envelope with a `result` or `error` member
    Structured,
}

impl Framing {
    pub fn api_mode(self) -> ApiMode {
        match self {
            Framing::Plain => ApiMode::Off,
            Framing::Structured => ApiMode::Json,
        }
    }
}

/// A validated console command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    text: String,
    framing: Framing,
}

impl Command {
    pub fn new(text: impl Into<String>, framing: Framing) -> Result<Self, ConsoleError> {
        let text = text.into();

        if text.trim().is_empty() {
            return Err(ConsoleError::MissingArgument("command text"));
        }
        if text.contains(['\n', '\r']) {
            return Err(ConsoleError::InvalidArgument(
                "command text must be a single line".to_string(),
            ));
        }
        if text.len() > MAX_FRAME_SIZE {
            return Err(ConsoleError::InvalidArgument(format!(
                "command text is {} bytes, limit is {}",
                text.len(),
                MAX_FRAME_SIZE
            )));
        }

        Ok(Self { text, framing })
    }

    pub fn plain(text: impl Into<String>) -> Result<Self, ConsoleError> {
        Self::new(text, Framing::Plain)
    }

    pub fn structured(text: impl Into<String>) -> Result<Self, ConsoleError> {
        Self::new(text, Framing::Structured)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }
}

/// A complete reply to one command
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Every payload byte received before end-of-data
    pub raw: Vec<u8>,
    /// Parsed JSON, present only for structured commands
    pub decoded: Option<serde_json::Value>,
}

impl Response {
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.raw)
    }

    pub fn into_text(self) -> String {
        match String::from_utf8(self.raw) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }

    /// Extract the typed `result` member of a structured reply
    pub fn result<T: DeserializeOwned>(&self) -> Result<T, ConsoleError> {
        let decoded = self.decoded.as_ref().ok_or_else(|| {
            ConsoleError::UnexpectedShape("response was not decoded as JSON".to_string())
        })?;

        let envelope: Envelope<T> = serde_json::from_value(decoded.clone())
            .map_err(|e| ConsoleError::UnexpectedShape(e.to_string()))?;
        envelope.into_result()
    }
}

/// JSON-RPC style wrapper around every structured reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl<T> Envelope<T> {
    pub fn into_result(self) -> Result<T, ConsoleError> {
        if let Some(error) = self.error {
            return Err(ConsoleError::Daemon {
                code: error.code,
                message: error.message,
            });
        }
        self.result
            .ok_or_else(|| ConsoleError::UnexpectedShape("missing `result` member".to_string()))
    }
}

/// Error member of a structured reply
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// `result` of the `version` command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionResult {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bdate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operatingsystem: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distversion: Option<String>,
}

/// `result` of the `list log` command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogResult {
    pub log: Vec<LogEntry>,
}

/// One row of the director's message log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub logid: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub jobid: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub time: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub logtext: String,
}

impl LogEntry {
    pub const TIME_FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.time, Self::TIME_FORMAT).ok()
    }
}

// Ids arrive as strings from some director versions and as numbers from others
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// Client configuration loaded from config.json or using defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Director console address (default: 127.0.0.1:9101)
    pub address: String,
    /// Unix socket to use instead of `address`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_path: Option<PathBuf>,
    /// Round-trip timeout per command in seconds (default: 30)
    pub timeout_secs: u64,
    /// Default `limit` for log queries (default: 50)
    pub log_limit: u32,
}

impl ConsoleConfig {
    /// Default location: ~/.dirconsole/config.json
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".dirconsole").join("config.json"))
    }

    /// Load configuration from `path`, falling back to defaults when the file is absent
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:9101".to_string(),
            socket_path: None,
            timeout_secs: 30,
            log_limit: 50,
        }
    }
}
