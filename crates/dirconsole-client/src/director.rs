// dirconsole-client/src/director.rs
// Wrappers for the director commands the admin console uses most
use dirconsole_common::{Command, ConsoleError, LogEntry, LogResult, VersionResult};

use crate::log_query::LogQuery;
use crate::session::{ConsoleSession, Transport};

impl<T: Transport> ConsoleSession<T> {
    /// `.help` in structured mode; returns the `result` member untouched
    pub async fn list_available_commands(&self) -> Result<serde_json::Value, ConsoleError> {
        let command = Command::structured(".help")?;
        self.send_command(&command, self.timeout()).await?.result()
    }

    /// `version` in structured mode; returns `result.version`
    pub async fn get_version(&self) -> Result<String, ConsoleError> {
        let command = Command::structured("version")?;
        let version: VersionResult = self.send_command(&command, self.timeout()).await?.result()?;
        Ok(version.version)
    }

    /// `status director` in plain mode; returns the text verbatim
    pub async fn get_status(&self) -> Result<String, ConsoleError> {
        self.run_command("status director").await
    }

    /// `list log` in structured mode; returns `result.log`
    pub async fn get_log_messages(&self, query: &LogQuery) -> Result<Vec<LogEntry>, ConsoleError> {
        let command = Command::structured(query.command_line()?)?;
        let log: LogResult = self.send_command(&command, self.timeout()).await?.result()?;
        Ok(log.log)
    }

    /// Any command in plain mode; returns the text verbatim
    pub async fn run_command(&self, text: &str) -> Result<String, ConsoleError> {
        let command = Command::plain(text)?;
        Ok(self.send_command(&command, self.timeout()).await?.into_text())
    }
}
