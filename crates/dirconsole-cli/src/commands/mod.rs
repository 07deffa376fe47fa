use clap::{Args, Subcommand};

use dirconsole_client::{ConsoleSession, LogEntry, LogQuery, Transport};
use dirconsole_common::{ConsoleConfig, ConsoleError};

/// dirconsole subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the commands the director accepts
    #[command(name = "commands")]
    ListCommands,
    /// Show the director version
    Version,
    /// Show `status director` output
    Status,
    /// Show director log messages
    Log(LogArgs),
    /// Run any console command and print its reply
    Run(RunArgs),
}

impl Commands {
    /// Run the subcommand and return what should be printed
    pub async fn execute<T: Transport>(
        self,
        session: &ConsoleSession<T>,
        config: &ConsoleConfig,
    ) -> Result<String, ConsoleError> {
        match self {
            Commands::ListCommands => cmd_commands(session).await,
            Commands::Version => session.get_version().await,
            Commands::Status => session.get_status().await,
            Commands::Log(args) => cmd_log(session, args, config).await,
            Commands::Run(args) => session.run_command(&args.command_line()).await,
        }
    }
}

/// Arguments for the `log` command
#[derive(Debug, Args)]
pub struct LogArgs {
    /// Number of messages (default: log_limit from the config)
    #[clap(long)]
    pub limit: Option<u32>,

    /// Number of messages to skip
    #[clap(long)]
    pub offset: Option<u32>,

    /// Newest messages first
    #[clap(long)]
    pub reverse: bool,
}

impl LogArgs {
    pub fn query(&self, config: &ConsoleConfig) -> LogQuery {
        let mut query = LogQuery::new()
            .limit(self.limit.unwrap_or(config.log_limit))
            .reverse(self.reverse);
        if let Some(offset) = self.offset {
            query = query.offset(offset);
        }
        query
    }
}

/// Arguments for the `run` command
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Console command, e.g. `list jobs`
    #[clap(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl RunArgs {
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

async fn cmd_commands<T: Transport>(session: &ConsoleSession<T>) -> Result<String, ConsoleError> {
    let commands = session.list_available_commands().await?;
    serde_json::to_string_pretty(&commands)
        .map_err(|e| ConsoleError::UnexpectedShape(e.to_string()))
}

async fn cmd_log<T: Transport>(
    session: &ConsoleSession<T>,
    args: LogArgs,
    config: &ConsoleConfig,
) -> Result<String, ConsoleError> {
    let log = session.get_log_messages(&args.query(config)).await?;
    Ok(log.iter().map(format_log_entry).collect::<Vec<_>>().join("\n"))
}

// Same layout as the director's own job reports
const LOG_TIME_FORMAT: &str = "%d-%b-%Y %H:%M:%S";

fn format_log_entry(entry: &LogEntry) -> String {
    let jobid = if entry.jobid.is_empty() || entry.jobid == "0" {
        "-"
    } else {
        entry.jobid.as_str()
    };
    let time = match entry.timestamp() {
        Some(ts) => ts.format(LOG_TIME_FORMAT).to_string(),
        None => entry.time.clone(),
    };
    format!("{} {:>6} {}", time, jobid, entry.logtext.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirconsole_client::ApiMode;
    use tokio_test::io::Builder;

    fn reply(payload: &[u8]) -> Vec<u8> {
        let mut bytes = (payload.len() as i32).to_be_bytes().to_vec();
        bytes.extend_from_slice(payload);
        bytes.extend_from_slice(&(-1i32).to_be_bytes());
        bytes
    }

    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut bytes = (payload.len() as i32).to_be_bytes().to_vec();
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn test_log_args_fall_back_to_config_limit() {
        let config = ConsoleConfig {
            log_limit: 25,
            ..ConsoleConfig::default()
        };
        let args = LogArgs {
            limit: None,
            offset: Some(5),
            reverse: true,
        };
        assert_eq!(
            args.query(&config).command_line().unwrap(),
            "list log limit=25 offset=5 reverse"
        );
    }

    #[test]
    fn test_format_log_entry() {
        let entry = LogEntry {
            logid: "1".to_string(),
            jobid: "42".to_string(),
            time: "2024-03-01 10:00:00".to_string(),
            logtext: "Backup OK\n".to_string(),
        };
        assert_eq!(format_log_entry(&entry), "01-Mar-2024 10:00:00     42 Backup OK");

        let system = LogEntry {
            jobid: "0".to_string(),
            ..entry
        };
        assert_eq!(format_log_entry(&system), "01-Mar-2024 10:00:00      - Backup OK");

        // Times the director sends in another layout are shown as received
        let odd_time = LogEntry {
            time: "yesterday".to_string(),
            ..system
        };
        assert_eq!(format_log_entry(&odd_time), "yesterday      - Backup OK");
    }

    #[tokio::test]
    async fn test_execute_log() {
        let mock = Builder::new()
            .write(&frame(b"list log limit=50"))
            .read(&reply(
                br#"{"result":{"log":[{"logid":"1","jobid":"7","time":"2024-03-01 10:00:00","logtext":"Start Backup\n"}]}}"#,
            ))
            .build();
        let session = ConsoleSession::with_api_mode(mock, ApiMode::Json);
        let args = LogArgs {
            limit: None,
            offset: None,
            reverse: false,
        };

        let output = Commands::Log(args)
            .execute(&session, &ConsoleConfig::default())
            .await
            .unwrap();
        assert_eq!(output, "01-Mar-2024 10:00:00      7 Start Backup");
    }

    #[tokio::test]
    async fn test_execute_run() {
        let mock = Builder::new()
            .write(&frame(b"list jobs"))
            .read(&reply(b"No results to list.\n"))
            .build();
        let session = ConsoleSession::new(mock);
        let args = RunArgs {
            command: vec!["list".to_string(), "jobs".to_string()],
        };

        let output = Commands::Run(args)
            .execute(&session, &ConsoleConfig::default())
            .await
            .unwrap();
        assert_eq!(output, "No results to list.\n");
    }

    #[tokio::test]
    async fn test_execute_commands_pretty_prints() {
        let mock = Builder::new()
            .write(&frame(b".help"))
            .read(&reply(br#"{"result":["status","version"]}"#))
            .build();
        let session = ConsoleSession::with_api_mode(mock, ApiMode::Json);

        let output = Commands::ListCommands
            .execute(&session, &ConsoleConfig::default())
            .await
            .unwrap();
        assert_eq!(output, "[\n  \"status\",\n  \"version\"\n]");
    }
}
