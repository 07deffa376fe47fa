use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tokio::io::AsyncWriteExt;

use client::ConnectionArgs;
use commands::Commands;
use dirconsole_common::ConsoleError;

mod client;
mod commands;

/// dirconsole - command line client for a backup director console
#[derive(Parser, Debug)]
#[command(name = "dirconsole")]
#[command(version)]
#[command(about = "Send console commands to a backup director", long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Emit logs as JSON lines on stderr
    #[clap(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.connection.resolve()?;
    let session = client::connect(&config).await?;

    let result = cli.command.execute(&session, &config).await;

    let mut transport = session.into_inner();
    if let Err(e) = transport.shutdown().await {
        tracing::debug!("Failed to shut down transport: {}", e);
    }

    let output = result?;
    if output.ends_with('\n') {
        print!("{}", output);
    } else {
        println!("{}", output);
    }
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn report(err: &anyhow::Error) {
    use ansi_term::Colour::{Red, Yellow};

    eprintln!("{} {:#}", Red.bold().paint("error:"), err);
    if let Some(hint) = err.downcast_ref::<ConsoleError>().and_then(ConsoleError::hint) {
        eprintln!("{} {}", Yellow.paint("hint:"), hint);
    }
}
