//! Meadow line client.
//!
//! # Usage
//!
//! ```bash
//! # Connect to a local server with the default fixed 3s reconnect delay
//! meadow
//!
//! # Remote server, exponential backoff giving up after 10 attempts
//! meadow --endpoint ws://farm.example:8000/ws --backoff exponential --max-attempts 10
//! ```
//!
//! Commands are read from stdin one per line; `help` lists them.

use std::{io::Write, time::Duration};

use clap::{Parser, ValueEnum};
use meadow_client::{
    ClientConfig, ClientEvent, StatusReport,
    commands::{self, Command, HELP},
    render,
    runtime::{ClientHandle, Runtime},
};
use meadow_core::{
    EncoderConfig, Fault, ReconnectPolicy, SessionConfig,
    backoff::{DEFAULT_INITIAL_DELAY, DEFAULT_MULTIPLIER},
    session::DEFAULT_ENDPOINT,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Reconnect delay strategy
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backoff {
    /// Same delay before every attempt, never gives up
    Fixed,
    /// Doubling delay with jitter and an optional attempt limit
    Exponential,
}

/// Farm simulation client
#[derive(Parser, Debug)]
#[command(name = "meadow")]
#[command(about = "Live client for a remote farm simulation")]
#[command(version)]
struct Args {
    /// WebSocket endpoint of the farm server
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Reconnect strategy
    #[arg(long, value_enum, default_value = "fixed")]
    backoff: Backoff,

    /// Delay before reconnecting (fixed backoff)
    #[arg(long, default_value = "3000")]
    reconnect_delay_ms: u64,

    /// Delay ceiling (exponential backoff)
    #[arg(long, default_value = "60000")]
    max_delay_ms: u64,

    /// Jitter factor between 0 and 1 (exponential backoff)
    #[arg(long, default_value = "0.2")]
    jitter: f64,

    /// Give up after this many reconnects (exponential backoff)
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Args {
    fn client_config(&self) -> ClientConfig {
        let reconnect = match self.backoff {
            Backoff::Fixed => {
                ReconnectPolicy::Fixed { delay: Duration::from_millis(self.reconnect_delay_ms) }
            },
            Backoff::Exponential => ReconnectPolicy::Exponential {
                initial: DEFAULT_INITIAL_DELAY,
                multiplier: DEFAULT_MULTIPLIER,
                max_delay: Duration::from_millis(self.max_delay_ms),
                jitter: self.jitter,
                max_attempts: self.max_attempts,
            },
        };

        ClientConfig {
            session: SessionConfig { endpoint: self.endpoint.clone(), reconnect },
            encoder: EncoderConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // Logs go to stderr so they do not interleave with command output.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    tracing::info!(endpoint = %args.endpoint, "meadow starting");

    let (runtime, handle) = Runtime::new(args.client_config());
    let runtime = tokio::spawn(runtime.run());
    tokio::spawn(print_status(handle.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        match commands::parse(&line) {
            Command::Quit => break,
            Command::Help => say(HELP)?,
            Command::State => say(render::farm(&handle.snapshot()).trim_end())?,
            Command::Unknown { input } => say(&format!("unknown command `{input}`, try `help`"))?,
            Command::InvalidArgs { command, error } => say(&format!("{command}: {error}"))?,
            command => {
                if let Some(event) = command.into_event() {
                    submit(&handle, event).await?;
                }
            },
        }
    }

    // Already stopped is fine; there is nothing left to close.
    let _ = handle.shutdown().await;
    runtime.await?;

    Ok(())
}

async fn submit(handle: &ClientHandle, event: ClientEvent) -> std::io::Result<()> {
    match handle.send(event).await {
        Ok(()) => Ok(()),
        Err(e) => say(&format!("error: {e}")),
    }
}

async fn print_status(handle: ClientHandle) {
    let mut status = handle.watch_status();
    let mut shown = StatusReport::default();

    while status.changed().await.is_ok() {
        let report = status.borrow_and_update().clone();

        let mut lines = Vec::new();
        if report.connection != shown.connection {
            lines.push(format!("[{}]", report.headline()));
        }
        let fresh_notice =
            report.last_notice.as_ref().filter(|n| shown.last_notice.as_ref() != Some(*n));
        if let Some(notice) = fresh_notice {
            lines.push(format!("ok: {notice}"));
        }
        // Rejected intents are reported by the command that caused them.
        let fresh_fault = report
            .last_error
            .as_ref()
            .filter(|f| shown.last_error.as_ref() != Some(*f))
            .filter(|f| !matches!(f, Fault::Validation(_) | Fault::Session(_)));
        if let Some(fault) = fresh_fault {
            lines.push(format!("error: {fault}"));
        }

        for line in lines {
            if say(&line).is_err() {
                return;
            }
        }
        shown = report;
    }
}

fn say(text: &str) -> std::io::Result<()> {
    writeln!(std::io::stdout().lock(), "{text}")
}
