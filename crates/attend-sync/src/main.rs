//! attend-sync CLI - watch the current directory and stream changes to a session.
//!
//! # Usage
//!
//! ```bash
//! # Prompt for the attendance id, then watch the current directory
//! attend-sync
//!
//! # Non-interactive, against a local server
//! SERVER_URL=http://localhost:3000 attend-sync --attendance-id abc123 --dir ./exercises
//! ```

use anyhow::{Context, Result};
use attend_sync::{RetryingSink, SessionClient, SyncConfig, Watcher};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const ASCII_ART: &str = r#"
  _____ _    _ _ _            __          ___           _
 / ____| |  (_) | |           \ \        / / |         | |
| (___ | | ___| | | ___ _ __   \ \  /\  / /| |__   __ _| | ___
 \___ \| |/ / | | |/ _ \ '__|   \ \/  \/ / | '_ \ / _` | |/ _ \
 ____) |   <| | | |  __/ |       \  /\  /  | | | | (_| | |  __/
|_____/|_|\_\_|_|_|\___|_|        \/  \/   |_| |_|\__,_|_|\___|
"#;

#[derive(Parser)]
#[command(name = "attend-sync")]
#[command(about = "Stream local file changes to an attendance session", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory to watch
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Attendance id (prompted for when omitted)
    #[arg(short, long, env = "ATTENDANCE_ID")]
    attendance_id: Option<String>,

    /// Server base URL
    #[arg(long, env = "SERVER_URL")]
    server_url: Option<String>,

    /// Poll interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => SyncConfig::from_file(path)?,
        None => SyncConfig::default(),
    };
    config.apply_env_overrides();

    config.apply_flag_overrides(
        cli.server_url,
        cli.attendance_id,
        cli.interval_ms.map(Duration::from_millis),
    );

    println!("{}", ASCII_ART);

    // Only ask when no layer supplied an id.
    if !config.has_attendance_id() {
        config.attendance_id = prompt_attendance_id().context("Failed to read attendance id")?;
    }
    config.validate()?;

    println!();
    println!(
        "Great! We're going to start watching this directory for changes \
         so that the trainer can see your progress."
    );
    println!("Hit Ctrl+C to stop.");

    if !config.has_attendance_id() {
        warn!("No attendance id set; changes will be detected but not uploaded");
    }

    let client = SessionClient::new(&config)?;
    let sink = RetryingSink::new(client.clone(), config.retry);
    let mut watcher = Watcher::new(sink, client, &cli.dir, &config);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received SIGINT signal (Ctrl+C)");
        }
        trigger.cancel();
    });

    watcher.poll_for_changes(cancel).await;
    Ok(())
}

fn prompt_attendance_id() -> io::Result<String> {
    println!("Please copy and paste your ID from the course page here and press enter.");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = if verbose {
        EnvFilter::new("attend_sync=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("attend_sync=info,warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
