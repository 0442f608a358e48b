//! Botyard command line.
//!
//! Loads configuration, discovers the bots in the plugin directory and runs
//! them on an in-process hub wired to the terminal: every stdin line is a
//! chat message in the console channel, every bot emission is printed.
//!
//! # Usage
//!
//! ```bash
//! botyard --plugins ./bots
//! botyard --list-kinds
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use botyard::core::ChannelId;
use botyard::runtime::{BotyardRuntime, available_kinds};
use botyard::transport::{MemoryHub, console};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// Keeps the built-in bot registrations linked.
use botyard_bots as _;

/// How long the runtime waits for stray blocking tasks (stdin) on exit.
const EXIT_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Parser)]
#[command(name = "botyard", version, about = "Host a directory of chat bots")]
struct Cli {
    /// Configuration file to load instead of searching for one.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory containing bot manifests.
    #[arg(short, long, value_name = "DIR")]
    plugins: Option<PathBuf>,

    /// Configuration profile, e.g. "development".
    #[arg(long, value_name = "NAME")]
    profile: Option<String>,

    /// Print the registered bot kinds and exit.
    #[arg(long)]
    list_kinds: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.list_kinds {
        for descriptor in available_kinds() {
            println!("{:<12} {}", descriptor.kind, descriptor.description);
        }
        return Ok(ExitCode::SUCCESS);
    }

    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    let result = rt.block_on(run(cli));
    // Stdin reads cannot be cancelled; do not wait on them forever.
    rt.shutdown_timeout(EXIT_GRACE);
    result
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut builder = BotyardRuntime::builder();
    if let Some(path) = &cli.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &cli.profile {
        builder = builder.profile(profile);
    }
    if let Some(dir) = &cli.plugins {
        builder = builder.plugin_dir(dir);
    }
    let runtime = builder.build().context("failed to load configuration")?;

    let hub = MemoryHub::new();
    let channel = ChannelId::new(runtime.config().runtime.console_channel.clone());
    let console_token = CancellationToken::new();

    let printer = tokio::spawn(console::print_emissions(
        hub.subscribe_emissions(),
        console_token.clone(),
    ));
    let reader = tokio::spawn(console::pump_stdin(
        hub.clone(),
        channel.clone(),
        console_token.clone(),
    ));
    info!(channel = %channel, "Reading chat messages from stdin");

    let report = runtime.run(Arc::new(hub.clone())).await?;

    console_token.cancel();
    hub.close();
    let _ = printer.await;
    reader.abort();

    print!("{report}");
    if !report.all_clean() {
        warn!("Some bots did not stop cleanly");
    }
    Ok(ExitCode::SUCCESS)
}
