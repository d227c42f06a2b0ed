// SPDX-License-Identifier: MIT

//! The `mb` binary: a thin client over the IPC frame protocol (spec §6).
//! Every subcommand except the lifecycle flags is a remote call against
//! the daemon; lifecycle flags manage the `mediabind` process directly.

mod client;
mod color;
mod commands;
mod exit_error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use client::Client;
use commands::DaemonArgs;
use exit_error::ExitError;

#[derive(Parser, Debug)]
#[command(name = "mb", styles = color::styles())]
struct Cli {
    #[command(flatten)]
    daemon: DaemonArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enqueue a download.
    I { url: String },
    /// List current/pending jobs.
    Ps,
    /// List completed titles.
    Ls {
        #[arg(short = 'q', long)]
        query: Option<String>,
        #[arg(short = 't', long = "tag")]
        tags: Vec<String>,
    },
    /// Show disk usage under the data directory.
    Du,
}

fn mediabind_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|dir| dir.join("mediabind")))
        .unwrap_or_else(|| PathBuf::from("mediabind"))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(e.code);
    }
}

async fn run(cli: Cli) -> Result<(), ExitError> {
    let mediabind = mediabind_path();

    if cli.daemon.requested() {
        return commands::daemon_lifecycle(&cli.daemon, &mediabind).await;
    }

    let Some(command) = cli.command else {
        return Err(ExitError::bad_flags("expected a subcommand or a lifecycle flag"));
    };

    let mut client = Client::connect_or_start(&mediabind, cli.daemon.ledger_path.clone()).await?;
    match command {
        Command::I { url } => commands::enqueue(&mut client, &url).await,
        Command::Ps => commands::ps(&mut client).await,
        Command::Ls { query, tags } => commands::ls(&mut client, query.as_deref(), &tags).await,
        Command::Du => commands::du(&mut client).await,
    }
}
