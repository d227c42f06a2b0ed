// SPDX-License-Identifier: MIT

//! The `mediabind` binary: parses the handful of startup overrides the
//! CLI passes in, detaches (unless told to stay in the foreground), and
//! runs the daemon until a shutdown signal arrives.
//!
//! Grounded on the teacher's `lifecycle::startup` ordering (create dirs,
//! claim the lock, load state, bind the socket last) even though the
//! teacher's own binary entry point was not present in the retrieval
//! pack; the sequence below follows that same order with this crate's
//! pieces (`config::DaemonConfig`, `lifecycle`, `Scheduler`).

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::Notify;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mediabin_daemon::config::DaemonConfig;
use mediabin_daemon::registry::CommandRegistry;
use mediabin_daemon::scheduler::Scheduler;
use mediabin_daemon::{commands, http, lifecycle};
use mediabin_fetcher::ProcessFetcher;

/// Startup overrides, passed by the CLI when it spawns `mediabind`
/// (spec §6: ledger path, serve flag, and port are the only
/// daemon-start-time options).
#[derive(Parser, Debug)]
struct Cli {
    #[arg(long)]
    ledger_path: Option<PathBuf>,

    #[arg(long)]
    serve: bool,

    #[arg(long)]
    port: Option<u16>,

    /// Bind the HTTP host to this machine's tailscale address instead of
    /// all interfaces.
    #[arg(long)]
    tailscale: bool,

    /// Stay attached to the controlling terminal instead of
    /// double-forking; used by tests and `--foreground` debugging runs.
    #[arg(long)]
    foreground: bool,
}

/// Resolve the address to bind the HTTP host to when `--tailscale` was
/// given, by shelling out to `tailscale ip -4`. Falls back to all
/// interfaces with a warning if the CLI isn't installed or returns
/// nothing usable — Tailscale integration itself is a thin external
/// dependency, not something this daemon reimplements.
fn tailscale_bind_ip() -> Option<std::net::Ipv4Addr> {
    let output = std::process::Command::new("tailscale").arg("ip").arg("-4").output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout).trim().parse().ok()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = DaemonConfig::resolve(cli.ledger_path, cli.serve, cli.port)?;
    let bind_ip = if cli.tailscale { tailscale_bind_ip() } else { None };

    if !cli.foreground {
        if let Some(child_pid) = lifecycle::detach(&config.paths.log_path)? {
            println!("{child_pid}");
            return Ok(());
        }
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(config, bind_ip))
}

async fn run(config: DaemonConfig, bind_ip: Option<std::net::Ipv4Addr>) -> Result<(), Box<dyn std::error::Error>> {
    let file_appender = tracing_appender::rolling::never(
        config.paths.log_path.parent().unwrap_or(&config.paths.daemon_dir),
        config.paths.log_path.file_name().unwrap_or_default(),
    );
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!(ledger_path = %config.ledger_path.display(), "starting mediabin daemon");

    let _pid_file = lifecycle::claim_pid_file(&config.paths.pid_path)?;

    let ledger = mediabin_ledger::open(&config.ledger_path).await?;
    // The metadata singleton, not `config.datadir`, is authoritative once
    // written (spec §3): a prior run may have persisted a different
    // `datadir_location`, and `ensure_metadata` only writes its argument
    // the first time the row is created.
    let metadata = ledger.ensure_metadata(&config.datadir.to_string_lossy()).await?;
    let datadir = PathBuf::from(metadata.datadir_location);

    let fetcher = Arc::new(ProcessFetcher::default());
    let (scheduler, status_rx) = Scheduler::new(ledger.clone(), fetcher, datadir.clone(), config.max_concurrent_downloads);
    scheduler.recover().await?;

    let mut registry = CommandRegistry::new();
    {
        let scheduler = Arc::clone(&scheduler);
        registry.register("i", move |args| {
            let scheduler = Arc::clone(&scheduler);
            async move { commands::enqueue(scheduler, args).await }
        })?;
    }
    {
        let scheduler = Arc::clone(&scheduler);
        registry.register("ps", move |args| {
            let scheduler = Arc::clone(&scheduler);
            async move { commands::list_current_procs(scheduler, args).await }
        })?;
    }
    {
        let ledger = ledger.clone();
        registry.register("ls", move |args| {
            let ledger = ledger.clone();
            async move { commands::list_complete(ledger, args).await }
        })?;
    }
    {
        let datadir = datadir.clone();
        registry.register("du", move |_args| {
            let datadir = datadir.clone();
            async move { commands::disk_usage(&datadir).await }
        })?;
    }

    let listener = lifecycle::bind_socket(&config.paths.socket_path)?;
    let shutdown = Arc::new(Notify::new());

    let scheduler_task = tokio::spawn(Arc::clone(&scheduler).run(status_rx));

    let http_task = if config.serve {
        let state = http::HttpState { ledger_path: config.ledger_path.clone(), datadir: datadir.clone() };
        let app = http::router(state);
        let host = bind_ip.unwrap_or(std::net::Ipv4Addr::UNSPECIFIED);
        let addr = std::net::SocketAddr::from((host, config.http_port));
        match tokio::net::TcpListener::bind(addr).await {
            Ok(tcp_listener) => {
                info!(port = config.http_port, "serving media over http");
                Some(tokio::spawn(async move {
                    if let Err(e) = axum::serve(tcp_listener, app).await {
                        error!(error = %e, "http server exited");
                    }
                }))
            }
            Err(e) => {
                error!(error = %e, port = config.http_port, "failed to bind http port, continuing without it");
                None
            }
        }
    } else {
        None
    };

    tokio::spawn(lifecycle::watch_shutdown_signals(Arc::clone(&shutdown)));
    lifecycle::accept_loop(listener, Arc::new(registry), Arc::clone(&shutdown)).await;

    scheduler.stop();
    scheduler_task.abort();
    if let Some(task) = http_task {
        task.abort();
    }
    lifecycle::cleanup(&config);
    info!("mediabin daemon stopped");
    Ok(())
}
