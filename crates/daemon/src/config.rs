// SPDX-License-Identifier: MIT

//! Daemon configuration and fixed on-disk paths (spec §6).
//!
//! Resolution order, matching the teacher's layered `Config::load`
//! pattern: built-in defaults, then an optional `<home>/.mediabin/
//! config.toml`, then explicit overrides the CLI passes in (ledger path,
//! concurrency, serve port).

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::DaemonError;

fn home_dir() -> Result<PathBuf, DaemonError> {
    dirs::home_dir().ok_or(DaemonError::NoHomeDir)
}

fn mediabin_dir() -> Result<PathBuf, DaemonError> {
    Ok(home_dir()?.join(".mediabin"))
}

/// Fixed on-disk locations derived from the home directory (spec §6);
/// these never move regardless of `config.toml` contents.
#[derive(Debug, Clone)]
pub struct Paths {
    pub root: PathBuf,
    pub daemon_dir: PathBuf,
    pub socket_path: PathBuf,
    pub pid_path: PathBuf,
    pub log_path: PathBuf,
    pub default_ledger_path: PathBuf,
    pub last_ledgerpath_file: PathBuf,
    pub config_path: PathBuf,
}

impl Paths {
    pub fn resolve() -> Result<Self, DaemonError> {
        let root = mediabin_dir()?;
        let daemon_dir = root.join("daemon");
        Ok(Self {
            socket_path: daemon_dir.join("socket.sock"),
            pid_path: daemon_dir.join("process.pid"),
            log_path: daemon_dir.join("log.txt"),
            default_ledger_path: root.join("ledger.db"),
            last_ledgerpath_file: root.join("last_ledgerpath"),
            config_path: root.join("config.toml"),
            daemon_dir,
            root,
        })
    }

    /// The ledger path the CLI last started the daemon with, if any
    /// (spec §6: "overridable by the client on first start and
    /// remembered in `<home>/.mediabin/last_ledgerpath`").
    pub fn remembered_ledger_path(&self) -> Option<PathBuf> {
        std::fs::read_to_string(&self.last_ledgerpath_file).ok().map(|s| PathBuf::from(s.trim()))
    }

    pub fn remember_ledger_path(&self, path: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(&self.last_ledgerpath_file, path.to_string_lossy().as_bytes())
    }
}

/// File-backed settings layered under CLI overrides. Every field has a
/// default so a missing or partial `config.toml` is never an error.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub max_concurrent_downloads: usize,
    pub http_port: u16,
    pub log_level: String,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self { max_concurrent_downloads: 3, http_port: 80, log_level: "info".to_string() }
    }
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, DaemonError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(toml::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Fully-resolved daemon configuration: file settings plus the
/// invocation-specific values the CLI supplies when starting the daemon.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub paths: Paths,
    pub ledger_path: PathBuf,
    pub datadir: PathBuf,
    pub max_concurrent_downloads: usize,
    pub serve: bool,
    pub http_port: u16,
    pub log_level: String,
}

impl DaemonConfig {
    pub fn resolve(
        ledger_path_override: Option<PathBuf>,
        serve: bool,
        port_override: Option<u16>,
    ) -> Result<Self, DaemonError> {
        let paths = Paths::resolve()?;
        let file_config = FileConfig::load(&paths.config_path)?;

        let ledger_path = ledger_path_override
            .or_else(|| paths.remembered_ledger_path())
            .unwrap_or_else(|| paths.default_ledger_path.clone());
        paths.remember_ledger_path(&ledger_path).map_err(DaemonError::Io)?;

        let datadir = ledger_path
            .parent()
            .map(|p| p.join("media_data"))
            .unwrap_or_else(|| PathBuf::from("media_data"));

        Ok(Self {
            max_concurrent_downloads: file_config.max_concurrent_downloads,
            http_port: port_override.unwrap_or(file_config.http_port),
            log_level: std::env::var("MEDIABIN_LOG").unwrap_or(file_config.log_level),
            paths,
            ledger_path,
            datadir,
            serve,
        })
    }
}
