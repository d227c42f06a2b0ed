// SPDX-License-Identifier: MIT

//! An error that carries a process exit code (spec §6: `0` success, `1`
//! daemon unreachable or precondition failed, `2` bad flags). Commands
//! return `ExitError` instead of calling `std::process::exit` directly,
//! so `main` is the only place that terminates the process.

use std::fmt;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(1, message)
    }

    pub fn bad_flags(message: impl Into<String>) -> Self {
        Self::new(2, message)
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

impl From<mediabin_daemon::DaemonError> for ExitError {
    fn from(e: mediabin_daemon::DaemonError) -> Self {
        Self::unreachable(e.to_string())
    }
}
