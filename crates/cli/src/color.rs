// SPDX-License-Identifier: MIT

//! TTY-gated color output for `ps`/`ls` (spec §6: "colourised progress").
//! `Call` frames also carry `stdout_is_tty`/`stderr_is_tty` so the daemon
//! side can make the same call for anything it writes back.

use clap::builder::styling::{Ansi256Color, Color, Style, Styles};
use std::io::IsTerminal;

pub mod codes {
    /// Section headers and completed titles.
    pub const HEADER: u8 = 74;
    /// In-flight downloads.
    pub const DOWNLOADING: u8 = 220;
    /// Still-pending rows.
    pub const PENDING: u8 = 245;
    /// Failed rows.
    pub const ERROR: u8 = 196;
}

/// Priority: `NO_COLOR=1` disables, `COLOR=1` forces, otherwise a TTY check.
pub fn should_colorize() -> bool {
    if std::env::var("NO_COLOR").is_ok_and(|v| v == "1") {
        return false;
    }
    if std::env::var("COLOR").is_ok_and(|v| v == "1") {
        return true;
    }
    std::io::stdout().is_terminal()
}

pub fn styles() -> Styles {
    if !should_colorize() {
        return Styles::plain();
    }
    Styles::styled()
        .header(Style::new().fg_color(Some(Color::Ansi256(Ansi256Color(codes::HEADER)))))
        .literal(Style::new().fg_color(Some(Color::Ansi256(Ansi256Color(codes::HEADER)))))
}

fn fg256(code: u8, text: &str) -> String {
    if should_colorize() {
        format!("\x1b[38;5;{code}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

pub fn downloading(text: &str) -> String {
    fg256(codes::DOWNLOADING, text)
}

pub fn pending(text: &str) -> String {
    fg256(codes::PENDING, text)
}

pub fn error(text: &str) -> String {
    fg256(codes::ERROR, text)
}

pub fn header(text: &str) -> String {
    fg256(codes::HEADER, text)
}
