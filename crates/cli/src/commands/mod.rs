// SPDX-License-Identifier: MIT

//! The four remote subcommands (spec §6) plus the `daemon` lifecycle
//! group, one module per concern, grounded on the teacher's
//! `commands/mod.rs` split (a thin module per subcommand, each calling
//! into a client query function and printing the formatted result).

mod daemon;
mod du;
mod enqueue;
mod ls;
mod ps;

pub use daemon::{daemon_lifecycle, DaemonArgs};
pub use du::du;
pub use enqueue::enqueue;
pub use ls::ls;
pub use ps::ps;
