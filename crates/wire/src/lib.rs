// SPDX-License-Identifier: MIT

//! Length-framed IPC wire protocol (spec §4.1, §3).

mod codec;
mod frame;

pub use codec::{read_frame, write_frame, ProtocolError, MAX_FRAME_LEN};
pub use frame::{ArgValue, Frame};
