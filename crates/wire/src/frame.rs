// SPDX-License-Identifier: MIT

//! The closed tagged union carried over the wire (spec §3, §9). Only these
//! five variants are ever defined; an unrecognized tag is a protocol error,
//! not an opaque blob to execute.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single positional or keyword argument value. Kept as a small, closed
/// sum of primitives rather than an arbitrary serialized object (spec §9:
/// "do not permit opaque code execution").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<ArgValue>),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ArgValue]> {
        match self {
            ArgValue::List(v) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        ArgValue::String(s.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        ArgValue::String(s)
    }
}

/// A frame on the IPC wire (spec §3). `Call` is always the first frame of
/// a request; `Result`/`ErrorResult` always terminates it; any number of
/// `StdoutChunk`/`StderrChunk` frames may precede the terminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Frame {
    Call {
        name: String,
        #[serde(default)]
        args: Vec<ArgValue>,
        #[serde(default)]
        kwargs: HashMap<String, ArgValue>,
        stdout_is_tty: bool,
        stderr_is_tty: bool,
    },
    StdoutChunk {
        text: String,
    },
    StderrChunk {
        text: String,
    },
    Result {
        value: serde_json::Value,
    },
    ErrorResult {
        message: String,
        kind: mediabin_core::ErrorKind,
    },
}

impl Frame {
    pub fn call(
        name: impl Into<String>,
        args: Vec<ArgValue>,
        kwargs: HashMap<String, ArgValue>,
        stdout_is_tty: bool,
        stderr_is_tty: bool,
    ) -> Self {
        Frame::Call { name: name.into(), args, kwargs, stdout_is_tty, stderr_is_tty }
    }

    pub fn stdout(text: impl Into<String>) -> Self {
        Frame::StdoutChunk { text: text.into() }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Frame::StderrChunk { text: text.into() }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Frame::Result { .. } | Frame::ErrorResult { .. })
    }
}
