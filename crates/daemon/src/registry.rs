// SPDX-License-Identifier: MIT

//! The command registry (spec §4.3, §9 "Dynamic method registry"): an
//! explicit, append-only map from name to handler, replacing the
//! source's decorator-based registration. `register` rejects a duplicate
//! name; the registry becomes read-only once the daemon's accept loop
//! starts (enforced by construction order in `lifecycle`, not by a
//! runtime lock, since no handler ever reaches back into it).

use std::collections::HashMap;
use std::collections::HashMap as KwMap;
use std::sync::Arc;

use async_trait::async_trait;
use mediabin_wire::ArgValue;

use crate::error::DaemonError;

/// Arguments a handler receives from a `Call` frame.
pub struct Args {
    pub positional: Vec<ArgValue>,
    pub keyword: KwMap<String, ArgValue>,
}

impl Args {
    pub fn first_str(&self) -> Result<&str, DaemonError> {
        self.positional
            .first()
            .and_then(ArgValue::as_str)
            .ok_or_else(|| DaemonError::BadArgs("expected a string argument".into()))
    }

    pub fn keyword_str(&self, name: &str) -> Option<&str> {
        self.keyword.get(name).and_then(ArgValue::as_str)
    }

    pub fn keyword_str_list(&self, name: &str) -> Vec<String> {
        self.keyword
            .get(name)
            .and_then(ArgValue::as_list)
            .map(|items| items.iter().filter_map(ArgValue::as_str).map(str::to_string).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, args: Args) -> Result<serde_json::Value, DaemonError>;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Args) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<serde_json::Value, DaemonError>> + Send + 'static,
{
    async fn call(&self, args: Args) -> Result<serde_json::Value, DaemonError> {
        (self)(args).await
    }
}

#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`. Rejects a duplicate name: the
    /// registry is append-only (spec §4.3) and a collision is a
    /// construction-time bug in the daemon binary, surfaced as a startup
    /// error rather than silently shadowing the earlier handler.
    pub fn register(&mut self, name: &str, handler: impl Handler) -> Result<(), DaemonError> {
        if self.handlers.contains_key(name) {
            return Err(DaemonError::BadArgs(format!("command {name:?} registered twice")));
        }
        self.handlers.insert(name.to_string(), Arc::new(handler));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(name).cloned()
    }
}
