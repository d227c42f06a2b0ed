// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetcherError {
    #[error("failed to spawn extractor process: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("extractor metadata probe returned no result for {0}")]
    NoMetadata(String),

    #[error("extractor metadata was not valid JSON: {0}")]
    MalformedMetadata(#[from] serde_json::Error),

    #[error("extractor exited with a non-zero status")]
    NonZeroExit,
}
