// src/app/error.rs
// Error types for importing, storing and downloading models.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while importing a local model file.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("file system error during {operation} on '{}': {source}", path.display())]
    FileSystem {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no free name for '{stem}' after {probes} attempts")]
    SuffixesExhausted { stem: String, probes: u32 },

    #[error("could not register imported model: {0}")]
    Store(#[from] StoreError),
}

impl ImportError {
    pub fn fs(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileSystem {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Failures reported by the model store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("model not found: {0}")]
    NotFound(String),

    #[error("model '{0}' is already downloaded")]
    AlreadyDownloaded(String),

    #[error("model '{0}' is already downloading")]
    AlreadyDownloading(String),

    #[error("model '{0}' has no download url")]
    NoDownloadUrl(String),

    #[error("not enough storage: {required} bytes needed, {available} bytes free")]
    InsufficientSpace { required: u64, available: u64 },

    #[error("'{0}' is not a Hugging Face id of the form author/repo/file")]
    InvalidHfId(String),

    #[error("model '{0}' cannot be removed from the list")]
    NotRemovable(String),

    #[error("catalog serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while streaming a model file from the network.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("network request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server returned {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("download cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the chat session store.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("session title cannot be empty")]
    EmptyTitle,

    #[error("session file is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
