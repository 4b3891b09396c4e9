use std::io;
use std::path::PathBuf;

/// A single source file could not be turned into a record.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{}: file has no parent directory to take the activity type from", .path.display())]
    NoActivityDir { path: PathBuf },

    #[error("{}: unknown activity type directory {tag:?}", .path.display())]
    UnknownActivityType { path: PathBuf, tag: String },

    #[error("{}: file name {stem:?} is not a timestamp: {source}", .path.display())]
    BadTimestamp {
        path: PathBuf,
        stem: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("{}: reading file: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: invalid JSON: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: missing field {field}.value", .path.display())]
    MissingField { path: PathBuf, field: &'static str },

    #[error("{}: {field}.value is not a 32-bit integer: {value}", .path.display())]
    NotAnInteger {
        path: PathBuf,
        field: &'static str,
        value: serde_json::Value,
    },

    #[error("{}: activeSeconds.value is negative: {value}", .path.display())]
    NegativeDuration { path: PathBuf, value: i32 },
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("listing {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("{context}: {source}")]
    Postgres {
        context: &'static str,
        #[source]
        source: postgres::Error,
    },

    #[error("{0}")]
    Rejected(String),
}

impl SinkError {
    pub fn pg(context: &'static str) -> impl FnOnce(postgres::Error) -> Self {
        move |source| Self::Postgres { context, source }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("subscribing to {}: {source}", .path.display())]
    Subscribe {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("spawning watch worker: {0}")]
    Spawn(#[source] io::Error),

    #[error("watch worker panicked")]
    WorkerPanicked,

    #[error("watcher is {0:?}")]
    InvalidState(crate::watch::WatchState),
}

/// Anything that can end a sync run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Watch(#[from] WatchError),
}
