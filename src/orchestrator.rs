use crate::error::{Error, SinkError};
use crate::scan::scan_tree;
use crate::sink::Sink;
use crate::sync::{self, SyncReport};
use crate::watch::{ChangeWatcher, WatchConfig, WatchStats};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

const LIVENESS_POLL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Bulk sync, then exit.
    Once,
    /// Bulk sync, then append new files until shutdown.
    Watch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub bulk: SyncReport,
    pub watch: Option<WatchStats>,
}

/// Runs the bulk load and then hands over to the watcher.
///
/// `connect` opens a new session each time it is called: one short-lived
/// session for the bulk load, one long-lived session owned by the watcher.
pub struct Orchestrator<F> {
    root: PathBuf,
    connect: F,
    watch: WatchConfig,
}

impl<S, F> Orchestrator<F>
where
    S: Sink + Send + 'static,
    F: FnMut() -> Result<S, SinkError>,
{
    pub fn new(root: impl Into<PathBuf>, connect: F, watch: WatchConfig) -> Self {
        Self {
            root: root.into(),
            connect,
            watch,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan the tree and replace the table with what was found.
    pub fn bulk_sync(&mut self) -> Result<SyncReport, Error> {
        let records = scan_tree(&self.root)?;
        tracing::info!(root = %self.root.display(), activities = records.len(), "scanned");

        let mut sink = (self.connect)()?;
        Ok(sync::replace_all(&mut sink, &records)?)
    }

    /// Open the long-lived session and start appending new files.
    pub fn start_watching(&mut self) -> Result<ChangeWatcher, Error> {
        let sink = (self.connect)()?;
        let mut watcher = ChangeWatcher::new(self.root.clone(), self.watch);
        watcher.start(sink)?;
        Ok(watcher)
    }

    /// Bulk sync, then (in watch mode) append new files until `shutdown`
    /// receives a message or its sender goes away.
    ///
    /// The watcher only subscribes after the bulk transaction has committed,
    /// so a truncate can never race a live append.
    pub fn run(&mut self, mode: Mode, shutdown: &Receiver<()>) -> Result<RunSummary, Error> {
        let bulk = self.bulk_sync()?;
        if mode == Mode::Once {
            return Ok(RunSummary { bulk, watch: None });
        }

        let mut watcher = self.start_watching()?;
        tracing::info!("listening");

        loop {
            match shutdown.recv_timeout(LIVENESS_POLL) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    tracing::info!("shutdown requested");
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {
                    if !watcher.is_alive() {
                        tracing::warn!("watch worker exited on its own");
                        break;
                    }
                }
            }
        }

        let stats = watcher.stop()?;
        Ok(RunSummary {
            bulk,
            watch: Some(stats),
        })
    }
}
