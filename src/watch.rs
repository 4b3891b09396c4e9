//! Live ingestion of files created under the watch root.
//!
//! The notify backend pushes raw events into a channel; a single worker thread
//! owns the database session and handles them one at a time, in delivery
//! order. Delivery order is whatever the OS notifier produces and is not
//! guaranteed to match creation order under concurrent writers.

use crate::dlog;
use crate::error::WatchError;
use crate::parse::parse_file;
use crate::sink::Sink;
use crate::sync;
use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    /// Wait this long after an event before reading the file.
    pub settle: Duration,
    /// Handlers taking longer than this are logged at WARN.
    pub slow_event_threshold: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            settle: Duration::ZERO,
            slow_event_threshold: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Watching,
    Stopped,
}

/// What the worker did while it was running.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchStats {
    pub appended: usize,
    pub failed: usize,
    pub ignored: usize,
    pub notifier_errors: usize,
}

enum Msg {
    Notify(notify::Result<Event>),
    Stop,
}

pub struct ChangeWatcher {
    root: PathBuf,
    config: WatchConfig,
    state: WatchState,
    watcher: Option<RecommendedWatcher>,
    control: Option<Sender<Msg>>,
    worker: Option<JoinHandle<WatchStats>>,
}

impl ChangeWatcher {
    pub fn new(root: impl Into<PathBuf>, config: WatchConfig) -> Self {
        Self {
            root: root.into(),
            config,
            state: WatchState::Idle,
            watcher: None,
            control: None,
            worker: None,
        }
    }

    pub const fn state(&self) -> WatchState {
        self.state
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `true` while the worker thread is running.
    pub fn is_alive(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Subscribe to the tree and hand `sink` to the worker.
    pub fn start<S>(&mut self, sink: S) -> Result<(), WatchError>
    where
        S: Sink + Send + 'static,
    {
        if self.state != WatchState::Idle {
            return Err(WatchError::InvalidState(self.state));
        }

        let (tx, rx) = mpsc::channel();

        let notify_tx = tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // The worker is gone once stop() ran; late events are dropped.
            let _ = notify_tx.send(Msg::Notify(res));
        })
        .map_err(|source| WatchError::Subscribe {
            path: self.root.clone(),
            source,
        })?;

        watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .map_err(|source| WatchError::Subscribe {
                path: self.root.clone(),
                source,
            })?;

        let config = self.config;
        let worker = thread::Builder::new()
            .name("hrsync-watch".into())
            .spawn(move || run_worker(&rx, sink, config))
            .map_err(WatchError::Spawn)?;

        tracing::info!(root = %self.root.display(), "watching for new files");

        self.watcher = Some(watcher);
        self.control = Some(tx);
        self.worker = Some(worker);
        self.state = WatchState::Watching;
        Ok(())
    }

    /// Unsubscribe, let the worker drain what was already delivered, and join it.
    pub fn stop(&mut self) -> Result<WatchStats, WatchError> {
        if self.state != WatchState::Watching {
            return Err(WatchError::InvalidState(self.state));
        }
        self.state = WatchState::Stopped;

        drop(self.watcher.take());
        if let Some(tx) = self.control.take() {
            let _ = tx.send(Msg::Stop);
        }

        let stats = match self.worker.take() {
            Some(handle) => handle.join().map_err(|_| WatchError::WorkerPanicked)?,
            None => WatchStats::default(),
        };

        tracing::info!(
            root = %self.root.display(),
            appended = stats.appended,
            failed = stats.failed,
            ignored = stats.ignored,
            notifier_errors = stats.notifier_errors,
            "watcher stopped"
        );
        Ok(stats)
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        if self.state == WatchState::Watching
            && let Err(e) = self.stop()
        {
            tracing::error!(err = %e, "stopping watcher on drop");
        }
    }
}

fn run_worker<S: Sink>(rx: &Receiver<Msg>, mut sink: S, config: WatchConfig) -> WatchStats {
    let mut stats = WatchStats::default();

    while let Ok(msg) = rx.recv() {
        match msg {
            Msg::Stop => break,
            Msg::Notify(Err(e)) => {
                stats.notifier_errors += 1;
                tracing::error!(err = %e, paths = ?e.paths, "filesystem watch error");
            }
            Msg::Notify(Ok(event)) => {
                for path in created_paths(&event) {
                    handle_created(&mut sink, path, &config, &mut stats);
                }
            }
        }
    }

    stats
}

/// Paths that newly appeared in the tree.
///
/// Files renamed into place count as created: that is how writers that stage a
/// file elsewhere deliver it.
fn created_paths(event: &Event) -> &[PathBuf] {
    match event.kind {
        EventKind::Create(CreateKind::Folder) => &[],
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            event.paths.as_slice()
        }
        _ => {
            dlog!("watch_skip kind={:?} paths={:?}", event.kind, event.paths);
            &[]
        }
    }
}

fn handle_created<S: Sink>(sink: &mut S, path: &Path, config: &WatchConfig, stats: &mut WatchStats) {
    if path.is_dir() {
        stats.ignored += 1;
        return;
    }

    let started = Instant::now();
    if !config.settle.is_zero() {
        thread::sleep(config.settle);
    }

    tracing::info!(path = %path.display(), "created file");

    match parse_file(path) {
        Err(e) => {
            stats.failed += 1;
            tracing::error!(path = %path.display(), err = %e, "skipping unparsable file");
        }
        Ok(record) => match sync::append(sink, &record) {
            Ok(()) => {
                stats.appended += 1;
                tracing::info!(
                    path = %path.display(),
                    activity = %record.activity_type,
                    timestamp = %record.timestamp.to_rfc3339(),
                    "row appended"
                );
            }
            Err(e) => {
                stats.failed += 1;
                tracing::error!(path = %path.display(), err = %e, "appending row failed");
            }
        },
    }

    let elapsed = started.elapsed();
    if elapsed > config.slow_event_threshold {
        tracing::warn!(
            path = %path.display(),
            elapsed_ms = elapsed.as_millis(),
            "slow event handler"
        );
    } else {
        dlog!("event_done path={} elapsed_ms={}", path.display(), elapsed.as_millis());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemoryTable;
    use notify::event::{AccessKind, DataChange, RemoveKind};

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn only_creations_and_renames_into_place_count() {
        let file = EventKind::Create(CreateKind::File);
        assert_eq!(created_paths(&event(file, "/r/run/a.json")).len(), 1);

        let any = EventKind::Create(CreateKind::Any);
        assert_eq!(created_paths(&event(any, "/r/run/a.json")).len(), 1);

        let moved_in = EventKind::Modify(ModifyKind::Name(RenameMode::To));
        assert_eq!(created_paths(&event(moved_in, "/r/run/a.json")).len(), 1);

        for kind in [
            EventKind::Create(CreateKind::Folder),
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            EventKind::Remove(RemoveKind::File),
            EventKind::Access(AccessKind::Any),
        ] {
            assert!(created_paths(&event(kind, "/r/run/a.json")).is_empty(), "{kind:?}");
        }
    }

    #[test]
    fn worker_isolates_failures_and_stops_on_request() {
        let tmp = tempfile::tempdir().unwrap();
        let run = tmp.path().join("run");
        std::fs::create_dir(&run).unwrap();
        let bad = run.join("garbage.json");
        let good = run.join("2024-01-01T08_00_00+0000.json");
        std::fs::write(&bad, "{}").unwrap();
        std::fs::write(
            &good,
            r#"{"activeSeconds":{"value":1800},"averageHR":{"value":120},"maxHR":{"value":150}}"#,
        )
        .unwrap();

        let table = MemoryTable::new();
        let (tx, rx) = mpsc::channel();
        let created = EventKind::Create(CreateKind::File);
        tx.send(Msg::Notify(Ok(Event::new(created).add_path(bad)))).unwrap();
        tx.send(Msg::Notify(Err(notify::Error::generic("queue overflow")))).unwrap();
        tx.send(Msg::Notify(Ok(Event::new(created).add_path(run.clone())))).unwrap();
        tx.send(Msg::Notify(Ok(Event::new(created).add_path(good.clone())))).unwrap();
        tx.send(Msg::Stop).unwrap();
        tx.send(Msg::Notify(Ok(Event::new(created).add_path(good)))).unwrap();

        let stats = run_worker(&rx, table.sink(), WatchConfig::default());

        assert_eq!(
            stats,
            WatchStats {
                appended: 1,
                failed: 1,
                ignored: 1,
                notifier_errors: 1,
            }
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn insert_failure_does_not_stop_the_worker() {
        let tmp = tempfile::tempdir().unwrap();
        let core = tmp.path().join("core");
        std::fs::create_dir(&core).unwrap();
        let body = r#"{"activeSeconds":{"value":600},"averageHR":{"value":110},"maxHR":{"value":130}}"#;
        let first = core.join("2024-01-02T09_00_00+0000.json");
        let second = core.join("2024-01-02T10_00_00+0000.json");
        std::fs::write(&first, body).unwrap();
        std::fs::write(&second, body).unwrap();

        let table = MemoryTable::new();
        let (tx, rx) = mpsc::channel();
        let created = EventKind::Create(CreateKind::File);
        tx.send(Msg::Notify(Ok(Event::new(created).add_path(first)))).unwrap();
        tx.send(Msg::Notify(Ok(Event::new(created).add_path(second)))).unwrap();
        drop(tx);

        let stats = run_worker(&rx, table.sink().fail_on_insert(0), WatchConfig::default());

        assert_eq!((stats.appended, stats.failed), (1, 1));
        assert_eq!(table.rows()[0].timestamp.to_rfc3339(), "2024-01-02T10:00:00+00:00");
    }

    #[test]
    fn stop_before_start_is_rejected() {
        let mut w = ChangeWatcher::new("/nonexistent", WatchConfig::default());
        assert_eq!(w.state(), WatchState::Idle);
        assert!(matches!(w.stop(), Err(WatchError::InvalidState(WatchState::Idle))));
    }

    #[test]
    fn missing_root_fails_to_subscribe() {
        let tmp = tempfile::tempdir().unwrap();
        let mut w = ChangeWatcher::new(tmp.path().join("missing"), WatchConfig::default());
        let err = w.start(MemoryTable::new().sink()).unwrap_err();
        assert!(matches!(err, WatchError::Subscribe { .. }));
        assert_eq!(w.state(), WatchState::Idle);
    }
}
