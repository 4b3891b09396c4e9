#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, Result};
use clap::Parser;
use hrsync::database::PgSink;
use hrsync::orchestrator::{Mode, Orchestrator, RunSummary};
use hrsync::sink::MemoryTable;
use hrsync::{cli, dlog, utils};
use std::sync::mpsc;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    utils::init_logging(cli.verbose, cli.quiet);

    let mode = if cli.once { Mode::Once } else { Mode::Watch };
    let watch = cli.watch_config();
    dlog!(
        "mode={mode:?} dry_run={} root={} settle_ms={}",
        cli.dry_run,
        cli.watch_path.display(),
        cli.settle_ms
    );

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    })
    .context("Installing shutdown signal handler")?;

    let summary = if cli.dry_run {
        let table = MemoryTable::new();
        tracing::info!("dry run: syncing into memory");
        Orchestrator::new(&cli.watch_path, || Ok(table.sink()), watch).run(mode, &shutdown_rx)?
    } else {
        let db = cli.db_config()?;
        tracing::info!(target_db = %db, "connection");

        if cli.init_schema {
            PgSink::connect(&db)?.ensure_schema()?;
        }

        Orchestrator::new(&cli.watch_path, || PgSink::connect(&db), watch)
            .run(mode, &shutdown_rx)
            .with_context(|| format!("Syncing {}", cli.watch_path.display()))?
    };

    report(&summary);
    Ok(())
}

fn report(summary: &RunSummary) {
    tracing::info!(
        rows = summary.bulk.inserted,
        elapsed_ms = summary.bulk.elapsed.as_millis(),
        "bulk sync done"
    );
    if let Some(w) = summary.watch {
        tracing::info!(appended = w.appended, failed = w.failed, "watch done");
    }
}
