//! Keep a PostgreSQL `activity_log` table in sync with a tree of per-activity
//! heart-rate summary files laid out as `<root>/<run|core|weight>/<timestamp>.json`.

pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod orchestrator;
pub mod parse;
pub mod scan;
pub mod sink;
pub mod sync;
pub mod types;
pub mod utils;
pub mod watch;
