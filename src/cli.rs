use crate::config::{DEFAULT_DBNAME, DEFAULT_HOST, DEFAULT_PORT, DbConfig};
use crate::watch::WatchConfig;
use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "hrsync",
    about = "Load heart-rate summary files into PostgreSQL and keep appending new ones"
)]
pub struct Cli {
    /// Root directory holding `run/`, `core/` and `weight/`.
    #[arg(long, env = "WATCHPATH", value_name = "DIR")]
    pub watch_path: PathBuf,

    /// PostgreSQL host
    #[arg(long, env = "DBHOST", default_value = DEFAULT_HOST)]
    pub db_host: String,

    /// PostgreSQL port
    #[arg(long, env = "DBPORT", default_value_t = DEFAULT_PORT)]
    pub db_port: u16,

    /// PostgreSQL user
    #[arg(long, env = "DBUSER", required_unless_present = "dry_run")]
    pub db_user: Option<String>,

    /// PostgreSQL password
    #[arg(
        long,
        env = "DBPASS",
        hide_env_values = true,
        required_unless_present = "dry_run"
    )]
    pub db_pass: Option<String>,

    /// PostgreSQL database
    #[arg(long, env = "DBNAME", default_value = DEFAULT_DBNAME)]
    pub db_name: String,

    /// Sync once and exit instead of watching for new files.
    #[arg(long)]
    pub once: bool,

    /// Parse and sync into memory only; never touches PostgreSQL.
    #[arg(long)]
    pub dry_run: bool,

    /// Create `activity_log` if it is missing.
    #[arg(long)]
    pub init_schema: bool,

    /// Delay before reading a newly created file, in milliseconds.
    #[arg(long, default_value_t = 0)]
    pub settle_ms: u64,

    /// Warn when handling one new file takes longer than this, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    pub slow_ms: u64,

    /// Increase log verbosity (-v, -vv). Defaults to INFO.
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Decrease log verbosity (-q, -qq). Defaults to INFO.
    #[arg(short = 'q', long, action = ArgAction::Count, global = true)]
    pub quiet: u8,
}

impl Cli {
    pub fn db_config(&self) -> Result<DbConfig> {
        let user = self.db_user.clone().context("DBUSER is not set")?;
        let password = self.db_pass.clone().context("DBPASS is not set")?;

        let mut db = DbConfig::new(user, password);
        db.host.clone_from(&self.db_host);
        db.port = self.db_port;
        db.dbname.clone_from(&self.db_name);
        Ok(db)
    }

    pub const fn watch_config(&self) -> WatchConfig {
        WatchConfig {
            settle: Duration::from_millis(self.settle_ms),
            slow_event_threshold: Duration::from_millis(self.slow_ms),
        }
    }
}
