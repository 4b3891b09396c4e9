use crate::config::DbConfig;
use crate::error::SinkError;
use crate::sink::{Sink, SinkTx, TABLE};
use crate::types::ActivityRecord;
use postgres::{Client, NoTls, Statement, Transaction};

const TRUNCATE_SQL: &str = "TRUNCATE TABLE activity_log";

const INSERT_SQL: &str = r"
    INSERT INTO activity_log
      (activityTimestamp, activitySeconds, activityType, heartrateAverage, heartrateMax)
    VALUES ($1, $2, $3, $4, $5)
";

/// One PostgreSQL session on `activity_log`.
pub struct PgSink {
    client: Client,
}

impl PgSink {
    pub fn connect(db: &DbConfig) -> Result<Self, SinkError> {
        let client = db
            .pg_config()
            .connect(NoTls)
            .map_err(SinkError::pg("Connecting to PostgreSQL"))?;
        tracing::debug!(target_db = %db, "connected");
        Ok(Self { client })
    }

    /// Create `activity_log` if it does not exist yet.
    pub fn ensure_schema(&mut self) -> Result<(), SinkError> {
        self.client
            .batch_execute(
                r"
                CREATE TABLE IF NOT EXISTS activity_log (
                  activityTimestamp  timestamptz NOT NULL,
                  activitySeconds    int NOT NULL,
                  activityType       text NOT NULL,
                  heartrateAverage   int NOT NULL,
                  heartrateMax       int NOT NULL
                );

                CREATE INDEX IF NOT EXISTS activity_log_timestamp_idx
                  ON activity_log (activityTimestamp DESC);
                ",
            )
            .map_err(SinkError::pg("Ensuring PostgreSQL schema"))?;
        tracing::info!(table = TABLE, "schema ready");
        Ok(())
    }
}

impl Sink for PgSink {
    type Tx<'a> = PgTx<'a>;

    fn begin(&mut self) -> Result<PgTx<'_>, SinkError> {
        let mut tx = self
            .client
            .transaction()
            .map_err(SinkError::pg("Starting transaction"))?;
        let insert = tx
            .prepare(INSERT_SQL)
            .map_err(SinkError::pg("Preparing activity insert"))?;
        Ok(PgTx { tx, insert })
    }
}

/// Rolls back on drop unless committed.
pub struct PgTx<'a> {
    tx: Transaction<'a>,
    insert: Statement,
}

impl SinkTx for PgTx<'_> {
    fn truncate(&mut self) -> Result<(), SinkError> {
        self.tx
            .batch_execute(TRUNCATE_SQL)
            .map_err(SinkError::pg("Truncating activity_log"))
    }

    fn insert(&mut self, record: &ActivityRecord) -> Result<(), SinkError> {
        self.tx
            .execute(
                &self.insert,
                &[
                    &record.timestamp,
                    &record.active_seconds,
                    &record.activity_type.tag(),
                    &record.average_heart_rate,
                    &record.max_heart_rate,
                ],
            )
            .map_err(SinkError::pg("Inserting activity"))?;
        Ok(())
    }

    fn commit(self) -> Result<(), SinkError> {
        self.tx
            .commit()
            .map_err(SinkError::pg("Committing transaction"))
    }
}
