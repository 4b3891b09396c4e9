//! Runs against a live PostgreSQL and truncates its `activity_log`.
//!
//! `DBUSER=.. DBPASS=.. [DBHOST=..] [DBNAME=..] cargo test -- --ignored`

use chrono::{DateTime, FixedOffset};
use hrsync::config::DbConfig;
use hrsync::database::PgSink;
use hrsync::sink::{Sink, SinkTx};
use hrsync::sync::{append, replace_all};
use hrsync::types::{ActivityRecord, ActivityType};
use postgres::NoTls;
use std::env;

fn db_from_env() -> DbConfig {
    let mut db = DbConfig::new(
        env::var("DBUSER").expect("DBUSER"),
        env::var("DBPASS").expect("DBPASS"),
    );
    if let Ok(host) = env::var("DBHOST") {
        db.host = host;
    }
    if let Ok(name) = env::var("DBNAME") {
        db.dbname = name;
    }
    db
}

fn rec(ty: ActivityType, ts: &str, secs: i32, avg: i32, max: i32) -> ActivityRecord {
    ActivityRecord {
        activity_type: ty,
        timestamp: DateTime::parse_from_rfc3339(ts).unwrap(),
        active_seconds: secs,
        average_heart_rate: avg,
        max_heart_rate: max,
    }
}

type Row = (DateTime<FixedOffset>, i32, String, i32, i32);

fn table_rows(db: &DbConfig) -> Vec<Row> {
    let mut client = db.pg_config().connect(NoTls).unwrap();
    client
        .query(
            "SELECT activityTimestamp, activitySeconds, activityType, heartrateAverage, heartrateMax
             FROM activity_log ORDER BY activityTimestamp",
            &[],
        )
        .unwrap()
        .into_iter()
        .map(|r| (r.get(0), r.get(1), r.get(2), r.get(3), r.get(4)))
        .collect()
}

#[test]
#[ignore = "needs a PostgreSQL server"]
fn replace_append_and_rollback() {
    let db = db_from_env();
    let mut sink = PgSink::connect(&db).unwrap();
    sink.ensure_schema().unwrap();

    let initial = [
        rec(ActivityType::Run, "2024-01-01T08:00:00+00:00", 1800, 120, 150),
        rec(ActivityType::Core, "2024-01-02T09:00:00+00:00", 600, 110, 130),
    ];
    replace_all(&mut sink, &initial).unwrap();
    replace_all(&mut sink, &initial).unwrap();

    let rows = table_rows(&db);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].2, "run");
    assert_eq!(rows[1].1, 600);

    append(
        &mut sink,
        &rec(ActivityType::Weight, "2024-01-03T07:30:00+00:00", 300, 90, 100),
    )
    .unwrap();
    let rows = table_rows(&db);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2].0.to_rfc3339(), "2024-01-03T07:30:00+00:00");

    {
        let mut tx = sink.begin().unwrap();
        tx.truncate().unwrap();
        tx.insert(&initial[0]).unwrap();
    }
    assert_eq!(table_rows(&db).len(), 3);
}
